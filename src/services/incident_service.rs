use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::incident::{Impact, Incident, IncidentStatus, IncidentUpdate, PostMortem, TransitionError};
use crate::database::models::user::User;

/// Plan code that unlocks incident management
pub const INCIDENT_PLAN: &str = "pro";

const INCIDENT_COLUMNS: &str = "id, page_id, user_id, title, description, status, impact, components,
     start_time, end_time, resolved_at, post_mortem, created_at, updated_at";

const UPDATE_COLUMNS: &str = "id, incident_id, status, message, impact, components, created_at";

#[derive(Debug, Error)]
pub enum IncidentError {
    #[error("Incident not found")]
    NotFound,

    #[error("Page not found")]
    PageNotFound,

    #[error("Incident management is only available for Pro plan users")]
    PlanRequired,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for IncidentError {
    fn from(err: sqlx::Error) -> Self {
        IncidentError::Database(DatabaseError::Sqlx(err))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncident {
    pub page_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub components: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncidentUpdate {
    pub status: IncidentStatus,
    pub message: String,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentDetail {
    #[serde(flatten)]
    pub incident: Incident,
    pub updates: Vec<IncidentUpdate>,
}

#[derive(Clone)]
pub struct IncidentService {
    pool: PgPool,
}

impl IncidentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Incident features require the pro plan with a live subscription
    pub fn ensure_access(user: &User, now: DateTime<Utc>) -> Result<(), IncidentError> {
        if user.subscription_plan == INCIDENT_PLAN && user.has_active_subscription(now) {
            Ok(())
        } else {
            Err(IncidentError::PlanRequired)
        }
    }

    pub async fn list_for_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Vec<Incident>, IncidentError> {
        self.ensure_page_owned(user_id, page_id).await?;
        let incidents = sqlx::query_as::<_, Incident>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE page_id = $1 ORDER BY created_at DESC"
        ))
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(incidents)
    }

    /// Create the incident and its initial "investigating" log entry
    pub async fn create(&self, user_id: Uuid, input: NewIncident) -> Result<IncidentDetail, IncidentError> {
        if input.title.trim().is_empty() || input.description.trim().is_empty() {
            return Err(IncidentError::Validation("Title and description are required".into()));
        }
        self.ensure_page_owned(user_id, input.page_id).await?;

        let mut tx = self.pool.begin().await?;
        let incident = sqlx::query_as::<_, Incident>(&format!(
            "INSERT INTO incidents (page_id, user_id, title, description, status, impact, components, start_time)
             VALUES ($1, $2, $3, $4, 'investigating', $5, $6, COALESCE($7, now()))
             RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(input.page_id)
        .bind(user_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.impact)
        .bind(&input.components)
        .bind(input.start_time)
        .fetch_one(&mut *tx)
        .await?;

        let update = sqlx::query_as::<_, IncidentUpdate>(&format!(
            "INSERT INTO incident_updates (incident_id, status, message, impact, components)
             VALUES ($1, 'investigating', 'Initial incident report', $2, $3)
             RETURNING {UPDATE_COLUMNS}"
        ))
        .bind(incident.id)
        .bind(incident.impact)
        .bind(&incident.components)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Opened incident {} on page {}", incident.id, incident.page_id);
        Ok(IncidentDetail {
            incident,
            updates: vec![update],
        })
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<IncidentDetail, IncidentError> {
        let incident = self.get_owned(user_id, id).await?;
        let updates = sqlx::query_as::<_, IncidentUpdate>(&format!(
            "SELECT {UPDATE_COLUMNS} FROM incident_updates WHERE incident_id = $1 ORDER BY created_at ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(IncidentDetail { incident, updates })
    }

    /// Append to the log and copy the update's fields onto the incident
    pub async fn add_update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: NewIncidentUpdate,
    ) -> Result<IncidentDetail, IncidentError> {
        if input.message.trim().is_empty() {
            return Err(IncidentError::Validation("Update message is required".into()));
        }
        let mut incident = self.get_owned(user_id, id).await?;
        incident.status.check_update(input.status)?;
        incident.apply_update(input.status, input.impact, &input.components, Utc::now());

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO incident_updates (incident_id, status, message, impact, components)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(input.status)
        .bind(input.message.trim())
        .bind(input.impact)
        .bind(&input.components)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE incidents SET status = $2, impact = $3, components = $4,
                 resolved_at = $5, end_time = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(id)
        .bind(incident.status)
        .bind(incident.impact)
        .bind(&incident.components)
        .bind(incident.resolved_at)
        .bind(incident.end_time)
        .bind(incident.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get(user_id, id).await
    }

    pub async fn write_post_mortem(
        &self,
        user_id: Uuid,
        id: Uuid,
        post_mortem: PostMortem,
    ) -> Result<Incident, IncidentError> {
        let incident = self.get_owned(user_id, id).await?;
        incident.status.check_post_mortem()?;

        let incident = sqlx::query_as::<_, Incident>(&format!(
            "UPDATE incidents SET post_mortem = $2, status = 'post-mortem', updated_at = now()
             WHERE id = $1 RETURNING {INCIDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(&post_mortem))
        .fetch_one(&self.pool)
        .await?;
        Ok(incident)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), IncidentError> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(IncidentError::NotFound);
        }
        Ok(())
    }

    async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<Incident, IncidentError> {
        sqlx::query_as::<_, Incident>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(IncidentError::NotFound)
    }

    async fn ensure_page_owned(&self, user_id: Uuid, page_id: Uuid) -> Result<(), IncidentError> {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM maintenance_pages WHERE id = $1 AND user_id = $2")
                .bind(page_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        exists.map(|_| ()).ok_or(IncidentError::PageNotFound)
    }
}
