use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "incident_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum IncidentStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    PostMortem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "incident_impact", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    #[default]
    None,
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMortem {
    pub summary: String,
    pub root_cause: String,
    pub resolution: String,
    pub prevention: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Incident {
    pub id: Uuid,
    pub page_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub impact: Impact,
    pub components: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub post_mortem: Option<Json<PostMortem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IncidentUpdate {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub status: IncidentStatus,
    pub message: String,
    pub impact: Impact,
    pub components: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Incident is closed after its post-mortem")]
    Closed,

    #[error("The post-mortem status is set by writing a post-mortem")]
    PostMortemViaUpdate,

    #[error("A post-mortem can only be written for a resolved incident")]
    NotResolved,
}

impl IncidentStatus {
    /// Whether an update log entry may move the incident to `next`
    pub fn check_update(self, next: IncidentStatus) -> Result<(), TransitionError> {
        if self == IncidentStatus::PostMortem {
            return Err(TransitionError::Closed);
        }
        if next == IncidentStatus::PostMortem {
            return Err(TransitionError::PostMortemViaUpdate);
        }
        Ok(())
    }

    pub fn check_post_mortem(self) -> Result<(), TransitionError> {
        match self {
            IncidentStatus::Resolved => Ok(()),
            IncidentStatus::PostMortem => Err(TransitionError::Closed),
            _ => Err(TransitionError::NotResolved),
        }
    }
}

impl Incident {
    /// Copy an update's fields onto the incident
    pub fn apply_update(&mut self, status: IncidentStatus, impact: Impact, components: &[String], now: DateTime<Utc>) {
        self.status = status;
        self.impact = impact;
        self.components = components.to_vec();
        if status == IncidentStatus::Resolved {
            self.resolved_at = Some(now);
            self.end_time = Some(now);
        }
        self.updated_at = now;
    }
}
