use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::page::{
    is_valid_domain, resolve_publication, slugify, DailyViews, Design, MaintenancePage, PageStatus, PublishType,
};

const PAGE_COLUMNS: &str = "id, user_id, domain, title, description, content, status, deployed, scheduled_for,
     design, total_views, unique_views, slug, created_at, updated_at";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Page not found")]
    NotFound,

    #[error("Invalid page data")]
    Validation(HashMap<String, String>),

    #[error("Page limit reached for your plan ({0} pages)")]
    LimitReached(i32),

    #[error("This page has reached its view limit")]
    ViewLimitReached,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for PageError {
    fn from(err: sqlx::Error) -> Self {
        PageError::Database(DatabaseError::Sqlx(err))
    }
}

/// Create/update payload. On update every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub domain: Option<String>,
    pub status: Option<PageStatus>,
    pub publish_type: Option<PublishType>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub design: Option<Design>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageAnalytics {
    pub page_id: Uuid,
    pub total_views: i64,
    pub unique_views: i64,
    pub daily: Vec<DailyViews>,
}

/// Outcome of counting a public view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCount {
    pub total_views: i64,
    pub unique_views: i64,
}

#[derive(Clone)]
pub struct PageService {
    pool: PgPool,
}

impl PageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<MaintenancePage>, PageError> {
        let pages = sqlx::query_as::<_, MaintenancePage>(&format!(
            "SELECT {PAGE_COLUMNS} FROM maintenance_pages WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pages)
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, PageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_pages WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Page by id regardless of owner, for public views
    pub async fn get(&self, id: Uuid) -> Result<MaintenancePage, PageError> {
        sqlx::query_as::<_, MaintenancePage>(&format!("SELECT {PAGE_COLUMNS} FROM maintenance_pages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PageError::NotFound)
    }

    /// Most recently updated deployed page serving `domain`
    pub async fn find_deployed_by_domain(&self, domain: &str) -> Result<Option<MaintenancePage>, PageError> {
        let page = sqlx::query_as::<_, MaintenancePage>(&format!(
            "SELECT {PAGE_COLUMNS} FROM maintenance_pages
             WHERE lower(domain) = lower($1) AND deployed
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;
        Ok(page)
    }

    /// Page by id, only if owned by `user_id`
    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<MaintenancePage, PageError> {
        sqlx::query_as::<_, MaintenancePage>(&format!(
            "SELECT {PAGE_COLUMNS} FROM maintenance_pages WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PageError::NotFound)
    }

    pub async fn create(&self, user_id: Uuid, input: PageInput, max_pages: i32) -> Result<MaintenancePage, PageError> {
        let count = self.count_for_user(user_id).await?;
        if count >= i64::from(max_pages) {
            return Err(PageError::LimitReached(max_pages));
        }

        let draft = build_page(None, input, Utc::now())?;
        let page = sqlx::query_as::<_, MaintenancePage>(&format!(
            "INSERT INTO maintenance_pages
                 (user_id, domain, title, description, content, status, scheduled_for, design, slug)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&draft.domain)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.content)
        .bind(draft.status)
        .bind(draft.scheduled_for)
        .bind(Json(&draft.design))
        .bind(&draft.slug)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created page {} for {}", page.id, page.domain);
        Ok(page)
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, input: PageInput) -> Result<MaintenancePage, PageError> {
        let current = self.get_owned(user_id, id).await?;
        let draft = build_page(Some(&current), input, Utc::now())?;

        let page = sqlx::query_as::<_, MaintenancePage>(&format!(
            "UPDATE maintenance_pages SET
                 domain = $3, title = $4, description = $5, content = $6, status = $7,
                 scheduled_for = $8, design = $9, slug = $10, updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&draft.domain)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.content)
        .bind(draft.status)
        .bind(draft.scheduled_for)
        .bind(Json(&draft.design))
        .bind(&draft.slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PageError::NotFound)?;
        Ok(page)
    }

    pub async fn set_status(&self, id: Uuid, status: PageStatus) -> Result<MaintenancePage, PageError> {
        sqlx::query_as::<_, MaintenancePage>(&format!(
            "UPDATE maintenance_pages SET status = $2,
                 scheduled_for = CASE WHEN $2 = 'scheduled'::page_status THEN scheduled_for ELSE NULL END,
                 updated_at = now()
             WHERE id = $1 RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PageError::NotFound)
    }

    pub async fn set_deployed(&self, id: Uuid, deployed: bool) -> Result<MaintenancePage, PageError> {
        sqlx::query_as::<_, MaintenancePage>(&format!(
            "UPDATE maintenance_pages SET deployed = $2, updated_at = now() WHERE id = $1 RETURNING {PAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(deployed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PageError::NotFound)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), PageError> {
        let result = sqlx::query("DELETE FROM maintenance_pages WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PageError::NotFound);
        }
        Ok(())
    }

    /// Count one view; `unique` when the visitor had no cookie for this page
    pub async fn record_view(&self, id: Uuid, unique: bool, views_limit: i64) -> Result<ViewCount, PageError> {
        let mut tx = self.pool.begin().await?;

        let unique_inc = i64::from(unique);
        let counts: Option<(i64, i64)> = sqlx::query_as(
            "UPDATE maintenance_pages
             SET total_views = total_views + 1, unique_views = unique_views + $2
             WHERE id = $1 AND total_views < $3
             RETURNING total_views, unique_views",
        )
        .bind(id)
        .bind(unique_inc)
        .bind(views_limit)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((total_views, unique_views)) = counts else {
            let exists: Option<i64> = sqlx::query_scalar("SELECT total_views FROM maintenance_pages WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => PageError::ViewLimitReached,
                None => PageError::NotFound,
            });
        };

        sqlx::query(
            "INSERT INTO page_views_daily (page_id, day, views, unique_views)
             VALUES ($1, CURRENT_DATE, 1, $2)
             ON CONFLICT (page_id, day) DO UPDATE SET
                 views = page_views_daily.views + 1,
                 unique_views = page_views_daily.unique_views + EXCLUDED.unique_views",
        )
        .bind(id)
        .bind(unique_inc)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ViewCount {
            total_views,
            unique_views,
        })
    }

    pub async fn analytics(&self, user_id: Uuid, id: Uuid) -> Result<PageAnalytics, PageError> {
        let page = self.get_owned(user_id, id).await?;
        let daily = sqlx::query_as::<_, DailyViews>(
            "SELECT day, views, unique_views FROM page_views_daily
             WHERE page_id = $1 ORDER BY day DESC LIMIT 90",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(PageAnalytics {
            page_id: page.id,
            total_views: page.total_views,
            unique_views: page.unique_views,
            daily,
        })
    }

    /// Publish every scheduled page whose time has passed
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<MaintenancePage>, PageError> {
        let pages = sqlx::query_as::<_, MaintenancePage>(&format!(
            "UPDATE maintenance_pages SET status = 'published', updated_at = now()
             WHERE status = 'scheduled' AND scheduled_for <= $1
             RETURNING {PAGE_COLUMNS}"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(pages)
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

/// The domain a deployed page moves to when `input` changes it.
///
/// The edge deployment lives under the old domain until it is torn down.
pub fn relocation_target(current: &MaintenancePage, input: &PageInput) -> Option<String> {
    if !current.deployed {
        return None;
    }
    let domain = normalize_domain(input.domain.as_deref()?);
    (domain != current.domain).then_some(domain)
}

/// Validate an update without writing it
pub fn check_update(current: &MaintenancePage, input: &PageInput) -> Result<(), PageError> {
    build_page(Some(current), input.clone(), Utc::now()).map(|_| ())
}

/// Resolved field values for an insert or update
#[derive(Debug)]
struct PageDraft {
    domain: String,
    title: String,
    description: String,
    content: String,
    status: PageStatus,
    scheduled_for: Option<DateTime<Utc>>,
    design: Design,
    slug: Option<String>,
}

/// Merge `input` over `current` (if any) and validate the result
fn build_page(current: Option<&MaintenancePage>, input: PageInput, now: DateTime<Utc>) -> Result<PageDraft, PageError> {
    let mut errors = HashMap::new();

    let title = input
        .title
        .or_else(|| current.map(|p| p.title.clone()))
        .unwrap_or_default()
        .trim()
        .to_string();
    let content = input
        .content
        .or_else(|| current.map(|p| p.content.clone()))
        .unwrap_or_default();
    let description = input
        .description
        .or_else(|| current.map(|p| p.description.clone()))
        .unwrap_or_default();
    let domain = normalize_domain(
        &input
            .domain
            .or_else(|| current.map(|p| p.domain.clone()))
            .unwrap_or_default(),
    );
    let design = input
        .design
        .or_else(|| current.map(|p| p.design.0.clone()))
        .unwrap_or_default();

    if title.is_empty() {
        errors.insert("title".to_string(), "Title is required".to_string());
    }
    if content.trim().is_empty() {
        errors.insert("content".to_string(), "Content is required".to_string());
    }
    if !is_valid_domain(&domain) {
        errors.insert("domain".to_string(), "Invalid domain".to_string());
    }
    errors.extend(design.validate());

    let fallback = current.map(|p| p.status).unwrap_or(PageStatus::Draft);
    let scheduled_input = input.scheduled_for.or_else(|| current.and_then(|p| p.scheduled_for));
    let requested = input.status.or(current.map(|p| p.status));
    let publish_type = match (input.publish_type, requested) {
        (Some(t), _) => Some(t),
        // Keep an existing schedule unless told otherwise
        (None, Some(PageStatus::Scheduled)) => Some(PublishType::Schedule),
        (None, _) => None,
    };
    let (status, scheduled_for) = resolve_publication(publish_type, scheduled_input, requested, fallback, now);
    if publish_type == Some(PublishType::Schedule) && scheduled_input.is_none() {
        errors.insert("scheduled_for".to_string(), "A schedule date is required".to_string());
    }

    if !errors.is_empty() {
        return Err(PageError::Validation(errors));
    }

    let slug = input
        .slug
        .map(|s| slugify(&s))
        .filter(|s| !s.is_empty())
        .or_else(|| current.and_then(|p| p.slug.clone()))
        .or_else(|| Some(slugify(&title)).filter(|s| !s.is_empty()));

    Ok(PageDraft {
        domain,
        title,
        description,
        content,
        status,
        scheduled_for,
        design,
        slug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_page;
    use chrono::Duration;

    fn input() -> PageInput {
        PageInput {
            title: Some("Planned Upgrade".into()),
            content: Some("<p>Back soon</p>".into()),
            domain: Some("Status.Example.com".into()),
            ..PageInput::default()
        }
    }

    #[test]
    fn domain_change_on_deployed_page_is_a_relocation() {
        let mut page = sample_page("old.example.com", PageStatus::Published);
        page.deployed = true;
        let moved = PageInput {
            domain: Some(" New.Example.com ".into()),
            ..PageInput::default()
        };
        assert_eq!(relocation_target(&page, &moved).as_deref(), Some("new.example.com"));

        let same = PageInput {
            domain: Some("OLD.example.com".into()),
            ..PageInput::default()
        };
        assert_eq!(relocation_target(&page, &same), None);
        assert_eq!(relocation_target(&page, &PageInput::default()), None);

        page.deployed = false;
        assert_eq!(relocation_target(&page, &moved), None);
    }

    #[test]
    fn invalid_update_is_rejected_before_any_write() {
        let page = sample_page("old.example.com", PageStatus::Published);
        let bad = PageInput {
            domain: Some("not a domain".into()),
            ..PageInput::default()
        };
        assert!(matches!(check_update(&page, &bad), Err(PageError::Validation(_))));
        assert!(check_update(&page, &PageInput::default()).is_ok());
    }

    #[test]
    fn new_page_defaults_to_draft_with_slug() {
        let draft = build_page(None, input(), Utc::now()).unwrap();
        assert_eq!(draft.status, PageStatus::Draft);
        assert_eq!(draft.domain, "status.example.com");
        assert_eq!(draft.slug.as_deref(), Some("planned-upgrade"));
        assert_eq!(draft.design, Design::default());
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let err = build_page(None, PageInput::default(), Utc::now()).unwrap_err();
        match err {
            PageError::Validation(fields) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("content"));
                assert!(fields.contains_key("domain"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn schedule_in_past_publishes_on_save() {
        let now = Utc::now();
        let draft = build_page(
            None,
            PageInput {
                publish_type: Some(PublishType::Schedule),
                scheduled_for: Some(now - Duration::minutes(1)),
                ..input()
            },
            now,
        )
        .unwrap();
        assert_eq!(draft.status, PageStatus::Published);
    }

    #[test]
    fn schedule_without_date_is_invalid() {
        let err = build_page(
            None,
            PageInput {
                publish_type: Some(PublishType::Schedule),
                ..input()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, PageError::Validation(f) if f.contains_key("scheduled_for")));
    }

    #[test]
    fn update_keeps_existing_fields_and_schedule() {
        let now = Utc::now();
        let mut page = sample_page("example.com", PageStatus::Scheduled);
        page.scheduled_for = Some(now + Duration::hours(3));

        let draft = build_page(
            Some(&page),
            PageInput {
                content: Some("<p>New ETA</p>".into()),
                ..PageInput::default()
            },
            now,
        )
        .unwrap();
        assert_eq!(draft.title, page.title);
        assert_eq!(draft.content, "<p>New ETA</p>");
        assert_eq!(draft.status, PageStatus::Scheduled);
        assert_eq!(draft.scheduled_for, page.scheduled_for);
        assert_eq!(draft.slug, page.slug);
    }

    #[test]
    fn update_to_archived() {
        let page = sample_page("example.com", PageStatus::Published);
        let draft = build_page(
            Some(&page),
            PageInput {
                status: Some(PageStatus::Archived),
                ..PageInput::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(draft.status, PageStatus::Archived);
        assert!(draft.scheduled_for.is_none());
    }

    #[test]
    fn invalid_design_is_rejected() {
        let mut design = Design::default();
        design.text_color = "white".into();
        let err = build_page(
            None,
            PageInput {
                design: Some(design),
                ..input()
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, PageError::Validation(f) if f.contains_key("design.textColor")));
    }
}
