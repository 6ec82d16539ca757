use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

pub const FONT_FAMILIES: [&str; 3] = ["Inter", "Roboto", "Open Sans"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "page_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
    Scheduled,
    Archived,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
            PageStatus::Scheduled => "scheduled",
            PageStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Centered,
    LeftAligned,
    RightAligned,
}

impl Layout {
    pub fn text_align(&self) -> &'static str {
        match self {
            Layout::Centered => "center",
            Layout::LeftAligned => "left",
            Layout::RightAligned => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoSize {
    pub width: u32,
    pub height: u32,
}

impl Default for LogoSize {
    fn default() -> Self {
        Self { width: 200, height: 50 }
    }
}

/// Visual settings of a maintenance page, stored as JSONB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Design {
    pub background_color: String,
    pub text_color: String,
    pub font_family: String,
    pub layout: Layout,
    pub logo: String,
    pub max_width: u32,
    pub logo_size: LogoSize,
    #[serde(rename = "customCSS")]
    pub custom_css: String,
}

impl Default for Design {
    fn default() -> Self {
        Self {
            background_color: "#000000".to_string(),
            text_color: "#ffffff".to_string(),
            font_family: "Inter".to_string(),
            layout: Layout::Centered,
            logo: String::new(),
            max_width: 768,
            logo_size: LogoSize::default(),
            custom_css: String::new(),
        }
    }
}

impl Design {
    /// Field-level validation errors keyed by camelCase field name
    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();
        if !is_hex_color(&self.background_color) {
            errors.insert("design.backgroundColor".into(), "Invalid background color".into());
        }
        if !is_hex_color(&self.text_color) {
            errors.insert("design.textColor".into(), "Invalid text color".into());
        }
        if !FONT_FAMILIES.contains(&self.font_family.as_str()) {
            errors.insert("design.fontFamily".into(), "Invalid font family".into());
        }
        if !self.logo.is_empty() && !is_http_url(&self.logo) {
            errors.insert("design.logo".into(), "Invalid logo URL".into());
        }
        if !(320..=1920).contains(&self.max_width) {
            errors.insert("design.maxWidth".into(), "Must be between 320 and 1920".into());
        }
        if !(1..=1000).contains(&self.logo_size.width) || !(1..=1000).contains(&self.logo_size.height) {
            errors.insert("design.logoSize".into(), "Must be between 1 and 1000".into());
        }
        errors
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Lowercase hostname with at least two labels
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    })
}

/// URL slug derived from a title: "Down for Maintenance!" -> "down-for-maintenance"
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaintenancePage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub status: PageStatus,
    pub deployed: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub design: Json<Design>,
    pub total_views: i64,
    pub unique_views: i64,
    pub slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenancePage {
    /// Flip a scheduled page to published once its time has come
    pub fn apply_schedule(&mut self, now: DateTime<Utc>) -> bool {
        match (self.status, self.scheduled_for) {
            (PageStatus::Scheduled, Some(at)) if at <= now => {
                self.status = PageStatus::Published;
                true
            }
            _ => false,
        }
    }
}

/// How the editor asked for the page to be published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishType {
    Now,
    Schedule,
    Draft,
}

/// Resolve the stored status and schedule from the editor's intent.
///
/// `fallback` is used when no intent applies: draft for new pages, the
/// requested status for updates.
pub fn resolve_publication(
    publish_type: Option<PublishType>,
    scheduled_for: Option<DateTime<Utc>>,
    requested: Option<PageStatus>,
    fallback: PageStatus,
    now: DateTime<Utc>,
) -> (PageStatus, Option<DateTime<Utc>>) {
    let (status, schedule) = match (publish_type, scheduled_for) {
        (Some(PublishType::Schedule), Some(at)) => (PageStatus::Scheduled, Some(at)),
        (Some(PublishType::Now), _) => (PageStatus::Published, None),
        _ if requested == Some(PageStatus::Archived) => (PageStatus::Archived, None),
        _ => (requested.unwrap_or(fallback), None),
    };

    // A page cannot stay "scheduled" without a date
    let status = match (status, schedule) {
        (PageStatus::Scheduled, None) => PageStatus::Draft,
        (PageStatus::Scheduled, Some(at)) if at <= now => PageStatus::Published,
        (other, _) => other,
    };
    (status, schedule)
}

/// One day of the per-page analytics breakdown
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyViews {
    pub day: NaiveDate,
    pub views: i64,
    pub unique_views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slugify("Down for Maintenance!"), "down-for-maintenance");
        assert_eq!(slugify("  --API v2 -- outage "), "api-v2-outage");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn domain_validation() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("status.my-app.io"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("Example.com"));
        assert!(!is_valid_domain("-bad.com"));
        assert!(!is_valid_domain("a..com"));
        assert!(!is_valid_domain("*.example.com"));
    }

    #[test]
    fn design_defaults_are_valid() {
        assert!(Design::default().validate().is_empty());
    }

    #[test]
    fn design_rejects_bad_values() {
        let design = Design {
            background_color: "black".into(),
            font_family: "Comic Sans".into(),
            logo: "ftp://example.com/logo.png".into(),
            max_width: 100,
            ..Design::default()
        };
        let errors = design.validate();
        assert!(errors.contains_key("design.backgroundColor"));
        assert!(errors.contains_key("design.fontFamily"));
        assert!(errors.contains_key("design.logo"));
        assert!(errors.contains_key("design.maxWidth"));
        assert!(!errors.contains_key("design.textColor"));
    }

    #[test]
    fn design_deserializes_partial_json_with_defaults() {
        let design: Design =
            serde_json::from_str(r##"{"backgroundColor":"#112233","layout":"left-aligned","customCSS":"h1{}"}"##)
                .unwrap();
        assert_eq!(design.background_color, "#112233");
        assert_eq!(design.layout, Layout::LeftAligned);
        assert_eq!(design.custom_css, "h1{}");
        assert_eq!(design.max_width, 768);
        assert_eq!(design.text_color, "#ffffff");
    }

    #[test]
    fn publish_now_clears_schedule() {
        let now = Utc::now();
        let (status, at) = resolve_publication(
            Some(PublishType::Now),
            Some(now + Duration::days(1)),
            None,
            PageStatus::Draft,
            now,
        );
        assert_eq!(status, PageStatus::Published);
        assert!(at.is_none());
    }

    #[test]
    fn future_schedule_stays_scheduled() {
        let now = Utc::now();
        let when = now + Duration::hours(2);
        let (status, at) =
            resolve_publication(Some(PublishType::Schedule), Some(when), None, PageStatus::Draft, now);
        assert_eq!(status, PageStatus::Scheduled);
        assert_eq!(at, Some(when));
    }

    #[test]
    fn past_schedule_publishes_at_save_time() {
        let now = Utc::now();
        let (status, at) = resolve_publication(
            Some(PublishType::Schedule),
            Some(now - Duration::minutes(5)),
            None,
            PageStatus::Draft,
            now,
        );
        assert_eq!(status, PageStatus::Published);
        assert!(at.is_some());
    }

    #[test]
    fn archive_request_wins_without_intent() {
        let now = Utc::now();
        let (status, _) =
            resolve_publication(None, None, Some(PageStatus::Archived), PageStatus::Draft, now);
        assert_eq!(status, PageStatus::Archived);

        let (status, _) = resolve_publication(None, None, None, PageStatus::Draft, now);
        assert_eq!(status, PageStatus::Draft);
    }

    #[test]
    fn scheduled_without_date_falls_back_to_draft() {
        let now = Utc::now();
        let (status, _) =
            resolve_publication(None, None, Some(PageStatus::Scheduled), PageStatus::Draft, now);
        assert_eq!(status, PageStatus::Draft);
    }
}
