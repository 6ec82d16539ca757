pub mod cloudflare_config;
pub mod incident;
pub mod page;
pub mod plan;
pub mod user;

pub use cloudflare_config::CloudflareConfig;
pub use incident::{Impact, Incident, IncidentStatus, IncidentUpdate, PostMortem};
pub use page::{Design, MaintenancePage, PageStatus};
pub use plan::{PlanLimits, SubscriptionPlan};
pub use user::{Role, SubscriptionStatus, User};
