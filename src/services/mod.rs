pub mod cloudflare_config_service;
pub mod incident_service;
pub mod page_service;
pub mod plan_service;
pub mod user_service;

pub use cloudflare_config_service::{CloudflareConfigError, CloudflareConfigInput, CloudflareConfigService};
pub use incident_service::{IncidentError, IncidentService};
pub use page_service::{PageError, PageInput, PageService};
pub use plan_service::PlanService;
pub use user_service::UserService;
