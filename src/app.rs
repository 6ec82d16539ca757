use axum::{
    extract::Extension,
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::database::manager::DatabaseManager;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin_middleware};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes())
        // Elevated API
        .merge(admin_routes())
        // Global middleware
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    Router::new()
        .route("/auth/register", post(public::auth::register_post))
        .route("/auth/login", post(public::auth::login_post))
        .route("/p/:id", get(public::pages::page_view))
        .route("/p/:id/view", post(public::pages::page_track))
        .route("/edge", get(public::edge::edge_get))
        .route("/webhook/stripe", post(public::webhook::stripe_post))
}

fn protected_routes() -> Router {
    use protected::{billing, events, incidents, pages, session, settings};

    Router::new()
        .route("/api/auth/whoami", get(session::whoami_get))
        // Pages
        .route("/api/pages", get(pages::crud::list).post(pages::crud::create))
        .route(
            "/api/pages/:id",
            get(pages::crud::get).put(pages::crud::update).delete(pages::crud::delete),
        )
        .route("/api/pages/:id/archive", post(pages::crud::archive))
        .route("/api/pages/:id/preview", get(pages::crud::preview))
        .route("/api/pages/:id/analytics", get(pages::crud::analytics))
        .route("/api/pages/:id/deploy", post(pages::deploy::deploy_post))
        .route("/api/pages/:id/activation", post(pages::deploy::activation_post))
        // Cloudflare settings
        .route(
            "/api/settings/cloudflare",
            get(settings::cloudflare_get)
                .put(settings::cloudflare_put)
                .delete(settings::cloudflare_delete),
        )
        .route("/api/settings/cloudflare/test", post(settings::cloudflare_test))
        // Incidents
        .route("/api/pages/:id/incidents", get(incidents::list_for_page))
        .route("/api/incidents", post(incidents::create))
        .route("/api/incidents/:id", get(incidents::get).delete(incidents::delete))
        .route("/api/incidents/:id/updates", post(incidents::add_update))
        .route("/api/incidents/:id/post-mortem", put(incidents::post_mortem_put))
        // Billing
        .route("/api/plans", get(billing::plans_get))
        .route("/api/subscription", get(billing::subscription_get))
        .route("/api/subscription/plan", put(billing::subscription_plan_put))
        // Live updates
        .route("/api/events", get(events::events_get))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn admin_routes() -> Router {
    use elevated::{plans, users};

    Router::new()
        .route("/api/admin/users", get(users::list))
        .route("/api/admin/users/:id/role", put(users::role_put))
        .route("/api/admin/users/:id/plan", put(users::plan_put))
        .route("/api/admin/plans", get(plans::list).post(plans::create))
        .route("/api/admin/plans/:code", put(plans::update).delete(plans::delete))
        // Layers run bottom-up: authenticate, then check the role
        .route_layer(middleware::from_fn(require_admin_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "StatusSaaS API",
            "version": version,
            "description": "Maintenance and status pages with Cloudflare edge deployment",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login (public - token acquisition)",
                "pages": "/p/:id (public HTML), /edge (public, by Host)",
                "webhook": "/webhook/stripe (public, signed)",
                "api": "/api/pages, /api/settings/cloudflare, /api/incidents, /api/subscription, /api/events (protected)",
                "admin": "/api/admin/* (admin role)"
            }
        }
    }))
}

async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
