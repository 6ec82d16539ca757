pub mod app;
pub mod auth;
pub mod billing;
pub mod cli;
pub mod cloudflare;
pub mod config;
pub mod database;
pub mod edge;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use app::app;
pub use state::AppState;

/// Install the `tracing` subscriber shared by the server and the CLI
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("statussaas=info,tower_http=info"));
    // A second install (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
