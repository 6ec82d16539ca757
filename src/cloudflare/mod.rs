//! Cloudflare edge deployment: API client, worker script generation and
//! the deploy/toggle/teardown pipeline.

pub mod client;
pub mod deploy;
pub mod error;
pub mod locks;
pub mod script;
pub mod selftest;
pub mod types;

pub use client::{build_http_client, CloudflareApi, CloudflareClient, KV_BINDING_NAME};
pub use deploy::{ActivationReport, DeployReport, Deployer, TeardownReport};
pub use error::CloudflareError;
pub use locks::DomainLocks;
pub use selftest::{run_connectivity_test, CheckStatus, ConnectivityReport};
pub use types::{route_pattern, CloudflareCredentials};
