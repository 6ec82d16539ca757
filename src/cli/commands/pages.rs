use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::cloudflare::Deployer;
use crate::database::models::page::PageStatus;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum PageCommands {
    #[command(about = "Deploy a page to its owner's Cloudflare account")]
    Deploy {
        #[arg(help = "Page id")]
        id: Uuid,
    },

    #[command(about = "Remove a page's KV record, route and DNS records")]
    Teardown {
        #[arg(help = "Page id")]
        id: Uuid,
    },

    #[command(about = "Publish scheduled pages whose time has come")]
    PublishDue,
}

pub async fn handle(cmd: PageCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    let pages = state.pages();
    match cmd {
        PageCommands::Deploy { id } => {
            let page = pages.get(id).await?;
            let client = state.cloudflare_configs().client_for_user(page.user_id).await?;
            let report = Deployer::new(&client, &state.locks).deploy(&page).await?;
            pages.set_deployed(id, true).await?;
            output_success(
                output_format,
                &format!("Deployed {} to {}", page.domain, report.route_pattern),
                Some(json!({ "deployment": report })),
            )
        }
        PageCommands::Teardown { id } => {
            let page = pages.get(id).await?;
            let client = state.cloudflare_configs().client_for_user(page.user_id).await?;
            let report = Deployer::new(&client, &state.locks).teardown(&page.domain).await?;
            pages.set_deployed(id, false).await?;
            for warning in &report.warnings {
                tracing::warn!("{}", warning);
            }
            output_success(
                output_format,
                &format!("Tore down {}", page.domain),
                Some(json!({ "teardown": report })),
            )
        }
        PageCommands::PublishDue => {
            let published = pages.publish_due(Utc::now()).await?;
            let mut edge_failures = Vec::new();

            // Deployed pages also need their KV record and route flipped
            for page in published.iter().filter(|p| p.deployed) {
                let result = match state.cloudflare_configs().client_for_user(page.user_id).await {
                    Ok(client) => Deployer::new(&client, &state.locks)
                        .set_activation(page, PageStatus::Published)
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                if let Err(e) = result {
                    tracing::warn!("Edge activation for {} failed: {}", page.domain, e);
                    edge_failures.push(json!({ "id": page.id, "domain": page.domain, "error": e }));
                }
            }

            let ids: Vec<Uuid> = published.iter().map(|p| p.id).collect();
            output_success(
                output_format,
                &format!("Published {} scheduled pages", ids.len()),
                Some(json!({ "published": ids, "edge_failures": edge_failures })),
            )
        }
    }
}
