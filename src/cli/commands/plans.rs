use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_list, output_success};
use crate::cli::OutputFormat;
use crate::database::models::plan::PlanCatalog;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum PlanCommands {
    #[command(about = "Insert or update plans from a YAML catalog")]
    Seed {
        #[arg(long, default_value = "plans.yaml", help = "Catalog file")]
        file: String,
    },

    #[command(about = "List all plans, including inactive ones")]
    List,
}

pub async fn handle(cmd: PlanCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PlanCommands::Seed { file } => {
            let source = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file))?;
            let catalog = PlanCatalog::from_yaml(&source).with_context(|| format!("invalid catalog {}", file))?;

            let service = state.plans();
            let mut codes = Vec::with_capacity(catalog.plans.len());
            for def in &catalog.plans {
                let plan = service
                    .upsert(def)
                    .await
                    .with_context(|| format!("failed to seed plan '{}'", def.code))?;
                tracing::info!("Seeded plan {}", plan.code);
                codes.push(plan.code);
            }

            output_success(
                output_format,
                &format!("Seeded {} plans from {}", codes.len(), file),
                Some(json!({ "plans": codes })),
            )
        }
        PlanCommands::List => {
            let plans = state.plans().list(true).await?;
            output_list(output_format, &plans, "No plans defined", |plan| {
                format!(
                    "{:<12} {:>8} {:>4} pages {:>7} views/page {}{}",
                    plan.code,
                    plan.price,
                    plan.page_limit,
                    plan.views_per_page_limit,
                    plan.name,
                    if plan.is_active { "" } else { " (inactive)" }
                )
            })
        }
    }
}
