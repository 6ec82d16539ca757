use clap::Subcommand;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::cloudflare::CheckStatus;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum CloudflareCommands {
    #[command(about = "Run the connectivity test with a user's stored credentials")]
    Test {
        #[arg(help = "User email")]
        email: String,
    },
}

pub async fn handle(cmd: CloudflareCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CloudflareCommands::Test { email } => {
            let user = state
                .users()
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with email {}", email))?;
            let report = state.cloudflare_configs().test(user.id).await?;

            if output_format == OutputFormat::Text {
                for check in &report.checks {
                    let mark = match check.status {
                        CheckStatus::Success => "✓",
                        CheckStatus::Failed => "✗",
                        CheckStatus::Skipped => "-",
                    };
                    println!("{} {:<14} {}", mark, check.name, check.message);
                }
            }

            let data = serde_json::to_value(&report)?;
            match report.failure() {
                None => output_success(output_format, "Cloudflare connectivity test passed", Some(data)),
                Some(message) => {
                    output_error(output_format, message, Some(data))?;
                    anyhow::bail!("Cloudflare connectivity test failed")
                }
            }
        }
    }
}
