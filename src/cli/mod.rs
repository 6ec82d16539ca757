pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "statusctl")]
#[command(about = "StatusSaaS operations CLI")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Subscription plan catalog")]
    Plans {
        #[command(subcommand)]
        cmd: commands::plans::PlanCommands,
    },

    #[command(about = "User bootstrap and role management")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Cloudflare credential checks")]
    Cloudflare {
        #[command(subcommand)]
        cmd: commands::cloudflare::CloudflareCommands,
    },

    #[command(about = "Edge deployment and scheduled publishing")]
    Pages {
        #[command(subcommand)]
        cmd: commands::pages::PageCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    if let Commands::Migrate = cli.command {
        return commands::migrate::handle(&pool, output_format).await;
    }

    let state = AppState::new(pool, config)?;
    match cli.command {
        Commands::Migrate => Ok(()),
        Commands::Plans { cmd } => commands::plans::handle(cmd, &state, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &state, output_format).await,
        Commands::Cloudflare { cmd } => commands::cloudflare::handle(cmd, &state, output_format).await,
        Commands::Pages { cmd } => commands::pages::handle(cmd, &state, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["statusctl", "plans", "list", "--json"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
    }

    #[test]
    fn seed_file_defaults_to_catalog() {
        let cli = Cli::try_parse_from(["statusctl", "plans", "seed"]).unwrap();
        match cli.command {
            Commands::Plans {
                cmd: commands::plans::PlanCommands::Seed { file },
            } => assert_eq!(file, "plans.yaml"),
            _ => panic!("expected plans seed"),
        }
    }

    #[test]
    fn page_commands_take_uuids() {
        assert!(Cli::try_parse_from(["statusctl", "pages", "deploy", "not-a-uuid"]).is_err());
        assert!(Cli::try_parse_from(["statusctl", "pages", "publish-due"]).is_ok());
    }
}
