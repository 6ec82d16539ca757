use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::user::Role;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a password account")]
    Create {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, env = "STATUSCTL_PASSWORD", help = "Password (or set STATUSCTL_PASSWORD)")]
        password: String,
        #[arg(long, help = "Grant the admin role")]
        admin: bool,
    },

    #[command(about = "Grant the admin role to an existing user")]
    Promote {
        #[arg(help = "User email")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = state.users();
    match cmd {
        UserCommands::Create {
            email,
            name,
            password,
            admin,
        } => {
            let role = if admin { Role::Admin } else { Role::User };
            let user = users.register(&email, &name, &password, role).await?;
            output_success(
                output_format,
                &format!("Created {} {}", role.as_str(), user.email),
                Some(json!({ "id": user.id, "email": user.email, "role": user.role })),
            )
        }
        UserCommands::Promote { email } => {
            let user = users
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No user with email {}", email))?;
            let user = users.set_role(user.id, Role::Admin).await?;
            output_success(
                output_format,
                &format!("{} is now an admin", user.email),
                Some(json!({ "id": user.id })),
            )
        }
    }
}
