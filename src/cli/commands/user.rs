use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::services::{AuthError, SessionManager};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Check whether a username is free")]
    Available {
        #[arg(help = "Username")]
        username: String,
    },

    #[command(about = "Show a user's public profile")]
    Show {
        #[arg(help = "User id")]
        user_id: Uuid,
    },

    #[command(about = "Set a new password and revoke every session of the user")]
    ResetPassword {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "New password (at least 6 characters)")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, sessions: &SessionManager, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Available { username } => {
            let available = sessions.is_username_available(&username).await?;
            let message = if available {
                format!("Username '{}' is available", username)
            } else {
                format!("Username '{}' is taken", username)
            };
            output_success(&output_format, &message, Some(json!({ "available": available })))
        }
        UserCommands::Show { user_id } => match sessions.get_user(user_id).await? {
            Some(user) => output_success(&output_format, "User found", Some(json!({ "user": user }))),
            None => {
                output_error(&output_format, "User not found", Some("NOT_FOUND"))?;
                anyhow::bail!("user {} does not exist", user_id)
            }
        },
        UserCommands::ResetPassword { username, password } => {
            match sessions.reset_password(&username, &password).await {
                Ok(user) => output_success(
                    &output_format,
                    &format!("Password reset for '{}'; all sessions revoked", user.username),
                    Some(json!({ "user": { "id": user.id, "username": user.username } })),
                ),
                Err(e @ (AuthError::Validation(_) | AuthError::NotFound(_))) => {
                    output_error(&output_format, &e.to_string(), Some("REJECTED"))?;
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
