use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::services::SessionManager;

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Resolve a session token to its user")]
    Verify {
        #[arg(help = "Session token")]
        token: String,
    },

    #[command(about = "Delete expired sessions on every backend")]
    Sweep,
}

pub async fn handle(cmd: SessionCommands, sessions: &SessionManager, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SessionCommands::Verify { token } => match sessions.verify_token(&token).await? {
            Some(identity) => output_success(
                &output_format,
                "Session is valid",
                Some(json!({ "userId": identity.user_id, "username": identity.username })),
            ),
            None => {
                output_error(&output_format, "Session is invalid or expired", Some("INVALID_SESSION"))?;
                anyhow::bail!("session rejected")
            }
        },
        SessionCommands::Sweep => {
            let removed = sessions.purge_expired().await?;
            output_success(
                &output_format,
                &format!("Removed {} expired session(s)", removed),
                Some(json!({ "removed": removed })),
            )
        }
    }
}
