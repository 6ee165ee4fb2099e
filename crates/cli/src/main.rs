//! AutoLead CLI - Database migrations and profile management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! autolead-cli migrate
//!
//! # Set a user's credit balance
//! autolead-cli profile set-credits -u user_123 -c 50
//!
//! # Make a user an admin
//! autolead-cli profile promote -u user_123
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "autolead-cli")]
#[command(author, version, about = "AutoLead CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Overwrite a user's credit balance
    SetCredits {
        /// User id as issued by the auth provider
        #[arg(short, long)]
        user: String,

        /// New balance
        #[arg(short, long)]
        credits: i32,
    },
    /// Grant the admin flag
    Promote {
        /// User id as issued by the auth provider
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Profile { action } => match action {
            ProfileAction::SetCredits { user, credits } => {
                commands::profile::set_credits(&user, credits).await?;
            }
            ProfileAction::Promote { user } => commands::profile::promote(&user).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_credits() {
        let cli = Cli::parse_from(["autolead-cli", "profile", "set-credits", "-u", "u1", "-c", "5"]);
        match cli.command {
            Commands::Profile {
                action: ProfileAction::SetCredits { user, credits },
            } => {
                assert_eq!(user, "u1");
                assert_eq!(credits, 5);
            }
            _ => panic!("expected set-credits"),
        }
    }
}
