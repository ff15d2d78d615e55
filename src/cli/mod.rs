pub mod client;
pub mod commands;
pub mod config;
pub mod store;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "tenant-notes")]
#[command(about = "Command-line client for the multi-tenant notes API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Remote server configuration and health")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },

    #[command(about = "Sign up, sign in and session information")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Organizations, plans and usage")]
    Org {
        #[command(subcommand)]
        cmd: commands::org::OrgCommands,
    },

    #[command(about = "Organization membership and roles")]
    Member {
        #[command(subcommand)]
        cmd: commands::member::MemberCommands,
    },

    #[command(about = "Invitations to join an organization")]
    Invite {
        #[command(subcommand)]
        cmd: commands::invite::InviteCommands,
    },

    #[command(about = "Notes in the active organization")]
    Note {
        #[command(subcommand)]
        cmd: commands::note::NoteCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Org { cmd } => commands::org::handle(cmd, output_format).await,
        Commands::Member { cmd } => commands::member::handle(cmd, output_format).await,
        Commands::Invite { cmd } => commands::invite::handle(cmd, output_format).await,
        Commands::Note { cmd } => commands::note::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands() {
        let cli = Cli::try_parse_from(["tenant-notes", "--json", "note", "create", "Standup", "--tag", "team", "--public"])
            .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::Note {
                cmd: commands::note::NoteCommands::Create { title, tags, public, .. },
            } => {
                assert_eq!(title, "Standup");
                assert_eq!(tags, vec!["team".to_string()]);
                assert!(public);
            }
            _ => panic!("expected note create"),
        }
    }

    #[test]
    fn member_role_defaults_to_member() {
        let cli = Cli::try_parse_from(["tenant-notes", "member", "add", "6f1c1f8e-8d4a-4b8e-9a55-1f7f0e2d3c4b"]).unwrap();
        match cli.command {
            Commands::Member {
                cmd: commands::member::MemberCommands::Add { role, slug, .. },
            } => {
                assert_eq!(role, "member");
                assert!(slug.is_none());
            }
            _ => panic!("expected member add"),
        }
    }
}
