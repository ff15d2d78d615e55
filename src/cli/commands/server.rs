use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::config::{load_server_config, ping_server, save_server_config, ServerStatus};
use crate::cli::utils::{output_current_item, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at an API server")]
    Set {
        #[arg(help = "Server URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Show,

    #[command(about = "Check server health status from API /health endpoint")]
    Health,

    #[command(about = "Show server information from API root endpoint")]
    Info,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Set { url } => {
            url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;

            let mut config = load_server_config()?;
            config.url = Some(url.trim_end_matches('/').to_string());
            config.status = ServerStatus::Unknown;
            config.last_ping = None;
            save_server_config(&config)?;

            output_success(
                &output_format,
                &format!("Server set to {}", config.url()),
                Some(json!({ "url": config.url() })),
            )
        }
        ServerCommands::Show => {
            let config = load_server_config()?;
            output_current_item(
                &output_format,
                "server",
                config.url(),
                json!({
                    "url": config.url(),
                    "status": config.status,
                    "last_ping": config.last_ping,
                }),
            )
        }
        ServerCommands::Health => {
            let mut config = load_server_config()?;
            let status = ping_server(config.url()).await;
            config.update_ping(status.clone());
            save_server_config(&config)?;

            match status {
                ServerStatus::Up => output_success(
                    &output_format,
                    &format!("Server {} is healthy", config.url()),
                    Some(json!({ "url": config.url(), "status": status })),
                ),
                _ => Err(anyhow::anyhow!("Server {} is not responding", config.url())),
            }
        }
        ServerCommands::Info => {
            let config = load_server_config()?;
            let client = ApiClient::new(config.url(), None)?;
            let info: Value = client.get("/").await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
                OutputFormat::Text => {
                    let field = |key: &str| info.get(key).and_then(Value::as_str).unwrap_or("-").to_string();
                    println!("Name: {}", field("name"));
                    println!("Version: {}", field("version"));
                    println!("Description: {}", field("description"));
                }
            }
            Ok(())
        }
    }
}
