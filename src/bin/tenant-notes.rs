use clap::Parser;
use tenant_notes_api::cli::client::ApiCallError;
use tenant_notes_api::cli::utils::output_error;
use tenant_notes_api::cli::{Cli, OutputFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    if let Err(e) = tenant_notes_api::cli::run(cli).await {
        let api_error = e.downcast_ref::<ApiCallError>();

        match (&output_format, std::env::var("CLI_VERBOSE").as_deref()) {
            (OutputFormat::Json, _) => {
                output_error(&output_format, &e.to_string(), api_error.and_then(|api| api.code.as_deref()))?
            }
            (_, Ok("true") | Ok("1")) => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        if let Some(prompt) = api_error.and_then(|api| api.prompt.as_deref()) {
            eprintln!("{prompt}");
        }
        std::process::exit(1);
    }

    Ok(())
}
