use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{load_auth_config, remove_json, save_auth_config, AuthConfig, AUTH_FILE, ORGANIZATION_FILE};
use crate::cli::store::refresh_store;
use crate::cli::utils::{output_current_item, output_no_current_item, output_success};
use crate::cli::OutputFormat;
use crate::services::{AuthPayload, Session};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account and its first organization")]
    SignUp {
        #[arg(long, help = "Email address")]
        email: String,
        #[arg(long, help = "Password, at least 8 characters")]
        password: String,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Company name; a personal organization is created without it")]
        company: Option<String>,
    },

    #[command(about = "Sign in and store the JWT token")]
    SignIn {
        #[arg(long, help = "Email address")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "Show the signed-in user and active organization")]
    Whoami,

    #[command(about = "Forget the stored token")]
    SignOut,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::SignUp {
            email,
            password,
            name,
            company,
        } => {
            let client = ApiClient::from_config()?;
            let payload: AuthPayload = client
                .post(
                    "/auth/sign-up",
                    &json!({ "email": email, "password": password, "name": name, "company": company }),
                )
                .await?;
            remember(&payload, &output_format, "Signed up").await
        }
        AuthCommands::SignIn { email, password } => {
            let client = ApiClient::from_config()?;
            let payload: AuthPayload = client
                .post("/auth/sign-in", &json!({ "email": email, "password": password }))
                .await?;
            remember(&payload, &output_format, "Signed in").await
        }
        AuthCommands::Whoami => {
            if load_auth_config()?.token.is_none() {
                return output_no_current_item(&output_format, "user");
            }

            let client = ApiClient::from_config()?;
            let session: Session = client.get("/api/auth/session").await?;
            output_current_item(
                &output_format,
                "user",
                &session.user.name,
                json!({
                    "email": session.user.email,
                    "slug": session.active_organization.as_ref().map(|o| o.slug.clone()),
                    "role": session.role,
                    "subscription": session.active_organization.as_ref().map(|o| o.subscription),
                }),
            )
        }
        AuthCommands::SignOut => {
            remove_json(AUTH_FILE)?;
            remove_json(ORGANIZATION_FILE)?;
            output_success(&output_format, "Signed out", None)
        }
    }
}

async fn remember(payload: &AuthPayload, output_format: &OutputFormat, verb: &str) -> anyhow::Result<()> {
    save_auth_config(&AuthConfig::signed_in(
        payload.token.clone(),
        payload.user.email.clone(),
        payload.user.id,
    ))?;

    let client = ApiClient::from_config()?;
    let store = refresh_store(&client).await?;

    output_success(
        output_format,
        &format!("{} as {}", verb, payload.user.email),
        Some(json!({
            "user": payload.user,
            "organization": store.active_slug(),
        })),
    )
}
