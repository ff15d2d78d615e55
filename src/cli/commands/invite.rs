use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::commands::org::target_slug;
use crate::cli::config::load_auth_config;
use crate::cli::store::refresh_store;
use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::models::Invitation;
use crate::services::AcceptedInvitation;

#[derive(Subcommand)]
pub enum InviteCommands {
    #[command(about = "Invite an email address to the organization (admin)")]
    Create {
        #[arg(help = "Email address to invite")]
        email: String,
        #[arg(long, default_value = "member", help = "admin or member")]
        role: String,
        #[arg(long, help = "Refresh the expiry of an existing pending invitation")]
        resend: bool,
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "List invitations of an organization, or your own with --mine")]
    List {
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
        #[arg(long, help = "Invitations addressed to the signed-in email")]
        mine: bool,
    },

    #[command(about = "Accept an invitation and join its organization")]
    Accept {
        #[arg(help = "Invitation id")]
        id: Uuid,
    },

    #[command(about = "Reject an invitation")]
    Reject {
        #[arg(help = "Invitation id")]
        id: Uuid,
    },

    #[command(about = "Cancel a pending invitation (admin)")]
    Cancel {
        #[arg(help = "Invitation id")]
        id: Uuid,
    },
}

pub async fn handle(cmd: InviteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_config()?;

    match cmd {
        InviteCommands::Create {
            email,
            role,
            resend,
            slug,
        } => {
            let slug = target_slug(slug)?;
            let invitation: Invitation = client
                .post(
                    &format!("/api/tenants/{}/invitations", slug),
                    &json!({ "email": email, "role": role, "resend": resend }),
                )
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Invited {} to '{}' (expires {})", invitation.email, slug, invitation.expires_at),
                Some(json!({ "invitation": invitation })),
            )
        }
        InviteCommands::List { slug, mine } => {
            let invitations: Vec<Invitation> = if mine {
                let email = load_auth_config()?
                    .email
                    .ok_or_else(|| anyhow::anyhow!("Not signed in"))?;
                let email: String = url::form_urlencoded::byte_serialize(email.as_bytes()).collect();
                client.get(&format!("/api/invitations?email={}", email)).await?
            } else {
                let slug = target_slug(slug)?;
                client.get(&format!("/api/tenants/{}/invitations", slug)).await?
            };

            output_collection(&output_format, "invitations", &invitations, "No invitations found", |i| {
                format!("{:<36} {:<32} {:<8} {:<9} {}", i.id, i.email, i.role, i.status, i.expires_at)
            })
        }
        InviteCommands::Accept { id } => {
            let accepted: AcceptedInvitation = client
                .post(&format!("/api/invitations/{}/accept", id), &json!({}))
                .await?;
            let store = refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!(
                    "Joined {} as {}",
                    store.active_slug().unwrap_or_else(|| accepted.invitation.organization_id.to_string()),
                    accepted.member.role
                ),
                Some(json!({ "invitation": accepted.invitation, "member": accepted.member })),
            )
        }
        InviteCommands::Reject { id } => {
            let invitation: Invitation = client
                .post(&format!("/api/invitations/{}/reject", id), &json!({}))
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Invitation {} rejected", id),
                Some(json!({ "invitation": invitation })),
            )
        }
        InviteCommands::Cancel { id } => {
            let invitation: Invitation = client.delete(&format!("/api/invitations/{}", id)).await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Invitation {} canceled", id),
                Some(json!({ "invitation": invitation })),
            )
        }
    }
}
