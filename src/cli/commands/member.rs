use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::commands::org::target_slug;
use crate::cli::store::refresh_store;
use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::models::Member;
use crate::services::MemberPage;

#[derive(Subcommand)]
pub enum MemberCommands {
    #[command(about = "List members of an organization")]
    List {
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
        #[arg(long, help = "Only members with this role")]
        role: Option<String>,
        #[arg(long, help = "Maximum rows to return")]
        limit: Option<usize>,
    },

    #[command(about = "Add an existing user to the organization (admin)")]
    Add {
        #[arg(help = "User id")]
        user_id: Uuid,
        #[arg(long, default_value = "member", help = "admin or member")]
        role: String,
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "Remove a member by member id or email (admin)")]
    Remove {
        #[arg(help = "Member id or email")]
        member: String,
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "Change a member's role (admin)")]
    Role {
        #[arg(help = "Member id or email")]
        member: String,
        #[arg(help = "admin or member")]
        role: String,
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "Leave an organization")]
    Leave {
        #[arg(help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

pub async fn handle(cmd: MemberCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_config()?;

    match cmd {
        MemberCommands::List { slug, role, limit } => {
            let slug = target_slug(slug)?;
            let mut path = format!("/api/tenants/{}/members?sortBy=createdAt&sortDirection=asc", slug);
            if let Some(role) = role {
                path.push_str(&format!("&filterField=role&filterOperator=eq&filterValue={}", encode(&role)));
            }
            if let Some(limit) = limit {
                path.push_str(&format!("&limit={}", limit));
            }

            let page: MemberPage = client.get(&path).await?;
            output_collection(&output_format, "members", &page.members, "No members found", |m| {
                format!("{:<36} {:<32} {:<8} {}", m.id, m.email, m.role, m.name)
            })
        }
        MemberCommands::Add { user_id, role, slug } => {
            let slug = target_slug(slug)?;
            let member: Member = client
                .post(
                    &format!("/api/tenants/{}/members", slug),
                    &json!({ "userId": user_id, "role": role }),
                )
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Added {} to '{}' as {}", user_id, slug, member.role),
                Some(json!({ "member": member })),
            )
        }
        MemberCommands::Remove { member, slug } => {
            let slug = target_slug(slug)?;
            let removed: Member = client
                .delete(&format!("/api/tenants/{}/members/{}", slug, encode(&member)))
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Removed {} from '{}'", member, slug),
                Some(json!({ "member": removed })),
            )
        }
        MemberCommands::Role { member, role, slug } => {
            let slug = target_slug(slug)?;
            let updated: Member = client
                .patch(
                    &format!("/api/tenants/{}/members/{}", slug, encode(&member)),
                    &json!({ "role": role }),
                )
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("{} is now {} in '{}'", member, updated.role, slug),
                Some(json!({ "member": updated })),
            )
        }
        MemberCommands::Leave { slug } => {
            let slug = target_slug(slug)?;
            let _: Member = client
                .post(&format!("/api/tenants/{}/leave", slug), &json!({}))
                .await?;
            refresh_store(&client).await?;

            output_success(&output_format, &format!("Left '{}'", slug), None)
        }
    }
}
