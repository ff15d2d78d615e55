use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::store::{refresh_store, OrganizationStore};
use crate::cli::utils::{output_collection, output_current_item, output_success, resolve_target_item};
use crate::cli::OutputFormat;
use crate::database::models::{Organization, OrganizationDetail};
use crate::services::Usage;

#[derive(Subcommand)]
pub enum OrgCommands {
    #[command(about = "List organizations you belong to")]
    List,

    #[command(about = "Make an organization the active one")]
    Use {
        #[arg(help = "Organization slug")]
        slug: String,
    },

    #[command(about = "Show an organization with members and invitations (defaults to active)")]
    Show {
        #[arg(help = "Organization slug")]
        slug: Option<String>,
    },

    #[command(about = "Create an organization on the free plan")]
    Create {
        #[arg(help = "Display name")]
        name: String,
        #[arg(help = "URL slug: lowercase letters, digits and dashes")]
        slug: String,
    },

    #[command(about = "Change the subscription plan (admin)")]
    Upgrade {
        #[arg(help = "Plan id: free, pro or enterprise")]
        plan: String,
        #[arg(long, help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "Show member and note usage against plan limits")]
    Usage {
        #[arg(help = "Organization slug (defaults to active)")]
        slug: Option<String>,
    },

    #[command(about = "Delete an organization (admin)")]
    Delete {
        #[arg(help = "Organization slug")]
        slug: String,
    },
}

/// Slug given on the command line, else the mirrored active organization
pub fn target_slug(slug: Option<String>) -> anyhow::Result<String> {
    resolve_target_item(slug, || Ok(OrganizationStore::load()?.active_slug()), "organization")
}

pub async fn handle(cmd: OrgCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_config()?;

    match cmd {
        OrgCommands::List => {
            let organizations: Vec<Organization> = client.get("/api/tenants").await?;
            let active = OrganizationStore::load()?.active_slug();
            output_collection(
                &output_format,
                "organizations",
                &organizations,
                "No organizations found",
                |o| {
                    let marker = if active.as_deref() == Some(o.slug.as_str()) { "*" } else { " " };
                    format!("{} {:<24} {:<32} {}", marker, o.slug, o.name, o.subscription)
                },
            )
        }
        OrgCommands::Use { slug } => {
            let organization: Organization = client.get(&format!("/api/tenants/{}", slug)).await?;
            let _: Organization = client
                .post("/api/tenants/set-active", &json!({ "tenantId": organization.id }))
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Switched to organization '{}'", slug),
                Some(json!({ "current_organization": slug })),
            )
        }
        OrgCommands::Show { slug } => {
            let slug = target_slug(slug)?;
            let detail: OrganizationDetail = client.get(&format!("/api/tenants/{}", slug)).await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail)?),
                OutputFormat::Text => {
                    let organization = &detail.organization;
                    println!("{} ({})", organization.name, organization.slug);
                    println!("Plan: {}", organization.subscription);
                    println!("Members:");
                    for member in &detail.members {
                        println!("  {:<32} {:<8} {}", member.email, member.role, member.id);
                    }
                    println!("Invitations:");
                    for invitation in &detail.invitations {
                        println!("  {:<32} {:<8} {}", invitation.email, invitation.status, invitation.id);
                    }
                }
            }
            Ok(())
        }
        OrgCommands::Create { name, slug } => {
            let organization: Organization = client
                .post("/api/tenants", &json!({ "name": name, "slug": slug }))
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Organization '{}' created", organization.slug),
                Some(json!({ "organization": organization })),
            )
        }
        OrgCommands::Upgrade { plan, slug } => {
            let slug = target_slug(slug)?;
            let organization: Organization = client
                .post(&format!("/api/tenants/{}/upgrade", slug), &json!({ "plan": plan }))
                .await?;
            refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Organization '{}' is now on the {} plan", slug, organization.subscription),
                Some(json!({ "organization": organization })),
            )
        }
        OrgCommands::Usage { slug } => {
            let slug = target_slug(slug)?;
            let usage: Usage = client.get(&format!("/api/tenants/{}/usage", slug)).await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&usage)?),
                OutputFormat::Text => {
                    println!("Plan: {}", usage.subscription);
                    for (label, metric) in [("Members", &usage.members), ("Notes", &usage.notes)] {
                        if metric.unlimited {
                            println!("{}: {} (unlimited)", label, metric.count);
                        } else {
                            println!("{}: {}/{} ({}%)", label, metric.count, metric.limit, metric.percentage);
                        }
                    }
                }
            }
            Ok(())
        }
        OrgCommands::Delete { slug } => {
            let organization: Organization = client.delete(&format!("/api/tenants/{}", slug)).await?;
            let store = refresh_store(&client).await?;

            output_success(
                &output_format,
                &format!("Organization '{}' deleted", organization.slug),
                Some(json!({ "current_organization": store.active_slug() })),
            )?;
            if let Some(active) = store.organization() {
                output_current_item(&output_format, "organization", &active.name, json!({ "slug": active.slug }))?;
            }
            Ok(())
        }
    }
}
