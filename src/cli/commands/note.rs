use clap::Subcommand;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::models::Note;
use crate::services::NotePage;

#[derive(Subcommand)]
pub enum NoteCommands {
    #[command(about = "List notes visible to you in the active organization")]
    List,

    #[command(about = "Create a note in the active organization")]
    Create {
        #[arg(help = "Note title")]
        title: String,
        #[arg(long, default_value = "", help = "Note body")]
        content: String,
        #[arg(long = "tag", help = "Tag, repeatable")]
        tags: Vec<String>,
        #[arg(long, help = "Visible to every member")]
        public: bool,
    },

    #[command(about = "Edit a note you wrote (admins may edit any)")]
    Update {
        #[arg(help = "Note id")]
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, help = "true or false")]
        public: Option<bool>,
    },

    #[command(about = "Delete a note")]
    Delete {
        #[arg(help = "Note id")]
        id: Uuid,
    },
}

pub async fn handle(cmd: NoteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_config()?;

    match cmd {
        NoteCommands::List => {
            let page: NotePage = client.get("/api/notes").await?;
            output_collection(&output_format, "notes", &page.notes, "No notes found", |n| {
                let visibility = if n.is_public { "public" } else { "private" };
                format!("{:<36} {:<7} {} [{}]", n.id, visibility, n.title, n.tags.join(", "))
            })
        }
        NoteCommands::Create {
            title,
            content,
            tags,
            public,
        } => {
            let note: Note = client
                .post(
                    "/api/notes",
                    &json!({ "title": title, "content": content, "tags": tags, "isPublic": public }),
                )
                .await?;

            output_success(
                &output_format,
                &format!("Note '{}' created", note.title),
                Some(json!({ "note": note })),
            )
        }
        NoteCommands::Update {
            id,
            title,
            content,
            public,
        } => {
            let mut update = Map::new();
            if let Some(title) = title {
                update.insert("title".into(), Value::String(title));
            }
            if let Some(content) = content {
                update.insert("content".into(), Value::String(content));
            }
            if let Some(public) = public {
                update.insert("isPublic".into(), Value::Bool(public));
            }
            if update.is_empty() {
                return Err(anyhow::anyhow!("Nothing to update: pass --title, --content or --public"));
            }

            let note: Note = client.put(&format!("/api/notes/{}", id), &Value::Object(update)).await?;
            output_success(
                &output_format,
                &format!("Note '{}' updated", note.title),
                Some(json!({ "note": note })),
            )
        }
        NoteCommands::Delete { id } => {
            let note: Note = client.delete(&format!("/api/notes/{}", id)).await?;
            output_success(
                &output_format,
                &format!("Note '{}' deleted", note.title),
                Some(json!({ "note": note })),
            )
        }
    }
}
