use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::permissions::is_admin;
use super::plans::check_note_quota;
use super::session::Session;
use crate::database::models::{NewNote, Note, NoteScope, NoteUpdate};
use crate::database::Store;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    /// When given it must name the active organization
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub total: usize,
}

/// Notes inside the caller's active organization
pub struct NoteService {
    store: Arc<dyn Store>,
}

impl NoteService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Admins see every note, members their own plus public ones
    pub async fn list(&self, session: &Session) -> ServiceResult<NotePage> {
        let organization = session.require_active_organization()?;
        let scope = if is_admin(session).success {
            NoteScope::Organization
        } else {
            NoteScope::AuthorOrPublic(session.user_id())
        };

        let notes = self.store.list_notes(organization.id, scope).await?;
        Ok(NotePage {
            total: notes.len(),
            notes,
        })
    }

    pub async fn create(&self, session: &Session, input: CreateNote) -> ServiceResult<Note> {
        let organization = session.require_active_organization()?;
        if let Some(requested) = input.organization_id {
            if requested != organization.id {
                tracing::warn!(
                    "User {} tried to write a note into organization {}",
                    session.user_id(),
                    requested
                );
                return Err(ServiceError::unauthorized("Notes can only be created in the active organization"));
            }
        }
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("title must not be empty"));
        }

        let author_count = self
            .store
            .count_notes(organization.id, Some(session.user_id()))
            .await?;
        let org_count = self.store.count_notes(organization.id, None).await?;
        if let Err(e) = check_note_quota(organization, author_count, org_count) {
            tracing::warn!("Note quota reached for user {} in {}", session.user_id(), organization.slug);
            return Err(e);
        }

        let note = self
            .store
            .create_note(NewNote {
                organization_id: organization.id,
                author_id: session.user_id(),
                title: input.title,
                content: input.content,
                tags: input.tags,
                is_public: input.is_public,
            })
            .await?;
        tracing::info!("Created note {} in {}", note.id, organization.slug);
        Ok(note)
    }

    pub async fn update(&self, session: &Session, id: Uuid, update: NoteUpdate) -> ServiceResult<Note> {
        self.find_writable(session, id).await?;
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(ServiceError::validation("title must not be empty"));
            }
        }

        let note = self.store.update_note(id, update).await?;
        tracing::info!("Updated note {}", note.id);
        Ok(note)
    }

    pub async fn delete(&self, session: &Session, id: Uuid) -> ServiceResult<Note> {
        self.find_writable(session, id).await?;

        let note = self.store.delete_note(id).await?;
        tracing::info!("Deleted note {}", note.id);
        Ok(note)
    }

    /// The note must live in the active organization and belong to the
    /// caller, unless the caller is an admin there
    async fn find_writable(&self, session: &Session, id: Uuid) -> ServiceResult<Note> {
        let organization = session.require_active_organization()?;
        let note = self
            .store
            .find_note(id)
            .await?
            .filter(|n| n.organization_id == organization.id)
            .ok_or_else(|| ServiceError::not_found("Note not found"))?;

        if note.author_id != session.user_id() && !is_admin(session).success {
            tracing::warn!("User {} may not modify note {}", session.user_id(), note.id);
            return Err(ServiceError::unauthorized("Only the author or an admin can modify this note"));
        }
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use crate::types::Role;

    fn note(title: &str) -> CreateNote {
        CreateNote {
            title: title.to_string(),
            content: "body".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn free_plan_stops_at_three_notes_per_author() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let service = NoteService::new(ctx.store.clone());

        for i in 1..=3 {
            service.create(&owner.session, note(&format!("note {i}"))).await.unwrap();
        }
        let err = service.create(&owner.session, note("note 4")).await.unwrap_err();
        assert!(matches!(err, ServiceError::QuotaExceeded { .. }));
        assert_eq!(service.list(&owner.session).await.unwrap().total, 3);
    }

    #[tokio::test]
    async fn members_see_own_and_public_notes() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let member = ctx.join(&owner, "member@example.com", Role::Member).await.unwrap();
        let service = NoteService::new(ctx.store.clone());

        service.create(&owner.session, note("private")).await.unwrap();
        service
            .create(
                &owner.session,
                CreateNote {
                    is_public: true,
                    ..note("shared")
                },
            )
            .await
            .unwrap();
        service.create(&member.session, note("mine")).await.unwrap();

        let titles: Vec<String> = service
            .list(&member.session)
            .await
            .unwrap()
            .notes
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"shared".to_string()));
        assert!(titles.contains(&"mine".to_string()));

        assert_eq!(service.list(&owner.session).await.unwrap().total, 3);
    }

    #[tokio::test]
    async fn only_author_or_admin_may_modify() {
        let ctx = TestContext::new();
        let owner = ctx.sign_up("owner@example.com").await.unwrap();
        let member = ctx.join(&owner, "member@example.com", Role::Member).await.unwrap();
        let service = NoteService::new(ctx.store.clone());

        let owners_note = service.create(&owner.session, note("owner's")).await.unwrap();
        let err = service.delete(&member.session, owners_note.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let members_note = service.create(&member.session, note("member's")).await.unwrap();
        let updated = service
            .update(
                &owner.session,
                members_note.id,
                NoteUpdate {
                    title: Some("edited".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "edited");
    }

    #[tokio::test]
    async fn notes_of_other_organizations_are_invisible() {
        let ctx = TestContext::new();
        let first = ctx.sign_up("first@example.com").await.unwrap();
        let second = ctx.sign_up("second@example.com").await.unwrap();
        let service = NoteService::new(ctx.store.clone());

        let theirs = service.create(&first.session, note("theirs")).await.unwrap();
        let err = service.delete(&second.session, theirs.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service
            .create(
                &second.session,
                CreateNote {
                    organization_id: Some(first.organization.id),
                    ..note("sneaky")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
