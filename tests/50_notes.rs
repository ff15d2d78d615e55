mod common;

use anyhow::{Context, Result};
use common::{Account, TestServer};
use reqwest::StatusCode;
use serde_json::json;

async fn create_note(server: &TestServer, account: &Account, title: &str, public: bool) -> Result<common::Reply> {
    server
        .post(
            "/api/notes",
            &account.token,
            json!({ "title": title, "content": "body", "tags": ["team"], "isPublic": public }),
        )
        .await
}

#[tokio::test]
async fn free_plan_stops_at_three_notes() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;

    for n in 1..=3 {
        let res = create_note(&server, &ann, &format!("Note {}", n), false).await?;
        assert_eq!(res.status, StatusCode::CREATED, "note {} failed: {:?}", n, res);
    }

    let fourth = create_note(&server, &ann, "Note 4", false).await?;
    assert_eq!(fourth.status, StatusCode::FORBIDDEN);
    assert_eq!(fourth.body["success"], false);
    assert_eq!(fourth.body["message"], "Upgrade to Pro");
    assert_eq!(fourth.body["error"]["code"], "QUOTA_EXCEEDED");
    assert!(fourth.error_message().starts_with("Free plan limited to 3 notes"));
    Ok(())
}

#[tokio::test]
async fn pro_plan_has_no_note_cap() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    server
        .post("/api/tenants/acme/upgrade", &ann.token, json!({ "plan": "pro" }))
        .await?;

    for n in 1..=5 {
        let res = create_note(&server, &ann, &format!("Note {}", n), false).await?;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let page = server.get("/api/notes", &ann.token).await?;
    assert_eq!(page.data()["total"], 5);
    Ok(())
}

#[tokio::test]
async fn members_see_own_and_public_notes() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    create_note(&server, &ann, "Private plan", false).await?;
    create_note(&server, &ann, "Team handbook", true).await?;
    create_note(&server, &bob, "Bob's scratch", false).await?;

    let bob_view = server.get("/api/notes", &bob.token).await?;
    let titles: Vec<&str> = bob_view.data()["notes"]
        .as_array()
        .context("notes array")?
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"Team handbook"));
    assert!(titles.contains(&"Bob's scratch"));

    let ann_view = server.get("/api/notes", &ann.token).await?;
    assert_eq!(ann_view.data()["total"], 3);
    Ok(())
}

#[tokio::test]
async fn only_author_or_admin_modifies_a_note() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    let ann_note = create_note(&server, &ann, "Roadmap", true).await?;
    let ann_note_id = ann_note.data()["id"].as_str().context("note id")?.to_string();
    let bob_note = create_note(&server, &bob, "Draft", false).await?;
    let bob_note_id = bob_note.data()["id"].as_str().context("note id")?.to_string();

    let denied = server.delete(&format!("/api/notes/{}", ann_note_id), &bob.token).await?;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let edited = server
        .put(&format!("/api/notes/{}", bob_note_id), &bob.token, json!({ "title": "Final" }))
        .await?;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.data()["title"], "Final");

    let removed = server.delete(&format!("/api/notes/{}", bob_note_id), &ann.token).await?;
    assert_eq!(removed.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn note_needs_a_title() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", None).await?;

    let res = server.post("/api/notes", &ann.token, json!({ "content": "no title" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = server
        .request(
            reqwest::Method::POST,
            "/api/notes",
            Some(&ann.token),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
