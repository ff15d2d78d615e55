mod common;

use anyhow::{Context, Result};
use common::{Account, TestServer};
use reqwest::StatusCode;
use serde_json::json;

async fn invite(server: &TestServer, admin: &Account, email: &str) -> Result<String> {
    let res = server
        .post(
            &format!("/api/tenants/{}/invitations", admin.slug),
            &admin.token,
            json!({ "email": email, "role": "member" }),
        )
        .await?;
    anyhow::ensure!(res.status == StatusCode::CREATED, "invite failed: {:?}", res);
    Ok(res.data()["id"].as_str().context("invitation id")?.to_string())
}

#[tokio::test]
async fn accepting_twice_leaves_invitation_accepted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    let id = invite(&server, &ann, "bob@acme.test").await?;

    let first = server
        .post(&format!("/api/invitations/{}/accept", id), &bob.token, json!({}))
        .await?;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data()["member"]["role"], "member");

    let second = server
        .post(&format!("/api/invitations/{}/accept", id), &bob.token, json!({}))
        .await?;
    assert_eq!(second.status, StatusCode::CONFLICT);

    let reject = server
        .post(&format!("/api/invitations/{}/reject", id), &bob.token, json!({}))
        .await?;
    assert_eq!(reject.status, StatusCode::CONFLICT);

    let current = server.get(&format!("/api/invitations/{}", id), &bob.token).await?;
    assert_eq!(current.data()["status"], "accepted");

    let session = server.get("/api/auth/session", &bob.token).await?;
    assert_eq!(session.data()["activeOrganization"]["slug"], "acme");
    assert_eq!(session.data()["role"], "member");
    Ok(())
}

#[tokio::test]
async fn only_the_invitee_can_accept() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let eve = server.sign_up("eve@evil.test", None).await?;
    let id = invite(&server, &ann, "bob@acme.test").await?;

    let res = server
        .post(&format!("/api/invitations/{}/accept", id), &eve.token, json!({}))
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn pending_invitation_conflicts_unless_resent() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let id = invite(&server, &ann, "bob@acme.test").await?;

    let duplicate = server
        .post(
            "/api/tenants/acme/invitations",
            &ann.token,
            json!({ "email": "bob@acme.test", "role": "member" }),
        )
        .await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let resent = server
        .post(
            "/api/tenants/acme/invitations",
            &ann.token,
            json!({ "email": "bob@acme.test", "role": "member", "resend": true }),
        )
        .await?;
    assert!(resent.status.is_success(), "resend failed: {:?}", resent);
    assert_eq!(resent.data()["id"], id.as_str());

    let listed = server.get("/api/tenants/acme/invitations", &ann.token).await?;
    assert_eq!(listed.data().as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn canceled_invitation_cannot_be_accepted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    let id = invite(&server, &ann, "bob@acme.test").await?;

    let mine = server.get("/api/invitations?email=bob@acme.test", &bob.token).await?;
    assert_eq!(mine.data().as_array().map(Vec::len), Some(1));

    let others = server.get("/api/invitations?email=bob@acme.test", &ann.token).await?;
    assert_eq!(others.status, StatusCode::UNAUTHORIZED);

    let canceled = server.delete(&format!("/api/invitations/{}", id), &ann.token).await?;
    assert_eq!(canceled.status, StatusCode::OK);
    assert_eq!(canceled.data()["status"], "canceled");

    let accept = server
        .post(&format!("/api/invitations/{}/accept", id), &bob.token, json!({}))
        .await?;
    assert_eq!(accept.status, StatusCode::CONFLICT);

    let canceled_again = server.delete(&format!("/api/invitations/{}", id), &ann.token).await?;
    assert_eq!(canceled_again.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn inviting_an_existing_member_conflicts() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;

    let res = server
        .post(
            "/api/tenants/acme/invitations",
            &ann.token,
            json!({ "email": "ann@acme.test", "role": "admin" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn malformed_ids_get_the_error_envelope() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;

    let paths = [
        "/api/invitations/not-a-uuid/accept",
        "/api/invitations/not-a-uuid/reject",
    ];
    for path in paths {
        let reply = server.post(path, &ann.token, json!({})).await?;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(reply.body["success"], false, "{}", path);
        assert_eq!(reply.body["error"]["code"], "BAD_REQUEST", "{}", path);
        assert!(reply.body["data"].is_null());
    }

    for path in ["/api/invitations/not-a-uuid", "/api/subscription/not-a-uuid"] {
        let reply = server.get(path, &ann.token).await?;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(reply.body["error"]["code"], "BAD_REQUEST", "{}", path);
    }

    let cancel = server.delete("/api/invitations/not-a-uuid", &ann.token).await?;
    assert_eq!(cancel.body["error"]["code"], "BAD_REQUEST");

    let note = server.delete("/api/notes/not-a-uuid", &ann.token).await?;
    assert_eq!(note.status, StatusCode::BAD_REQUEST);
    assert_eq!(note.body["success"], false);
    Ok(())
}
