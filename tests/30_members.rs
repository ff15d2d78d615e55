mod common;

use anyhow::Result;
use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn members_list_with_role_filter() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    let all = server.get("/api/tenants/acme/members", &ann.token).await?;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.data()["total"], 2);
    assert_eq!(all.data()["members"][0]["email"], "ann@acme.test");

    let admins = server
        .get(
            "/api/tenants/acme/members?filterField=role&filterOperator=eq&filterValue=admin",
            &ann.token,
        )
        .await?;
    assert_eq!(admins.data()["total"], 1);

    let bad_field = server
        .get("/api/tenants/acme/members?filterField=email&filterValue=x", &ann.token)
        .await?;
    assert_eq!(bad_field.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_admins_add_members() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    let carol = server.sign_up("carol@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    let denied = server
        .post(
            "/api/tenants/acme/members",
            &bob.token,
            json!({ "userId": carol.user_id, "role": "member" }),
        )
        .await?;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);

    let added = server
        .post(
            "/api/tenants/acme/members",
            &ann.token,
            json!({ "userId": carol.user_id, "role": "member" }),
        )
        .await?;
    assert_eq!(added.status, StatusCode::CREATED);

    let again = server
        .post(
            "/api/tenants/acme/members",
            &ann.token,
            json!({ "userId": carol.user_id, "role": "member" }),
        )
        .await?;
    assert_eq!(again.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn free_plan_caps_members() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    for email in ["bob@acme.test", "carol@acme.test"] {
        let account = server.sign_up(email, None).await?;
        server.join(&ann, &account, "member").await?;
    }

    let dave = server.sign_up("dave@acme.test", None).await?;
    let res = server
        .post(
            "/api/tenants/acme/members",
            &ann.token,
            json!({ "userId": dave.user_id, "role": "member" }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"]["code"], "QUOTA_EXCEEDED");
    assert_eq!(res.body["message"], "Upgrade to Pro");
    Ok(())
}

#[tokio::test]
async fn last_admin_cannot_leave_or_be_demoted() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    let leave = server.post("/api/tenants/acme/leave", &ann.token, json!({})).await?;
    assert_eq!(leave.status, StatusCode::CONFLICT);

    let demote = server
        .patch("/api/tenants/acme/members/ann@acme.test", &ann.token, json!({ "role": "member" }))
        .await?;
    assert_eq!(demote.status, StatusCode::CONFLICT);

    let promote = server
        .patch("/api/tenants/acme/members/bob@acme.test", &ann.token, json!({ "role": "admin" }))
        .await?;
    assert_eq!(promote.status, StatusCode::OK);
    assert_eq!(promote.data()["role"], "admin");

    let leave = server.post("/api/tenants/acme/leave", &ann.token, json!({})).await?;
    assert_eq!(leave.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn removed_member_loses_access() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    let removed = server
        .delete("/api/tenants/acme/members/bob@acme.test", &ann.token)
        .await?;
    assert_eq!(removed.status, StatusCode::OK);

    let detail = server.get("/api/tenants/acme", &bob.token).await?;
    assert_eq!(detail.status, StatusCode::UNAUTHORIZED);

    let missing = server
        .delete("/api/tenants/acme/members/bob@acme.test", &ann.token)
        .await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_routes_refuse_members_whatever_the_payload() -> Result<()> {
    let server = TestServer::spawn().await?;
    let ann = server.sign_up("ann@acme.test", Some("Acme")).await?;
    let bob = server.sign_up("bob@acme.test", None).await?;
    server.join(&ann, &bob, "member").await?;

    // Bob administers his personal organization and makes it active again
    let switched = server
        .post(
            "/api/tenants/set-active",
            &bob.token,
            json!({ "tenantId": bob.organization_id }),
        )
        .await?;
    assert_eq!(switched.status, StatusCode::OK);

    let role_update = server
        .patch("/api/tenants/acme/members/ann@acme.test", &bob.token, json!({}))
        .await?;
    assert_eq!(role_update.status, StatusCode::UNAUTHORIZED);
    assert_eq!(role_update.body["error"]["code"], "UNAUTHORIZED");

    let invite = server
        .post("/api/tenants/acme/invitations", &bob.token, json!({}))
        .await?;
    assert_eq!(invite.status, StatusCode::UNAUTHORIZED);

    let add = server
        .post("/api/tenants/acme/members", &bob.token, json!({ "role": "owner" }))
        .await?;
    assert_eq!(add.status, StatusCode::UNAUTHORIZED);

    let removal = server
        .delete("/api/tenants/acme/members/ann@acme.test", &bob.token)
        .await?;
    assert_eq!(removal.status, StatusCode::UNAUTHORIZED);

    let update = server.put("/api/tenants/acme", &bob.token, json!({})).await?;
    assert_eq!(update.status, StatusCode::UNAUTHORIZED);

    let upgrade = server
        .post("/api/tenants/acme/upgrade", &bob.token, json!({ "plan": "platinum" }))
        .await?;
    assert_eq!(upgrade.status, StatusCode::UNAUTHORIZED);

    let delete = server.delete("/api/tenants/acme", &bob.token).await?;
    assert_eq!(delete.status, StatusCode::UNAUTHORIZED);

    let delete_by_id = server
        .delete(&format!("/api/organizations/{}", ann.organization_id), &bob.token)
        .await?;
    assert_eq!(delete_by_id.status, StatusCode::UNAUTHORIZED);

    // Unknown organizations are still reported as missing
    let missing = server
        .patch("/api/tenants/nope/members/ann@acme.test", &bob.token, json!({}))
        .await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    // The admin still gets field validation
    let invalid = server
        .patch("/api/tenants/acme/members/bob@acme.test", &ann.token, json!({}))
        .await?;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error_message(), "Missing required field: role");

    let tenant = server.get("/api/tenants/acme", &ann.token).await?;
    assert_eq!(tenant.status, StatusCode::OK);
    Ok(())
}
