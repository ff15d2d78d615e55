#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tenant_notes_api::app::{app, AppState};
use tenant_notes_api::config::AppConfig;
use tenant_notes_api::database::MemoryStore;

/// API server on a free port, backed by a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    client: reqwest::Client,
}

/// Response status plus the decoded envelope
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_message(&self) -> &str {
        self.body["error"]["message"].as_str().unwrap_or_default()
    }
}

/// A signed-up user: JWT plus the organization created for them
#[derive(Debug, Clone)]
pub struct Account {
    pub token: String,
    pub email: String,
    pub user_id: String,
    pub organization_id: String,
    pub slug: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.api.port = port;
        config.api.enable_request_logging = false;
        let state = AppState::new(Arc::new(MemoryStore::new()), config);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Reply> {
        let mut request = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(Reply { status, body })
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<Reply> {
        self.request(reqwest::Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(reqwest::Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(reqwest::Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<Reply> {
        self.request(reqwest::Method::PATCH, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<Reply> {
        self.request(reqwest::Method::DELETE, path, Some(token), None).await
    }

    /// Sign up; with `company` the organization slug is derived from it
    pub async fn sign_up(&self, email: &str, company: Option<&str>) -> Result<Account> {
        let reply = self
            .request(
                reqwest::Method::POST,
                "/auth/sign-up",
                None,
                Some(json!({
                    "email": email,
                    "password": "correct-horse",
                    "name": email.split('@').next().unwrap_or("user"),
                    "company": company,
                })),
            )
            .await?;
        anyhow::ensure!(reply.status == StatusCode::CREATED, "sign-up failed: {:?}", reply);

        let data = reply.data();
        let text = |v: &Value| v.as_str().map(str::to_string).context("missing field");
        Ok(Account {
            token: text(&data["token"])?,
            email: text(&data["user"]["email"])?,
            user_id: text(&data["user"]["id"])?,
            organization_id: text(&data["organization"]["id"])?,
            slug: text(&data["organization"]["slug"])?,
        })
    }

    /// Add `member` to `owner`'s organization through an accepted invitation
    pub async fn join(&self, owner: &Account, member: &Account, role: &str) -> Result<()> {
        let invite = self
            .post(
                &format!("/api/tenants/{}/invitations", owner.slug),
                &owner.token,
                json!({ "email": member.email, "role": role }),
            )
            .await?;
        anyhow::ensure!(invite.status == StatusCode::CREATED, "invite failed: {:?}", invite);

        let id = invite.data()["id"].as_str().context("invitation id")?;
        let accept = self
            .post(&format!("/api/invitations/{}/accept", id), &member.token, json!({}))
            .await?;
        anyhow::ensure!(accept.status == StatusCode::OK, "accept failed: {:?}", accept);
        Ok(())
    }
}
