use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::cli::config::{load_auth_config, load_server_config};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

/// Response envelope as sent by the API
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    message: Option<String>,
    error: Option<ErrorBody>,
    data: Option<T>,
}

/// Failed API call with the server's message and code
#[derive(Debug, thiserror::Error)]
#[error("{message} ({status})")]
pub struct ApiCallError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<String>,
    /// Top-level message, e.g. an upgrade prompt
    pub prompt: Option<String>,
}

/// Thin reqwest wrapper that speaks the API's envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", base_url, e))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    /// Client for the configured server using the stored token
    pub fn from_config() -> anyhow::Result<Self> {
        let server = load_server_config()?;
        let auth = load_auth_config()?;
        Self::new(server.url(), auth.token)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        self.request::<(), T>(Method::DELETE, path, None).await
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> anyhow::Result<T> {
        let url = self.base_url.join(path)?;
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!("{} {}", method, url);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: Envelope<Value> = serde_json::from_str(&text).map_err(|_| ApiCallError {
            status,
            message: if text.is_empty() { status.to_string() } else { text.clone() },
            code: None,
            prompt: None,
        })?;

        if !envelope.success || !status.is_success() {
            let (message, code) = match envelope.error {
                Some(error) => (error.message, error.code),
                None => (status.to_string(), None),
            };
            return Err(ApiCallError {
                status,
                message,
                code,
                prompt: envelope.message,
            }
            .into());
        }

        Ok(serde_json::from_value(envelope.data.unwrap_or(Value::Null))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url", None).is_err());
        assert!(ApiClient::new("http://localhost:3000", None).is_ok());
    }

    #[test]
    fn error_envelope_parses() {
        let envelope: Envelope<Value> = serde_json::from_str(
            r#"{"success":false,"message":"Upgrade to Pro","error":{"message":"Free plan limited to 3 notes.","code":"QUOTA_EXCEEDED"},"data":null}"#,
        )
        .unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Upgrade to Pro"));
        assert_eq!(envelope.error.unwrap().code.as_deref(), Some("QUOTA_EXCEEDED"));
    }
}
