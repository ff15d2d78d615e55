use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

/// server.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub last_ping: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ServerStatus,
}

impl ServerConfig {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

/// auth.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<Uuid>,
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl AuthConfig {
    pub fn signed_in(token: String, email: String, user_id: Uuid) -> Self {
        Self {
            token: Some(token),
            email: Some(email),
            user_id: Some(user_id),
            signed_in_at: Some(Utc::now()),
        }
    }
}

pub const SERVER_FILE: &str = "server.json";
pub const AUTH_FILE: &str = "auth.json";
pub const ORGANIZATION_FILE: &str = "organization.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("TENANT_NOTES_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("tenant-notes").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Read a JSON config file, falling back to the default when it does not exist
pub fn load_json<T: DeserializeOwned + Default>(file_name: &str) -> anyhow::Result<T> {
    let path = get_config_dir()?.join(file_name);
    if !path.exists() {
        return Ok(T::default());
    }

    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
}

pub fn save_json<T: Serialize>(file_name: &str, value: &T) -> anyhow::Result<()> {
    let path = get_config_dir()?.join(file_name);
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn remove_json(file_name: &str) -> anyhow::Result<()> {
    let path = get_config_dir()?.join(file_name);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    load_json(SERVER_FILE)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    save_json(SERVER_FILE, config)
}

pub fn load_auth_config() -> anyhow::Result<AuthConfig> {
    load_json(AUTH_FILE)
}

pub fn save_auth_config(config: &AuthConfig) -> anyhow::Result<()> {
    save_json(AUTH_FILE, config)
}

pub async fn ping_server(url: &str) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", url.trim_end_matches('/'));

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}
