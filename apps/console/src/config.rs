use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

/// Auth tenant parameters, as served to the original web client via
/// `auth_config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub domain: String,
    pub client_id: String,
    pub audience: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub auth: Option<AuthConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:9000/".into(),
            api_token: None,
            auth: None,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("console.json"))
}

pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&raw) {
            Ok(file_settings) => settings = file_settings,
            Err(err) => warn!("config: ignoring unreadable {}: {err}", path.display()),
        }
    }

    if let Ok(v) = std::env::var("HUGO_API_URL") {
        settings.api_url = v;
    }
    if let Ok(v) = std::env::var("HUGO_API_TOKEN") {
        settings.api_token = Some(v);
    }

    settings
}
