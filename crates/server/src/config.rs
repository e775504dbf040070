use std::fs;

use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            body_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    body_limit_bytes: Option<usize>,
}

/// Defaults, then `server.toml`, then the environment.
pub fn load_settings() -> Settings {
    let raw = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

fn settings_from(raw_file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.server_bind = v;
                }
                if let Some(v) = file_cfg.body_limit_bytes {
                    settings.body_limit_bytes = v;
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__BODY_LIMIT_BYTES") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.body_limit_bytes = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__BODY_LIMIT_BYTES"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
