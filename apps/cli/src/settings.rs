use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppSettings {
    pub database_url: String,
    pub calculator_url: String,
    pub slot_key: String,
    pub calculator_timeout_ms: u64,
    pub offline: bool,
}

/// Defaults, then `qpa.toml` in the working directory, then `config_path`,
/// then `QPA__*` environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Result<AppSettings, config::ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("database_url", "sqlite://./data/qpa.db")?
        .set_default("calculator_url", "http://127.0.0.1:8000")?
        .set_default("slot_key", client_core::DEFAULT_SLOT_KEY)?
        .set_default("calculator_timeout_ms", 5000)?
        .set_default("offline", false)?
        .add_source(config::File::with_name("qpa").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path.to_path_buf()));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("QPA")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// Turns a bare file path into a sqlite url; urls pass through.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return "sqlite://./data/qpa.db".to_string();
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
