use std::{collections::HashMap, fs, path::Path, time::Duration};

pub const SETTINGS_FILE: &str = "transcriber.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub settle_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            settle_delay_ms: 1000,
            request_timeout_secs: 300,
        }
    }
}

impl Settings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Defaults, then `transcriber.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(SETTINGS_FILE));
    apply_env(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) else {
        tracing::warn!(path = %path.display(), "ignoring unparseable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("settle_delay_ms")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.settle_delay_ms = v;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.request_timeout_secs = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("TRANSCRIBER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__SETTLE_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.settle_delay_ms = parsed;
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}
