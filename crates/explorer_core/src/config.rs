use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context};
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "explorer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub partial_prefix: String,
    pub history_page_size: u32,
    pub comments_page_size: u32,
    pub page_window_distance: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            partial_prefix: "/api/partial".into(),
            history_page_size: 10,
            comments_page_size: 15,
            page_window_distance: 2,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional settings file, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        for (key, value) in file_cfg {
            let value = match value {
                toml::Value::String(v) => v,
                other => other.to_string(),
            };
            settings.apply(&key, value);
        }
    }

    for (var, key) in [
        ("EXPLORER_SERVER_URL", "server_url"),
        ("APP__SERVER_URL", "server_url"),
        ("APP__PARTIAL_PREFIX", "partial_prefix"),
        ("APP__HISTORY_PAGE_SIZE", "history_page_size"),
        ("APP__COMMENTS_PAGE_SIZE", "comments_page_size"),
        ("APP__PAGE_WINDOW_DISTANCE", "page_window_distance"),
    ] {
        if let Some(v) = env(var) {
            settings.apply(key, v);
        }
    }

    settings.server_url = normalize_server_url(&settings.server_url)?;
    settings.partial_prefix = normalize_prefix(&settings.partial_prefix);
    Ok(settings)
}

impl Settings {
    fn apply(&mut self, key: &str, value: String) {
        match key {
            "server_url" => self.server_url = value,
            "partial_prefix" => self.partial_prefix = value,
            "history_page_size" => set_positive(key, &value, &mut self.history_page_size),
            "comments_page_size" => set_positive(key, &value, &mut self.comments_page_size),
            "page_window_distance" => {
                if let Ok(parsed) = value.trim().parse() {
                    self.page_window_distance = parsed;
                } else {
                    warn!(%key, %value, "ignoring invalid setting");
                }
            }
            _ => warn!(%key, "ignoring unknown setting"),
        }
    }
}

fn set_positive(key: &str, value: &str, slot: &mut u32) {
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => *slot = parsed,
        _ => warn!(%key, %value, "ignoring invalid setting"),
    }
}

pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(anyhow!("server_url must start with http:// or https://: {raw}"));
    }
    Ok(trimmed.to_string())
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
