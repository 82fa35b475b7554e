use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context};
use shared::domain::GameMode;
use tracing::warn;
use url::Url;

pub const CONFIG_FILE: &str = "chess_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub mode: GameMode,
    pub difficulty: u8,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            mode: GameMode::VsBot,
            difficulty: client_core::DEFAULT_DIFFICULTY,
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file at `path`, then environment.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url") {
                    settings.server_url = v.clone();
                }
                if let Some(v) = file_cfg.get("mode") {
                    apply_mode(&mut settings, v);
                }
                if let Some(v) = file_cfg.get("difficulty") {
                    apply_difficulty(&mut settings, v);
                }
                if let Some(v) = file_cfg.get("log_filter") {
                    settings.log_filter = v.clone();
                }
            }
            Err(err) => warn!(path = %path.display(), "ignoring unreadable config file: {err}"),
        }
    }

    if let Some(v) = env("CHESS_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__MODE") {
        apply_mode(&mut settings, &v);
    }
    if let Some(v) = env("APP__DIFFICULTY") {
        apply_difficulty(&mut settings, &v);
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn apply_mode(settings: &mut Settings, raw: &str) {
    match parse_mode(raw) {
        Some(mode) => settings.mode = mode,
        None => warn!(value = raw, "ignoring unknown game mode"),
    }
}

fn apply_difficulty(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u8>() {
        Ok(level) if level > 0 => settings.difficulty = level,
        _ => warn!(value = raw, "ignoring invalid difficulty"),
    }
}

pub fn parse_mode(raw: &str) -> Option<GameMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bot" | "ai" | "vs_bot" => Some(GameMode::VsBot),
        "pvp" | "human" | "local" | "vs_human" => Some(GameMode::VsHuman),
        _ => None,
    }
}

/// Adds `http://` when no scheme is given and drops trailing slashes.
pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Settings::default().server_url);
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&candidate).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("server url must use http or https, got '{}'", url.scheme());
    }
    Ok(candidate.trim_end_matches('/').to_string())
}
