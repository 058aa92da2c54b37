use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "resume.toml";
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub per_page: u32,
    pub debounce_ms: u64,
    pub token_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".into(),
            per_page: 10,
            debounce_ms: 300,
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    per_page: Option<u32>,
    debounce_ms: Option<u64>,
    token_path: Option<PathBuf>,
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("resume-client")
        .join("token")
}

/// Defaults, then the config file (when present), then environment overrides.
pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", config_path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", config_path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    settings.per_page = clamp_per_page(settings.per_page);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file.per_page {
        settings.per_page = v;
    }
    if let Some(v) = file.debounce_ms {
        settings.debounce_ms = v;
    }
    if let Some(v) = file.token_path {
        settings.token_path = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = var("RESUME_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__PER_PAGE") {
        settings.per_page = v
            .parse()
            .with_context(|| format!("APP__PER_PAGE must be a positive integer, got '{v}'"))?;
    }
    if let Some(v) = var("APP__DEBOUNCE_MS") {
        settings.debounce_ms = v
            .parse()
            .with_context(|| format!("APP__DEBOUNCE_MS must be an integer, got '{v}'"))?;
    }
    if let Some(v) = var("APP__TOKEN_PATH") {
        settings.token_path = PathBuf::from(v);
    }
    Ok(())
}

/// The backend accepts `per_page` in `[1, 100]`.
pub fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}
