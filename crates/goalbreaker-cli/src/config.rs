//! Configuration file management for goalbreaker.
//!
//! Provides a TOML config file at `~/.config/goalbreaker/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default. The database
//! URL and the generation API key have no default; a missing value stops the
//! process at startup.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use goalbreaker_core::generation::GeminiConfig;
use goalbreaker_db::config::DbConfig;

/// Environment variable holding the generation service API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the generation model.
pub const MODEL_ENV: &str = "GOALBREAKER_GEMINI_MODEL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff_ms: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the goalbreaker config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/goalbreaker` or
/// `~/.config/goalbreaker`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("goalbreaker");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("goalbreaker")
}

/// Return the path to the goalbreaker config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Load the config file if one exists. A missing file is `None`; a file that
/// cannot be read or parsed is an error.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    if !config_path().exists() {
        return Ok(None);
    }
    load_config().map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix (the file holds an API key).
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the database config: `cli_db_url` > `GOALBREAKER_DATABASE_URL` >
/// `DATABASE_URL` > config file > error.
pub fn resolve_db_config(cli_db_url: Option<&str>, file: Option<&ConfigFile>) -> Result<DbConfig> {
    if let Some(url) = cli_db_url {
        return Ok(DbConfig::new(url));
    }
    if let Some(cfg) = DbConfig::from_env() {
        return Ok(cfg);
    }
    if let Some(cfg) = file {
        return Ok(DbConfig::new(cfg.database.url.clone()));
    }
    bail!(
        "database URL not found; pass --database-url, set GOALBREAKER_DATABASE_URL, \
         or run `goalbreaker init` to create a config file"
    )
}

/// Resolve the generation client config.
///
/// - API key: `GEMINI_API_KEY` env > config file > error.
/// - Model: `GOALBREAKER_GEMINI_MODEL` env > config file > default.
/// - Base URL, timeout, retries: config file > default. A zero timeout is an
///   error.
pub fn resolve_generation_config(file: Option<&ConfigFile>) -> Result<GeminiConfig> {
    let section = file.map(|f| &f.generation);

    let api_key = match non_empty_env(API_KEY_ENV) {
        Some(key) => key,
        None => match section.map(|s| s.api_key.trim()).filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => bail!(
                "generation API key not found; set GEMINI_API_KEY or run `goalbreaker init` to create a config file"
            ),
        },
    };

    let mut config = GeminiConfig::new(api_key);
    if let Some(model) = non_empty_env(MODEL_ENV).or_else(|| section.and_then(|s| s.model.clone()))
    {
        config.model = model;
    }
    if let Some(section) = section {
        if let Some(base_url) = &section.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = section.timeout_secs {
            if secs == 0 {
                bail!("generation.timeout_secs must be greater than 0");
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = section.max_retries {
            config.max_retries = retries;
        }
        if let Some(ms) = section.retry_backoff_ms {
            config.retry_backoff = Duration::from_millis(ms);
        }
    }
    Ok(config)
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct AppConfig {
    pub db_config: DbConfig,
    pub generation: GeminiConfig,
}

impl AppConfig {
    /// Resolve both the database and generation settings. Either one missing
    /// is an error.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file = load_config_if_present()?;
        Ok(Self {
            db_config: resolve_db_config(cli_db_url, file.as_ref())?,
            generation: resolve_generation_config(file.as_ref())?,
        })
    }

    /// Resolve only the database settings, for commands that never call the
    /// generation service.
    pub fn resolve_db(cli_db_url: Option<&str>) -> Result<DbConfig> {
        let file = load_config_if_present()?;
        resolve_db_config(cli_db_url, file.as_ref())
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
