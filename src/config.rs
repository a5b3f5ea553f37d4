use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "carddav2txt";

pub const DEFAULT_EXTENSION: &str = ".txt";

pub const ENV_DESTINATION: &str = "CARDDAV2TXT_DESTINATION_PATH";
pub const ENV_EXTENSION: &str = "CARDDAV2TXT_FILE_EXTENSION";
pub const ENV_USER: &str = "CARDDAV_USER";
pub const ENV_PASSWORD: &str = "CARDDAV_PW";
pub const ENV_URI: &str = "CARDDAV_URI";

#[derive(Debug, Clone)]
pub struct Config {
    /// Config file the settings were read from, if any.
    pub config_path: Option<PathBuf>,
    pub destination: PathBuf,
    pub extension: String,
    pub remote: RemoteConfig,
}

#[derive(Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub extension: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    destination: Option<PathBuf>,
    extension: Option<String>,
    carddav: CardDavFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CardDavFile {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

fn config_root() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join(APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_root().map(|dir| dir.join(CONFIG_FILE_NAME))
}

pub fn load(overrides: &Overrides) -> Result<Config> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_with_env(overrides, |key| env.get(key).cloned())
}

/// Resolve the configuration with `env` standing in for the process
/// environment. Precedence: command line, then environment, then file.
pub fn load_with_env(overrides: &Overrides, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
    let (config_path, file) = read_config_file(overrides.config.as_deref())?;

    let destination = overrides
        .destination
        .clone()
        .or_else(|| env(ENV_DESTINATION).map(PathBuf::from))
        .or(file.destination)
        .ok_or_else(|| missing("destination", ENV_DESTINATION))?;

    let extension = overrides
        .extension
        .clone()
        .or_else(|| env(ENV_EXTENSION))
        .or(file.extension)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    let extension = normalize_extension(&extension)?;

    let url = env(ENV_URI)
        .or(file.carddav.url)
        .ok_or_else(|| missing("carddav.url", ENV_URI))?;
    let username = env(ENV_USER)
        .or(file.carddav.username)
        .ok_or_else(|| missing("carddav.username", ENV_USER))?;
    let password = env(ENV_PASSWORD)
        .or(file.carddav.password)
        .ok_or_else(|| missing("carddav.password", ENV_PASSWORD))?;

    let destination = expand_tilde(&destination);
    if !destination.is_dir() {
        bail!(
            "destination folder must exist: {}",
            destination.display()
        );
    }

    Ok(Config {
        config_path,
        destination,
        extension,
        remote: RemoteConfig {
            url,
            username,
            password,
        },
    })
}

fn missing(key: &str, env_var: &str) -> anyhow::Error {
    anyhow!("`{key}` must be set in the configuration file or as the {env_var} environment variable")
}

fn read_config_file(explicit: Option<&Path>) -> Result<(Option<PathBuf>, ConfigFile)> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok((None, ConfigFile::default())),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let value: toml::Value = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    warn_unknown_keys(&value);

    let file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded configuration file");
    Ok((Some(path), file))
}

fn normalize_extension(extension: &str) -> Result<String> {
    let trimmed = extension.trim();
    if trimmed.is_empty() || trimmed == "." {
        bail!("file extension must not be empty");
    }
    if trimmed.starts_with('.') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!(".{trimmed}"))
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in(table, "", &["destination", "extension", "carddav"]);

    if let Some(carddav) = table.get("carddav").and_then(|v| v.as_table()) {
        warn_unknown_in(carddav, "carddav.", &["url", "username", "password"]);
    }
}

fn warn_unknown_in(table: &toml::map::Map<String, toml::Value>, prefix: &str, known: &[&str]) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            tracing::warn!("unknown configuration key `{}{}`", prefix, key);
        }
    }
}
