use anyhow::{bail, Context, Result};
use rustyline::DefaultEditor;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

const API_KEY_ENV: &str = "SUBSOURCE_API_KEY";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
}

/// Resolve the SubSource API key: environment variable first, then the
/// config file, then a one-time interactive capture that persists the key
/// for later runs.
pub fn resolve_api_key() -> Result<String> {
    if let Ok(key) = env::var(API_KEY_ENV) {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let config_path = get_config_path();
    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("cannot read {}", config_path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("invalid config file at {}", config_path.display()))?;
        if let Some(key) = config.api_key.filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }
    }

    let key = capture_api_key()?;
    if let Err(e) = persist_api_key(&key) {
        eprintln!("Warning: could not save the API key: {e:#}");
    } else {
        println!("API key saved to {}", config_path.display());
    }
    Ok(key)
}

fn capture_api_key() -> Result<String> {
    println!("No SubSource API key found.");
    println!("Set the {API_KEY_ENV} environment variable, or enter the key now.");
    println!("Keys are issued at https://subsource.net (Profile -> API Key).");

    let mut editor = DefaultEditor::new()?;
    let key = editor
        .readline("API key: ")
        .context("API key entry aborted")?;
    let key = key.trim().to_string();
    if key.is_empty() {
        bail!("no API key provided");
    }
    Ok(key)
}

fn persist_api_key(key: &str) -> Result<()> {
    let config_path = get_config_path();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(&ConfigFile {
        api_key: Some(key.to_string()),
    })?;
    fs::write(&config_path, content)?;
    Ok(())
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subdl"))
        // If the standard path could not be found (e.g. `$HOME` is not
        // set), default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}
