pub mod types;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
pub use types::*;

/// Mode name used when `startingMode` is absent. Every config must declare it.
pub const DEFAULT_MODE: &str = "default";

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProxyConfig> {
    let path = path.as_ref();

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ProxyConfig =
        serde_json::from_str(&raw).context("Failed to deserialize configuration")?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate the loaded configuration
fn validate_config(config: &ProxyConfig) -> Result<()> {
    if !config.modes.contains_key(DEFAULT_MODE) {
        anyhow::bail!("Configuration must declare a '{}' mode", DEFAULT_MODE);
    }

    if let Some(starting_mode) = &config.starting_mode {
        if !config.modes.contains_key(starting_mode) {
            anyhow::bail!(
                "startingMode '{}' does not match any declared mode",
                starting_mode
            );
        }
    }

    for (mode_name, mode) in &config.modes {
        for (server_name, target) in mode {
            if matches!(target, ServerTarget::Full(false)) {
                anyhow::bail!(
                    "Mode '{}' sets backend '{}' to false; omit the backend instead",
                    mode_name,
                    server_name
                );
            }
            if !config.mcp_servers.contains_key(server_name) {
                tracing::warn!(
                    "Mode '{}' references unknown backend '{}'; it will never match",
                    mode_name,
                    server_name
                );
            }
        }
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        anyhow::bail!(
            "Invalid log level '{}'. Valid levels: {}",
            config.logging.level,
            valid_levels.join(", ")
        );
    }

    let valid_formats = ["pretty", "json"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        anyhow::bail!(
            "Invalid log format '{}'. Valid formats: {}",
            config.logging.format,
            valid_formats.join(", ")
        );
    }

    Ok(())
}

/// Write-back handle for the configuration file. The only key this proxy ever
/// updates is `startingMode`, after a successful mode switch; the rest of
/// the file is left byte-for-byte as the user wrote it, modulo formatting.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn set_starting_mode(&self, mode_name: &str) -> crate::Result<()> {
        let raw = std::fs::read_to_string(&self.path)?;
        let mut value: serde_json::Value = serde_json::from_str(&raw)?;

        let object = value.as_object_mut().ok_or_else(|| {
            crate::ProxyError::config(format!(
                "Config file {} is not a JSON object",
                self.path.display()
            ))
        })?;
        object.insert(
            "startingMode".to_string(),
            serde_json::Value::String(mode_name.to_string()),
        );

        std::fs::write(&self.path, serde_json::to_string_pretty(&value)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"{
                "logging": { "level": "debug", "format": "json" },
                "mcpServers": {
                    "github": { "command": "npx", "args": ["-y", "github-mcp"] },
                    "docs": { "url": "https://example.com/mcp" }
                },
                "modes": {
                    "default": { "github": true },
                    "docs-only": { "docs": { "tools": ["search"] } }
                },
                "startingMode": "docs-only"
            }"#,
        );

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.mcp_servers.len(), 2);
        assert_eq!(config.modes.len(), 2);
        assert_eq!(config.starting_mode.as_deref(), Some("docs-only"));
    }

    #[test]
    fn test_load_config_with_defaults() {
        let temp_file = write_config(
            r#"{
                "mcpServers": { "github": { "command": "npx" } },
                "modes": { "default": { "github": true } }
            }"#,
        );

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.starting_mode.is_none());
    }

    #[test]
    fn test_missing_default_mode_rejected() {
        let temp_file = write_config(
            r#"{
                "mcpServers": { "github": { "command": "npx" } },
                "modes": { "review": { "github": true } }
            }"#,
        );

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("default"));
    }

    #[test]
    fn test_unknown_starting_mode_rejected() {
        let temp_file = write_config(
            r#"{
                "mcpServers": { "github": { "command": "npx" } },
                "modes": { "default": { "github": true } },
                "startingMode": "missing"
            }"#,
        );

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_false_server_target_rejected() {
        let temp_file = write_config(
            r#"{
                "mcpServers": { "github": { "command": "npx" } },
                "modes": { "default": { "github": false } }
            }"#,
        );

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_config_store_persists_starting_mode() {
        let temp_file = write_config(
            r#"{
                "mcpServers": { "github": { "command": "npx" } },
                "modes": {
                    "default": { "github": true },
                    "review": { "github": { "tools": ["create_pr"] } }
                }
            }"#,
        );

        let store = ConfigStore::new(temp_file.path());
        store.set_starting_mode("review").unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.starting_mode.as_deref(), Some("review"));
        // The rest of the config survives the rewrite.
        assert_eq!(config.modes.len(), 2);
        assert_eq!(config.mcp_servers.len(), 1);
    }
}
