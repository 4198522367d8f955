//! Configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::terminal::{CellSize, Viewport};

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Shell spawned inside the sandbox
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Extra arguments for the shell
    #[serde(default)]
    pub args: Vec<String>,
    /// Prefix for per-session scratch directories
    #[serde(default = "default_scratch_prefix")]
    pub scratch_prefix: String,
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_scratch_prefix() -> String {
    "webos-sandbox".to_string()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            args: Vec::new(),
            scratch_prefix: default_scratch_prefix(),
        }
    }
}

/// Terminal card configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Card width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Card height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
    /// Character cell width in pixels
    #[serde(default = "default_cell_width")]
    pub cell_width: u32,
    /// Character cell height in pixels
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,
}

fn default_width() -> u32 {
    600
}
fn default_height() -> u32 {
    400
}
fn default_cell_width() -> u32 {
    9
}
fn default_cell_height() -> u32 {
    17
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            cell_width: default_cell_width(),
            cell_height: default_cell_height(),
        }
    }
}

impl TerminalConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize::new(self.cell_width, self.cell_height)
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox configuration
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Terminal configuration
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration")?;
        if config.sandbox.shell.trim().is_empty() {
            anyhow::bail!("sandbox.shell must not be empty");
        }
        if config.terminal.cell_width == 0 || config.terminal.cell_height == 0 {
            anyhow::bail!("terminal cell size must be non-zero");
        }
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "webos", "WebOS")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sandbox.shell, "sh");
        assert!(config.sandbox.args.is_empty());
        assert_eq!(config.terminal.width, 600);
        assert_eq!(config.terminal.height, 400);
    }

    #[test]
    fn test_embedded_default_matches_defaults() {
        let parsed = Config::from_toml(Config::default_config_str()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.sandbox.shell, defaults.sandbox.shell);
        assert_eq!(parsed.sandbox.scratch_prefix, defaults.sandbox.scratch_prefix);
        assert_eq!(parsed.terminal.cell_width, defaults.terminal.cell_width);
        assert_eq!(parsed.terminal.cell_height, defaults.terminal.cell_height);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml("[sandbox]\nshell = \"bash\"\nargs = [\"--norc\"]\n").unwrap();
        assert_eq!(config.sandbox.shell, "bash");
        assert_eq!(config.sandbox.args, vec!["--norc".to_string()]);
        assert_eq!(config.terminal.width, 600);
    }

    #[test]
    fn test_rejects_empty_shell_and_zero_cells() {
        assert!(Config::from_toml("[sandbox]\nshell = \"  \"\n").is_err());
        assert!(Config::from_toml("[terminal]\ncell_width = 0\n").is_err());
    }
}
