use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when `PLEXUS_CONFIG` is
/// not set.
pub const DEFAULT_CONFIG_FILE: &str = "plexus.toml";

const MAX_FRAME_INTERVAL_MS: u64 = 60_000;

/// Which registry drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Module registry with a message bus.
    #[default]
    Kernel,
    /// Layer stack, no bus.
    Layered,
}

/// Top-level schema loaded from `plexus.toml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub mode: RunMode,
    pub frame_count: u64,
    pub frame_interval_ms: u64,
    /// Name of the event synthesized each frame.
    pub input_event: String,
    /// Contain panics in module hooks and bus subscribers.
    pub isolate_modules: bool,
    pub render: RenderConfig,
    pub log: LogConfig,
}

/// Settings for the rendering module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Resource name handed to the loader on attach.
    pub asset: String,
    /// Directory the file loader resolves names against.
    pub asset_root: PathBuf,
}

/// Logging output settings. `PLEXUS_LOG` / `RUST_LOG` override `filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
    pub file: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Kernel,
            frame_count: 5,
            frame_interval_ms: 300,
            input_event: "Click".to_string(),
            isolate_modules: true,
            render: RenderConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            asset: "background.txt".to_string(),
            asset_root: PathBuf::from("."),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            file: false,
        }
    }
}

impl KernelConfig {
    /// Parse and validate config TOML.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse kernel config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file. A missing file is an error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;

        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid config at {}", path.display()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from `PLEXUS_CONFIG` when set (the file must exist), otherwise
    /// from [`DEFAULT_CONFIG_FILE`] if present.
    pub fn load() -> Result<Self> {
        match std::env::var_os("PLEXUS_CONFIG") {
            Some(path) if !path.is_empty() => Self::from_path(Path::new(&path)),
            _ => Self::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Validate semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        validate_nonempty("input_event", &self.input_event)?;
        validate_nonempty("render.asset", &self.render.asset)?;
        validate_nonempty("log.filter", &self.log.filter)?;
        if self.frame_interval_ms > MAX_FRAME_INTERVAL_MS {
            bail!(
                "frame_interval_ms must be at most {} (got {})",
                MAX_FRAME_INTERVAL_MS,
                self.frame_interval_ms
            );
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn validate_nonempty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} must not be empty");
    }
    Ok(())
}
