use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::{
    BrowserKind, BrowserOptions, ScreenshotOptions, DEFAULT_MAX_CONCURRENT_SESSIONS,
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
use crate::{RenderError, Result, Viewport};

/// File-level configuration; every key is optional in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub node_command: String,
    pub browser: BrowserKind,
    pub viewport: Viewport,
    pub headless: bool,
    pub max_concurrent_sessions: usize,
    pub output_dir: Option<PathBuf>,
    pub timeouts: Timeouts,
    pub screenshot: ScreenshotOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub process: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process: DEFAULT_PROCESS_TIMEOUT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            browser: BrowserKind::default(),
            viewport: Viewport::default(),
            headless: true,
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
            output_dir: None,
            timeouts: Timeouts::default(),
            screenshot: ScreenshotOptions::default(),
        }
    }
}

impl Config {
    /// Load config from an explicit TOML file, the central config, or defaults.
    /// Priority: explicit path > $XDG_CONFIG_HOME/pagerender/config.toml > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::central_config_path() {
                Some(central) if central.is_file() => Self::from_file(&central),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            RenderError::Config(msg) => {
                RenderError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RenderError::Config(format!("Invalid config: {}", e)))
    }

    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("pagerender").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        self.browser_options().validate()
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            node_command: self.node_command.clone(),
            browser: self.browser,
            viewport: self.viewport,
            headless: self.headless,
            navigation_timeout: self.timeouts.navigation,
            network_idle_timeout: self.timeouts.network_idle,
            process_timeout: self.timeouts.process,
            screenshot: self.screenshot,
            output_dir: self.output_dir.clone(),
            max_concurrent_sessions: self.max_concurrent_sessions,
        }
    }
}
