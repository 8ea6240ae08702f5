//! Session options shared by every browser engine.

use crate::{RenderError, Result, Viewport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a single exchange with the browser helper process.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(45);

/// Default number of sessions a [`Renderer`](crate::Renderer) runs at once.
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 4;

/// Browser family launched by Playwright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    /// Name of the matching export on the `playwright` module.
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Value of Playwright's `type` screenshot option.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ScreenshotOptions {
    pub format: ImageFormat,
    /// Capture the full scrollable page instead of the viewport.
    pub full_page: bool,
}

/// Configuration options for browser sessions.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// The Node.js command used to run the Playwright helper (default: "node").
    pub node_command: String,
    /// Browser family to launch.
    pub browser: BrowserKind,
    /// Viewport dimensions for the browser context.
    pub viewport: Viewport,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for any single exchange with the helper process.
    pub process_timeout: Duration,
    pub screenshot: ScreenshotOptions,
    /// Directory for generated screenshot files (system temp dir if unset).
    pub output_dir: Option<PathBuf>,
    /// Maximum number of concurrent browser sessions.
    pub max_concurrent_sessions: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            browser: BrowserKind::default(),
            viewport: Viewport::default(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            screenshot: ScreenshotOptions::default(),
            output_dir: None,
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
        }
    }
}

impl BrowserOptions {
    /// Rejects settings no session can run with. Messages name both the config
    /// key and the CLI flag, since options are merged from both.
    pub fn validate(&self) -> Result<()> {
        if self.node_command.trim().is_empty() {
            return Err(RenderError::Config(
                "node_command must not be empty".to_string(),
            ));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(RenderError::Config(format!(
                "viewport must have positive dimensions, got {}",
                self.viewport
            )));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(RenderError::Config(
                "max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            (
                "navigation timeout (timeouts.navigation, --nav-timeout)",
                self.navigation_timeout,
            ),
            (
                "network idle timeout (timeouts.network_idle, --network-idle-timeout)",
                self.network_idle_timeout,
            ),
            (
                "process timeout (timeouts.process, --process-timeout)",
                self.process_timeout,
            ),
        ] {
            if value.is_zero() {
                return Err(RenderError::Config(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
