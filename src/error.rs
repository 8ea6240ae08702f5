use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Screenshot capture to {} failed: {message}", path.display())]
    Capture { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl RenderError {
    pub fn launch(message: impl Into<String>) -> Self {
        RenderError::Launch(message.into())
    }

    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn capture(path: &Path, message: impl Into<String>) -> Self {
        RenderError::Capture {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        RenderError::Unknown(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            RenderError::Launch(_) => ErrorCategory::Launch,
            RenderError::Navigation { .. } => ErrorCategory::Navigation,
            RenderError::Capture { .. } => ErrorCategory::Capture,
            RenderError::Serialization(_) | RenderError::Config(_) => ErrorCategory::Config,
            RenderError::Io(_) | RenderError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let message = self.to_string();
        let lower = message.to_ascii_lowercase();
        let remediation = match self {
            RenderError::Launch(_) => {
                if lower.contains("playwright npm package is missing") {
                    "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`)."
                } else if lower.contains("executable doesn't exist")
                    || lower.contains("browser executable")
                {
                    "Run `npx playwright install` to download the browser binaries."
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    "Install Node.js and ensure the node binary is on PATH (or pass --node-command)."
                } else {
                    "Check that Node.js, Playwright and the browser are installed; re-run with --verbose."
                }
            }
            RenderError::Navigation { .. } => {
                if lower.contains("timeout") || lower.contains("timed out") {
                    "Try increasing --nav-timeout/--network-idle-timeout or ensure the page stops issuing requests."
                } else {
                    "Verify the URL (scheme included, e.g. https://example.com) and network connectivity."
                }
            }
            RenderError::Capture { .. } => {
                "Check that the screenshot directory exists or can be created and is writable, and that the disk is not full."
            }
            RenderError::Io(_) => "Check file paths/permissions.",
            RenderError::Serialization(_) => {
                "Unexpected helper output; re-run with --verbose for details."
            }
            RenderError::Config(_) => {
                if lower.contains("viewport") {
                    "Use WIDTHxHEIGHT with positive values (e.g., 1280x720)."
                } else {
                    "Check flags and the config file (TOML) for invalid values."
                }
            }
            RenderError::Unknown(_) => "Re-run with --verbose; file an issue if persistent.",
        };
        ErrorPayload::new(self.category(), message, remediation)
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Launch,
    Navigation,
    Capture,
    Config,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
