use crate::browser::{BrowserKind, Cookie};
use crate::error::ErrorPayload;
use crate::render::RenderResult;
use crate::{RenderError, Result, Viewport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RenderOutput {
    Render(RenderReport),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub version: String,
    pub url: String,
    pub browser: BrowserKind,
    pub viewport: Viewport,
    pub html_length: usize,
    pub screenshot_path: PathBuf,
    pub screenshot_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_dimensions: Option<ImageDimensions>,
    pub elapsed_ms: u64,
    pub cookie_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
}

/// Optional bulk fields of a [`RenderReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportDetail {
    pub html: bool,
    pub cookies: bool,
}

impl RenderReport {
    /// Builds a report, checking that the screenshot exists and is non-empty.
    pub fn from_result(
        url: &str,
        browser: BrowserKind,
        result: &RenderResult,
        detail: ReportDetail,
    ) -> Result<Self> {
        let path = &result.screenshot_path;
        let metadata = std::fs::metadata(path).map_err(|e| {
            RenderError::capture(path, format!("screenshot file not found after render: {}", e))
        })?;
        if metadata.len() == 0 {
            return Err(RenderError::capture(path, "screenshot file is empty"));
        }
        let screenshot_dimensions = image::image_dimensions(path)
            .ok()
            .map(|(width, height)| ImageDimensions { width, height });

        Ok(Self {
            version: OUTPUT_VERSION.to_string(),
            url: url.to_string(),
            browser,
            viewport: result.viewport,
            html_length: result.html.len(),
            screenshot_path: path.clone(),
            screenshot_bytes: metadata.len(),
            screenshot_dimensions,
            elapsed_ms: result.elapsed.as_millis() as u64,
            cookie_count: result.cookies.len(),
            html: detail.html.then(|| result.html.clone()),
            cookies: detail.cookies.then(|| result.cookies.clone()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}

impl From<&RenderError> for ErrorOutput {
    fn from(err: &RenderError) -> Self {
        let error = err.to_payload();
        Self {
            version: OUTPUT_VERSION.to_string(),
            message: Some(error.message.clone()),
            error,
        }
    }
}
