//! pagerender library
//!
//! Renders a web page in a headless browser: launches a session, navigates
//! until the network is idle, writes a screenshot, and returns the rendered
//! HTML together with the screenshot path. The browser is always closed
//! before a render call returns, whether it succeeded or not.
//!
//! # Module Overview
//!
//! - [`render`] - The render orchestrator ([`Renderer`], [`render()`])
//! - [`browser`] - Engine/session traits and the Playwright engine
//! - [`config`] - TOML configuration
//! - [`output`] - JSON report schema
//! - [`error`] - Error taxonomy and user-facing payloads
//!
//! # Example
//!
//! ```no_run
//! use pagerender_lib::{BrowserOptions, RenderRequest, Renderer};
//!
//! # async fn example() -> pagerender_lib::Result<()> {
//! let renderer = Renderer::new(BrowserOptions::default());
//! let request = RenderRequest::new("https://example.com").with_output_path("screenshot.png");
//! let result = renderer.render(&request).await?;
//! println!("{} bytes of HTML, screenshot at {:?}", result.html.len(), result.screenshot_path);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod output;
pub mod render;
pub mod viewport;

pub use browser::{
    BrowserEngine, BrowserKind, BrowserOptions, BrowserSession, Cookie, ImageFormat,
    PlaywrightEngine, SameSite, ScreenshotOptions, DEFAULT_MAX_CONCURRENT_SESSIONS, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
pub use config::Config;
pub use error::{ErrorCategory, ErrorPayload, RenderError, Result};
pub use output::{ErrorOutput, RenderOutput, RenderReport, ReportDetail, OUTPUT_VERSION};
pub use render::{
    render, ProgressCallback, RenderRequest, RenderResult, Renderer, SessionState,
};
pub use viewport::Viewport;
