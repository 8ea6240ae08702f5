//! Browser automation for headless page rendering.
//!
//! The render orchestrator only talks to the [`BrowserEngine`] and
//! [`BrowserSession`] traits; the production engine drives Playwright through
//! a Node.js helper process.
//!
//! # Module Structure
//!
//! - [`cookie`] - Cookies seeded into and read from a session
//! - [`engine`] - The engine/session traits
//! - [`options`] - Session options and defaults
//! - [`playwright`] - Playwright engine and session
//! - `driver` - The helper script, its line protocol and availability checks
//!
//! # Example
//!
//! ```no_run
//! use pagerender_lib::{BrowserEngine, BrowserOptions, PlaywrightEngine};
//! use std::path::Path;
//!
//! # async fn example() -> pagerender_lib::Result<()> {
//! let engine = PlaywrightEngine::new(BrowserOptions::default());
//! let mut session = engine.launch().await?;
//! session.goto("https://example.com").await?;
//! session.screenshot(Path::new("screenshot.png")).await?;
//! let html = session.content().await?;
//! session.close().await?;
//! println!("{} bytes of HTML", html.len());
//! # Ok(())
//! # }
//! ```

pub mod cookie;
mod driver;
pub mod engine;
pub mod options;
pub mod playwright;

pub use cookie::{Cookie, SameSite};
pub use engine::{BrowserEngine, BrowserSession};
pub use options::{
    BrowserKind, BrowserOptions, ImageFormat, ScreenshotOptions, DEFAULT_MAX_CONCURRENT_SESSIONS,
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
pub use playwright::{PlaywrightEngine, PlaywrightSession};
