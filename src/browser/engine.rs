//! The seam between the render orchestrator and a browser-automation engine.

use async_trait::async_trait;
use std::path::Path;

use super::Cookie;
use crate::Result;

/// Something that can start a fresh browser session (process, isolated
/// context and page) on demand.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launches a new session. On error nothing the engine started may be
    /// left running.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One live page inside its own browser process.
///
/// Calls must be issued in order; each one completes before the next starts.
#[async_trait]
pub trait BrowserSession: Send {
    /// Adds cookies to the session's isolated context.
    async fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<()>;

    /// Navigates to `url` and returns once the network has gone idle.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Writes a screenshot of the current page to `path`, replacing any
    /// existing file.
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Returns the serialized markup of the current document.
    async fn content(&mut self) -> Result<String>;

    /// Returns every cookie held by the session's context.
    async fn cookies(&mut self) -> Result<Vec<Cookie>>;

    /// Closes the context and terminates the browser. Calling it again is a
    /// no-op.
    async fn close(&mut self) -> Result<()>;
}
