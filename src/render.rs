//! Render orchestration.
//!
//! A render call owns exactly one [`BrowserSession`] from launch to close.
//! The session is closed on every exit path before the call returns, and a
//! failed call never hands back a partial result.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempPath;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::browser::{BrowserEngine, BrowserOptions, BrowserSession, Cookie, PlaywrightEngine};
use crate::{RenderError, Result, Viewport};

pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Lifecycle of the session behind one render call. Transitions are strictly
/// sequential; a failure skips straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Launched,
    Navigated,
    Captured,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Launched => "launched",
            SessionState::Navigated => "navigated",
            SessionState::Captured => "captured",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Address handed to the browser as-is.
    pub url: String,
    /// Screenshot destination. When `None` a unique file is created under
    /// the configured output directory (or the system temp dir).
    pub output_path: Option<PathBuf>,
    /// Added to the session's fresh context before navigating.
    pub cookies: Vec<Cookie>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_path: None,
            cookies: Vec::new(),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_cookies(mut self, cookies: impl IntoIterator<Item = Cookie>) -> Self {
        self.cookies.extend(cookies);
        self
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Serialized document markup at capture time.
    pub html: String,
    /// Path of the written screenshot.
    pub screenshot_path: PathBuf,
    /// Cookies held by the context once the page settled.
    pub cookies: Vec<Cookie>,
    /// Viewport used for rendering.
    pub viewport: Viewport,
    /// Time taken to render the page, including browser launch and close.
    pub elapsed: Duration,
}

/// Where the screenshot goes. Generated files stay owned by a [`TempPath`]
/// until the call succeeds, so a failed or cancelled call removes them.
#[derive(Debug)]
enum OutputTarget {
    Explicit(PathBuf),
    Generated(TempPath),
}

impl OutputTarget {
    fn path(&self) -> &Path {
        match self {
            OutputTarget::Explicit(path) => path.as_path(),
            OutputTarget::Generated(temp) => &**temp,
        }
    }

    fn into_path(self) -> Result<PathBuf> {
        match self {
            OutputTarget::Explicit(path) => Ok(path),
            OutputTarget::Generated(temp) => temp.keep().map_err(|e| {
                RenderError::capture(&e.path, format!("failed to keep screenshot file: {}", e.error))
            }),
        }
    }

    fn discard(self) {
        if let OutputTarget::Generated(temp) = self {
            let path = temp.to_path_buf();
            if let Err(err) = temp.close() {
                debug!(path = %path.display(), error = %err, "could not remove screenshot file");
            }
        }
    }
}

/// What a successful drive hands back before the session is closed.
struct Captured {
    html: String,
    cookies: Vec<Cookie>,
    target: OutputTarget,
}

/// Sequences browser sessions for render calls, bounded by a semaphore.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn BrowserEngine>,
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
    progress: Option<ProgressCallback>,
}

impl Renderer {
    /// Creates a renderer backed by Playwright.
    pub fn new(options: BrowserOptions) -> Self {
        let engine = Arc::new(PlaywrightEngine::new(options.clone()));
        Self::with_engine(engine, options)
    }

    /// Creates a renderer over any engine. `options` supplies the concurrency
    /// limit, output directory and screenshot format.
    pub fn with_engine(engine: Arc<dyn BrowserEngine>, options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            engine,
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Renders `url`, writing the screenshot to a fresh unique file.
    pub async fn render_url(&self, url: &str) -> Result<RenderResult> {
        self.render(&RenderRequest::new(url)).await
    }

    pub async fn render(&self, request: &RenderRequest) -> Result<RenderResult> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| RenderError::unknown("Renderer is unavailable"))?;

        let start = Instant::now();
        info!(url = %request.url, "rendering page");
        self.report(
            SessionState::Unopened,
            &format!(
                "Launching headless {} for {} ({}, nav {}s, idle {}s)…",
                self.options.browser,
                request.url,
                self.options.viewport,
                self.options.navigation_timeout.as_secs(),
                self.options.network_idle_timeout.as_secs()
            ),
        );

        let mut session = self.engine.launch().await?;
        self.report(SessionState::Launched, "Browser launched");

        let outcome = self.drive(session.as_mut(), request).await;
        let closed = session.close().await;
        self.report(SessionState::Closed, "Browser closed");

        match (outcome, closed) {
            (Ok(captured), Ok(())) => {
                let screenshot_path = captured.target.into_path()?;
                let elapsed = start.elapsed();
                info!(
                    url = %request.url,
                    html_len = captured.html.len(),
                    cookies = captured.cookies.len(),
                    screenshot = %screenshot_path.display(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "render finished"
                );
                Ok(RenderResult {
                    html: captured.html,
                    screenshot_path,
                    cookies: captured.cookies,
                    viewport: self.options.viewport,
                    elapsed,
                })
            }
            (Ok(captured), Err(close_err)) => {
                warn!(error = %close_err, "browser session failed to close");
                captured.target.discard();
                Err(RenderError::unknown(format!(
                    "Browser session did not close cleanly: {}",
                    close_err
                )))
            }
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "browser session failed to close after error");
                }
                debug!(url = %request.url, error = %err, "render failed");
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        request: &RenderRequest,
    ) -> Result<Captured> {
        if !request.cookies.is_empty() {
            session.add_cookies(&request.cookies).await?;
            debug!(count = request.cookies.len(), "cookies added to context");
        }
        session.goto(&request.url).await?;
        self.report(SessionState::Navigated, "Page reached network idle");
        let cookies = session.cookies().await?;

        // Resolved only now so a failed navigation leaves the filesystem untouched.
        let target = self.resolve_output(request)?;
        if let Err(err) = session.screenshot(target.path()).await {
            target.discard();
            return Err(err);
        }
        self.report(
            SessionState::Captured,
            &format!("Screenshot written to {}", target.path().display()),
        );

        match session.content().await {
            Ok(html) => Ok(Captured {
                html,
                cookies,
                target,
            }),
            Err(err) => {
                target.discard();
                Err(err)
            }
        }
    }

    fn resolve_output(&self, request: &RenderRequest) -> Result<OutputTarget> {
        if let Some(path) = &request.output_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    RenderError::capture(
                        path,
                        format!("failed to create screenshot dir {}: {}", parent.display(), e),
                    )
                })?;
            }
            return Ok(OutputTarget::Explicit(path.clone()));
        }

        let dir = self
            .options
            .output_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&dir).map_err(|e| {
            RenderError::capture(&dir, format!("failed to create screenshot dir: {}", e))
        })?;

        let suffix = format!(".{}", self.options.screenshot.format.extension());
        let temp = tempfile::Builder::new()
            .prefix("pagerender-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| {
                RenderError::capture(&dir, format!("failed to allocate screenshot file: {}", e))
            })?
            .into_temp_path();
        Ok(OutputTarget::Generated(temp))
    }

    fn report(&self, state: SessionState, message: &str) {
        debug!(%state, "{}", message);
        if let Some(cb) = &self.progress {
            cb(message);
        }
    }
}

/// Renders `url` with default options: headless Chromium, network-idle wait,
/// screenshot to a fresh temp file.
pub async fn render(url: &str) -> Result<RenderResult> {
    Renderer::new(BrowserOptions::default()).render_url(url).await
}
