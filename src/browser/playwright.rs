//! Playwright-backed engine: one Node.js helper process per session.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::driver::{
    ensure_node_available, ensure_playwright_available, map_launch_error, map_spawn_error,
    parse_line, DriverCommand, DriverOp, DriverReply, HelperLine, DRIVER_SCRIPT,
    LAUNCH_REPLY_ID,
};
use super::{BrowserEngine, BrowserOptions, BrowserSession, Cookie};
use crate::{RenderError, Result};

/// Upper bound on a graceful close before the helper is killed. Shorter
/// process timeouts lower it further.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for buffered stderr once the helper is gone.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Launches sessions by spawning the Playwright helper with `node`.
#[derive(Debug, Clone, Default)]
pub struct PlaywrightEngine {
    options: BrowserOptions,
}

impl PlaywrightEngine {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

#[async_trait]
impl BrowserEngine for PlaywrightEngine {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        // Fail fast if Node or Playwright is missing to avoid spawning the helper.
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        let session = PlaywrightSession::spawn(&self.options).await?;
        Ok(Box::new(session))
    }
}

enum ExchangeError {
    Timeout(Duration),
    Exited,
    Io(io::Error),
    Protocol(String),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Timeout(limit) => {
                write!(f, "helper did not answer within {:?}; browser killed", limit)
            }
            ExchangeError::Exited => f.write_str("helper exited unexpectedly"),
            ExchangeError::Io(err) => write!(f, "helper pipe error: {}", err),
            ExchangeError::Protocol(msg) => write!(f, "helper protocol error: {}", msg),
        }
    }
}

/// A live helper process holding a browser, an isolated context and a page.
///
/// The child is spawned with `kill_on_drop`, so dropping a session that was
/// never closed still terminates the browser.
pub struct PlaywrightSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<Vec<u8>>>,
    options: BrowserOptions,
    next_id: u64,
    closed: bool,
}

impl PlaywrightSession {
    async fn spawn(options: &BrowserOptions) -> Result<Self> {
        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(DRIVER_SCRIPT)
            .arg(options.browser.as_str())
            .arg(options.viewport.width.to_string())
            .arg(options.viewport.height.to_string())
            .arg(if options.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;

        let stdin = child.stdin.take();
        let stderr_pipe = child.stderr.take();
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill().await;
            return Err(RenderError::launch("Playwright helper stdout was not captured"));
        };

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut buf).await;
            }
            buf
        });

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr_task: Some(stderr_task),
            options: options.clone(),
            next_id: LAUNCH_REPLY_ID + 1,
            closed: false,
        };

        match session
            .read_reply(LAUNCH_REPLY_ID, options.process_timeout)
            .await
        {
            Ok(reply) if reply.is_ok() => {
                debug!(
                    pid = ?session.child.id(),
                    browser = %options.browser,
                    viewport = %options.viewport,
                    "browser session launched"
                );
                Ok(session)
            }
            Ok(reply) => {
                session.terminate().await;
                Err(map_launch_error(&reply.error_message()))
            }
            Err(err) => {
                let stderr = session.terminate().await;
                if stderr.is_empty() {
                    Err(RenderError::launch(format!(
                        "Playwright helper failed to start: {}",
                        err
                    )))
                } else {
                    Err(map_launch_error(&stderr))
                }
            }
        }
    }

    async fn read_reply(
        &mut self,
        expected: u64,
        limit: Duration,
    ) -> std::result::Result<DriverReply, ExchangeError> {
        let stdout = &mut self.stdout;
        let read = async {
            loop {
                let line = match stdout.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => return Err(ExchangeError::Exited),
                    Err(err) => return Err(ExchangeError::Io(err)),
                };
                match parse_line(&line) {
                    HelperLine::Reply(reply) if reply.id == Some(expected) => return Ok(reply),
                    HelperLine::Reply(reply) if reply.id.is_none() => {
                        return Err(ExchangeError::Protocol(reply.error_message()))
                    }
                    HelperLine::Reply(reply) => {
                        debug!(id = ?reply.id, expected, "ignoring stale helper reply")
                    }
                    HelperLine::Malformed { id, error } if id == Some(expected) => {
                        return Err(ExchangeError::Protocol(format!(
                            "undecodable reply: {}",
                            error
                        )))
                    }
                    HelperLine::Malformed { id, error } => {
                        debug!(id = ?id, %error, "ignoring undecodable helper line")
                    }
                    HelperLine::Noise => debug!(line = line.trim(), "ignoring helper output"),
                }
            }
        };

        match timeout(limit, read).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout(limit)),
        }
    }

    /// Sends one command and waits for its reply. Any transport failure kills
    /// the helper; the returned text is suitable for an error message.
    async fn request(
        &mut self,
        op: DriverOp,
        limit: Duration,
    ) -> std::result::Result<DriverReply, String> {
        if self.closed {
            return Err("browser session is already closed".to_string());
        }

        let id = self.next_id;
        self.next_id += 1;
        let name = op.name();
        let mut line = serde_json::to_string(&DriverCommand { id, op })
            .map_err(|e| format!("failed to encode {} command: {}", name, e))?;
        line.push('\n');

        debug!(id, op = name, "sending helper command");
        let written = match self.stdin.as_mut() {
            Some(stdin) => match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(err) => Err(err),
            },
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "helper stdin is not available",
            )),
        };
        if let Err(err) = written {
            let stderr = self.terminate().await;
            return Err(with_stderr(
                format!("failed to send {} command: {}", name, err),
                &stderr,
            ));
        }

        match self.read_reply(id, limit).await {
            Ok(reply) if reply.is_ok() => Ok(reply),
            Ok(reply) => Err(reply.error_message()),
            Err(err) => {
                if matches!(err, ExchangeError::Timeout(_)) {
                    warn!(id, op = name, "helper timed out; killing browser");
                }
                let stderr = self.terminate().await;
                Err(with_stderr(err.to_string(), &stderr))
            }
        }
    }

    /// Kills the helper and returns whatever it wrote to stderr.
    async fn terminate(&mut self) -> String {
        self.closed = true;
        self.stdin.take();
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
        self.drain_stderr().await
    }

    async fn drain_stderr(&mut self) -> String {
        let Some(task) = self.stderr_task.take() else {
            return String::new();
        };
        match timeout(STDERR_DRAIN_TIMEOUT, task).await {
            Ok(Ok(buf)) => String::from_utf8_lossy(&buf).trim().to_string(),
            _ => String::new(),
        }
    }
}

/// Navigation waits on both Playwright timeouts, so its exchange bound must
/// cover their sum.
fn navigation_limit(options: &BrowserOptions) -> Duration {
    options
        .process_timeout
        .max(options.navigation_timeout + options.network_idle_timeout)
}

fn close_limit(options: &BrowserOptions) -> Duration {
    options.process_timeout.min(CLOSE_TIMEOUT)
}

fn with_stderr(message: String, stderr: &str) -> String {
    if stderr.is_empty() {
        message
    } else {
        format!("{}; stderr: {}", message, stderr)
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn add_cookies(&mut self, cookies: &[Cookie]) -> Result<()> {
        let op = DriverOp::AddCookies {
            cookies: cookies.to_vec(),
        };
        let limit = self.options.process_timeout;
        self.request(op, limit)
            .await
            .map(|_| ())
            .map_err(|message| RenderError::unknown(format!("Failed to set cookies: {}", message)))
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        let op = DriverOp::Goto {
            url: url.to_string(),
            timeout_ms: self.options.navigation_timeout.as_millis() as u64,
            idle_timeout_ms: self.options.network_idle_timeout.as_millis() as u64,
        };
        let limit = navigation_limit(&self.options);
        self.request(op, limit)
            .await
            .map(|_| ())
            .map_err(|message| RenderError::navigation(url, message))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        let op = DriverOp::Screenshot {
            path: path.to_string_lossy().into_owned(),
            image_type: self.options.screenshot.format.as_str(),
            full_page: self.options.screenshot.full_page,
        };
        let limit = self.options.process_timeout;
        self.request(op, limit)
            .await
            .map(|_| ())
            .map_err(|message| RenderError::capture(path, message))
    }

    async fn content(&mut self) -> Result<String> {
        let limit = self.options.process_timeout;
        let reply = self
            .request(DriverOp::Content, limit)
            .await
            .map_err(|message| {
                RenderError::unknown(format!("Failed to read page content: {}", message))
            })?;
        reply
            .html
            .ok_or_else(|| RenderError::unknown("Helper returned no page content"))
    }

    async fn cookies(&mut self) -> Result<Vec<Cookie>> {
        let limit = self.options.process_timeout;
        let reply = self
            .request(DriverOp::Cookies, limit)
            .await
            .map_err(|message| {
                RenderError::unknown(format!("Failed to read cookies: {}", message))
            })?;
        Ok(reply.cookies.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let limit = close_limit(&self.options);
        if let Err(message) = self.request(DriverOp::Close, limit).await {
            warn!(%message, "graceful browser close failed");
        }

        if !self.closed {
            self.stdin.take();
            match timeout(limit, self.child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "browser helper exited"),
                Ok(Err(err)) => warn!(error = %err, "failed to wait for browser helper"),
                Err(_) => {
                    warn!("browser helper still running after close; killing");
                    let _ = self.child.kill().await;
                }
            }
            self.closed = true;
            let stderr = self.drain_stderr().await;
            if !stderr.is_empty() {
                debug!(%stderr, "browser helper stderr");
            }
        }

        match self.child.try_wait() {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(RenderError::unknown(
                "Browser helper is still running after close",
            )),
            Err(err) => Err(RenderError::Io(err)),
        }
    }
}
