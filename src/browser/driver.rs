//! The Node.js helper that hosts Playwright, its line protocol, and the
//! availability checks run before a helper is spawned.

use super::Cookie;
use crate::{RenderError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Long-lived Playwright helper.
///
/// argv: browser, viewport width, viewport height, headless flag ("0" = headed).
/// Answers `{"id":0}` once the page is open, then serves one JSON command per
/// stdin line, strictly in order. EOF on stdin closes the browser.
pub(crate) const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const [, browserName, width, height, headlessFlag] = process.argv;

let browser;
let context;
let page;

const LONE_SURROGATE = /[\uD800-\uDBFF](?![\uDC00-\uDFFF])|(?<![\uD800-\uDBFF])[\uDC00-\uDFFF]/g;

function wellFormed(value) {
  if (typeof value !== 'string') {
    return value;
  }
  return typeof value.toWellFormed === 'function'
    ? value.toWellFormed()
    : value.replace(LONE_SURROGATE, '\uFFFD');
}

function send(payload) {
  process.stdout.write(JSON.stringify(payload, (_key, value) => wellFormed(value)) + '\n');
}

function describe(err) {
  return err && err.message ? err.message : String(err);
}

async function shutdown() {
  if (context) {
    const ctx = context;
    context = undefined;
    await ctx.close().catch(() => {});
  }
  if (browser) {
    const b = browser;
    browser = undefined;
    await b.close();
  }
}

async function launch() {
  const playwright = require('playwright');
  const browserType = playwright[browserName];
  if (!browserType) {
    throw new Error(`Unsupported browser type: ${browserName}`);
  }
  browser = await browserType.launch({ headless: headlessFlag !== '0' });
  context = await browser.newContext({
    viewport: {
      width: parseInt(width, 10),
      height: parseInt(height, 10)
    }
  });
  page = await context.newPage();
}

async function dispatch(cmd) {
  switch (cmd.op) {
    case 'goto':
      await page.goto(cmd.url, { waitUntil: 'networkidle', timeout: cmd.timeoutMs });
      await page.waitForLoadState('networkidle', { timeout: cmd.idleTimeoutMs });
      return {};
    case 'screenshot':
      await page.screenshot({ path: cmd.path, type: cmd.type, fullPage: !!cmd.fullPage });
      return {};
    case 'content':
      return { html: await page.content() };
    case 'addCookies':
      await context.addCookies(cmd.cookies);
      return {};
    case 'cookies':
      return { cookies: await context.cookies() };
    case 'close':
      await shutdown();
      return {};
    default:
      throw new Error(`Unknown op: ${cmd.op}`);
  }
}

let queue = launch().then(
  () => send({ id: 0, status: 'ok' }),
  async (err) => {
    send({ id: 0, status: 'error', message: describe(err) });
    await shutdown().catch(() => {});
    process.exit(1);
  }
);

const lines = readline.createInterface({ input: process.stdin });

lines.on('line', (line) => {
  queue = queue.then(async () => {
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (err) {
      send({ id: null, status: 'error', message: 'Malformed command: ' + describe(err) });
      return;
    }
    try {
      const result = await dispatch(cmd);
      send(Object.assign({ id: cmd.id, status: 'ok' }, result));
    } catch (err) {
      send({ id: cmd.id, status: 'error', message: describe(err) });
    }
    if (cmd.op === 'close') {
      process.exit(0);
    }
  });
});

lines.on('close', () => {
  queue = queue.then(async () => {
    await shutdown().catch(() => {});
    process.exit(0);
  });
});
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Id the helper uses for its launch report.
pub(crate) const LAUNCH_REPLY_ID: u64 = 0;

#[derive(Debug, Serialize)]
pub(crate) struct DriverCommand {
    pub id: u64,
    #[serde(flatten)]
    pub op: DriverOp,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub(crate) enum DriverOp {
    #[serde(rename_all = "camelCase")]
    Goto {
        url: String,
        timeout_ms: u64,
        idle_timeout_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Screenshot {
        path: String,
        #[serde(rename = "type")]
        image_type: &'static str,
        full_page: bool,
    },
    Content,
    #[serde(rename = "addCookies")]
    AddCookies {
        cookies: Vec<Cookie>,
    },
    Cookies,
    Close,
}

impl DriverOp {
    pub fn name(&self) -> &'static str {
        match self {
            DriverOp::Goto { .. } => "goto",
            DriverOp::Screenshot { .. } => "screenshot",
            DriverOp::Content => "content",
            DriverOp::AddCookies { .. } => "addCookies",
            DriverOp::Cookies => "cookies",
            DriverOp::Close => "close",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriverReply {
    pub id: Option<u64>,
    pub status: String,
    pub message: Option<String>,
    pub html: Option<String>,
    pub cookies: Option<Vec<Cookie>>,
}

impl DriverReply {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("helper returned status {}", self.status))
    }
}

/// One line of helper stdout.
#[derive(Debug)]
pub(crate) enum HelperLine {
    Reply(DriverReply),
    /// Looks like a reply but does not decode; `id` is kept when readable.
    Malformed { id: Option<u64>, error: String },
    /// Anything else the helper or Playwright printed.
    Noise,
}

#[derive(Deserialize)]
struct ReplyHeader {
    id: Option<u64>,
}

/// Classifies one stdout line. Lone UTF-16 surrogate escapes, which
/// `JSON.stringify` emits for malformed page text, are replaced with U+FFFD
/// before giving up on a line.
pub(crate) fn parse_line(line: &str) -> HelperLine {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return HelperLine::Noise;
    }
    let error = match serde_json::from_str::<DriverReply>(trimmed) {
        Ok(reply) => return HelperLine::Reply(reply),
        Err(err) => err,
    };
    if let Some(repaired) = replace_lone_surrogates(trimmed) {
        if let Ok(reply) = serde_json::from_str::<DriverReply>(&repaired) {
            return HelperLine::Reply(reply);
        }
    }
    match serde_json::from_str::<ReplyHeader>(trimmed) {
        Ok(header) => HelperLine::Malformed {
            id: header.id,
            error: error.to_string(),
        },
        Err(_) => HelperLine::Noise,
    }
}

/// Rewrites `\uXXXX` escapes of unpaired surrogates as `\ufffd`. Returns
/// `None` when the text has none.
fn replace_lone_surrogates(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut copied = 0;
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) != Some(&b'u') {
            i += 2;
            continue;
        }
        let width = match escape_unit(raw, i) {
            Some(0xD800..=0xDBFF) => match escape_unit(raw, i + 6) {
                Some(0xDC00..=0xDFFF) => {
                    i += 12;
                    continue;
                }
                _ => 6,
            },
            Some(0xDC00..=0xDFFF) => 6,
            _ => {
                i += 2;
                continue;
            }
        };
        out.push_str(&raw[copied..i]);
        out.push_str("\\ufffd");
        i += width;
        copied = i;
        changed = true;
    }
    if !changed {
        return None;
    }
    out.push_str(&raw[copied..]);
    Some(out)
}

fn escape_unit(raw: &str, at: usize) -> Option<u32> {
    let digits = raw.get(at..)?.strip_prefix("\\u")?.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> RenderError {
    if err.kind() == io::ErrorKind::NotFound {
        RenderError::launch(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        RenderError::launch(format!("Unable to spawn Playwright helper: {}", err))
    }
}

/// Maps a launch report or availability-check stderr to a launch error with a useful hint.
pub(crate) fn map_launch_error(detail: &str) -> RenderError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return RenderError::launch(
            "Playwright npm package is missing; install with `npm install playwright`.",
        );
    }

    if lower.contains("executable doesn't exist") {
        return RenderError::launch(format!(
            "Browser executable is missing; run `npx playwright install`. ({})",
            first_line(detail)
        ));
    }

    RenderError::launch(format!("Playwright helper failed to start: {}", detail.trim()))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            RenderError::launch(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(RenderError::launch(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package can be required.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            RenderError::launch(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_launch_error(&stderr));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_command_uses_camel_case_fields() {
        let cmd = DriverCommand {
            id: 3,
            op: DriverOp::Goto {
                url: "https://example.com".to_string(),
                timeout_ms: 30_000,
                idle_timeout_ms: 10_000,
            },
        };
        let json: serde_json::Value =
            serde_json::to_value(&cmd).expect("serialize goto command");
        assert_eq!(json["id"], 3);
        assert_eq!(json["op"], "goto");
        assert_eq!(json["url"], "https://example.com");
        assert_eq!(json["timeoutMs"], 30_000);
        assert_eq!(json["idleTimeoutMs"], 10_000);
    }

    #[test]
    fn screenshot_command_carries_type_and_full_page() {
        let cmd = DriverCommand {
            id: 4,
            op: DriverOp::Screenshot {
                path: "out/shot.jpg".to_string(),
                image_type: "jpeg",
                full_page: true,
            },
        };
        let line = serde_json::to_string(&cmd).expect("serialize screenshot command");
        assert!(line.contains("\"op\":\"screenshot\""));
        assert!(line.contains("\"type\":\"jpeg\""));
        assert!(line.contains("\"fullPage\":true"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn unit_ops_serialize_with_only_id_and_op() {
        let line = serde_json::to_string(&DriverCommand {
            id: 9,
            op: DriverOp::Close,
        })
        .expect("serialize close");
        assert_eq!(line, r#"{"id":9,"op":"close"}"#);
    }

    #[test]
    fn cookie_ops_use_playwright_names() {
        let line = serde_json::to_string(&DriverCommand {
            id: 5,
            op: DriverOp::AddCookies {
                cookies: vec![Cookie::new("sid", "abc").with_url("https://example.com")],
            },
        })
        .expect("serialize addCookies");
        assert!(line.starts_with(r#"{"id":5,"op":"addCookies","cookies":[{"name":"sid""#));
        assert!(line.contains(r#""url":"https://example.com""#));

        let line = serde_json::to_string(&DriverCommand {
            id: 6,
            op: DriverOp::Cookies,
        })
        .expect("serialize cookies");
        assert_eq!(line, r#"{"id":6,"op":"cookies"}"#);
    }

    fn expect_reply(line: &str) -> DriverReply {
        match parse_line(line) {
            HelperLine::Reply(reply) => reply,
            other => panic!("expected a reply for {line}, got {other:?}"),
        }
    }

    #[test]
    fn parse_line_reads_content_payload() {
        let reply = expect_reply(r#"{"id":2,"status":"ok","html":"<html></html>"}"#);
        assert!(reply.is_ok());
        assert_eq!(reply.id, Some(2));
        assert_eq!(reply.html.as_deref(), Some("<html></html>"));
    }

    #[test]
    fn parse_line_reads_cookie_payload() {
        let reply = expect_reply(
            r#"{"id":4,"status":"ok","cookies":[{"name":"sid","value":"1","domain":"example.com","path":"/","expires":-1,"httpOnly":false,"secure":false,"sameSite":"Lax"}]}"#,
        );
        let cookies = reply.cookies.expect("cookies");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].path.as_deref(), Some("/"));
    }

    #[test]
    fn parse_line_ignores_stray_output() {
        assert!(matches!(parse_line("Downloading Chromium 120.0"), HelperLine::Noise));
        assert!(matches!(parse_line(""), HelperLine::Noise));
        assert!(matches!(parse_line("{not json"), HelperLine::Noise));
    }

    #[test]
    fn error_reply_exposes_message() {
        let reply = expect_reply(
            r#"{"id":1,"status":"error","message":"net::ERR_NAME_NOT_RESOLVED"}"#,
        );
        assert!(!reply.is_ok());
        assert_eq!(reply.error_message(), "net::ERR_NAME_NOT_RESOLVED");
    }

    #[test]
    fn lone_surrogate_in_html_is_replaced() {
        // What JSON.stringify prints for page text holding an unpaired surrogate.
        let reply = expect_reply(r#"{"id":3,"status":"ok","html":"<html>a\ud800b</html>"}"#);
        assert_eq!(reply.html.as_deref(), Some("<html>a\u{fffd}b</html>"));

        let reply = expect_reply(r#"{"id":3,"status":"ok","html":"x\udc00\ud83d"}"#);
        assert_eq!(reply.html.as_deref(), Some("x\u{fffd}\u{fffd}"));
    }

    #[test]
    fn surrogate_pairs_and_escaped_backslashes_are_untouched() {
        let reply = expect_reply(r#"{"id":3,"status":"ok","html":"\ud83d\ude00"}"#);
        assert_eq!(reply.html.as_deref(), Some("\u{1F600}"));

        assert_eq!(replace_lone_surrogates(r#"{"html":"a\\ud800"}"#), None);
        assert_eq!(
            replace_lone_surrogates(r#"{"html":"\ud800\ud800\udc00"}"#).as_deref(),
            Some(r#"{"html":"\ufffd\ud800\udc00"}"#)
        );
    }

    #[test]
    fn undecodable_reply_keeps_its_id() {
        match parse_line(r#"{"id":3,"status":7}"#) {
            HelperLine::Malformed { id, error } => {
                assert_eq!(id, Some(3));
                assert!(!error.is_empty());
            }
            other => panic!("expected malformed reply, got {other:?}"),
        }
    }

    #[test]
    fn map_launch_error_detects_missing_module() {
        let err = map_launch_error("Error: Cannot find module 'playwright'\n    at Module._resolveFilename");
        assert!(
            err.to_string().contains("Playwright npm package is missing"),
            "got: {err}"
        );
    }

    #[test]
    fn map_launch_error_detects_missing_browser_binary() {
        let err = map_launch_error(
            "browserType.launch: Executable doesn't exist at /root/.cache/ms-playwright/chromium-1091/chrome-linux/chrome\nLooks like Playwright was just installed",
        );
        let msg = err.to_string();
        assert!(msg.contains("npx playwright install"), "got: {msg}");
        assert!(!msg.contains("Looks like"), "only the first line is kept: {msg}");
    }

    #[test]
    fn map_spawn_error_names_missing_command() {
        let err = map_spawn_error(io::Error::from(io::ErrorKind::NotFound), "nodejs");
        assert!(matches!(err, RenderError::Launch(_)));
        assert!(err.to_string().contains("'nodejs' was not found on PATH"));
    }

    #[tokio::test]
    async fn ensure_node_available_fails_for_missing_binary() {
        let result = ensure_node_available("definitely-not-a-binary").await;
        assert!(matches!(result, Err(RenderError::Launch(_))));
    }

    #[tokio::test]
    async fn ensure_playwright_available_fails_for_missing_binary() {
        let result = ensure_playwright_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }
}
