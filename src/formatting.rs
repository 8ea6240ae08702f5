use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pagerender_lib::{ErrorOutput, RenderError, RenderOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &RenderOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: RenderError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let payload = RenderOutput::Error(ErrorOutput::from(&err));

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &RenderOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &RenderOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &RenderOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        RenderOutput::Render(report) => {
            let status = color("OK", "32", colorize);
            writeln!(
                buf,
                "{status} Rendered {} ({}, {}) in {:.1}s",
                report.url,
                report.browser,
                report.viewport,
                report.elapsed_ms as f64 / 1000.0
            )
            .ok();
            writeln!(buf, "HTML: {} bytes", report.html_length).ok();
            if report.cookie_count > 0 {
                writeln!(buf, "Cookies: {}", report.cookie_count).ok();
            }
            let dims = report
                .screenshot_dimensions
                .map(|d| format!(", {}x{}", d.width, d.height))
                .unwrap_or_default();
            write!(
                buf,
                "Screenshot: {} ({}{dims})",
                report.screenshot_path.display(),
                format_bytes(report.screenshot_bytes)
            )
            .ok();
        }
        RenderOutput::Error(out) => {
            let label = format!("ERROR [{:?}]", out.error.category).to_ascii_lowercase();
            writeln!(buf, "{} {}", color(&label, "31", colorize), out.error.message).ok();
            if let Some(hint) = &out.error.remediation {
                write!(buf, "Hint: {hint}").ok();
            }
        }
    }
    buf.trim_end().to_string()
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\u{1b}[{code}m{text}\u{1b}[0m")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerender_lib::output::ImageDimensions;
    use pagerender_lib::{BrowserKind, RenderReport, Viewport, OUTPUT_VERSION};

    fn report() -> RenderReport {
        RenderReport {
            version: OUTPUT_VERSION.to_string(),
            url: "https://example.com".to_string(),
            browser: BrowserKind::Chromium,
            viewport: Viewport::default(),
            html_length: 1256,
            screenshot_path: PathBuf::from("screenshot.png"),
            screenshot_bytes: 20_480,
            screenshot_dimensions: Some(ImageDimensions {
                width: 1280,
                height: 720,
            }),
            elapsed_ms: 2300,
            cookie_count: 2,
            html: None,
            cookies: None,
        }
    }

    #[test]
    fn pretty_render_lists_html_length_and_screenshot() {
        let text = format_pretty(&RenderOutput::Render(report()), false);
        assert!(text.starts_with("OK Rendered https://example.com (chromium, 1280x720) in 2.3s"));
        assert!(text.contains("HTML: 1256 bytes"));
        assert!(text.contains("Cookies: 2"));
        assert!(text.contains("Screenshot: screenshot.png (20.0 KB, 1280x720)"));
    }

    #[test]
    fn pretty_error_includes_category_and_hint() {
        let err = RenderError::navigation("http://invalid.invalid", "net::ERR_NAME_NOT_RESOLVED");
        let text = format_pretty(&RenderOutput::Error(ErrorOutput::from(&err)), false);
        assert!(text.starts_with("error [navigation]"), "got: {text}");
        assert!(text.contains("Hint: Verify the URL"));
    }

    #[test]
    fn colorize_wraps_status_in_ansi() {
        let text = format_pretty(&RenderOutput::Render(report()), true);
        assert!(text.starts_with("\u{1b}[32mOK\u{1b}[0m"));
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
