use clap::{Parser, ValueEnum};
use pagerender_lib::{BrowserKind, ImageFormat, Viewport};
use std::path::PathBuf;

pub const DEFAULT_URL: &str = "https://example.com";

#[derive(Parser)]
#[command(name = "pagerender")]
#[command(
    version,
    about = "Render a page in a headless browser, save a screenshot and report the HTML",
    long_about = "pagerender\n\nLaunches a headless browser through Playwright, navigates to URL, waits until the network is idle, writes a screenshot and reports the rendered HTML length. The browser is always closed before exit.\n\nWith no URL it renders https://example.com as a smoke test of the local Node.js/Playwright setup."
)]
pub struct Cli {
    #[arg(default_value = DEFAULT_URL, help = "Page to render")]
    pub url: String,

    #[arg(
        long,
        short = 's',
        value_name = "PATH",
        default_value = "screenshot.png",
        help = "Where to write the screenshot (overwritten if present)"
    )]
    pub screenshot: PathBuf,

    #[arg(long, value_enum, help = "Browser to launch [default: chromium]")]
    pub browser: Option<BrowserArg>,

    #[arg(
        long,
        default_value = "1280x720",
        help = "Viewport dimensions (WIDTHxHEIGHT)"
    )]
    pub viewport: Viewport,

    #[arg(long, help = "Capture the full scrollable page instead of the viewport")]
    pub full_page: bool,

    #[arg(long, value_enum, help = "Screenshot encoding [default: png]")]
    pub image_format: Option<ImageFormatArg>,

    #[arg(long, help = "Run the browser with a visible window")]
    pub headed: bool,

    #[arg(long, default_value = "30", help = "Navigation timeout (seconds)")]
    pub nav_timeout: u64,

    #[arg(long, default_value = "10", help = "Network idle timeout (seconds)")]
    pub network_idle_timeout: u64,

    #[arg(
        long,
        default_value = "45",
        help = "Timeout (seconds) for each exchange with the Playwright helper"
    )]
    pub process_timeout: u64,

    #[arg(long, value_name = "CMD", help = "Node.js command used to run Playwright")]
    pub node_command: Option<String>,

    #[arg(
        long = "cookie",
        value_name = "NAME=VALUE",
        value_parser = parse_cookie_pair,
        help = "Cookie for URL, added before navigating (repeatable)"
    )]
    pub cookies: Vec<(String, String)>,

    #[arg(long, help = "Include the rendered HTML in the report")]
    pub include_html: bool,

    #[arg(long, help = "Include the page's cookies in the report")]
    pub include_cookies: bool,

    #[arg(long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, short, help = "Report file path (stdout if omitted)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Print progress while rendering")]
    pub verbose: bool,

    #[arg(
        long,
        value_name = "PATH",
        help = "Optional config file (TOML) with defaults for browser/viewport/timeouts; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BrowserArg {
    Chromium,
    Firefox,
    Webkit,
}

impl From<BrowserArg> for BrowserKind {
    fn from(arg: BrowserArg) -> Self {
        match arg {
            BrowserArg::Chromium => BrowserKind::Chromium,
            BrowserArg::Firefox => BrowserKind::Firefox,
            BrowserArg::Webkit => BrowserKind::Webkit,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ImageFormatArg {
    Png,
    Jpeg,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(arg: ImageFormatArg) -> Self {
        match arg {
            ImageFormatArg::Png => ImageFormat::Png,
            ImageFormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

fn parse_cookie_pair(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("cookie name must not be empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{BrowserArg, Cli, ImageFormatArg, OutputFormat, DEFAULT_URL};
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn defaults_render_example_com_to_screenshot_png() {
        let cli = Cli::parse_from(["pagerender"]);

        assert_eq!(cli.url, DEFAULT_URL);
        assert_eq!(cli.screenshot, Path::new("screenshot.png"));
        assert!(cli.browser.is_none());
        assert_eq!(cli.viewport.width, 1280);
        assert_eq!(cli.viewport.height, 720);
        assert!(!cli.full_page);
        assert!(cli.image_format.is_none());
        assert!(!cli.headed);
        assert_eq!(cli.nav_timeout, 30);
        assert_eq!(cli.network_idle_timeout, 10);
        assert_eq!(cli.process_timeout, 45);
        assert!(cli.node_command.is_none());
        assert!(cli.cookies.is_empty());
        assert!(!cli.include_html);
        assert!(!cli.include_cookies);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(cli.output.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn respects_overrides() {
        let cli = Cli::parse_from([
            "pagerender",
            "https://example.org/docs",
            "--screenshot",
            "out/docs.jpg",
            "--browser",
            "webkit",
            "--viewport",
            "1920x1080",
            "--full-page",
            "--image-format",
            "jpeg",
            "--nav-timeout",
            "20",
            "--network-idle-timeout",
            "6",
            "--process-timeout",
            "50",
            "--node-command",
            "nodejs",
            "--cookie",
            "sid=abc=def",
            "--cookie",
            "theme=",
            "--include-html",
            "--include-cookies",
            "--format",
            "pretty",
            "-o",
            "report.json",
            "--verbose",
            "--config",
            "pagerender.toml",
        ]);

        assert_eq!(cli.url, "https://example.org/docs");
        assert_eq!(cli.screenshot, Path::new("out/docs.jpg"));
        assert!(matches!(cli.browser, Some(BrowserArg::Webkit)));
        assert_eq!(cli.viewport.width, 1920);
        assert!(cli.full_page);
        assert!(matches!(cli.image_format, Some(ImageFormatArg::Jpeg)));
        assert_eq!(cli.nav_timeout, 20);
        assert_eq!(cli.network_idle_timeout, 6);
        assert_eq!(cli.process_timeout, 50);
        assert_eq!(cli.node_command.as_deref(), Some("nodejs"));
        assert_eq!(
            cli.cookies,
            vec![
                ("sid".to_string(), "abc=def".to_string()),
                ("theme".to_string(), String::new())
            ]
        );
        assert!(cli.include_html);
        assert!(cli.include_cookies);
        assert!(matches!(cli.format, OutputFormat::Pretty));
        assert_eq!(cli.output.as_deref(), Some(Path::new("report.json")));
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some(Path::new("pagerender.toml")));
    }

    #[test]
    fn rejects_cookie_without_name_or_separator() {
        assert!(Cli::try_parse_from(["pagerender", "--cookie", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["pagerender", "--cookie", "=x"]).is_err());
    }

    #[test]
    fn rejects_bad_viewport() {
        assert!(Cli::try_parse_from(["pagerender", "--viewport", "wide"]).is_err());
    }
}
