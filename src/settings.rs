use std::path::Path;
use std::time::Duration;

use pagerender_lib::{BrowserOptions, Config, RenderError};

use crate::cli::Cli;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct RenderFlagSources {
    pub viewport: bool,
    pub nav_timeout: bool,
    pub network_idle_timeout: bool,
    pub process_timeout: bool,
}

impl RenderFlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            network_idle_timeout: flag_present(args, "--network-idle-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Merge CLI arguments with the config file, preferring CLI when flags are present.
pub fn resolve_browser_options(
    cli: &Cli,
    config: &Config,
    flags: &RenderFlagSources,
) -> BrowserOptions {
    let mut options = config.browser_options();

    if let Some(browser) = cli.browser {
        options.browser = browser.into();
    }
    if let Some(command) = &cli.node_command {
        options.node_command = command.clone();
    }
    if let Some(format) = cli.image_format {
        options.screenshot.format = format.into();
    }
    options.screenshot.full_page |= cli.full_page;
    options.headless &= !cli.headed;

    if flags.viewport {
        options.viewport = cli.viewport;
    }
    if flags.nav_timeout {
        options.navigation_timeout = Duration::from_secs(cli.nav_timeout);
    }
    if flags.network_idle_timeout {
        options.network_idle_timeout = Duration::from_secs(cli.network_idle_timeout);
    }
    if flags.process_timeout {
        options.process_timeout = Duration::from_secs(cli.process_timeout);
    }

    options
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/pagerender/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, RenderError> {
    let cfg = Config::load(path)?;

    cfg.validate().map_err(|e| {
        let detail = match e {
            RenderError::Config(msg) => msg,
            other => other.to_string(),
        };
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), detail))
            .unwrap_or_else(|| format!("Invalid config: {}", detail));
        RenderError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(options: &BrowserOptions, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: browser={} ({}), viewport={}, screenshot={}{}, timeouts: nav={}s, network-idle={}s, process={}s, node={}",
        options.browser,
        if options.headless { "headless" } else { "headed" },
        options.viewport,
        options.screenshot.format.as_str(),
        if options.screenshot.full_page { " full-page" } else { "" },
        options.navigation_timeout.as_secs(),
        options.network_idle_timeout.as_secs(),
        options.process_timeout.as_secs(),
        options.node_command,
    )
}
