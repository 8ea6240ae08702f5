mod cli;
mod formatting;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use pagerender_lib::{
    Cookie, RenderError, RenderOutput, RenderReport, RenderRequest, Renderer, ReportDetail,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use formatting::{render_error, write_output};
use settings::{format_effective_config, load_config, resolve_browser_options, RenderFlagSources};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    run().await
}

/// Logs go to stderr so stdout stays a clean report; `RUST_LOG` overrides.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, args.format, args.output.clone()),
    };
    let flags = RenderFlagSources::from_args(&raw_args);
    let options = resolve_browser_options(&args, &config, &flags);
    if let Err(err) = options.validate() {
        return render_error(err, args.format, args.output.clone());
    }
    let summary = format_effective_config(&options, args.config.as_deref());
    debug!("{}", summary);

    let mut renderer = Renderer::new(options.clone());
    if args.verbose {
        eprintln!("{summary}");
        renderer = renderer.with_progress(Arc::new(|message: &str| eprintln!("{message}")));
    }

    let cookies = args
        .cookies
        .iter()
        .map(|(name, value)| Cookie::new(name, value).with_url(args.url.clone()));
    let request = RenderRequest::new(args.url.clone())
        .with_output_path(args.screenshot.clone())
        .with_cookies(cookies);
    let result = match renderer.render(&request).await {
        Ok(result) => result,
        Err(err) => return render_error(err, args.format, args.output.clone()),
    };

    let report = match RenderReport::from_result(
        &args.url,
        options.browser,
        &result,
        ReportDetail {
            html: args.include_html,
            cookies: args.include_cookies,
        },
    ) {
        Ok(report) => report,
        Err(err) => return render_error(err, args.format, args.output.clone()),
    };
    info!(
        html_len = report.html_length,
        screenshot = %report.screenshot_path.display(),
        bytes = report.screenshot_bytes,
        "screenshot file created"
    );
    if args.verbose {
        eprintln!(
            "HTML content length: {}; screenshot saved to {}",
            report.html_length,
            report.screenshot_path.display()
        );
    }

    if let Err(err) = write_output(&RenderOutput::Render(report), args.format, args.output.clone())
    {
        return render_error(
            RenderError::Config(format!("Failed to write output: {}", err)),
            args.format,
            args.output,
        );
    }
    ExitCode::SUCCESS
}
