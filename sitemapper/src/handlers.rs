use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sitemapper_core::crawl::{CrawlOptions, execute_crawl_until};
use sitemapper_core::map::{DEFAULT_OUTPUT_FILE_SVG, GraphRenderer};
use sitemapper_core::report::{
    ReportData, ReportFormat, generate_json_report, generate_text_report, save_report,
};
use sitemapper_scanner::{CanonicalUrl, CrawlOutcome, Termination};
use std::path::{Path, PathBuf};
use tracing::{Level, warn};
use url::Url;

/// Everything the command line configures for one run.
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub url: Url,
    pub depth: usize,
    pub timeout_secs: u64,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: u8,
}

impl CrawlArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<Url>("url")
            .cloned()
            .ok_or_else(|| anyhow!("no URL to crawl"))?;
        let depth = matches.get_one::<usize>("depth").copied().unwrap_or(0);
        let timeout_secs = matches.get_one::<u64>("timeout").copied().unwrap_or(0);

        let format = if matches.get_flag("graph") {
            ReportFormat::Graph
        } else {
            let name = matches
                .get_one::<String>("format")
                .map(String::as_str)
                .unwrap_or("text");
            ReportFormat::from_str(name).ok_or_else(|| anyhow!("unknown report format '{}'", name))?
        };

        let output = matches
            .get_one::<String>("output")
            .map(|path| expand_output_path(path));

        Ok(Self {
            url,
            depth,
            timeout_secs,
            format,
            output,
            quiet: matches.get_flag("quiet"),
            verbose: matches.get_count("verbose"),
        })
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        let mut options = CrawlOptions::new(self.url.clone());
        options.max_depth = self.depth;
        options.timeout = CrawlOptions::timeout_from_secs(self.timeout_secs);
        options.show_progress_bars = !self.quiet;
        options
    }
}

/// Maps `-q` and the `-v` count to the most detailed level that gets logged.
pub fn log_level(quiet: bool, verbose: u8) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Expands a leading `~` in a user supplied path.
pub fn expand_output_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

// Status lines go to stderr so a report on stdout can be piped.
fn status(quiet: bool, message: &str) {
    if !quiet {
        eprintln!("{}", message);
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

pub async fn handle_crawl(args: &CrawlArgs) -> Result<()> {
    let options = args.crawl_options();
    status(args.quiet, &options.describe().bright_white().to_string());

    let outcome = execute_crawl_until(options, ctrl_c())
        .await
        .with_context(|| format!("crawling {} failed", args.url))?;

    match outcome.termination {
        Termination::Completed => {}
        Termination::DeadlineExceeded => status(
            args.quiet,
            &"Max crawling time exceeded, saving current results..."
                .yellow()
                .to_string(),
        ),
        Termination::Interrupted => status(
            args.quiet,
            &"Crawl interrupted, saving current results...".yellow().to_string(),
        ),
        Termination::Aborted => status(
            args.quiet,
            &"Crawl aborted, saving current results...".red().to_string(),
        ),
    }

    let seed = CanonicalUrl::parse(args.url.as_str())?;
    write_report(args.format, seed.as_str(), &outcome, args.output.as_deref(), args.quiet)?;

    status(args.quiet, &"Done!".green().bold().to_string());
    Ok(())
}

/// Renders `outcome` in `format`. Text and JSON reports go to `output` when
/// given, stdout otherwise. Graphs always go to a file.
pub fn write_report(
    format: ReportFormat,
    seed: &str,
    outcome: &CrawlOutcome,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let data = ReportData::new(seed, outcome);

    let content = match format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => generate_json_report(&data).context("failed to serialize report")?,
        ReportFormat::Graph => {
            let renderer = GraphRenderer::new(output.unwrap_or(Path::new(DEFAULT_OUTPUT_FILE_SVG)));
            renderer
                .render(&data.sitemap)
                .context("failed to render the sitemap graph")?;
            status(
                quiet,
                &format!("✓ Sitemap graph saved to {}", renderer.svg_path().display()),
            );
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            save_report(&content, path)
                .with_context(|| format!("failed to save report to {}", path.display()))?;
            status(quiet, &format!("✓ Report saved to {}", path.display()));
        }
        None => print!("{}", content),
    }

    Ok(())
}
