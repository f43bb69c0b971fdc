use colored::Colorize;
use sitemapper::commands::command_argument_builder;
use sitemapper::handlers::{CrawlArgs, handle_crawl, log_level};
use sitemapper_core::print_banner;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let matches = command_argument_builder().get_matches();
    let args = CrawlArgs::from_matches(&matches)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level(args.quiet, args.verbose))
        .init();

    if !args.quiet {
        print_banner();
    }

    handle_crawl(&args).await
}
