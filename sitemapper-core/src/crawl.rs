use crate::error::{CoreError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_scanner::{CanonicalUrl, CrawlOutcome, Crawler, ProgressCallback};
use std::future::{self, Future};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "https://www.google.com";
pub const DEFAULT_DEPTH: usize = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: Url,
    /// 0 means unlimited
    pub max_depth: usize,
    /// `None` means no deadline
    pub timeout: Option<Duration>,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            max_depth: DEFAULT_DEPTH,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            show_progress_bars: false,
        }
    }

    /// Converts a timeout given in seconds, where 0 means unlimited.
    pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// One-line description of the crawl about to start.
    pub fn describe(&self) -> String {
        let depth = if self.max_depth > 0 {
            format!(" up to {} level(s) deep", self.max_depth)
        } else {
            String::new()
        };
        let timeout = match self.timeout {
            Some(timeout) => format!(" (timeout {}s)", timeout.as_secs()),
            None => " (no timeout specified)".to_string(),
        };

        format!("Crawling {}{}{}.", self.url, depth, timeout)
    }
}

/// Checks that `url` can seed a crawl: http(s) with a host.
pub fn validate_seed(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::config(format!(
            "invalid URL {}: only http and https URLs can be crawled",
            url
        )));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::config(format!(
            "invalid URL {}: a full, non-relative URL including the protocol must be specified \
             (e.g. https://google.com)",
            url
        )));
    }

    Ok(())
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options
pub async fn execute_crawl(options: CrawlOptions) -> Result<CrawlOutcome> {
    execute_crawl_until(options, future::pending()).await
}

/// Execute a crawl that also stops early once `interrupt` resolves.
/// Whatever was gathered up to that point is returned.
pub async fn execute_crawl_until<F>(options: CrawlOptions, interrupt: F) -> Result<CrawlOutcome>
where
    F: Future<Output = ()>,
{
    let CrawlOptions {
        url,
        max_depth,
        timeout,
        show_progress_bars,
    } = options;

    validate_seed(&url)?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let visited = Arc::new(AtomicUsize::new(0));

    let mut crawler = Crawler::new(&url)?.with_max_depth(max_depth);

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let visited = visited.clone();
        let callback: ProgressCallback = Arc::new(move |addr: &CanonicalUrl, depth: usize| {
            let count = visited.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!(
                "Crawling... {} pages fetched [depth {}] {}",
                count,
                depth,
                extract_url_path(addr.as_str())
            ));
        });
        crawler = crawler.with_progress_callback(callback);
    }

    let outcome = crawler.crawl_until(timeout, interrupt).await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(outcome)
}
