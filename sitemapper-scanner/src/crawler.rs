use crate::error::Result;
use crate::normalize::Domain;
use crate::parser::Parser;
use crate::sitemap::{CanonicalUrl, Page, Sitemap};
use std::future::{self, Future};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

/// Max depth used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Called before each page fetch with the page address and its depth.
pub type ProgressCallback = Arc<dyn Fn(&CanonicalUrl, usize) + Send + Sync>;

/// Why a crawl returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every reachable page within the depth limit was visited.
    Completed,
    DeadlineExceeded,
    Interrupted,
    /// The walk task died; the sitemap holds what it recorded before that.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub sitemap: Sitemap,
    pub termination: Termination,
}

impl CrawlOutcome {
    /// True when the crawl was stopped before the walk finished on its own.
    pub fn is_partial(&self) -> bool {
        self.termination != Termination::Completed
    }
}

/// Depth-first crawler confined to the seed URL's scheme and host.
///
/// Pages are fetched one at a time. Each distinct canonical address is parsed
/// at most once; the sitemap is the record of what has been visited.
#[derive(Clone)]
pub struct Crawler {
    seed: CanonicalUrl,
    max_depth: usize,
    parser: Parser,
    sitemap: Arc<Mutex<Sitemap>>,
    keep_crawling: Arc<AtomicBool>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    /// Creates a crawler for `seed`, which must be absolute with a host.
    pub fn new(seed: &Url) -> Result<Self> {
        let domain = Domain::from_url(seed)?;
        let parser = Parser::new(domain.clone())?;

        Ok(Self {
            seed: domain.normalize(seed),
            max_depth: DEFAULT_MAX_DEPTH,
            parser,
            sitemap: Arc::new(Mutex::new(Sitemap::new())),
            keep_crawling: Arc::new(AtomicBool::new(true)),
            progress_callback: None,
        })
    }

    /// Number of levels to descend from the seed; 0 means unlimited.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.parser = Parser::with_timeout(self.parser.domain().clone(), timeout)?;
        Ok(self)
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn seed(&self) -> &CanonicalUrl {
        &self.seed
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Stops the crawl. A fetch already in flight is allowed to finish, every
    /// visit attempted after this becomes a no-op.
    pub fn cancel(&self) {
        self.keep_crawling.store(false, Ordering::SeqCst);
    }

    pub fn is_crawling(&self) -> bool {
        self.keep_crawling.load(Ordering::SeqCst)
    }

    /// Crawls from the seed until the walk completes or `deadline` elapses.
    /// `None` means no deadline.
    pub async fn crawl(&self, deadline: Option<Duration>) -> CrawlOutcome {
        self.crawl_until(deadline, future::pending::<()>()).await
    }

    /// Like [`Crawler::crawl`], but also stops as soon as `interrupt` resolves.
    ///
    /// The walk runs on its own task. When the deadline or the interrupt wins
    /// the race the crawler is cancelled, the page being fetched at that moment
    /// is allowed to land, and the sitemap gathered so far is returned.
    pub async fn crawl_until<F>(&self, deadline: Option<Duration>, interrupt: F) -> CrawlOutcome
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting crawl of {} (max depth: {})",
            self.seed,
            if self.max_depth == 0 { "unlimited".to_string() } else { self.max_depth.to_string() }
        );

        let walker = self.clone();
        let mut walk = tokio::spawn(async move { walker.walk().await });

        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => future::pending().await,
            }
        };

        let mut termination = tokio::select! {
            joined = &mut walk => match joined {
                Ok(()) => Termination::Completed,
                Err(e) => {
                    error!("Crawl task failed: {}", e);
                    Termination::Aborted
                }
            },
            _ = expired => Termination::DeadlineExceeded,
            _ = interrupt => Termination::Interrupted,
        };

        if matches!(termination, Termination::DeadlineExceeded | Termination::Interrupted) {
            self.cancel();
            info!("Crawl stopped ({:?}), waiting for the page in flight", termination);
            if let Err(e) = walk.await {
                error!("Crawl task failed: {}", e);
                termination = Termination::Aborted;
            }
        }

        let sitemap = self.sitemap().await;
        info!("Crawl complete. Visited {} pages", sitemap.len());

        CrawlOutcome {
            sitemap,
            termination,
        }
    }

    /// Snapshot of the pages visited so far.
    pub async fn sitemap(&self) -> Sitemap {
        self.sitemap.lock().await.clone()
    }

    async fn walk(&self) {
        // Frames are (address, depth). Links are pushed in reverse so the first
        // link on a page is explored, subtree and all, before the second.
        let mut stack = vec![(self.seed.clone(), 0)];

        while let Some((addr, depth)) = stack.pop() {
            if !self.is_crawling() {
                break;
            }

            let Some(page) = self.visit(&addr, depth).await else {
                continue;
            };

            for link in page.links.into_iter().rev() {
                if !self.known(&link).await {
                    stack.push((link, depth + 1));
                }
            }
        }
    }

    /// Parses `addr` and records it, unless crawling has stopped, `depth` is at
    /// the limit or the page is already known. Returns the parsed page.
    async fn visit(&self, addr: &CanonicalUrl, depth: usize) -> Option<Page> {
        if !self.is_crawling() || !self.within_depth(depth) || self.known(addr).await {
            return None;
        }

        if let Some(ref callback) = self.progress_callback {
            callback(addr, depth);
        }

        match self.parser.parse(addr.as_str()).await {
            Ok(page) => {
                debug!("Visited {} ({} links, depth {})", page.addr, page.links.len(), depth);
                self.add(page.clone()).await;
                Some(page)
            }
            Err(e) => {
                warn!("parsing {} returned an error: {}", addr, e);
                None
            }
        }
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth == 0 || depth < self.max_depth
    }

    /// Records `page` unless its address is already a key. Entries are never replaced.
    async fn add(&self, page: Page) {
        let mut sitemap = self.sitemap.lock().await;
        if sitemap.contains(&page.addr) {
            debug!("{} already in the sitemap", page.addr);
            return;
        }
        sitemap.insert(page);
    }

    async fn known(&self, addr: &CanonicalUrl) -> bool {
        self.sitemap.lock().await.contains(addr)
    }
}
