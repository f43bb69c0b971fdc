pub mod crawler;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod sitemap;

pub use crawler::{CrawlOutcome, Crawler, ProgressCallback, Termination};
pub use error::ScanError;
pub use normalize::Domain;
pub use parser::Parser;
pub use sitemap::{CanonicalUrl, Links, Page, Sitemap};
