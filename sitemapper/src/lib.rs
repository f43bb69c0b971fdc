pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{CrawlArgs, expand_output_path, handle_crawl, log_level, write_report};

// Re-export crawl functionality from sitemapper-core
pub use sitemapper_core::crawl::{CrawlOptions, execute_crawl, execute_crawl_until};
