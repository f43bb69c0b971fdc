use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{url}: URL is outside the starting domain, ignoring")]
    ExternalDomain { url: String },

    #[error("{url}: stopped after 10 redirects")]
    TooManyRedirects { url: String },

    #[error("{url}: fetch timed out after {timeout:?}")]
    FetchTimeout { url: String, timeout: Duration },

    #[error("Redirect from {url} has an invalid Location header: {reason}")]
    BadLocation { url: String, reason: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ScanError {
    /// True when a redirect tried to leave the crawl's domain.
    pub fn is_external_domain(&self) -> bool {
        matches!(self, ScanError::ExternalDomain { .. })
    }

    pub fn is_too_many_redirects(&self) -> bool {
        matches!(self, ScanError::TooManyRedirects { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::FetchTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
