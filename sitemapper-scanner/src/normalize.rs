use url::{ParseError, Url};

use crate::error::{Result, ScanError};
use crate::sitemap::CanonicalUrl;

/// The scheme and host a crawl is confined to, taken from the seed URL.
///
/// Relative links are resolved against the root of this domain rather than
/// against the page they were found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    scheme: String,
    host: String,
}

impl Domain {
    /// `host` includes the port when it isn't the scheme's default.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn from_url(url: &Url) -> Result<Self> {
        let host = authority(url)
            .ok_or_else(|| ScanError::InvalidUrl(format!("{} has no host", url)))?;
        Ok(Self::new(url.scheme(), host))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// True if `url` points at this domain's host (and port).
    pub fn contains(&self, url: &Url) -> bool {
        authority(url).is_some_and(|host| host == self.host)
    }

    /// Parses `raw`, filling in this domain's scheme and host when it has none.
    pub fn resolve(&self, raw: &str) -> std::result::Result<Url, ParseError> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => self.root()?.join(raw),
            Err(e) => Err(e),
        }
    }

    /// Canonical form of an already parsed URL: trailing slashes, query string
    /// and fragment are dropped, a missing host is replaced by this domain's.
    pub fn normalize(&self, url: &Url) -> CanonicalUrl {
        let host = authority(url).unwrap_or_else(|| self.host.clone());
        let path = url.path().trim_end_matches('/');
        CanonicalUrl::from_parts(url.scheme(), &host, path)
    }

    pub fn normalize_str(&self, raw: &str) -> std::result::Result<CanonicalUrl, ParseError> {
        self.resolve(raw).map(|url| self.normalize(&url))
    }

    fn root(&self) -> std::result::Result<Url, ParseError> {
        Url::parse(&format!("{}://{}/", self.scheme, self.host))
    }
}

/// `host[:port]` of a URL, with the port left out when it's the scheme default.
pub fn authority(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|host| !host.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
