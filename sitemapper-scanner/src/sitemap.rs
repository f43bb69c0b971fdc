use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Result, ScanError};
use crate::normalize::Domain;

/// A normalised page address: scheme and host always present, no trailing
/// slash, no query string and no fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub(crate) fn from_parts(scheme: &str, host: &str, path: &str) -> Self {
        Self(format!("{}://{}{}", scheme, host, path))
    }

    /// Parses an absolute URL and normalises it against its own scheme and host.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;
        let domain = Domain::from_url(&url)?;
        Ok(domain.normalize(&url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CanonicalUrl {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CanonicalUrl {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalUrl {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Same-domain links found on a single page, deduplicated, in no particular order.
pub type Links = Vec<CanonicalUrl>;

/// A successfully fetched and parsed page.
///
/// `addr` is the address the fetch finally landed on after following any
/// redirects, not necessarily the one that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub addr: CanonicalUrl,
    pub links: Links,
}

impl Page {
    pub fn new(addr: CanonicalUrl, links: Links) -> Self {
        Self { addr, links }
    }
}

/// Map of every visited page to the links discovered on it.
///
/// A key being present is the only record that a page was visited. Links may
/// point at pages that never became keys (depth limit, cancellation or a
/// failed fetch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Sitemap {
    pages: HashMap<CanonicalUrl, Links>,
}

impl Sitemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: Page) {
        self.pages.insert(page.addr, page.links);
    }

    pub fn contains<Q>(&self, addr: &Q) -> bool
    where
        CanonicalUrl: Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
    {
        self.pages.contains_key(addr)
    }

    pub fn get<Q>(&self, addr: &Q) -> Option<&Links>
    where
        CanonicalUrl: Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
    {
        self.pages.get(addr)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> impl Iterator<Item = &CanonicalUrl> {
        self.pages.keys()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, CanonicalUrl, Links> {
        self.pages.iter()
    }

    /// Every (page, link) pair in the sitemap.
    pub fn edges(&self) -> Vec<(&CanonicalUrl, &CanonicalUrl)> {
        self.pages
            .iter()
            .flat_map(|(page, links)| links.iter().map(move |link| (page, link)))
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}

impl<'a> IntoIterator for &'a Sitemap {
    type Item = (&'a CanonicalUrl, &'a Links);
    type IntoIter = hash_map::Iter<'a, CanonicalUrl, Links>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

impl FromIterator<Page> for Sitemap {
    fn from_iter<I: IntoIterator<Item = Page>>(iter: I) -> Self {
        let mut sitemap = Sitemap::new();
        for page in iter {
            sitemap.insert(page);
        }
        sitemap
    }
}
