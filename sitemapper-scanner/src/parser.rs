use crate::error::{Result, ScanError};
use crate::normalize::Domain;
use crate::sitemap::{Links, Page};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Max time a single page fetch may take, redirects and body included,
/// independent of the crawl deadline.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Redirects followed for one request before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Outcome of inspecting one response in a redirect chain.
enum Hop {
    /// Same-domain redirect to follow next.
    Follow(Url),
    /// Not a redirect, the body belongs to the page.
    Arrived(Response),
}

/// Fetches single pages and extracts the same-domain links on them.
#[derive(Debug, Clone)]
pub struct Parser {
    client: Client,
    domain: Domain,
    timeout: Duration,
}

impl Parser {
    pub fn new(domain: Domain) -> Result<Self> {
        Self::with_timeout(domain, FETCH_TIMEOUT)
    }

    pub fn with_timeout(domain: Domain, timeout: Duration) -> Result<Self> {
        // Redirects are followed by hand so every hop can be checked against the domain
        let client = Client::builder()
            .user_agent(concat!("sitemapper/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            domain,
            timeout,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `addr` and returns the page it ends up on.
    ///
    /// Redirects are followed while they stay on the crawl's host, up to
    /// [`MAX_REDIRECTS`] of them. The returned page is keyed by the last hop.
    /// The whole chain and the body read share one timeout.
    pub async fn parse(&self, addr: &str) -> Result<Page> {
        let (landed_on, body) = tokio::time::timeout(self.timeout, self.fetch(addr))
            .await
            .map_err(|_| ScanError::FetchTimeout {
                url: addr.to_string(),
                timeout: self.timeout,
            })??;
        let links = self.extract_links(&body, addr)?;

        Ok(Page::new(self.domain.normalize(&landed_on), links))
    }

    async fn fetch(&self, addr: &str) -> Result<(Url, String)> {
        let mut current =
            Url::parse(addr).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", addr, e)))?;
        let mut redirects = 0;

        loop {
            debug!("Fetching {}", current);
            let response = self.client.get(current.clone()).send().await?;

            match self.next_hop(&current, response)? {
                Hop::Follow(target) => {
                    if redirects >= MAX_REDIRECTS {
                        return Err(ScanError::TooManyRedirects {
                            url: addr.to_string(),
                        });
                    }
                    redirects += 1;
                    debug!("Redirect {} -> {} ({}/{})", current, target, redirects, MAX_REDIRECTS);
                    current = target;
                }
                Hop::Arrived(response) => {
                    let body = response.text().await?;
                    return Ok((current, body));
                }
            }
        }
    }

    fn next_hop(&self, current: &Url, response: Response) -> Result<Hop> {
        let is_redirect = matches!(
            response.status(),
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        );

        if !is_redirect {
            return Ok(Hop::Arrived(response));
        }

        // A redirect without a Location is just a response
        let Some(location) = response.headers().get(LOCATION).cloned() else {
            return Ok(Hop::Arrived(response));
        };

        let bad_location = |reason: String| ScanError::BadLocation {
            url: current.to_string(),
            reason,
        };
        let location = location.to_str().map_err(|e| bad_location(e.to_string()))?;
        let target = current
            .join(location)
            .map_err(|e| bad_location(e.to_string()))?;

        if !self.domain.contains(&target) {
            return Err(ScanError::ExternalDomain {
                url: target.to_string(),
            });
        }

        Ok(Hop::Follow(target))
    }

    /// Collects the normalised, same-domain targets of every anchor in `html`.
    ///
    /// Hrefs that don't parse are logged and skipped; links to other hosts or
    /// non-http(s) schemes are dropped silently.
    pub fn extract_links(&self, html: &str, page: &str) -> Result<Links> {
        let document = Html::parse_document(html);
        let anchor_selector =
            Selector::parse("a").map_err(|e| ScanError::ParseError(format!("{:?}", e)))?;

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&anchor_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };

            let url = match self.domain.resolve(href) {
                Ok(url) => url,
                Err(e) => {
                    warn!(
                        "failed to parse URL {} found on page {}, it will be ignored: {}",
                        href, page, e
                    );
                    continue;
                }
            };

            if !matches!(url.scheme(), "http" | "https") || !self.domain.contains(&url) {
                continue;
            }

            let link = self.domain.normalize(&url);
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }

        debug!("Found {} link(s) on {}", links.len(), page);
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::CanonicalUrl;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, path_regex},
    };

    fn canonical(raw: &str) -> CanonicalUrl {
        CanonicalUrl::parse(raw).unwrap()
    }

    fn parser_for(server: &MockServer) -> Parser {
        let url = Url::parse(&server.uri()).unwrap();
        Parser::new(Domain::from_url(&url).unwrap()).unwrap()
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string(body.to_string())
    }

    fn redirect(status: u16, location: &str) -> ResponseTemplate {
        ResponseTemplate::new(status).insert_header("location", location)
    }

    #[test]
    fn test_extract_links_keeps_same_domain_only() {
        let parser = Parser::new(Domain::new("http", "localhost")).unwrap();
        let page = r#"<html><body>
            <a href="/foo/bar">bar</a>
            <a href="https://google.com">external</a>
            <a href="mailto:someone@localhost">mail</a>
            <a href="ftp://localhost/file">ftp</a>
            <a name="no-href">anchor</a>
        </body></html>"#;

        let links = parser.extract_links(page, "http://localhost").unwrap();
        assert_eq!(links, vec![canonical("http://localhost/foo/bar")]);
    }

    #[test]
    fn test_extract_links_without_anchors() {
        let parser = Parser::new(Domain::new("http", "localhost")).unwrap();
        let links = parser
            .extract_links("<html><body><p>Nothing here</p></body></html>", "http://localhost")
            .unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_extract_links_skips_unparseable_href() {
        let parser = Parser::new(Domain::new("http", "localhost")).unwrap();
        let page = r#"<a href="http://[::1">broken</a><a href="/foo/bar">bar</a>"#;

        let links = parser.extract_links(page, "http://localhost").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], "http://localhost/foo/bar");
    }

    #[test]
    fn test_extract_links_deduplicates_per_page() {
        let parser = Parser::new(Domain::new("https", "test.com")).unwrap();
        let page = r#"
            <a href="/foo">1</a>
            <a href="/foo/">2</a>
            <a href="/foo?page=2">3</a>
            <a href="https://test.com/foo#section">4</a>
            <a href="/bar">5</a>
        "#;

        let mut links = parser.extract_links(page, "https://test.com").unwrap();
        links.sort();
        assert_eq!(
            links,
            vec![
                canonical("https://test.com/bar"),
                canonical("https://test.com/foo"),
            ]
        );
    }

    #[test]
    fn test_extract_links_uses_first_href_only() {
        let parser = Parser::new(Domain::new("https", "test.com")).unwrap();
        let page = r#"<a href="/first" href="/second">dup</a>"#;

        let links = parser.extract_links(page, "https://test.com").unwrap();
        assert_eq!(links, vec![canonical("https://test.com/first")]);
    }

    #[tokio::test]
    async fn test_parse_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(
                r#"<p>Go to <a href="/foo/bar">bar</a>, or <a href="https://google.com">away</a></p>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let page = parser_for(&server).parse(&server.uri()).await.unwrap();

        assert_eq!(page.addr, server.uri().as_str());
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0], format!("{}/foo/bar", server.uri()).as_str());
    }

    #[tokio::test]
    async fn test_parse_error_status_still_yields_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"<a href="/home">Back home</a>"#.to_string()),
            )
            .mount(&server)
            .await;

        let page = parser_for(&server)
            .parse(&format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.links, vec![canonical(&format!("{}/home", server.uri()))]);
    }

    #[tokio::test]
    async fn test_parse_returns_error_if_page_inaccessible() {
        let parser = Parser::new(Domain::new("", "")).unwrap();
        assert!(parser.parse("").await.is_err());
    }

    #[tokio::test]
    async fn test_parse_returns_error_after_too_many_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(redirect(307, "/endless-redirect"))
            .expect(MAX_REDIRECTS as u64 + 1)
            .mount(&server)
            .await;

        let err = parser_for(&server).parse(&server.uri()).await.unwrap_err();

        assert!(err.is_too_many_redirects(), "unexpected error: {}", err);
        assert!(err.to_string().contains("stopped after 10 redirects"));
    }

    #[tokio::test]
    async fn test_parse_follows_exactly_max_redirects() {
        let server = MockServer::start().await;
        for hop in 0..MAX_REDIRECTS {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{}", hop)))
                .respond_with(redirect(302, &format!("/hop/{}", hop + 1)))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/hop/{}", MAX_REDIRECTS)))
            .respond_with(html("<p>made it</p>"))
            .mount(&server)
            .await;

        let page = parser_for(&server)
            .parse(&format!("{}/hop/0", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.addr, format!("{}/hop/{}", server.uri(), MAX_REDIRECTS).as_str());
    }

    #[tokio::test]
    async fn test_parse_returns_error_if_redirected_to_external_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(redirect(307, "https://google.com/foo"))
            .expect(1)
            .mount(&server)
            .await;

        let err = parser_for(&server).parse(&server.uri()).await.unwrap_err();

        assert!(err.is_external_domain(), "unexpected error: {}", err);
        assert!(err.to_string().contains("outside the starting domain"));
    }

    #[tokio::test]
    async fn test_parse_follows_redirects_within_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(redirect(307, "/foo"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/foo"))
            .respond_with(redirect(308, "/bar"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bar"))
            .respond_with(html(
                r#"<p>No more redirects, head over to <a href="/baz">baz</a>.</p>"#,
            ))
            .mount(&server)
            .await;

        let page = parser_for(&server).parse(&server.uri()).await.unwrap();

        // keyed by where the chain ended, not where it started
        assert_eq!(page.addr, format!("{}/bar", server.uri()).as_str());
        assert_eq!(page.links, vec![canonical(&format!("{}/baz", server.uri()))]);
    }

    #[tokio::test]
    async fn test_redirect_target_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(redirect(301, "/landing/?utm=1#top"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/landing/?$"))
            .respond_with(html("<p>landing</p>"))
            .mount(&server)
            .await;

        let page = parser_for(&server).parse(&server.uri()).await.unwrap();
        assert_eq!(page.addr, format!("{}/landing", server.uri()).as_str());
    }

    #[tokio::test]
    async fn test_timeout_covers_the_whole_redirect_chain() {
        let server = MockServer::start().await;
        for hop in 0..4 {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{}", hop)))
                .respond_with(
                    redirect(302, &format!("/hop/{}", hop + 1))
                        .set_delay(Duration::from_millis(600)),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/hop/4"))
            .respond_with(html("<p>made it</p>"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let parser =
            Parser::with_timeout(Domain::from_url(&url).unwrap(), Duration::from_secs(1)).unwrap();

        let started = std::time::Instant::now();
        let err = parser
            .parse(&format!("{}/hop/0", server.uri()))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {}", err);
        assert!(
            started.elapsed() < Duration::from_millis(1500),
            "fetch took {:?}",
            started.elapsed()
        );
    }
}
