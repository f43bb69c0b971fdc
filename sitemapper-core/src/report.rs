// Report generation from a finished crawl

use crate::error::Result;
use serde::Serialize;
use sitemapper_scanner::{CrawlOutcome, Sitemap, Termination};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportFormat {
    Text,
    Json,
    Graph,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "graph" | "dot" | "svg" => Some(ReportFormat::Graph),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkData {
    pub from: String,
    pub to: String,
}

/// Everything a report needs, with pages and links in a stable order.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub seed: String,
    pub complete: bool,
    pub pages: Vec<String>,
    pub links: Vec<LinkData>,
    #[serde(skip)]
    pub sitemap: Sitemap,
}

impl ReportData {
    pub fn new(seed: impl Into<String>, outcome: &CrawlOutcome) -> Self {
        let mut data = Self::from_sitemap(seed, &outcome.sitemap);
        data.complete = outcome.termination == Termination::Completed;
        data
    }

    pub fn from_sitemap(seed: impl Into<String>, sitemap: &Sitemap) -> Self {
        let mut pages: Vec<String> = sitemap.pages().map(|page| page.to_string()).collect();
        pages.sort();

        let mut links: Vec<LinkData> = sitemap
            .edges()
            .into_iter()
            .map(|(from, to)| LinkData {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();
        links.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Self {
            seed: seed.into(),
            complete: true,
            pages,
            links,
            sitemap: sitemap.clone(),
        }
    }
}

/// Renders the sitemap as a list of pages followed by a list of links.
pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("\npages:\n\n");
    for page in &data.pages {
        report.push_str(page);
        report.push('\n');
    }

    report.push_str("\nlinks:\n\n");
    for link in &data.links {
        report.push_str(&format!("{} -> {}\n", link.from, link.to));
    }

    report.push_str(&format!(
        "\n{} page(s), {} link(s)\n",
        data.pages.len(),
        data.links.len()
    ));

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "sitemapper",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "seed": data.seed,
            "complete": data.complete,
            "summary": {
                "total_pages": data.pages.len(),
                "total_links": data.links.len()
            },
            "pages": data.pages,
            "links": data.links,
            "sitemap": data.sitemap
        }
    });

    Ok(serde_json::to_string_pretty(&json_report)?)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
