//! Directed graph of a crawled site and its Graphviz rendering.

use crate::error::{CoreError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use sitemapper_scanner::Sitemap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub const DEFAULT_OUTPUT_FILE_DOT: &str = "sitemap.dot";
pub const DEFAULT_OUTPUT_FILE_SVG: &str = "sitemap.svg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    pub url: String,
    /// False for link targets that never became sitemap pages.
    pub visited: bool,
}

/// One node per distinct address, one edge per (page, link) pair.
#[derive(Debug, Default)]
pub struct SiteMapGraph {
    graph: DiGraph<MapNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl SiteMapGraph {
    pub fn from_sitemap(sitemap: &Sitemap) -> Self {
        let mut map = Self::default();

        let mut pages: Vec<_> = sitemap.iter().collect();
        pages.sort_by(|a, b| a.0.cmp(b.0));

        for (page, _) in &pages {
            let node = map.insert_or_get_node(page.as_str());
            map.graph[node].visited = true;
        }

        for (page, links) in pages {
            let source = map.insert_or_get_node(page.as_str());
            for link in links {
                let target = map.insert_or_get_node(link.as_str());
                map.graph.add_edge(source, target, ());
            }
        }

        map
    }

    fn insert_or_get_node(&mut self, url: &str) -> NodeIndex {
        if let Some(&node) = self.index.get(url) {
            return node;
        }
        let node = self.graph.add_node(MapNode {
            url: url.to_string(),
            visited: false,
        });
        self.index.insert(url.to_string(), node);
        node
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, url: &str) -> Option<&MapNode> {
        self.index.get(url).map(|&node| &self.graph[node])
    }

    /// Writes the graph in DOT format: edges first, then the visited pages.
    /// Link targets that were never visited are drawn dashed.
    pub fn write_dot<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut w = BufWriter::new(writer);

        writeln!(w, "digraph G {{")?;

        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()];
            let to = &self.graph[edge.target()];
            writeln!(w, "\"{}\"->\"{}\";", escape(&from.url), escape(&to.url))?;
        }

        for node in self.graph.node_weights() {
            if node.visited {
                writeln!(w, "\"{}\";", escape(&node.url))?;
            } else {
                writeln!(w, "\"{}\" [style=dashed];", escape(&node.url))?;
            }
        }

        writeln!(w, "}}")?;
        w.flush()
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders a sitemap to SVG through Graphviz.
#[derive(Debug, Clone)]
pub struct GraphRenderer {
    program: String,
    dot_path: PathBuf,
    svg_path: PathBuf,
}

impl GraphRenderer {
    /// The `.dot` file is written next to `svg_path`, with the same stem.
    pub fn new(svg_path: impl Into<PathBuf>) -> Self {
        let svg_path = svg_path.into();
        Self {
            program: "dot".to_string(),
            dot_path: svg_path.with_extension("dot"),
            svg_path,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn dot_path(&self) -> &Path {
        &self.dot_path
    }

    pub fn svg_path(&self) -> &Path {
        &self.svg_path
    }

    /// Writes the `.dot` file, then runs `dot -Tsvg` on it. The `.dot` file is
    /// kept even when rendering fails.
    pub fn render(&self, sitemap: &Sitemap) -> Result<()> {
        let graph = SiteMapGraph::from_sitemap(sitemap);
        debug!(
            "Sitemap graph has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let file = File::create(&self.dot_path)?;
        graph.write_dot(file)?;
        info!("Sitemap graph description saved to {}", self.dot_path.display());

        let status = Command::new(&self.program)
            .arg("-Tsvg")
            .arg(&self.dot_path)
            .arg("-o")
            .arg(&self.svg_path)
            .status()
            .map_err(|e| {
                CoreError::graph_tool(format!(
                    "could not run '{}' ({}); Graphviz is required to render the graph, \
                     the graph description is still available in {}",
                    self.program,
                    e,
                    self.dot_path.display()
                ))
            })?;

        if !status.success() {
            return Err(CoreError::graph_tool(format!(
                "'{}' exited with {}; the graph description is still available in {}",
                self.program,
                status,
                self.dot_path.display()
            )));
        }

        info!("Sitemap graph saved to {}", self.svg_path.display());
        Ok(())
    }
}

impl Default for GraphRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_FILE_SVG)
    }
}
