use clap::{arg, command};
use sitemapper_core::crawl::DEFAULT_URL;
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    command!("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .about("Crawls a website within its starting domain and maps the links between its pages.")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-u --"url" <URL>)
                .required(false)
                .help("The URL to start crawling from")
                .value_parser(clap::value_parser!(Url))
                .default_value(DEFAULT_URL),
        )
        .arg(
            arg!(-d --"depth" <DEPTH>)
                .required(false)
                .help("Maximum crawl depth, 0 for unlimited")
                .value_parser(clap::value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(-t --"timeout" <SECONDS>)
                .required(false)
                .help("Maximum crawl time in seconds, 0 for unlimited")
                .value_parser(clap::value_parser!(u64))
                .default_value("60"),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json, graph")
                .value_parser(["text", "json", "graph"])
                .default_value("text"),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help(
                    "Save the report to a file (default: display to screen). In graph mode \
                this is the SVG file to write (default: sitemap.svg)",
                ),
        )
        .arg(
            arg!(--"graph")
                .required(false)
                .help("Render the sitemap as an SVG graph, same as --format graph (requires Graphviz)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and non-essential output")
                .required(false)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
}
