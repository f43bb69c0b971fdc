pub mod crawl;
pub mod error;
pub mod map;
pub mod report;

pub use error::{CoreError, Result};

use colored::Colorize;

const BANNER: &str = r#"
     _ _                                            
 ___(_) |_ ___ _ __ ___   __ _ _ __  _ __   ___ _ __ 
/ __| | __/ _ \ '_ ` _ \ / _` | '_ \| '_ \ / _ \ '__|
\__ \ | ||  __/ | | | | | (_| | |_) | |_) |  __/ |   
|___/_|\__\___|_| |_| |_|\__,_| .__/| .__/ \___|_|   
                              |_|   |_|              
"#;

/// Prints the startup banner to stderr so it never ends up in saved reports.
pub fn print_banner() {
    eprintln!("{}", BANNER.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "sitemapper".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
}
