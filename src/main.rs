use anyhow::Result;
use clap::Parser;
use tracing::warn;

use feedcrawl::{search_with_info, to_opml, CrawlConfig};

#[derive(Parser)]
#[command(name = "feedcrawl", about = "Concurrent RSS/Atom/JSON-Feed discovery crawler")]
struct Cli {
    /// Seed URLs to search from
    urls: Vec<String>,

    /// Comma-separated seed URLs, as an alternative to positional args
    #[arg(long)]
    urls_csv: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Emit results as OPML instead of JSON
    #[arg(long)]
    opml: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config: CrawlConfig = match std::fs::read_to_string(&cli.config) {
        Ok(s) => CrawlConfig::from_toml_str(&s)?,
        Err(_) => {
            warn!(path = %cli.config, "config file not found, using defaults");
            CrawlConfig::default()
        }
    };

    let mut seeds = cli.urls;
    if let Some(csv) = cli.urls_csv {
        seeds.extend(csv.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
    }

    if seeds.is_empty() {
        eprintln!("usage: feedcrawl <url>... [--config FILE] [--opml]");
        std::process::exit(1);
    }

    let result = search_with_info(&seeds, &config).await;
    let all_failed = result.feeds.is_empty() && result.root_error.is_some();

    if cli.opml {
        println!("{}", to_opml(&result.feeds));
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    std::process::exit(if all_failed { 1 } else { 0 });
}
