//! Command-line front end: replay `-f`/`-s`/`-l` flags, in the order
//! they were given, as pipeline stages.

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use quarry_engine::{Scraper, ScraperConfig, SelectorSpec};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    about = "Scrape structured data out of web pages with CSS selectors"
)]
struct Args {
    /// Url to scrape
    url: String,

    /// Narrow the results to the elements matching a selector
    #[arg(short, long, value_name = "SELECTOR")]
    filter: Vec<String>,

    /// Extract data: a selector, or a JSON object of named selectors
    #[arg(short, long, value_name = "SPEC")]
    select: Vec<String>,

    /// Follow the link each result's selector matches
    #[arg(short = 'l', long = "followlink", value_name = "SELECTOR")]
    follow: Vec<String>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

enum CliOp {
    Filter(String),
    Select(SelectorSpec),
    Follow(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches)?;

    let default_filter = if args.verbose {
        "quarry=info,quarry_engine=info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!(url = %args.url, "scraping");

    let mut scraper = Scraper::with_config(&ScraperConfig::default())?;
    scraper.get(args.url.as_str());
    for op in collect_ops(&matches) {
        match op {
            CliOp::Filter(selector) => scraper.filter(&selector),
            CliOp::Select(spec) => scraper.select(spec),
            CliOp::Follow(selector) => scraper.follow(&selector),
        };
    }

    let mut results = scraper.done().await?;
    let output = if results.len() == 1 {
        results.remove(0)
    } else {
        Value::Array(results)
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Interleave the three repeatable flags back into command-line order.
fn collect_ops(matches: &ArgMatches) -> Vec<CliOp> {
    let mut ops: Vec<(usize, CliOp)> = Vec::new();
    push_ops(matches, "filter", &mut ops, |value| {
        CliOp::Filter(value.to_string())
    });
    push_ops(matches, "select", &mut ops, |value| {
        CliOp::Select(parse_select(value))
    });
    push_ops(matches, "follow", &mut ops, |value| {
        CliOp::Follow(value.to_string())
    });
    ops.sort_by_key(|(index, _)| *index);
    ops.into_iter().map(|(_, op)| op).collect()
}

fn push_ops(
    matches: &ArgMatches,
    id: &str,
    ops: &mut Vec<(usize, CliOp)>,
    build: impl Fn(&str) -> CliOp,
) {
    let (Some(indices), Some(values)) = (
        matches.indices_of(id),
        matches.get_many::<String>(id),
    ) else {
        return;
    };
    for (index, value) in indices.zip(values) {
        ops.push((index, build(value)));
    }
}

/// `-s` accepts either JSON or a bare selector string.
fn parse_select(text: &str) -> SelectorSpec {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            SelectorSpec::from_json(&value).unwrap_or_else(|| SelectorSpec::Text(text.to_string()))
        }
        Err(_) => SelectorSpec::Text(text.to_string()),
    }
}
