//! The fluent scraping pipeline and the final result aggregator.

use std::collections::HashSet;
use std::time::Instant;

use ego_tree::NodeId;
use futures::future::join_all;
use quarry_core::{SelectorSpec, parse};
use scraper::Html;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::dom;
use crate::error::ScrapeError;
use crate::extract;
use crate::http::{DEFAULT_USER_AGENT, HttpClient, ensure_scheme};
use crate::lineage::{DataId, Lineage, ResultId};

const MISUSE_BEFORE_GET: &str = "a scrape must start with a call to get()";
const MISUSE_CONSUMED: &str = "the pipeline was already consumed by done()";

/// Settings applied when the scraper builds its own HTTP client.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> ScraperConfig {
        ScraperConfig {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A queued pipeline stage. Stages run strictly in the order given.
enum Op {
    Filter(String),
    Select(SelectorSpec),
    Follow(String),
}

enum State {
    /// No `get()` yet.
    Unstarted,
    /// Stages queued, waiting for `done()`.
    Pending {
        url: String,
        query: Vec<(String, String)>,
        ops: Vec<Op>,
    },
    /// An op was called out of order; surfaced when `done()` runs.
    Invalid(&'static str),
    /// `done()` already ran.
    Consumed,
}

/// Declarative scraper over a lineage of results.
///
/// ```no_run
/// # async fn demo() -> Result<(), quarry_engine::ScrapeError> {
/// let mut scraper = quarry_engine::Scraper::new()?;
/// let links = scraper
///     .get("example.com/news")
///     .filter(".stories li")
///     .select(("a", "href"))
///     .done()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Scraper {
    client: HttpClient,
    state: State,
}

/// Build a scraper with default configuration, primed with a url.
pub fn scrape(url: &str) -> Result<Scraper, ScrapeError> {
    let mut scraper = Scraper::new()?;
    scraper.get(url);
    Ok(scraper)
}

impl Scraper {
    pub fn new() -> Result<Scraper, ScrapeError> {
        Scraper::with_config(&ScraperConfig::default())
    }

    pub fn with_config(config: &ScraperConfig) -> Result<Scraper, ScrapeError> {
        Ok(Scraper::with_client(HttpClient::new(&config.user_agent)?))
    }

    /// Use a caller-supplied client, e.g. one with a custom transport.
    pub fn with_client(client: HttpClient) -> Scraper {
        Scraper {
            client,
            state: State::Unstarted,
        }
    }

    /// Start (or restart) a pipeline at a url. Always legal; any stages
    /// queued so far are discarded.
    pub fn get(&mut self, url: impl Into<String>) -> &mut Scraper {
        self.state = State::Pending {
            url: url.into(),
            query: Vec::new(),
            ops: Vec::new(),
        };
        self
    }

    /// Like [`get`](Scraper::get), with query parameters appended to
    /// the url.
    pub fn get_with_query(
        &mut self,
        url: impl Into<String>,
        query: &[(&str, &str)],
    ) -> &mut Scraper {
        self.state = State::Pending {
            url: url.into(),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            ops: Vec::new(),
        };
        self
    }

    /// Narrow the current results to the elements a selector matches.
    pub fn filter(&mut self, selector: &str) -> &mut Scraper {
        self.push(Op::Filter(selector.to_string()))
    }

    /// Extract data from each current result.
    pub fn select(&mut self, spec: impl Into<SelectorSpec>) -> &mut Scraper {
        self.push(Op::Select(spec.into()))
    }

    /// Load the page each result links to and continue there.
    pub fn follow(&mut self, selector: &str) -> &mut Scraper {
        self.push(Op::Follow(selector.to_string()))
    }

    fn push(&mut self, op: Op) -> &mut Scraper {
        match &mut self.state {
            State::Pending { ops, .. } => ops.push(op),
            State::Unstarted => self.state = State::Invalid(MISUSE_BEFORE_GET),
            State::Consumed => self.state = State::Invalid(MISUSE_CONSUMED),
            State::Invalid(_) => {}
        }
        self
    }

    /// Run the queued stages and aggregate the extracted data. Consumes
    /// the pipeline; only a fresh `get()` may follow.
    pub async fn done(&mut self) -> Result<Vec<Value>, ScrapeError> {
        let state = std::mem::replace(&mut self.state, State::Consumed);
        let (url, query, ops) = match state {
            State::Pending { url, query, ops } => (url, query, ops),
            State::Unstarted => return Err(ScrapeError::PipelineMisuse(MISUSE_BEFORE_GET)),
            State::Invalid(message) => return Err(ScrapeError::PipelineMisuse(message)),
            State::Consumed => return Err(ScrapeError::PipelineMisuse(MISUSE_CONSUMED)),
        };

        let client = self.client.clone();
        let mut lineage = Lineage::new();

        let url = ensure_scheme(&url);
        let (document, final_url) = load_page(&client, Some(&url), &query, None).await?;
        let doc = lineage.add_document(document);
        let root = lineage.add_root(doc, &final_url, None);
        let mut current = vec![root];

        for op in ops {
            current = match op {
                Op::Filter(selector) => apply_filter(&mut lineage, &current, &selector),
                Op::Select(spec) => {
                    for &id in &current {
                        extract::apply_select(&mut lineage, id, &spec);
                    }
                    current
                }
                Op::Follow(selector) => {
                    apply_follow(&client, &mut lineage, &current, &selector).await?
                }
            };
        }

        Ok(aggregate(&lineage, &current))
    }

    /// [`done`](Scraper::done), deserializing each result.
    pub async fn done_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>, ScrapeError> {
        self.done()
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(ScrapeError::from))
            .collect()
    }
}

/// Resolve a link, absolute or relative to the page it was found on.
fn resolve_url(url: Option<&str>, base: Option<&str>) -> Result<Url, ScrapeError> {
    let url = url.unwrap_or("").trim();
    if url.is_empty() {
        return Err(ScrapeError::NoUrl);
    }
    match Url::parse(url) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ScrapeError::InvalidUrlScheme {
                scheme: scheme.to_string(),
                url: url.to_string(),
            }),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => {
                let base_url = Url::parse(base).map_err(|source| ScrapeError::Url {
                    url: base.to_string(),
                    source,
                })?;
                base_url.join(url).map_err(|source| ScrapeError::Url {
                    url: url.to_string(),
                    source,
                })
            }
            None => Err(ScrapeError::RelativeUrlWithoutContext(url.to_string())),
        },
        Err(source) => Err(ScrapeError::Url {
            url: url.to_string(),
            source,
        }),
    }
}

/// Fetch and parse one page, returning the document and the url it was
/// finally served from.
async fn load_page(
    client: &HttpClient,
    url: Option<&str>,
    query: &[(String, String)],
    base: Option<&str>,
) -> Result<(Html, String), ScrapeError> {
    let mut target = resolve_url(url, base)?;
    if !query.is_empty() {
        target
            .query_pairs_mut()
            .extend_pairs(query.iter().map(|(key, value)| (key.as_str(), value.as_str())));
    }
    let (final_url, body) = client.get(&target).await?;
    let document = dom::parse_document(final_url.as_str(), &body)?;
    Ok((document, final_url.to_string()))
}

fn apply_filter(lineage: &mut Lineage, current: &[ResultId], selector: &str) -> Vec<ResultId> {
    let parsed = parse(selector);
    let mut next = Vec::new();
    for &id in current {
        let nodes: Vec<NodeId> = {
            let Some(element) = lineage.element(id) else {
                continue;
            };
            let mut matches = dom::query(element, &parsed.base);
            if let Some(nth) = &parsed.nth {
                matches = nth
                    .keep_indices(matches.len())
                    .into_iter()
                    .map(|index| matches[index])
                    .collect();
            }
            matches.into_iter().map(|element| element.id()).collect()
        };
        for node in nodes {
            next.push(lineage.add_child(id, node));
        }
    }
    next
}

/// Collect one link per matched element, load them all concurrently,
/// and root each loaded page under the result its link came from. A
/// branch that fails to load is logged and dropped; zero candidate
/// elements across all results is an error.
async fn apply_follow(
    client: &HttpClient,
    lineage: &mut Lineage,
    current: &[ResultId],
    selector: &str,
) -> Result<Vec<ResultId>, ScrapeError> {
    let parsed = parse(selector);
    let mut candidates: Vec<(ResultId, Option<String>, String)> = Vec::new();
    for &id in current {
        let Some(element) = lineage.element(id) else {
            continue;
        };
        let mut matches = dom::query(element, &parsed.base);
        if let Some(nth) = &parsed.nth {
            matches = nth
                .keep_indices(matches.len())
                .into_iter()
                .map(|index| matches[index])
                .collect();
        }
        let base = lineage.result(id).url.clone();
        for element in matches {
            let link = match &parsed.attr {
                Some(filter) => dom::apply_attr_filter(element, filter),
                None => dom::attribute(element, "href"),
            };
            candidates.push((id, link, base.clone()));
        }
    }

    if candidates.is_empty() {
        return Err(ScrapeError::NoFollowTarget(selector.to_string()));
    }

    let count = candidates.len();
    let started = Instant::now();
    let loads = candidates.into_iter().map(|(parent, link, base)| async move {
        let page = load_page(client, link.as_deref(), &[], Some(&base)).await;
        (parent, page)
    });
    let pages = join_all(loads).await;
    info!(count, elapsed = ?started.elapsed(), "loaded follow targets");

    let mut next = Vec::new();
    for (parent, page) in pages {
        match page {
            Ok((document, final_url)) => {
                let doc = lineage.add_document(document);
                next.push(lineage.add_root(doc, &final_url, Some(parent)));
            }
            Err(err) => warn!(error = %err, "dropping follow branch"),
        }
    }
    Ok(next)
}

/// Gather the data the surviving results point at. Attachments shared
/// by several results are emitted once; arrays are flattened; nulls and
/// empty strings are skipped. A lone result that never grew a lineage
/// falls back to the page markup itself.
fn aggregate(lineage: &Lineage, current: &[ResultId]) -> Vec<Value> {
    let mut out = Vec::new();
    let mut seen: HashSet<DataId> = HashSet::new();
    for &id in current {
        match lineage.current_data_id(id) {
            Some(data_id) => {
                if seen.insert(data_id) {
                    flatten_into(lineage.data(data_id).clone(), &mut out);
                }
            }
            None => {
                if lineage.result(id).parent.is_none() && current.len() == 1 {
                    out.push(Value::String(lineage.document_markup(id)));
                }
            }
        }
    }
    out
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Null => {}
        Value::String(text) if text.is_empty() => {}
        other => out.push(other),
    }
}
