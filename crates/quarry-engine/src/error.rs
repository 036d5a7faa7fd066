use thiserror::Error;

/// Everything that can go wrong while driving a scrape to completion.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no url to fetch")]
    NoUrl,

    #[error("unsupported scheme '{scheme}' in url '{url}'")]
    InvalidUrlScheme { scheme: String, url: String },

    #[error("relative url '{0}' cannot be resolved before a page has been loaded")]
    RelativeUrlWithoutContext(String),

    #[error("invalid url '{url}': {source}")]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[error("no parsable html returned from '{0}'")]
    Parse(String),

    #[error("request to '{url}' failed with status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not find a link to follow with '{0}'")]
    NoFollowTarget(String),

    #[error("{0}")]
    PipelineMisuse(&'static str),

    #[error("could not deserialize scraped data: {0}")]
    Deserialize(#[from] serde_json::Error),
}
