pub mod dom;
pub mod error;
pub mod extract;
pub mod http;
pub mod lineage;
pub mod pipeline;

pub use error::ScrapeError;
pub use http::{HttpClient, Transport, TransportResponse};
pub use pipeline::{Scraper, ScraperConfig, scrape};
pub use quarry_core::SelectorSpec;
