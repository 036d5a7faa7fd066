//! Shared mock transport and page fixtures for the engine tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarry_engine::{HttpClient, ScrapeError, Scraper, Transport, TransportResponse};
use url::Url;

pub struct MockTransport {
    pages: HashMap<String, TransportResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> MockTransport {
        MockTransport {
            pages: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, url: &str, body: &str) -> MockTransport {
        self.pages.insert(
            normalize(url),
            TransportResponse {
                status: 200,
                headers: Vec::new(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16, headers: &[(&str, &str)]) -> MockTransport {
        self.pages.insert(
            normalize(url),
            TransportResponse {
                status,
                headers: headers
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
                body: String::new(),
            },
        );
        self
    }

    pub fn into_scraper(self) -> (Scraper, Arc<MockTransport>) {
        let transport = Arc::new(self);
        let scraper = Scraper::with_client(HttpClient::with_transport(transport.clone()));
        (scraper, transport)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).unwrap().to_string()
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &Url) -> Result<TransportResponse, ScrapeError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(response) => Ok(response.clone()),
            None => Ok(TransportResponse {
                status: 404,
                headers: Vec::new(),
                body: String::new(),
            }),
        }
    }
}

pub const LISTING_URL: &str = "http://test.io/";

/// An entry list: four definition lists, the first outside `.results`.
/// The first entry links to a page nobody serves.
pub fn listing_page() -> String {
    format!(
        r#"<!DOCTYPE html><html><body>
        {first}
        <div class="results">
          {second}
          {third}
          {fourth}
        </div>
        </body></html>"#,
        first = entry(1, "http://missing.io/gone"),
        second = entry(2, "/details/2"),
        third = entry(3, "http://test.io/details/3"),
        fourth = entry(4, "/details/4"),
    )
}

fn entry(n: usize, href: &str) -> String {
    format!(
        r#"<dl>
          <dt><a href="{href}"><b>Entry:</b> Item {n}</a></dt>
          <dd>
            <span class="info" title="C{n} Title" testAttr="attr{n}">D{n}</span>
            <span class="note">N{n}</span>
          </dd>
        </dl>"#
    )
}

pub fn details_page(n: usize) -> String {
    format!(
        r#"<html><body>
        <div class="details">
          <h1>Details {n}</h1>
          <dl>
            <dt>Spec A{n}</dt>
            <dt>Spec B{n}</dt>
          </dl>
        </div>
        </body></html>"#
    )
}

/// The listing plus every details page it links to inside `.results`.
pub fn site() -> MockTransport {
    MockTransport::new()
        .page(LISTING_URL, &listing_page())
        .page("http://test.io/details/2", &details_page(2))
        .page("http://test.io/details/3", &details_page(3))
        .page("http://test.io/details/4", &details_page(4))
}
