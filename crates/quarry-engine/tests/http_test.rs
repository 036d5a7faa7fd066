mod common;

use common::MockTransport;
use quarry_engine::ScrapeError;

const PAGE: &str = "<p>landed</p>";

#[tokio::test]
async fn bare_hosts_are_fetched_over_http() {
    let (mut scraper, transport) = MockTransport::new()
        .page("http://test.io/", PAGE)
        .into_scraper();
    let results = scraper.get("test.io").done().await.unwrap();
    assert_eq!(transport.requests(), vec!["http://test.io/".to_string()]);
    assert!(results[0].as_str().unwrap().contains("landed"));
}

#[tokio::test]
async fn query_parameters_are_appended() {
    let (mut scraper, transport) = MockTransport::new()
        .page("http://test.io/search?q=rust&page=2", PAGE)
        .into_scraper();
    scraper
        .get_with_query("test.io/search", &[("q", "rust"), ("page", "2")])
        .done()
        .await
        .unwrap();
    assert_eq!(
        transport.requests(),
        vec!["http://test.io/search?q=rust&page=2".to_string()]
    );
}

#[tokio::test]
async fn absolute_redirects_are_followed() {
    let (mut scraper, transport) = MockTransport::new()
        .status("http://test.io/", 301, &[("Location", "http://test.io/new")])
        .page("http://test.io/new", PAGE)
        .into_scraper();
    scraper.get("test.io").done().await.unwrap();
    assert_eq!(
        transport.requests(),
        vec![
            "http://test.io/".to_string(),
            "http://test.io/new".to_string(),
        ]
    );
}

#[tokio::test]
async fn relative_redirects_resolve_against_the_current_url() {
    let (mut scraper, transport) = MockTransport::new()
        .status("http://test.io/old/page", 307, &[("Location", "/moved")])
        .page("http://test.io/moved", PAGE)
        .into_scraper();
    scraper.get("test.io/old/page").done().await.unwrap();
    assert_eq!(
        transport.requests()[1],
        "http://test.io/moved".to_string()
    );
}

#[tokio::test]
async fn redirect_chains_are_followed_hop_by_hop() {
    let (mut scraper, transport) = MockTransport::new()
        .status("http://test.io/", 300, &[("Location", "/a")])
        .status("http://test.io/a", 410, &[("Location", "/b")])
        .page("http://test.io/b", PAGE)
        .into_scraper();
    scraper.get("test.io").done().await.unwrap();
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn a_redirect_to_itself_is_an_error() {
    let (mut scraper, _) = MockTransport::new()
        .status("http://test.io/", 301, &[("Location", "http://test.io/")])
        .into_scraper();
    let err = scraper.get("test.io").done().await.unwrap_err();
    assert!(matches!(
        err,
        ScrapeError::HttpStatus { status: 301, .. }
    ));
}

#[tokio::test]
async fn a_redirect_without_a_location_is_an_error() {
    let (mut scraper, _) = MockTransport::new()
        .status("http://test.io/", 301, &[])
        .into_scraper();
    let err = scraper.get("test.io").done().await.unwrap_err();
    assert!(matches!(err, ScrapeError::HttpStatus { status: 301, .. }));
}

#[tokio::test]
async fn other_error_statuses_fail_the_scrape() {
    let (mut scraper, _) = MockTransport::new().into_scraper();
    let err = scraper.get("test.io").done().await.unwrap_err();
    assert!(matches!(err, ScrapeError::HttpStatus { status: 404, .. }));

    let (mut scraper, _) = MockTransport::new()
        .status("http://test.io/", 500, &[])
        .into_scraper();
    let err = scraper.get("test.io").done().await.unwrap_err();
    assert!(matches!(err, ScrapeError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn followed_pages_use_the_post_redirect_url_as_base() {
    let listing = r#"<dl><dt><a href="/details">More</a></dt></dl>"#;
    let (mut scraper, transport) = MockTransport::new()
        .status("http://test.io/", 301, &[("Location", "http://other.io/list")])
        .page("http://other.io/list", listing)
        .page("http://other.io/details", "<h1>There</h1>")
        .into_scraper();
    let results = scraper
        .get("test.io")
        .follow("dt a")
        .select("h1")
        .done()
        .await
        .unwrap();
    assert_eq!(results, vec![serde_json::json!("There")]);
    assert!(
        transport
            .requests()
            .contains(&"http://other.io/details".to_string())
    );
}
