//! Directory-listing discovery for repositories without a browsable tree.
//!
//! Some source repositories publish their file index as a nested-bullet
//! Markdown document (`DIRECTORY.md`) instead of being cloned and walked. This
//! crate fetches such listings and the raw files they link to, and parses the
//! listing into categorized entries.

mod parser;

use std::time::Duration;

use algocatalog_shared::{CatalogError, Result};
use reqwest::Client;
use tracing::{debug, instrument};

pub use parser::{ListingEntry, ListingParsed, parse_listing};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// User-Agent string for all outgoing requests.
const USER_AGENT: &str = concat!("algocatalog/", env!("CARGO_PKG_VERSION"));

/// Host serving rendered file pages, rewritten to the raw-content host.
const BROWSE_HOST: &str = "github.com";
const RAW_HOST: &str = "raw.githubusercontent.com";

/// Build a reqwest client with the shared settings.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch a URL as text. Non-success statuses and oversized bodies are errors.
#[instrument(skip(client))]
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(CatalogError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| CatalogError::Network(format!("{url}: failed to read body: {e}")))?;

    debug!(bytes = body.len(), "fetched");
    Ok(body)
}

/// Fetch a directory listing document.
///
/// A listing without a single bullet line is rejected so that an error page
/// served with a 200 status is not mistaken for an empty repository.
pub async fn fetch_listing(client: &Client, url: &str) -> Result<String> {
    let body = fetch_text(client, url).await?;

    let has_bullet = body
        .lines()
        .any(|l| matches!(l.trim_start().chars().next(), Some('*' | '-')));
    if !has_bullet {
        return Err(CatalogError::parse(format!(
            "{url}: document contains no listing bullets"
        )));
    }

    Ok(body)
}

/// Rewrite a browse URL (`https://github.com/o/r/blob/b/p`) to its raw-content URL.
///
/// URLs on other hosts are returned unchanged.
pub fn raw_url(blob_url: &str) -> String {
    let browse_prefix = format!("https://{BROWSE_HOST}/");
    match blob_url.strip_prefix(&browse_prefix) {
        Some(rest) => format!("https://{RAW_HOST}/{}", rest.replacen("/blob/", "/", 1)),
        None => blob_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_url_rewrites_github_blob() {
        assert_eq!(
            raw_url("https://github.com/TheAlgorithms/C-Sharp/blob/master/Algorithms/Foo.cs"),
            "https://raw.githubusercontent.com/TheAlgorithms/C-Sharp/master/Algorithms/Foo.cs"
        );
    }

    #[test]
    fn test_raw_url_leaves_other_hosts() {
        assert_eq!(raw_url("http://127.0.0.1:9/a/Foo.cs"), "http://127.0.0.1:9/a/Foo.cs");
    }

    #[tokio::test]
    async fn test_fetch_listing_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let listing = std::fs::read_to_string("../../../fixtures/listing/DIRECTORY.md")
            .expect("read listing fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/DIRECTORY.md"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(&listing))
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let body = fetch_listing(&client, &format!("{}/DIRECTORY.md", server.uri()))
            .await
            .unwrap();

        let parsed = parse_listing(&body);
        assert_eq!(parsed.entries.len(), 6);
    }

    #[tokio::test]
    async fn test_fetch_listing_not_found() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/DIRECTORY.md"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let err = fetch_listing(&client, &format!("{}/DIRECTORY.md", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_listing_rejects_non_listing() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/DIRECTORY.md"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
            )
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let result = fetch_listing(&client, &format!("{}/DIRECTORY.md", server.uri())).await;
        assert!(matches!(result, Err(CatalogError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_fetch_text_returns_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/Foo.cs"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("class Foo {}"))
            .mount(&server)
            .await;

        let client = build_client(5).unwrap();
        let body = fetch_text(&client, &format!("{}/Foo.cs", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "class Foo {}");
    }
}
