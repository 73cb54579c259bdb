use crate::types::*;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Characters left unescaped in the query: alphanumerics plus `_ . - ~ /`.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

pub const DEFAULT_RESULT_SIZE: usize = 10;
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("search key file {path} could not be read: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("search key file {path} is empty")]
    Empty { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to reach search endpoint: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search endpoint answered with status {status}")]
    Status { status: u16 },
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result of the network half of a query.
#[derive(Debug)]
pub enum SearchOutcome {
    Found(Vec<SearchResult>),
    Failed(SearchError),
}

impl SearchOutcome {
    /// Collapses a failure into an empty list, logging the reason.
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            SearchOutcome::Found(results) => results,
            SearchOutcome::Failed(e) => {
                warn!("Error when querying the search API: {}", e);
                Vec::new()
            }
        }
    }
}

/// Reads the API key: the first line of `path`, trimmed.
pub fn read_search_key(path: &Path) -> Result<String, CredentialError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Missing {
        path: path.to_path_buf(),
        source,
    })?;
    let key = contents.lines().next().unwrap_or("").trim();
    if key.is_empty() {
        return Err(CredentialError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}

/// Builds the filter URL. `size` is accepted for callers but is not sent.
pub fn build_search_url(endpoint: &str, key: &str, terms: &str, _size: usize) -> String {
    format!(
        "{}?token={}&format=json&sort=relevancy&q={}",
        endpoint,
        utf8_percent_encode(key, QUERY_ESCAPE),
        utf8_percent_encode(terms, QUERY_ESCAPE),
    )
}

/// Masks the `token` query value for logging.
fn redact_token(search_url: &str) -> String {
    match search_url.split_once("token=") {
        Some((head, rest)) => {
            let tail = rest.find('&').map(|i| &rest[i..]).unwrap_or("");
            format!("{}token=***{}", head, tail)
        }
        None => search_url.to_string(),
    }
}

/// Client for the remote web-content search API.
///
/// The key file is read again on every query and nothing is cached.
#[derive(Clone, Debug)]
pub struct SearchGateway {
    http_client: reqwest::Client,
    endpoint: String,
    key_path: PathBuf,
}

impl SearchGateway {
    pub fn new(http_client: reqwest::Client, endpoint: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            key_path: key_path.into(),
        }
    }

    /// Builds a client with an optional request timeout; `None` waits indefinitely.
    pub fn http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent("Rango/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub async fn run_query(&self, terms: &str, size: usize) -> Result<Vec<SearchResult>, CredentialError> {
        Ok(self.query(terms, size).await?.into_results())
    }

    /// Runs one query. Credential problems are returned as errors before any
    /// request is made; everything after that lands in the outcome.
    pub async fn query(&self, terms: &str, size: usize) -> Result<SearchOutcome, CredentialError> {
        let key = read_search_key(&self.key_path)?;
        info!("Searching for: {}", terms);

        let search_url = build_search_url(&self.endpoint, &key, terms, size);
        debug!("Search URL: {}", redact_token(&search_url));

        Ok(match self.fetch(&search_url).await {
            Ok(results) => {
                info!("Search API returned {} results", results.len());
                SearchOutcome::Found(results)
            }
            Err(e) => SearchOutcome::Failed(e),
        })
    }

    async fn fetch(&self, search_url: &str) -> Result<Vec<SearchResult>, SearchError> {
        let resp = self
            .http_client
            .get(search_url)
            .header("Accept", "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SearchError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await?;
        let parsed: WebhoseResponse = serde_json::from_str(&body)?;

        Ok(parsed.posts.into_iter().map(SearchResult::from).collect())
    }
}

impl From<WebhosePost> for SearchResult {
    fn from(post: WebhosePost) -> Self {
        Self {
            title: post.title,
            link: post.url,
            summary: post.text.chars().take(SUMMARY_CHARS).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn key_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn gateway(endpoint: String, key_path: &Path) -> SearchGateway {
        SearchGateway::new(reqwest::Client::new(), endpoint, key_path)
    }

    #[test]
    fn reads_first_line_trimmed() {
        let file = key_file("  abc123  \nsecond line\n");
        assert_eq!(read_search_key(file.path()).unwrap(), "abc123");
    }

    #[test]
    fn empty_key_file_is_rejected() {
        let file = key_file("\n");
        assert!(matches!(read_search_key(file.path()), Err(CredentialError::Empty { .. })));
    }

    #[test]
    fn url_encodes_terms_and_omits_size() {
        let url = build_search_url("http://webhose.io/filterWebContent", "k3y", "a b", 25);
        assert_eq!(
            url,
            "http://webhose.io/filterWebContent?token=k3y&format=json&sort=relevancy&q=a%20b"
        );
        assert!(!url.contains("size"));
        assert!(!url.contains("25"));
    }

    #[test]
    fn url_escapes_reserved_but_keeps_path_safe_chars() {
        let url = build_search_url("http://h/f", "k", "c++ & rust/tokio_~x.y-z", 10);
        assert!(url.ends_with("q=c%2B%2B%20%26%20rust/tokio_~x.y-z"));
    }

    #[test]
    fn logged_url_hides_encoded_token() {
        let url = build_search_url("http://webhose.io/filterWebContent", "ab+cd/ef=", "a b", 10);
        assert!(url.contains("token=ab%2Bcd/ef%3D&"));

        let logged = redact_token(&url);

        assert_eq!(
            logged,
            "http://webhose.io/filterWebContent?token=***&format=json&sort=relevancy&q=a%20b"
        );
        assert!(!logged.contains("ab%2Bcd"));
    }

    #[test]
    fn summary_is_first_200_chars() {
        let text: String = "é".repeat(500);
        let result = SearchResult::from(WebhosePost {
            title: "t".into(),
            url: "http://x".into(),
            text,
        });
        assert_eq!(result.summary.chars().count(), 200);
        assert!(result.summary.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(server.url(), &dir.path().join("search.key"));

        let err = gw.run_query("rust", DEFAULT_RESULT_SIZE).await.unwrap_err();

        assert!(matches!(err, CredentialError::Missing { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn maps_posts_into_results() {
        let mut server = mockito::Server::new_async().await;
        let long_text = "x".repeat(500);
        let body = serde_json::json!({
            "posts": [
                { "title": "Rust", "url": "https://rust-lang.org", "text": long_text },
                { "title": "Tokio", "url": "https://tokio.rs", "text": "async runtime" }
            ],
            "totalResults": 2
        });
        let mock = server
            .mock("GET", "/filterWebContent")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("token".into(), "secret".into()),
                mockito::Matcher::UrlEncoded("format".into(), "json".into()),
                mockito::Matcher::UrlEncoded("sort".into(), "relevancy".into()),
                mockito::Matcher::UrlEncoded("q".into(), "rust lang".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
        let file = key_file("secret\n");
        let gw = gateway(format!("{}/filterWebContent", server.url()), file.path());

        let results = gw.run_query("rust lang", 3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[0].link, "https://rust-lang.org");
        assert_eq!(results[0].summary, "x".repeat(200));
        assert_eq!(results[1].summary, "async runtime");
    }

    #[tokio::test]
    async fn malformed_json_yields_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("{ not json")
            .create_async()
            .await;
        let file = key_file("secret");
        let gw = gateway(server.url(), file.path());

        let outcome = gw.query("rust", DEFAULT_RESULT_SIZE).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Failed(SearchError::Decode(_))));

        let results = gw.run_query("rust", DEFAULT_RESULT_SIZE).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn missing_posts_field_yields_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"totalResults": 0}"#)
            .create_async()
            .await;
        let file = key_file("secret");
        let gw = gateway(server.url(), file.path());

        assert!(gw.run_query("rust", DEFAULT_RESULT_SIZE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_error_is_reported_as_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let file = key_file("secret");
        let gw = gateway(server.url(), file.path());

        let outcome = gw.query("rust", DEFAULT_RESULT_SIZE).await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Failed(SearchError::Status { status: 503 })));
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_empty_list() {
        let file = key_file("secret");
        let gw = gateway("http://127.0.0.1:9/filterWebContent".to_string(), file.path());

        assert!(gw.run_query("rust", DEFAULT_RESULT_SIZE).await.unwrap().is_empty());
    }
}
