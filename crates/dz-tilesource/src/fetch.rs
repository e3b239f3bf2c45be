//! Fetching JSON documents behind URI references.

use std::cell::RefCell;
use std::time::Duration;

use dz_core::ResolutionError;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Source of JSON documents for URI references.
pub trait JsonFetcher {
    /// Fetch and parse the document at `uri`, giving up after `timeout`.
    fn fetch_json(&self, uri: &str, timeout: Duration) -> Result<Value, ResolutionError>;
}

impl<T: JsonFetcher + ?Sized> JsonFetcher for &T {
    fn fetch_json(&self, uri: &str, timeout: Duration) -> Result<Value, ResolutionError> {
        (**self).fetch_json(uri, timeout)
    }
}

/// Fetcher for `file:` URIs and, with the `http` feature, `http(s)` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFetcher;

impl JsonFetcher for StdFetcher {
    fn fetch_json(&self, uri: &str, timeout: Duration) -> Result<Value, ResolutionError> {
        let parsed = Url::parse(uri).map_err(|err| fetch_error(uri, err))?;
        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| fetch_error(uri, "not a local file path"))?;
                debug!("Reading {}", path.display());
                let text = std::fs::read_to_string(&path).map_err(|err| fetch_error(uri, err))?;
                serde_json::from_str(&text).map_err(|err| fetch_error(uri, err))
            }
            "http" | "https" => fetch_http(uri, timeout),
            other => Err(fetch_error(uri, format!("unsupported scheme '{other}'"))),
        }
    }
}

#[cfg(feature = "http")]
fn fetch_http(uri: &str, timeout: Duration) -> Result<Value, ResolutionError> {
    debug!("GET {uri} (timeout {}s)", timeout.as_secs());
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();
    let mut response = agent.get(uri).call().map_err(|err| match err {
        ureq::Error::Timeout(_) => ResolutionError::Timeout {
            uri: uri.to_string(),
            timeout_secs: timeout.as_secs(),
        },
        other => fetch_error(uri, other),
    })?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| fetch_error(uri, err))?;
    serde_json::from_str(&body).map_err(|err| fetch_error(uri, err))
}

#[cfg(not(feature = "http"))]
fn fetch_http(uri: &str, _timeout: Duration) -> Result<Value, ResolutionError> {
    Err(fetch_error(
        uri,
        "http support is not enabled (build with the `http` feature)",
    ))
}

fn fetch_error(uri: &str, err: impl ToString) -> ResolutionError {
    ResolutionError::Fetch {
        uri: uri.to_string(),
        message: err.to_string(),
    }
}

/// Serves documents from memory and records every request.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: FxHashMap<String, Value>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.documents.insert(uri.into(), document);
        self
    }

    /// URIs requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl JsonFetcher for MemoryFetcher {
    fn fetch_json(&self, uri: &str, _timeout: Duration) -> Result<Value, ResolutionError> {
        self.requests.borrow_mut().push(uri.to_string());
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| fetch_error(uri, "404 Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use serde_json::json;
    use url::Url;

    use super::{JsonFetcher, MemoryFetcher, StdFetcher};

    #[test]
    fn std_fetcher_reads_file_uris() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("create temp file");
        write!(file, r#"{{"width": 10, "height": 20}}"#).expect("write temp file");
        let uri = Url::from_file_path(file.path())
            .expect("absolute temp path")
            .to_string();

        let value = StdFetcher
            .fetch_json(&uri, Duration::from_secs(1))
            .expect("file fetch succeeds");
        assert_eq!(value, json!({"width": 10, "height": 20}));
    }

    #[test]
    fn std_fetcher_reports_missing_files() {
        let result = StdFetcher.fetch_json(
            "file:///definitely/not/here/info.json",
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn memory_fetcher_records_requests() {
        let fetcher = MemoryFetcher::new().with_document("https://a/info.json", json!({}));
        assert!(fetcher.fetch_json("https://a/info.json", Duration::ZERO).is_ok());
        assert!(fetcher.fetch_json("https://b/info.json", Duration::ZERO).is_err());
        assert_eq!(
            fetcher.requests(),
            vec!["https://a/info.json", "https://b/info.json"]
        );
    }
}
