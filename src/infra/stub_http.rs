use crate::app::ports::{HttpClientPort, HttpGetResult};
use async_trait::async_trait;
use std::sync::Mutex;

type Matcher = Box<dyn Fn(&str, &[(&str, String)]) -> bool + Send + Sync>;

struct CannedResponse {
    matcher: Matcher,
    status: u16,
    body: Vec<u8>,
}

/// A request seen by [`StubHttp`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory HTTP client for development/testing.
///
/// Responses are matched in registration order; the first matcher that
/// accepts the request wins. Unmatched requests get a 404 with an empty body.
#[derive(Default)]
pub struct StubHttp {
    responses: Vec<CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StubHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_when<F>(mut self, matcher: F, status: u16, body: impl Into<Vec<u8>>) -> Self
    where
        F: Fn(&str, &[(&str, String)]) -> bool + Send + Sync + 'static,
    {
        self.responses.push(CannedResponse {
            matcher: Box::new(matcher),
            status,
            body: body.into(),
        });
        self
    }

    /// Answer any request whose query carries `key=value`.
    pub fn respond_to_param(
        self,
        key: &'static str,
        value: &str,
        status: u16,
        body: &serde_json::Value,
    ) -> Self {
        let value = value.to_string();
        self.respond_when(
            move |_, query| query.iter().any(|(k, v)| *k == key && *v == value),
            status,
            body.to_string(),
        )
    }

    /// Answer any request to a URL starting with `prefix`.
    pub fn respond_to_url(self, prefix: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        let prefix = prefix.to_string();
        self.respond_when(move |url, _| url.starts_with(&prefix), status, body)
    }

    /// Answer every request not matched earlier.
    pub fn respond_to_all(self, status: u16, body: &serde_json::Value) -> Self {
        self.respond_when(|_, _| true, status, body.to_string())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpClientPort for StubHttp {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpGetResult, String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                url: url.to_string(),
                query: query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            });
        }

        let response = self.responses.iter().find(|r| (r.matcher)(url, query));
        Ok(match response {
            Some(r) => HttpGetResult {
                status: r.status,
                bytes: r.body.clone(),
                content_type: "application/json".to_string(),
            },
            None => HttpGetResult {
                status: 404,
                bytes: Vec::new(),
                content_type: "text/plain".to_string(),
            },
        })
    }
}
