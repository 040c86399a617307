//! Scripted transport shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Request, StatusCode, Url};
use serde_json::Value;

use crate::error::SourceError;
use crate::http::{ApiResponse, Transport};

type Handler = Box<dyn Fn(&RecordedRequest) -> (u16, Value) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    /// Last path segment, e.g. `RefreshToken`.
    pub fn endpoint(&self) -> &str {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers_named(AUTHORIZATION.as_str()).into_iter().next()
    }

    pub fn headers_named(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// Answers requests by endpoint name and records everything it sees.
///
/// Each `execute` yields once before answering so concurrent requests
/// interleave the way they would over a real connection.
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<String, Handler>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, endpoint: &str, status: u16, body: Value) {
        self.respond_with(endpoint, move |_| (status, body.clone()));
    }

    pub fn respond_with<F>(&self, endpoint: &str, handler: F)
    where
        F: Fn(&RecordedRequest) -> (u16, Value) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .insert(endpoint.to_string(), Box::new(handler));
    }

    /// Make requests to `endpoint` fail as if the connection dropped.
    pub fn fail(&self, endpoint: &str) {
        self.failing.lock().insert(endpoint.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, endpoint: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.endpoint() == endpoint)
            .cloned()
            .collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.requests_to(endpoint).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> Result<ApiResponse, SourceError> {
        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .unwrap_or(Value::Null);
        let recorded = RecordedRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect(),
            body,
        };
        self.requests.lock().push(recorded.clone());

        tokio::task::yield_now().await;

        if self.failing.lock().contains(recorded.endpoint()) {
            return Err(SourceError::Other("connection reset".to_string()));
        }

        let (status, body) = match self.handlers.lock().get(recorded.endpoint()) {
            Some(handler) => handler(&recorded),
            None => (404, Value::Null),
        };
        let status = StatusCode::from_u16(status).expect("valid status code");
        Ok(ApiResponse::new(status, recorded.url, body.to_string()))
    }
}
