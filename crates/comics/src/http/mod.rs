//! Request pipeline.
//!
//! Every API call goes through a [`Pipeline`]: an ordered list of
//! [`Middleware`] stages composed at client construction, ending in a
//! [`Transport`]. A stage may rewrite the request, forward it any number of
//! times through [`Next`], and rewrite the response.

mod rate_limit;
mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue, REFERER};
use reqwest::{Method, Request, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SourceError;

pub use rate_limit::HostRateLimit;
pub use transport::{ReqwestTransport, default_client};

/// Fully buffered response. API bodies are small JSON documents.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: Url,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url,
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SourceError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn error_for_status(self) -> Result<Self, SourceError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SourceError::UnexpectedStatus {
                status: self.status,
                url: self.url.to_string(),
            })
        }
    }
}

/// The last hop of a pipeline: actually sends the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<ApiResponse, SourceError>;
}

/// One pipeline stage.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<ApiResponse, SourceError>;
}

/// The remainder of the pipeline after the current stage. `Copy`, so a stage
/// can dispatch more than once (e.g. refresh then retry).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub async fn run(self, request: Request) -> Result<ApiResponse, SourceError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    transport: self.transport,
                    stages: rest,
                };
                stage.handle(request, next).await
            }
            None => self.transport.execute(request).await,
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl Pipeline {
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            transport,
            stages: Vec::new(),
        }
    }

    pub async fn execute(&self, request: Request) -> Result<ApiResponse, SourceError> {
        let next = Next {
            transport: self.transport.as_ref(),
            stages: &self.stages,
        };
        next.run(request).await
    }
}

pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    stages: Vec<Arc<dyn Middleware>>,
}

impl PipelineBuilder {
    /// Append a stage. Stages run in insertion order.
    pub fn stage(mut self, stage: Arc<dyn Middleware>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            transport: self.transport,
            stages: self.stages.into(),
        }
    }
}

/// Build a JSON `POST` with the given referer.
pub fn post_json<T: Serialize + ?Sized>(
    url: Url,
    referer: &str,
    body: &T,
) -> Result<Request, SourceError> {
    let mut request = Request::new(Method::POST, url);
    let headers = request.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    match HeaderValue::from_str(referer) {
        Ok(value) => {
            headers.insert(REFERER, value);
        }
        Err(e) => {
            tracing::debug!(error = %e, referer, "Invalid referer; skipping");
        }
    }
    *request.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(request)
}
