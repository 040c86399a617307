use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, Request};
use rustls::ClientConfig;
use rustls::crypto::aws_lc_rs;
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use super::{ApiResponse, Transport};
use crate::config::SourceConfig;
use crate::error::SourceError;

/// Build the HTTP client used by [`ReqwestTransport`].
///
/// When a cookie jar is given it is shared with the client, so cookies set by
/// the site (and the host's sign-in flow) are visible to the session.
pub fn default_client(config: &SourceConfig, jar: Option<Arc<Jar>>) -> Result<Client, SourceError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.8,zh-CN;q=0.5"),
    );

    let provider = Arc::new(aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_platform_verifier()?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.timeout());

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    Ok(builder.build()?)
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<ApiResponse, SourceError> {
        let method = request.method().clone();
        let response = self.client.execute(request).await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().await?;

        debug!(%method, %url, %status, len = body.len(), "Received response");

        Ok(ApiResponse { status, url, body })
    }
}
