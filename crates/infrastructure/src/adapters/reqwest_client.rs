//! HTTP Client implementation using reqwest.
//!
//! This adapter implements the `HttpClient` port using the reqwest library.
//! Relative request URLs are resolved against the API base URL; absolute
//! ones (presigned storage URLs) are sent as given.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use galleria_application::ports::{HttpClient, HttpClientError};
use galleria_domain::{HttpMethod, RequestBody, RequestSpec, ResponseSpec};
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

/// HTTP client implementation using reqwest.
///
/// The underlying client keeps a cookie store so the refresh cookie set at
/// login is sent back on `/api/refresh-token`.
pub struct ReqwestHttpClient {
    client: Client,
    base: Url,
}

impl ReqwestHttpClient {
    /// Creates a client for the API at `base`.
    ///
    /// Default configuration:
    /// - Cookie store: enabled
    /// - Follow redirects: up to 10
    /// - User-Agent: "Galleria/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(base: Url) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .user_agent(concat!("Galleria/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpClientError::Other(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// Creates a client around an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Attaches the domain body to the builder.
    fn build_body(builder: reqwest::RequestBuilder, body: &RequestBody) -> reqwest::RequestBuilder {
        match body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes { data, .. } => builder.body(data.clone()),
        }
    }

    /// Maps reqwest errors to `HttpClientError`.
    fn map_error(error: &reqwest::Error) -> HttpClientError {
        if error.is_timeout() {
            return HttpClientError::Timeout;
        }
        if error.is_connect() {
            return HttpClientError::ConnectionFailed(error.to_string());
        }
        HttpClientError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: RequestSpec) -> Result<ResponseSpec, HttpClientError> {
        let url = request
            .resolve_url(&self.base)
            .map_err(|e| HttpClientError::InvalidUrl(e.to_string()))?;
        let start = Instant::now();

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url.clone());

        for header in request.headers.iter() {
            builder = builder.header(&header.name, &header.value);
        }
        if let Some(content_type) = request.body.content_type() {
            if request.headers.get("Content-Type").is_none() {
                builder = builder.header("Content-Type", content_type);
            }
        }
        builder = Self::build_body(builder, &request.body);

        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::Other(format!("Failed to read body: {e}")))?
            .to_vec();

        debug!(
            method = %request.method,
            url = %url.path(),
            status,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "HTTP request completed"
        );
        Ok(ResponseSpec::new(status, headers, body))
    }
}
