//! Request specification type

use serde::{Deserialize, Serialize};
use url::Url;

use super::{Headers, HttpMethod, RequestBody};
use crate::error::{DomainError, DomainResult};

/// Complete specification for an HTTP request.
///
/// `url` is either absolute (presigned storage URLs) or a path that is
/// resolved against the API base URL when the request is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL or API path
    pub url: String,
    /// Query parameters appended in order
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// HTTP headers
    #[serde(default)]
    pub headers: Headers,
    /// Request body
    #[serde(default)]
    pub body: RequestBody,
}

impl RequestSpec {
    /// Creates a request with no headers, query or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Headers::new(),
            body: RequestBody::None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Creates a POST request with an empty body.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Creates a POST request carrying `payload` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBody`] if the payload cannot be serialized.
    pub fn post_json<T: Serialize>(url: impl Into<String>, payload: &T) -> DomainResult<Self> {
        let value =
            serde_json::to_value(payload).map_err(|e| DomainError::InvalidBody(e.to_string()))?;
        Ok(Self::post(url).with_body(RequestBody::Json(value)))
    }

    /// Creates a PUT request carrying raw bytes.
    #[must_use]
    pub fn put_bytes(url: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        let content_type = content_type.into();
        let mut spec = Self::new(HttpMethod::Put, url);
        spec.headers.set("Content-Type", content_type.clone());
        spec.body = RequestBody::Bytes { content_type, data };
        spec
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets `Authorization: Bearer <token>`, replacing any previous value.
    pub fn set_bearer(&mut self, token: &str) {
        self.headers.set("Authorization", format!("Bearer {token}"));
    }

    /// Returns the bearer token currently attached, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get("Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Returns true if the request URL refers to `endpoint`.
    ///
    /// Matching is substring based so that absolute and relative forms of
    /// the same endpoint are treated alike.
    #[must_use]
    pub fn targets(&self, endpoint: &str) -> bool {
        self.url.contains(endpoint)
    }

    /// Resolves the request URL against `base` and appends the query.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] if the URL cannot be parsed or joined.
    pub fn resolve_url(&self, base: &Url) -> DomainResult<Url> {
        let mut url = match Url::parse(&self.url) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => base
                .join(&self.url)
                .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.url)))?,
            Err(e) => return Err(DomainError::InvalidUrl(format!("{e}: {}", self.url))),
        };

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_relative_url_with_query() {
        let base = Url::parse("https://gallery.example.com").unwrap();
        let spec = RequestSpec::get("/api/image/presigned-url")
            .with_query("filename", "cat photo.png")
            .with_query("filetype", "image/png");

        let url = spec.resolve_url(&base).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gallery.example.com/api/image/presigned-url?filename=cat+photo.png&filetype=image%2Fpng"
        );
    }

    #[test]
    fn test_resolve_absolute_url_ignores_base() {
        let base = Url::parse("https://gallery.example.com").unwrap();
        let spec = RequestSpec::get("https://bucket.s3.example.com/a.png?X-Sig=abc");

        let url = spec.resolve_url(&base).unwrap();
        assert_eq!(url.host_str(), Some("bucket.s3.example.com"));
        assert_eq!(url.query(), Some("X-Sig=abc"));
    }

    #[test]
    fn test_bearer_round_trip() {
        let mut spec = RequestSpec::get("/api/forum");
        assert_eq!(spec.bearer(), None);
        spec.set_bearer("abc");
        spec.set_bearer("def");
        assert_eq!(spec.bearer(), Some("def"));
        assert_eq!(spec.headers.len(), 1);
    }

    #[test]
    fn test_put_bytes_sets_content_type() {
        let spec = RequestSpec::put_bytes("https://s3/x", "image/jpeg", vec![0xff]);
        assert_eq!(spec.method, HttpMethod::Put);
        assert_eq!(spec.headers.get("content-type"), Some("image/jpeg"));
        assert_eq!(spec.body.content_type(), Some("image/jpeg"));
    }

    #[test]
    fn test_targets_matches_absolute_and_relative() {
        assert!(RequestSpec::post("/api/login/jwt").targets("/api/login/jwt"));
        assert!(RequestSpec::post("https://x.example.com/api/logout").targets("/api/logout"));
        assert!(!RequestSpec::get("/api/forum").targets("/api/logout"));
    }
}
