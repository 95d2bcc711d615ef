//! Reqwest-backed request descriptors.
//!
//! [`ServiceClient`] builds [`JsonRequest`]s and [`BinaryRequest`]s against a
//! configured REST endpoint. Both resend throttled requests (HTTP 429 or 503
//! with a `Retry-After` header) and report each wait through the
//! [`RetrySignal`] before sleeping.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::node::ResponseValue;
use crate::request::{ExecuteFuture, RequestDescriptor, RetrySignal};

/// Longest response body quoted in a service error.
const MAX_ERROR_BODY: usize = 200;

/// Entry point for building requests against one service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    config: Arc<ServiceConfig>,
}

impl ServiceClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::InvalidRequest {
            detail: format!("failed to create http client: {e}"),
        })?;
        Ok(Self::with_http(http, config))
    }

    /// Create a client that shares an existing HTTP client.
    #[must_use]
    pub fn with_http(http: reqwest::Client, config: ServiceConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// A request whose response body is JSON.
    #[must_use]
    pub fn json(&self, path: impl Into<String>) -> JsonRequest {
        JsonRequest(self.endpoint(path.into()))
    }

    /// A request whose response body is returned as raw bytes.
    #[must_use]
    pub fn binary(&self, path: impl Into<String>) -> BinaryRequest {
        BinaryRequest(self.endpoint(path.into()))
    }

    fn endpoint(&self, path: String) -> Endpoint {
        Endpoint {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            path,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    config: Arc<ServiceConfig>,
    path: String,
    params: Vec<(String, String)>,
}

impl Endpoint {
    fn url(&self) -> Result<String> {
        let base = &self.config.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::InvalidRequest {
                detail: format!("base url must be http or https, got '{base}'"),
            });
        }

        let mut url = base.trim_end_matches('/').to_string();
        let path = self.path.trim_start_matches('/');
        if !path.is_empty() {
            url.push('/');
            url.push_str(path);
        }

        let key = self.config.api_key.as_deref().map(|key| ("key", key));
        let pairs = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(key);

        let mut separator = if url.contains('?') { '&' } else { '?' };
        for (k, v) in pairs {
            url.push(separator);
            url.push_str(&urlencoding::encode(k));
            url.push('=');
            url.push_str(&urlencoding::encode(v));
            separator = '&';
        }

        Ok(url)
    }

    /// Send the request, resending while the backend throttles us.
    async fn send(&self, url: &str, retry: &RetrySignal) -> Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            tracing::debug!(url, attempt, "fetching");

            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if is_throttled(status) && attempt < self.config.max_retries {
                if let Some(seconds) = retry_after_secs(&response) {
                    retry.retry_after(i64::from(seconds));
                    tokio::time::sleep(Duration::from_secs(u64::from(seconds))).await;
                    attempt += 1;
                    continue;
                }
            }

            return Err(service_error(url, response).await);
        }
    }

    async fn fetch_bytes(&self, retry: &RetrySignal) -> Result<(String, Vec<u8>)> {
        let url = self.url()?;
        let response = self.send(&url, retry).await?;
        let data = response.bytes().await.map_err(|e| Error::Network {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok((url, data.to_vec()))
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn retry_after_secs(response: &reqwest::Response) -> Option<u32> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

async fn service_error(url: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    // A body that cannot be read still leaves the status to report.
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Error::Service {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"errorDetails": [..]}` and `{"message": ..}` JSON bodies and
/// falls back to the (truncated) raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(ResponseValue::Object(fields)) = serde_json::from_str::<ResponseValue>(body) {
        if let Some(ResponseValue::Array(details)) = fields.get("errorDetails") {
            let details: Vec<&str> = details.iter().filter_map(|d| d.as_str()).collect();
            if !details.is_empty() {
                return Some(details.join("; "));
            }
        }
        if let Some(message) = fields.get("message").and_then(ResponseValue::as_str) {
            return Some(message.to_string());
        }
    }

    Some(body.chars().take(MAX_ERROR_BODY).collect())
}

/// A GET request returning a JSON document.
#[derive(Debug, Clone)]
pub struct JsonRequest(Endpoint);

impl JsonRequest {
    /// Add a query parameter. Keys and values are percent-encoded.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.params.push((key.into(), value.into()));
        self
    }
}

impl RequestDescriptor for JsonRequest {
    type Output = ResponseValue;

    fn build_url(&self) -> Result<String> {
        self.0.url()
    }

    fn execute(&self, retry: RetrySignal) -> ExecuteFuture<'_, ResponseValue> {
        Box::pin(async move {
            let (url, data) = self.0.fetch_bytes(&retry).await?;
            serde_json::from_slice(&data).map_err(|e| Error::MalformedResponse {
                url,
                message: e.to_string(),
            })
        })
    }
}

/// A GET request returning raw bytes, such as a static map image.
#[derive(Debug, Clone)]
pub struct BinaryRequest(Endpoint);

impl BinaryRequest {
    /// Add a query parameter. Keys and values are percent-encoded.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.params.push((key.into(), value.into()));
        self
    }
}

impl RequestDescriptor for BinaryRequest {
    type Output = Vec<u8>;

    fn build_url(&self) -> Result<String> {
        self.0.url()
    }

    fn execute(&self, retry: RetrySignal) -> ExecuteFuture<'_, Vec<u8>> {
        Box::pin(async move {
            let (_, data) = self.0.fetch_bytes(&retry).await?;
            Ok(data)
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::error::ErrorKind;
    use crate::executor::{Executor, Status};

    fn client(base_url: &str) -> ServiceClient {
        let config = ServiceConfig::default()
            .with_base_url(base_url)
            .with_timeout(Some(Duration::from_secs(5)));
        ServiceClient::new(config).unwrap()
    }

    fn path(p: &str) -> Matcher {
        Matcher::Regex(format!("^{p}"))
    }

    #[test]
    fn test_build_url_encodes_params_and_key() {
        let config = ServiceConfig::default()
            .with_base_url("https://example.com/REST/v1/")
            .with_api_key("k&y");
        let request = ServiceClient::new(config)
            .unwrap()
            .json("/Locations")
            .param("q", "66-46 74th St, Middle Village")
            .param("maxResults", "25");

        assert_eq!(
            request.build_url().unwrap(),
            "https://example.com/REST/v1/Locations?q=66-46%2074th%20St%2C%20Middle%20Village&maxResults=25&key=k%26y"
        );
    }

    #[test]
    fn test_build_url_extends_existing_query() {
        let request = client("https://example.com/REST/v1")
            .binary("Imagery/Map/Road?mapSize=300,200")
            .param("zoomLevel", "12");
        assert_eq!(
            request.build_url().unwrap(),
            "https://example.com/REST/v1/Imagery/Map/Road?mapSize=300,200&zoomLevel=12"
        );
    }

    #[test]
    fn test_build_url_rejects_bad_base() {
        let err = client("ftp://example.com").json("Locations").build_url().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"errorDetails": ["Access was denied.", "Check the key."]}"#),
            Some("Access was denied.; Check the key.".to_string())
        );
        assert_eq!(
            error_message(r#"{"message": "quota exhausted"}"#),
            Some("quota exhausted".to_string())
        );
        assert_eq!(error_message("  Bad Gateway \n"), Some("Bad Gateway".to_string()));
        assert_eq!(error_message("   "), None);
        assert_eq!(error_message(&"x".repeat(500)).unwrap().len(), MAX_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_json_request_through_executor() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", path("/Locations"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"statusCode": 200, "resourceSets": [{"estimatedTotal": 1}]}"#)
            .create_async()
            .await;

        let request = client(&server.url()).json("Locations").param("q", "Seattle");
        let (executor, rx) = Executor::new();
        let tree = executor.run(&request).await.ok().unwrap();

        let labels: Vec<_> = tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["statusCode", "resourceSets"]);
        assert_eq!(
            tree.get(&["resourceSets", "0", "estimatedTotal"]).unwrap().display(),
            "estimatedTotal: 1"
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Status::UrlResolved(format!("{}/Locations?q=Seattle", server.url()))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_throttled_request_is_resent() {
        let mut server = Server::new_async().await;
        let throttled = server
            .mock("GET", path("/Routes"))
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", path("/Routes"))
            .with_status(200)
            .with_body(r#"{"travelDuration": 1234}"#)
            .expect(1)
            .create_async()
            .await;

        let (retry, retry_rx) = RetrySignal::channel();
        let value = client(&server.url()).json("Routes").execute(retry).await.unwrap();

        assert_eq!(value["travelDuration"], 1234);
        assert_eq!(retry_rx.try_recv().unwrap(), 0);
        assert!(retry_rx.try_recv().is_err());
        throttled.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_throttling_without_retries_left_fails() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", path("/Traffic"))
            .with_status(503)
            .with_header("retry-after", "1")
            .create_async()
            .await;

        let config = ServiceConfig::default()
            .with_base_url(server.url())
            .with_max_retries(0);
        let (retry, retry_rx) = RetrySignal::channel();
        let err = ServiceClient::new(config)
            .unwrap()
            .json("Traffic")
            .execute(retry)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Service { status: 503, .. }));
        assert!(retry_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_service_error_carries_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", path("/Elevation"))
            .with_status(401)
            .with_body(r#"{"errorDetails": ["Access was denied."]}"#)
            .create_async()
            .await;

        let (executor, _rx) = Executor::new();
        let outcome = executor.run(&client(&server.url()).json("Elevation")).await;
        let error = outcome.error().unwrap();

        assert_eq!(error.kind, ErrorKind::Service);
        assert!(error.message.starts_with("Access was denied."));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", path("/Locations"))
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server.url())
            .json("Locations")
            .execute(RetrySignal::detached())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_binary_request() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", path("/Imagery/Map"))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89, b'P', b'N', b'G'])
            .create_async()
            .await;

        let (executor, _rx) = Executor::new();
        let bytes = executor
            .run_binary(&client(&server.url()).binary("Imagery/Map/Road"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(bytes, [0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let err = client("http://127.0.0.1:1")
            .json("Locations")
            .execute(RetrySignal::detached())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
