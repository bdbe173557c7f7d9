//! HTTP adapters for the external data providers.
//!
//! Each adapter performs one best-effort GET with a timeout and returns the
//! provider's JSON body untouched. Nothing is retried.

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;
use wayfarer_core::{SearchError, SearchResult};

use crate::config::ProvidersConfig;

/// A flat parameter mapping against one provider endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ProviderRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn optional<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch raw nested JSON for a request
    async fn fetch(&self, request: ProviderRequest) -> SearchResult<Value>;
}

/// API key read from the process environment on every call
#[derive(Debug, Clone, Copy)]
pub struct ApiKey {
    pub variable: &'static str,
    pub param: &'static str,
}

impl ApiKey {
    fn resolve(&self) -> SearchResult<String> {
        std::env::var(self.variable)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SearchError::Configuration {
                variable: self.variable.to_string(),
            })
    }
}

/// Spaces consecutive calls at least `min_interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct HttpProvider {
    name: &'static str,
    client: Client,
    base_url: String,
    timeout: Duration,
    api_key: Option<ApiKey>,
    limiter: Option<RateLimiter>,
}

impl HttpProvider {
    pub fn new(
        name: &'static str,
        base_url: &str,
        timeout: Duration,
        headers: header::HeaderMap,
    ) -> Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid {} base URL: {}", name, base_url))?;

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            name,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            api_key: None,
            limiter: None,
        })
    }

    pub fn with_api_key(mut self, variable: &'static str, param: &'static str) -> Self {
        self.api_key = Some(ApiKey { variable, param });
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.limiter = Some(RateLimiter::new(interval));
        self
    }

    /// SerpAPI, serving the Google Flights/Hotels/Events/Finance engines
    pub fn serpapi(config: &ProvidersConfig) -> Result<Self> {
        Ok(Self::new(
            "serpapi",
            &config.serpapi_url,
            Duration::from_secs(config.timeout_secs),
            header::HeaderMap::new(),
        )?
        .with_api_key("SERPAPI_KEY", "api_key"))
    }

    /// National Weather Service
    pub fn nws(config: &ProvidersConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/geo+json"),
        );
        Self::new("nws", &config.nws_url, Duration::from_secs(config.timeout_secs), headers)
    }

    pub fn weatherstack(config: &ProvidersConfig) -> Result<Self> {
        Ok(Self::new(
            "weatherstack",
            &config.weatherstack_url,
            Duration::from_secs(config.timeout_secs),
            header::HeaderMap::new(),
        )?
        .with_api_key("WEATHERSTACK_API_KEY", "access_key"))
    }

    /// OpenStreetMap Nominatim, limited to one request per second
    pub fn nominatim(config: &ProvidersConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header_value(&config.user_agent)?);
        Ok(Self::new(
            "nominatim",
            &config.nominatim_url,
            Duration::from_secs(config.timeout_secs),
            headers,
        )?
        .with_min_interval(Duration::from_secs(1)))
    }

    fn url(&self, request: &ProviderRequest) -> SearchResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.base_url,
            request.path.trim_start_matches('/')
        ))
        .map_err(|e| SearchError::InvalidArguments(format!("Invalid request path: {}", e)))?;

        let mut pairs = request.query.clone();
        if let Some(key) = &self.api_key {
            pairs.push((key.param.to_string(), key.resolve()?));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn unavailable(&self, error: reqwest::Error) -> SearchError {
        let message = if error.is_timeout() {
            format!("Request timed out after {}s", self.timeout.as_secs())
        } else {
            format!("API request failed: {}", error)
        };
        SearchError::provider(self.name, message)
    }
}

fn header_value(value: &str) -> Result<header::HeaderValue> {
    header::HeaderValue::from_str(value).context("Invalid header value")
}

/// Error carried in a 2xx body: `{"success": false, "error": {...}}` or
/// `{"error": "..."}`
fn body_error(body: &Value) -> Option<String> {
    let error = body.get("error");
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let code = error
            .and_then(|e| e.get("code"))
            .map(|c| c.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let info = error
            .and_then(|e| e.get("info"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Some(format!("API Error {}: {}", code, info));
    }
    error.and_then(Value::as_str).map(str::to_string)
}

/// SerpAPI reports an empty result set as an error body
fn reports_no_results(message: &str) -> bool {
    message.contains("hasn't returned any results")
}

#[async_trait::async_trait]
impl ProviderAdapter for HttpProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, request: ProviderRequest) -> SearchResult<Value> {
        let url = self.url(&request)?;
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        tracing::debug!(provider = self.name, path = %request.path, "Provider request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = self.name, status = status.as_u16(), "Provider returned an error status");
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| body_error(&v).or_else(|| v.get("detail").and_then(Value::as_str).map(str::to_string)))
                .unwrap_or(body);
            return Err(SearchError::provider(
                self.name,
                format!("HTTP {}: {}", status.as_u16(), detail.trim()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::provider(self.name, format!("Invalid JSON response: {}", e)))?;
        if let Some(message) = body_error(&body) {
            if reports_no_results(&message) {
                return Err(SearchError::no_results(self.name, message));
            }
            return Err(SearchError::provider(self.name, message));
        }
        Ok(body)
    }
}

/// One adapter per external API
#[derive(Clone)]
pub struct Providers {
    pub serpapi: Arc<dyn ProviderAdapter>,
    pub nws: Arc<dyn ProviderAdapter>,
    pub weatherstack: Arc<dyn ProviderAdapter>,
    pub nominatim: Arc<dyn ProviderAdapter>,
}

impl Providers {
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            serpapi: Arc::new(HttpProvider::serpapi(config)?),
            nws: Arc::new(HttpProvider::nws(config)?),
            weatherstack: Arc::new(HttpProvider::weatherstack(config)?),
            nominatim: Arc::new(HttpProvider::nominatim(config)?),
        })
    }

    /// The same adapter behind every provider slot
    pub fn uniform(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            serpapi: adapter.clone(),
            nws: adapter.clone(),
            weatherstack: adapter.clone(),
            nominatim: adapter,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ProvidersConfig {
        ProvidersConfig {
            timeout_secs: 2,
            serpapi_url: server.uri(),
            nws_url: server.uri(),
            weatherstack_url: server.uri(),
            nominatim_url: server.uri(),
            user_agent: "wayfarer-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_serpapi_sends_key_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("engine", "google_flights"))
            .and(query_param("api_key", "test-serp-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"best_flights": []})))
            .mount(&server)
            .await;

        std::env::set_var("SERPAPI_KEY", "test-serp-key");
        let provider = HttpProvider::serpapi(&config(&server)).unwrap();
        let body = provider
            .fetch(ProviderRequest::new("search").param("engine", "google_flights"))
            .await
            .unwrap();
        assert_eq!(body, json!({"best_flights": []}));
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let server = MockServer::start().await;
        let provider = HttpProvider::new("keyed", &server.uri(), Duration::from_secs(2), header::HeaderMap::new())
            .unwrap()
            .with_api_key("WAYFARER_TEST_UNSET_KEY", "key");

        let err = provider.fetch(ProviderRequest::new("search")).await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("WAYFARER_TEST_UNSET_KEY"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nws_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/points/39.7,-97.1"))
            .and(header_is("user-agent", "wayfarer-test"))
            .and(header_is("accept", "application/geo+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"properties": {}})))
            .mount(&server)
            .await;

        let provider = HttpProvider::nws(&config(&server)).unwrap();
        assert!(provider.fetch(ProviderRequest::new("points/39.7,-97.1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&server)
            .await;

        let provider = HttpProvider::nws(&config(&server)).unwrap();
        let err = provider.fetch(ProviderRequest::new("alerts/active")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Provider nws unavailable: HTTP 500: boom");
    }

    #[tokio::test]
    async fn test_success_false_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": {"code": 101, "type": "invalid_access_key", "info": "You have not supplied a valid API Access Key."}
            })))
            .mount(&server)
            .await;

        std::env::set_var("WEATHERSTACK_API_KEY", "bad-key");
        let provider = HttpProvider::weatherstack(&config(&server)).unwrap();
        let err = provider
            .fetch(ProviderRequest::new("current").param("query", "Paris"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err
            .to_string()
            .contains("API Error 101: You have not supplied a valid API Access Key."));
    }

    #[tokio::test]
    async fn test_empty_serpapi_answer_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "search_metadata": {"status": "Success"},
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        std::env::set_var("SERPAPI_KEY", "test-serp-key");
        let provider = HttpProvider::serpapi(&config(&server)).unwrap();
        let err = provider
            .fetch(ProviderRequest::new("search").param("engine", "google_events"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "no_results");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("hasn't returned any results"));
    }

    #[tokio::test]
    async fn test_timeout_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let provider =
            HttpProvider::new("slow", &server.uri(), Duration::from_millis(200), header::HeaderMap::new()).unwrap();
        let err = provider.fetch(ProviderRequest::new("anything")).await.unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_calls() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_request_builder() {
        let request = ProviderRequest::new("search")
            .param("q", "jazz")
            .optional("htichips", None::<String>)
            .optional("gl", Some("us"));
        assert_eq!(request.get("q"), Some("jazz"));
        assert_eq!(request.get("htichips"), None);
        assert_eq!(request.query.len(), 2);
    }
}
