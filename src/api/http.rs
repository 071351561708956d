//! HTTP transport for Daktela V6 REST API calls

use super::response::{ApiResponse, NO_TOTAL};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Path prefix of every API endpoint
pub const API_NAMESPACE: &str = "/api/v6/";
/// Default User-Agent of outgoing requests
pub const USER_AGENT: &str = "daktela-v6-rust-connector";
/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Ordered query parameters; nested values are sent in bracket notation
pub type QueryParams = Vec<(String, Value)>;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Mask an access token for logging
fn mask_credential(value: &str) -> String {
    if value.len() <= 8 || !value.is_ascii() {
        "*".repeat(value.chars().count())
    } else {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    }
}

/// Normalize an instance address: default to `https://` and drop a trailing slash
pub fn normalize_url(url: &str) -> String {
    let mut url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    if url.ends_with('/') {
        url.pop();
    }
    url
}

/// Lower-case the first character of an endpoint (`Users/x` -> `users/x`)
pub fn endpoint_path(endpoint: &str) -> String {
    let mut chars = endpoint.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Encode query parameters the way the API expects nested structures:
/// `filter[filters][0][field]=name`. Empty lists/objects and nulls are omitted.
pub fn build_query(params: &[(String, Value)]) -> String {
    let mut pairs: Vec<String> = Vec::new();
    for (key, value) in params {
        encode_pair(key, value, &mut pairs);
    }
    pairs.join("&")
}

fn encode_pair(key: &str, value: &Value, pairs: &mut Vec<String>) {
    let scalar = match value {
        Value::Null => return,
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                encode_pair(&format!("{}[{}]", key, index), item, pairs);
            }
            return;
        },
        Value::Object(map) => {
            for (name, item) in map {
                encode_pair(&format!("{}[{}]", key, name), item, pairs);
            }
            return;
        },
    };
    pairs.push(format!(
        "{}={}",
        urlencoding::encode(key),
        urlencoding::encode(&scalar)
    ));
}

/// Interpret a response body as the API envelope
/// `{"result": {"data": ..., "total": ...} | value, "error" | "errors": [...]}`.
pub fn parse_envelope(http_status: u16, body: &str) -> ApiResponse {
    if body.is_empty() {
        return ApiResponse::new(None, 0, Vec::new(), http_status);
    }

    let envelope: Value = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(
                "Failed to parse response JSON ({}): {}",
                http_status,
                sanitize_for_log(body)
            );
            return ApiResponse::failure(http_status, format!("Failed to parse response JSON: {}", e));
        },
    };

    let result = present(envelope.get("result"));
    let data = result
        .and_then(|r| present(r.get("data")))
        .or(result)
        .cloned();
    let total = match result {
        Some(r) => match present(r.get("total")) {
            Some(raw) => parse_total(raw).unwrap_or_else(|| {
                tracing::warn!("Ignoring unparseable total: {}", raw);
                NO_TOTAL
            }),
            None => 1,
        },
        None => NO_TOTAL,
    };
    let errors = present(envelope.get("error"))
        .or_else(|| present(envelope.get("errors")))
        .map(collect_errors)
        .unwrap_or_default();

    if !errors.is_empty() {
        tracing::warn!("API error: {} - {}", http_status, sanitize_for_log(&errors.join("; ")));
    }

    ApiResponse::new(data, total, errors, http_status)
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Integer or numeric-string count; fractional counts are truncated
fn parse_total(value: &Value) -> Option<i64> {
    let count = match value {
        Value::Number(n) => return n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(count) => return Some(count),
            Err(_) => s.trim().parse::<f64>().ok()?,
        },
        _ => return None,
    };
    count.is_finite().then(|| count.trunc() as i64)
}

/// Flatten the error payload into messages. Objects keyed by field become
/// `field: message` entries.
fn collect_errors(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(collect_errors).collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(field, inner)| {
                collect_errors(inner)
                    .into_iter()
                    .map(move |message| format!("{}: {}", field, message))
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Connection settings applied to every request of a transport
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub verify_tls: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Performs exactly one HTTP call and normalizes the outcome
pub trait Transport: Send + Sync {
    fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: QueryParams,
        body: Option<Value>,
    ) -> ApiResponse;
}

/// Blocking HTTP transport bound to one instance and access token
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport with the default timeout and TLS verification
    pub fn new(instance: &str, access_token: &str) -> Result<Self> {
        Self::with_config(instance, access_token, &ClientConfig::default())
    }

    pub fn with_config(instance: &str, access_token: &str, config: &ClientConfig) -> Result<Self> {
        let base_url = normalize_url(instance);
        Url::parse(&base_url).with_context(|| format!("Invalid instance URL: {}", base_url))?;

        if !config.verify_tls {
            tracing::warn!("TLS certificate verification disabled for {}", base_url);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL; the access token is always the last query parameter
    pub fn request_url(&self, endpoint: &str, query: &[(String, Value)]) -> String {
        self.url_with_token(endpoint, query, &self.access_token)
    }

    fn url_with_token(&self, endpoint: &str, query: &[(String, Value)], token: &str) -> String {
        let mut params = query.to_vec();
        params.push(("accessToken".to_string(), Value::String(token.to_string())));
        format!(
            "{}{}{}.json?{}",
            self.base_url,
            API_NAMESPACE,
            endpoint_path(endpoint),
            build_query(&params)
        )
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: QueryParams,
        body: Option<Value>,
    ) -> ApiResponse {
        let url = self.request_url(endpoint, &query);
        tracing::debug!(
            "{} {}",
            method,
            self.url_with_token(endpoint, &query, &mask_credential(&self.access_token))
        );

        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                let status = e.status().map(|s| s.as_u16()).unwrap_or(0);
                let message = e.without_url().to_string();
                tracing::error!("Failed to send request: {}", message);
                return ApiResponse::failure(status, message);
            },
        };

        let status = response.status().as_u16();
        match response.text() {
            Ok(text) => parse_envelope(status, &text),
            Err(e) => {
                let message = e.without_url().to_string();
                tracing::error!("Failed to read response body: {}", message);
                ApiResponse::failure(status, message)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("my.daktela.com"), "https://my.daktela.com");
        assert_eq!(normalize_url("https://my.daktela.com/"), "https://my.daktela.com");
        assert_eq!(normalize_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_endpoint_path_lowercases_first_char_only() {
        assert_eq!(endpoint_path("CampaignsRecords"), "campaignsRecords");
        assert_eq!(endpoint_path("Users/john/Activities"), "users/john/Activities");
        assert_eq!(endpoint_path(""), "");
    }

    #[test]
    fn test_build_query_brackets_nested_values() {
        let params = vec![
            ("skip".to_string(), json!(0)),
            ("take".to_string(), json!(100)),
            (
                "filter".to_string(),
                json!({"logic": "and", "filters": [{"field": "a", "operator": "in", "value": ["x", "y"]}]}),
            ),
            ("sort".to_string(), json!([])),
            ("flag".to_string(), json!(true)),
        ];
        let query = build_query(&params);

        assert_eq!(
            query,
            "skip=0&take=100\
             &filter%5Blogic%5D=and\
             &filter%5Bfilters%5D%5B0%5D%5Bfield%5D=a\
             &filter%5Bfilters%5D%5B0%5D%5Boperator%5D=in\
             &filter%5Bfilters%5D%5B0%5D%5Bvalue%5D%5B0%5D=x\
             &filter%5Bfilters%5D%5B0%5D%5Bvalue%5D%5B1%5D=y\
             &flag=1"
        );
    }

    #[test]
    fn test_request_url_appends_token_last() {
        let transport = HttpTransport::new("my.daktela.com/", "secret token").unwrap();
        let url = transport.request_url("Users", &[("take".to_string(), json!(5))]);
        assert_eq!(
            url,
            "https://my.daktela.com/api/v6/users.json?take=5&accessToken=secret%20token"
        );
    }

    #[test]
    fn test_invalid_instance_is_rejected() {
        assert!(HttpTransport::new("https://exa mple.com", "t").is_err());
    }

    #[test]
    fn test_envelope_with_data_and_total() {
        let response = parse_envelope(200, r#"{"result":{"data":[{"name":"a"}],"total":42}}"#);
        assert_eq!(response.data(), Some(&json!([{"name": "a"}])));
        assert_eq!(response.total(), 42);
        assert!(response.errors().is_empty());
        assert_eq!(response.http_status(), 200);
    }

    #[test]
    fn test_envelope_with_bare_result() {
        let response = parse_envelope(201, r#"{"result":{"name":"user_1","title":"User"}}"#);
        assert_eq!(response.data(), Some(&json!({"name": "user_1", "title": "User"})));
        assert_eq!(response.total(), 1);
    }

    #[test]
    fn test_envelope_without_result() {
        let response = parse_envelope(404, r#"{"error":["Record not found"]}"#);
        assert!(response.data().is_none());
        assert_eq!(response.total(), NO_TOTAL);
        assert_eq!(response.errors(), &["Record not found".to_string()]);
        assert_eq!(response.http_status(), 404);
    }

    #[test]
    fn test_envelope_errors_key_and_field_errors() {
        let response = parse_envelope(400, r#"{"errors":{"title":["is required"]}}"#);
        assert_eq!(response.errors(), &["title: is required".to_string()]);
    }

    #[test]
    fn test_envelope_total_forms() {
        let total = |raw: &str| parse_envelope(200, raw).total();
        assert_eq!(total(r#"{"result":{"data":[],"total":12.0}}"#), 12);
        assert_eq!(total(r#"{"result":{"data":[],"total":"7"}}"#), 7);
        assert_eq!(total(r#"{"result":{"data":[],"total":"7.9"}}"#), 7);
        assert_eq!(total(r#"{"result":{"data":[],"total":"many"}}"#), NO_TOTAL);
        assert_eq!(total(r#"{"result":{"data":[],"total":true}}"#), NO_TOTAL);
        assert_eq!(total(r#"{"result":{"data":[]}}"#), 1);
    }

    #[test]
    fn test_empty_body() {
        let response = parse_envelope(204, "");
        assert!(response.data().is_none());
        assert_eq!(response.total(), 0);
        assert!(response.errors().is_empty());
        assert_eq!(response.http_status(), 204);
    }

    #[test]
    fn test_malformed_body() {
        let response = parse_envelope(502, "<html>Bad Gateway</html>");
        assert!(response.data().is_none());
        assert_eq!(response.total(), NO_TOTAL);
        assert_eq!(response.errors().len(), 1);
        assert!(response.errors()[0].starts_with("Failed to parse response JSON"));
        assert_eq!(response.http_status(), 502);
    }

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential("abc"), "***");
        assert_eq!(mask_credential("0123456789abcdef"), "0123...cdef");
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }
}
