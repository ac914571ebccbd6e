//! Thin HTTP client used by the auth and wishlist API modules.
//!
//! Responses are read eagerly into a plain `Response` (status, headers, body)
//! so results can be moved through channels and inspected synchronously by the
//! controllers that own them.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercased keys)
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Error body shape shared by the backend's failure responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Attempt to deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The human-readable message a failed response carries, if any.
    ///
    /// Looks at the JSON `message` field first, then `error`.
    pub fn server_message(&self) -> Option<String> {
        let body: ErrorBody = self.json().ok()?;
        body.message
            .or(body.error)
            .filter(|message| !message.trim().is_empty())
    }

    /// Server message, or `"Server error (status N)"` when there is none.
    pub fn failure_message(&self) -> String {
        self.server_message()
            .unwrap_or_else(|| format!("Server error (status {})", self.status))
    }
}

/// HTTP client error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Network error: {}", self.message)
    }
}

impl std::error::Error for HttpError {}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// A builder for constructing HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    fn new(client: reqwest::Client, method: Method, url: impl Into<String>) -> Self {
        Self {
            client,
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {token}"))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let json_bytes = serde_json::to_vec(value)?;
        self.body = Some(json_bytes);
        self.headers
            .insert("content-type".to_owned(), "application/json".to_owned());
        Ok(self)
    }

    /// Send the request and read the whole response.
    pub async fn send(self) -> HttpResult<Response> {
        let mut request = match self.method {
            Method::Get => self.client.get(&self.url),
            Method::Post => self.client.post(&self.url),
            Method::Delete => self.client.delete(&self.url),
        };

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        if let Some(body) = self.body {
            request = request.body(body);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::new(e.to_string()))?;

        // Extract status and headers before consuming the response
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_owned());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::new(e.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// HTTP client handle. Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.inner.clone(), Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.inner.clone(), Method::Post, url)
    }

    /// Create a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.inner.clone(), Method::Delete, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &[u8]) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_response_is_success() {
        assert!(response(200, b"").is_success());
        assert!(response(204, b"").is_success());
        assert!(!response(404, b"").is_success());
    }

    #[test]
    fn test_response_header_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_owned(), "application/json".to_owned());

        let response = Response {
            status: 200,
            headers,
            body: Vec::new(),
        };

        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn server_message_prefers_message_field() {
        let response = response(400, br#"{"message": "Invalid code", "error": "bad"}"#);
        assert_eq!(response.server_message().as_deref(), Some("Invalid code"));
    }

    #[test]
    fn server_message_falls_back_to_error_field() {
        let response = response(401, br#"{"error": "Session expired"}"#);
        assert_eq!(response.server_message().as_deref(), Some("Session expired"));
    }

    #[test]
    fn failure_message_without_body_uses_status() {
        let response = response(502, b"<html>bad gateway</html>");
        assert_eq!(response.server_message(), None);
        assert_eq!(response.failure_message(), "Server error (status 502)");
    }

    #[test]
    fn blank_server_message_is_ignored() {
        let response = response(500, br#"{"message": "  "}"#);
        assert_eq!(response.failure_message(), "Server error (status 500)");
    }

    #[test]
    fn test_request_builder_bearer_and_json() {
        #[derive(serde::Serialize)]
        struct TestBody {
            code: String,
        }

        let builder = Client::new()
            .post("https://example.com")
            .bearer("abc")
            .json(&TestBody {
                code: "123456".to_owned(),
            })
            .expect("serializable");

        assert_eq!(
            builder.headers.get("authorization"),
            Some(&"Bearer abc".to_owned())
        );
        assert_eq!(
            builder.headers.get("content-type"),
            Some(&"application/json".to_owned())
        );
        assert_eq!(builder.body.as_deref(), Some(br#"{"code":"123456"}"#.as_slice()));
    }
}
