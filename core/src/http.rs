//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The poller builds `HttpRequest`
//! values and classifies `HttpResponse` values; the actual round-trip is
//! performed by whatever `Transport` the caller plugs in.
//!
//! Response bodies are buffered into `Bytes` exactly once. Every reader gets
//! a fresh view over the same buffer, so the poller can inspect a body and
//! still hand it back to the caller untouched.

use std::io::Cursor;

use bytes::Bytes;

pub const AZURE_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
pub const LOCATION: &str = "Location";
pub const RETRY_AFTER: &str = "Retry-After";
pub const CONTENT_TYPE: &str = "Content-Type";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is always absolute, query string included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data, with its body fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup. Returns the first match, trimmed.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// The buffered body. Cloning `Bytes` is a reference-count bump.
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    /// A fresh reader positioned at the start of the body.
    pub fn body_reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.body.clone())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// False for empty and whitespace-only bodies.
    pub fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse::new(202).with_header("azure-asyncoperation", " https://example/op ");
        assert_eq!(response.header(AZURE_ASYNC_OPERATION), Some("https://example/op"));
        assert_eq!(response.header(LOCATION), None);
    }

    #[test]
    fn body_can_be_read_more_than_once() {
        let response = HttpResponse::new(200).with_body(r#"{"status":"Succeeded"}"#);

        let mut first = String::new();
        response.body_reader().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        response.body_reader().read_to_string(&mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(response.body_text(), first);
    }

    #[test]
    fn whitespace_body_counts_as_empty() {
        assert!(!HttpResponse::new(200).has_body());
        assert!(!HttpResponse::new(200).with_body(" \r\n").has_body());
        assert!(HttpResponse::new(200).with_body("{}").has_body());
    }

    #[test]
    fn method_renders_as_verb() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(HttpMethod::Get.as_str(), "GET");
    }
}
