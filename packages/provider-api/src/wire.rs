//! Minimal HTTP/1.0 framing for the provider control channel.
//!
//! The provider implements its control server directly over a raw socket, so
//! the client must speak the exact subset it understands:
//!
//! - request line `"<METHOD> <path> HTTP/1.0\r\n"`;
//! - `Content-Length` and `Content-Type: application/json`, and only those,
//!   and only when a non-empty body is present;
//! - a blank line, then the raw body bytes.
//!
//! Responses carry no usable `Content-Length`; the provider always closes
//! the connection after responding, and [`split_body`] only has to find the
//! header/body boundary in whatever the transport accumulated.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// The four verbs the control API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One outbound control call: method, path + query, optional JSON body.
///
/// Immutable; constructed per call and never reused. [`Request::encode`]
/// produces the full wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl Request {
    /// A body-less request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// A request with a raw, pre-serialised body.
    pub fn with_body(method: Method, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Some(body.into()),
        }
    }

    /// A request whose body is the JSON serialisation of `value`.
    pub fn json<T: Serialize>(
        method: Method,
        path: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::with_body(method, path, serde_json::to_string(value)?))
    }

    /// Serialise to the wire format described in the module docs.
    ///
    /// An empty body string is treated exactly like no body: no headers are
    /// emitted for it.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body.as_deref().unwrap_or("");
        let mut message = format!("{} {} HTTP/1.0\r\n", self.method, self.path);
        if !body.is_empty() {
            message.push_str(&format!("Content-Length: {}\r\n", body.len()));
            message.push_str("Content-Type: application/json\r\n");
        }
        message.push_str("\r\n");
        message.push_str(body);
        message.into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Response body extraction
// ---------------------------------------------------------------------------

/// Extract the body from an accumulated raw response.
///
/// The body is everything after the **first** `\r\n\r\n`. Taking the suffix
/// after the first boundary (rather than the last fragment of a split)
/// keeps any `\r\n\r\n` sequence embedded in the body intact.
///
/// Returns `None` when the response contains no boundary at all, which
/// means the peer closed before finishing its headers.
pub fn split_body(raw: &[u8]) -> Option<Vec<u8>> {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| raw[i + 4..].to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_without_body_is_request_line_and_blank_line_only() {
        let req = Request::new(Method::Get, "/nodes/auto");
        assert_eq!(req.encode(), b"GET /nodes/auto HTTP/1.0\r\n\r\n");
    }

    #[test]
    fn encode_with_body_carries_exactly_two_headers() {
        let req = Request::with_body(Method::Put, "/nodes/abc123", r#"{"a":1}"#);
        let wire = String::from_utf8(req.encode()).unwrap();
        assert_eq!(
            wire,
            "PUT /nodes/abc123 HTTP/1.0\r\n\
             Content-Length: 7\r\n\
             Content-Type: application/json\r\n\
             \r\n\
             {\"a\":1}"
        );
    }

    #[test]
    fn encode_treats_empty_body_as_absent() {
        let req = Request::with_body(Method::Put, "/connections/mode/auto?save=1", "");
        assert_eq!(
            req.encode(),
            b"PUT /connections/mode/auto?save=1 HTTP/1.0\r\n\r\n"
        );
    }

    #[test]
    fn json_body_is_serialised() {
        let req = Request::json(Method::Post, "/connections/connect?save=1", &["10.0.0.5:61000"])
            .unwrap();
        assert_eq!(req.body.as_deref(), Some(r#"["10.0.0.5:61000"]"#));
    }

    #[test]
    fn split_body_takes_everything_after_first_boundary() {
        let raw = b"HTTP/1.0 200 OK\r\nServer: x\r\n\r\ntrue";
        assert_eq!(split_body(raw).unwrap(), b"true");
    }

    #[test]
    fn split_body_preserves_embedded_boundary() {
        // A JSON body whose string value contains the literal header/body
        // separator must survive extraction intact.
        let raw = b"HTTP/1.0 200 OK\r\n\r\n{\"text\":\"a\r\n\r\nb\"}";
        assert_eq!(split_body(raw).unwrap(), b"{\"text\":\"a\r\n\r\nb\"}");
    }

    #[test]
    fn split_body_without_boundary_is_none() {
        assert_eq!(split_body(b"HTTP/1.0 200 OK\r\n"), None);
        assert_eq!(split_body(b""), None);
    }

    #[test]
    fn split_body_with_empty_body_is_empty() {
        assert_eq!(split_body(b"HTTP/1.0 204 No Content\r\n\r\n").unwrap(), b"");
    }
}
