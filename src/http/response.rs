//! Response construction and serialization.
//!
//! # Responsibilities
//! - Map handler outcomes to 200 / 404 / 500 responses
//! - Serialize the status line, headers and body into one buffer
//!
//! # Design Decisions
//! - `Content-Length` is always the byte length of the body (bodies may be binary)
//! - `Access-Control-Allow-Origin: *` is emitted on every response when CORS is on,
//!   including 404 and 500
//! - `Connection: close`: exactly one request is served per connection

use http::StatusCode;

/// Content type used for bodies that carry no specific type.
pub const TEXT_PLAIN: &str = "text/plain";

/// A response ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    body: Vec<u8>,
}

impl Response {
    /// A `200 OK` carrying a handler's body.
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: content_type.into(),
            body,
        }
    }

    /// A `404 Not Found` with an empty body.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            content_type: TEXT_PLAIN.to_string(),
            body: Vec::new(),
        }
    }

    /// A `500 Internal Server Error` with the JSON failure envelope.
    pub fn server_error(description: &str) -> Self {
        let body = serde_json::json!({
            "success": false,
            "message": format!("Server error: {description}"),
        });
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            content_type: "application/json".to_string(),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialize into the bytes written to the socket.
    pub fn to_bytes(&self, enable_cors: bool) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or_default()
        );
        if enable_cors {
            head.push_str("Access-Control-Allow-Origin: *\r\n");
        }
        head.push_str(&format!("Content-Type: {}\r\n", self.content_type));
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Cache-Control: no-cache\r\n");
        head.push_str("Connection: close\r\n");
        head.push_str("\r\n");

        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
