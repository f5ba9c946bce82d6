//! Request parsing.
//!
//! # Responsibilities
//! - Split the request line into method, URI and version
//! - Reject anything that is not `GET|POST|PUT|DELETE <uri> HTTP/1.1`
//! - Derive the path and the decoded query map from the URI
//! - Locate `Content-Length` while the body is still being framed
//!
//! # Design Decisions
//! - Rejections are blunt: the caller drops the connection without a response
//! - The URI is kept verbatim; handlers see exactly what the client sent
//! - Header names are matched case-insensitively

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The only protocol version the server speaks.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Errors that abort a connection while framing or parsing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// The request line is not `METHOD SP URI SP VERSION`.
    #[error("malformed request line {0:?}")]
    MalformedRequestLine(String),

    /// The request header is not valid UTF-8.
    #[error("request header is not valid UTF-8")]
    NonUtf8Header,

    /// Any version other than HTTP/1.1.
    #[error("unsupported HTTP version {0:?}")]
    UnsupportedVersion(String),

    /// A method outside GET, POST, PUT and DELETE.
    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),

    /// `Content-Length` is present but not a non-negative integer.
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    /// The request grew past the configured size limit.
    #[error("request exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
}

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = FramingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(FramingError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// A fully framed request. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    method: Method,
    uri: String,
    path: String,
    query: HashMap<String, Vec<String>>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ParsedRequest {
    /// Parse the header block (without the terminating blank line) and attach the body.
    pub fn parse(header: &[u8], body: Vec<u8>) -> Result<Self, FramingError> {
        let header = std::str::from_utf8(header).map_err(|_| FramingError::NonUtf8Header)?;
        let mut lines = header.split("\r\n");
        let request_line = lines.next().unwrap_or_default();

        let parts: Vec<&str> = request_line.split(' ').collect();
        let [method, uri, version] = parts.as_slice() else {
            return Err(FramingError::MalformedRequestLine(request_line.to_string()));
        };
        if uri.is_empty() {
            return Err(FramingError::MalformedRequestLine(request_line.to_string()));
        }
        if *version != HTTP_VERSION {
            return Err(FramingError::UnsupportedVersion(version.to_string()));
        }
        let method: Method = method.parse()?;

        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (*uri, HashMap::new()),
        };

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            method,
            uri: uri.to_string(),
            path: path.to_string(),
            query,
            headers,
            body,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target exactly as received, query string included.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The URI up to (not including) the first `?`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    /// First value of a query parameter.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup; first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Decode a query string into a multi-map, keeping repeated keys in order.
pub fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        map.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    map
}

/// Find the `Content-Length` value in a raw header block.
///
/// Returns `Ok(None)` when the header is absent.
pub fn content_length(header: &[u8]) -> Result<Option<usize>, FramingError> {
    const NAME: &[u8] = b"content-length:";

    for line in header.split(|b| *b == b'\n') {
        if line.len() < NAME.len() || !line[..NAME.len()].eq_ignore_ascii_case(NAME) {
            continue;
        }
        let raw = String::from_utf8_lossy(&line[NAME.len()..]);
        let value = raw.trim();
        return value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| FramingError::InvalidContentLength(value.to_string()));
    }
    Ok(None)
}
