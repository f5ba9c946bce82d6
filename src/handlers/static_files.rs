//! Static content from a document root.
//!
//! Files are served with a content type guessed from their extension.
//! Directories resolve to `index.html` or `index.htm` when present and to an
//! HTML listing otherwise. Anything that cannot be read, or that would resolve
//! outside the root, produces an empty body and therefore a 404.

use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::http::request::{Method, ParsedRequest};
use crate::http::response::TEXT_PLAIN;
use crate::routing::{HandlerError, HandlerResponse, RequestHandler};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    doc_root: PathBuf,
}

impl StaticFileHandler {
    pub fn new(doc_root: impl Into<PathBuf>) -> Self {
        let doc_root = doc_root.into();
        tracing::info!(doc_root = %doc_root.display(), "Static file handler ready");
        Self { doc_root }
    }

    pub fn doc_root(&self) -> &Path {
        &self.doc_root
    }

    /// Map a request path to a location under the root.
    fn resolve(&self, request_path: &str) -> Option<(String, PathBuf)> {
        let relative = request_path.trim_start_matches('/');
        let confined = Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined {
            return None;
        }
        Some((relative.to_string(), self.doc_root.join(relative)))
    }
}

impl RequestHandler for StaticFileHandler {
    fn name(&self) -> &str {
        "static"
    }

    fn score(&self, request: &ParsedRequest) -> f64 {
        if request.method() == Method::Get {
            0.1
        } else {
            0.0
        }
    }

    fn handle(&self, request: &ParsedRequest) -> Result<HandlerResponse, HandlerError> {
        let Some((relative, mut path)) = self.resolve(request.path()) else {
            tracing::warn!(uri = %request.uri(), "Refusing path outside the document root");
            return Ok(HandlerResponse::empty());
        };

        if path.is_dir() {
            if let Some(index) = INDEX_FILES.iter().map(|name| path.join(name)).find(|p| p.is_file()) {
                path = index;
            }
        }
        tracing::debug!(path = %path.display(), "Serving");

        if path.is_dir() {
            return Ok(HandlerResponse::new("text/html", directory_listing(&path, &relative)?));
        }

        match fs::read(&path) {
            Ok(body) => {
                let content_type = mime_guess::from_path(&path).first_raw().unwrap_or(TEXT_PLAIN);
                Ok(HandlerResponse::new(content_type, body))
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read file");
                Ok(HandlerResponse::empty())
            }
        }
    }
}

fn directory_listing(dir: &Path, relative: &str) -> Result<String, HandlerError> {
    let mut names = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();

    let base = relative.trim_end_matches('/');
    let mut html = String::from("<ul>");
    for name in &names {
        let href = if base.is_empty() {
            format!("/{name}")
        } else {
            format!("/{base}/{name}")
        };
        let _ = write!(html, "<li><a href='{}'>{}</a></li>", escape_html(&href), escape_html(name));
    }
    html.push_str("</ul>");
    Ok(html)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
