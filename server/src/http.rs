//! Minimal HTTP/1.0 request parsing and response building.
//!
//! Only what the maze API needs: a request line, headers, an optional body
//! sized by `Content-Length`, and a response that always closes the
//! connection and carries permissive CORS headers.

use crate::error::ServerError;
use crate::utils::http_date;
use log::debug;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Component, Path};

pub const SERVER_NAME: &str = "mazeserver/1.0";

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// True if `line` has the shape `METHOD SP target SP HTTP/x.y`
pub fn is_request_line(line: &str) -> bool {
    let parts: Vec<&str> = line.trim_end_matches("\r\n").split(' ').collect();
    if parts.len() != 3 {
        return false;
    }
    let method_ok = !parts[0].is_empty() && parts[0].bytes().all(|b| b.is_ascii_uppercase());
    method_ok && !parts[1].is_empty() && parts[2].starts_with("HTTP/")
}

impl HttpRequest {
    /// Parses the request line and headers, i.e. everything before the
    /// blank line. The body is attached separately once it has arrived.
    pub fn parse_head(head: &str) -> Result<Self, ServerError> {
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        if !is_request_line(request_line) {
            return Err(ServerError::Protocol("Bad Request".to_string()));
        }

        let mut parts = request_line.split(' ');
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default().to_string();

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };

        let mut headers = Vec::new();
        for line in lines.filter(|line| !line.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ServerError::Protocol("Malformed header".to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            method,
            path: percent_decode(path),
            query,
            version,
            headers,
            body: Vec::new(),
        })
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Declared body length; zero when the header is absent
    pub fn content_length(&self) -> Result<usize, ServerError> {
        match self.header("Content-Length") {
            None => Ok(0),
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ServerError::Protocol("Invalid Content-Length".to_string())),
        }
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

/// Decodes `%XX` escapes and `+` as space. Invalid escapes are kept verbatim.
pub fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(value) => {
                        out.push(value);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, "application/json", value.to_string().into_bytes())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, "text/plain", body.as_bytes().to_vec())
    }

    /// JSON error body with the status derived from the error kind
    pub fn from_error(err: &ServerError) -> Self {
        Self::json(
            err.status_code(),
            &json!({"status": shared::STATUS_ERROR, "message": err.to_string()}),
        )
    }

    /// Serializes status line, fixed headers, extra headers, blank line, body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.0 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        );
        head.push_str(&format!("Date: {}\r\n", http_date()));
        head.push_str("Connection: close\r\n");
        head.push_str(&format!("Server: {}\r\n", SERVER_NAME));
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Access-Control-Allow-Origin: *\r\n");
        head.push_str("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n");
        head.push_str("Access-Control-Allow-Headers: Content-Type\r\n");
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") => "text/html",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "application/octet-stream",
    }
}

/// Serves a file that sits directly inside `root`. Nested paths and any
/// attempt to climb out of the directory are answered with 404.
pub async fn serve_static(root: &Path, request_path: &str) -> HttpResponse {
    let name = request_path.trim_start_matches('/');
    let candidate = Path::new(name);
    let mut components = candidate.components();
    let single_file = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_file {
        return HttpResponse::text(404, "");
    }

    let full_path = root.join(candidate);
    match tokio::fs::metadata(&full_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return HttpResponse::text(404, ""),
    }

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => HttpResponse::new(200, content_type_for(&full_path), bytes),
        Err(e) => {
            debug!("Failed to read {}: {}", full_path.display(), e);
            HttpResponse::text(404, "")
        }
    }
}
