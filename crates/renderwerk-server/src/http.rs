// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Just enough HTTP/1.1 to carry one request and one response per connection.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A parsed request line and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    /// Offset of the first body byte in the buffer the head was parsed from.
    pub body_offset: usize,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub head: RequestHead,
    pub body: Vec<u8>,
}

#[derive(Debug)]
pub enum ReadError {
    /// The peer closed the connection before sending anything.
    Empty,
    /// Not parseable as HTTP/1.1.
    Malformed(String),
    /// Declared body exceeds the configured limit.
    TooLarge { declared: usize, limit: usize },
    Io(std::io::Error),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("connection closed before a request arrived"),
            Self::Malformed(reason) => write!(f, "malformed request: {reason}"),
            Self::TooLarge { declared, limit } => {
                write!(f, "request body of {declared} bytes exceeds the {limit} byte limit")
            }
            Self::Io(err) => write!(f, "read failed: {err}"),
        }
    }
}

/// Parse the request line and headers at the start of `data`.
///
/// Returns `Ok(None)` while the blank line ending the head has not arrived.
pub fn parse_request_head(data: &[u8]) -> Result<Option<RequestHead>, ReadError> {
    let Some(header_end) = find_subsequence(data, b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&data[..header_end])
        .map_err(|_| ReadError::Malformed("request head is not UTF-8".into()))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ReadError::Malformed(format!("bad request line {request_line:?}")));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(ReadError::Malformed(format!("unsupported protocol {version}")));
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };

    let mut headers = HashMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ReadError::Malformed(format!("bad header line {line:?}")));
        };
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(Some(RequestHead {
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        query,
        headers,
        body_offset: header_end + 4,
    }))
}

/// Read one request. The body is framed by `Content-Length`; bodies larger
/// than `max_body` are refused before they are read.
pub async fn read_request<S>(stream: &mut S, max_body: usize) -> Result<HttpRequest, ReadError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    let head = loop {
        let n = stream.read(&mut chunk).await.map_err(ReadError::Io)?;
        if n == 0 {
            return Err(if buf.is_empty() {
                ReadError::Empty
            } else {
                ReadError::Malformed("connection closed inside the request head".into())
            });
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head) = parse_request_head(&buf)? {
            break head;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ReadError::Malformed("request head too large".into()));
        }
    };

    let declared = match head.content_length() {
        Some(length) => length,
        None if head.header("content-length").is_some() => {
            return Err(ReadError::Malformed("unparseable Content-Length".into()));
        }
        None => 0,
    };
    if declared > max_body {
        return Err(ReadError::TooLarge {
            declared,
            limit: max_body,
        });
    }

    // Grows with the bytes that arrive, not with the declared length.
    let mut body = buf.split_off(head.body_offset.min(buf.len()));
    if body.len() > declared {
        body.truncate(declared);
    } else if body.len() < declared {
        let remaining = (declared - body.len()) as u64;
        (&mut *stream)
            .take(remaining)
            .read_to_end(&mut body)
            .await
            .map_err(ReadError::Io)?;
        if body.len() < declared {
            return Err(ReadError::Malformed(
                "connection closed inside the request body".into(),
            ));
        }
    }

    Ok(HttpRequest { head, body })
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Form-style decoding: `+` is a space, `%XX` escapes are resolved and
/// invalid UTF-8 is replaced.
fn decode_component(value: &str) -> String {
    let spaced = value.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn json(status: u16, value: &impl serde::Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(err) => Self::new(
                500,
                "text/plain; charset=utf-8",
                format!("failed to serialise response: {err}").into_bytes(),
            ),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// Write `response` with `Connection: close` framing.
pub async fn write_response<S>(stream: &mut S, response: &HttpResponse) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason_phrase(response.status),
        response.content_type,
        response.body.len()
    );
    for (name, value) in &response.headers {
        // Header values must stay on one line.
        let value: String = value.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await
}
