//! Per-connection request handling.
//!
//! Every connection carries exactly one request and one response. The
//! handler buffers bytes until a complete request is framed, dispatches it
//! through the router, writes the reply and closes the stream.
//!
//! Framing depends on [`ProtocolMode`]:
//! - `Line`: the request is the first CRLF-terminated line; the reply is
//!   JSON followed by `\r\n\r\n`.
//! - `Http`: headers end at the first blank line and `Content-Length`
//!   bytes of body follow.
//! - `Auto`: the first line decides. Anything shaped like an HTTP request
//!   line is treated as HTTP, everything else as a line command.

use crate::config::{ProtocolMode, ServerConfig};
use crate::error::ServerError;
use crate::http::{is_request_line, HttpRequest, HttpResponse};
use crate::router::{error_reply, CommandRouter};
use log::{debug, error, warn};
use shared::{LINE_TERMINATOR, RESPONSE_TERMINATOR};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data for {0:?}")]
    Timeout(Duration),
    #[error("peer closed before sending a complete request")]
    Closed,
    #[error("request exceeded {0} bytes")]
    TooLarge(usize),
}

/// A fully framed request
#[derive(Debug)]
enum Frame {
    Line(String),
    Http(HttpRequest),
    BadHttp(ServerError),
    TooLarge { http: bool },
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn first_line(buf: &[u8]) -> Option<String> {
    find(buf, LINE_TERMINATOR).map(|end| String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Runs request work on its own task so a panic turns into an internal
/// error reply instead of tearing down the connection silently.
async fn contained<T, F>(peer: SocketAddr, work: F) -> Result<T, ServerError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|e| {
        error!("Request from {} failed: {}", peer, e);
        ServerError::Internal("Internal server error".to_string())
    })
}

pub struct ConnectionHandler {
    router: CommandRouter,
    mode: ProtocolMode,
    read_timeout: Duration,
    max_request_bytes: usize,
}

impl ConnectionHandler {
    pub fn new(router: CommandRouter, config: &ServerConfig) -> Self {
        Self {
            router,
            mode: config.protocol,
            read_timeout: config.read_timeout,
            max_request_bytes: config.max_request_bytes,
        }
    }

    /// Serves one request on `stream` and closes it
    pub async fn handle<S>(&self, mut stream: S, peer: SocketAddr) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let frame = self.read_frame(&mut stream).await?;

        let (reply, outcome) = match frame {
            Frame::Line(line) => {
                debug!("{} -> {}", peer, line);
                let router = self.router.clone();
                let reply = contained(peer, async move { router.handle_line(&line).await })
                    .await
                    .unwrap_or_else(|e| error_reply(&e));
                (line_bytes(&reply), Ok(()))
            }
            Frame::Http(request) => {
                let target = format!("{} {}", request.method, request.path);
                let router = self.router.clone();
                let response = contained(peer, async move { router.handle_http(&request).await })
                    .await
                    .unwrap_or_else(|e| HttpResponse::from_error(&e));
                debug!("{} -> {} ({})", peer, target, response.status);
                (response.to_bytes(), Ok(()))
            }
            Frame::BadHttp(err) => {
                warn!("Malformed HTTP request from {}: {}", peer, err);
                (HttpResponse::from_error(&err).to_bytes(), Ok(()))
            }
            Frame::TooLarge { http } => {
                let err = ServerError::Protocol("Request too large".to_string());
                let reply = if http {
                    HttpResponse::json(413, &error_reply(&err)).to_bytes()
                } else {
                    line_bytes(&error_reply(&err))
                };
                (reply, Err(ConnectionError::TooLarge(self.max_request_bytes)))
            }
        };

        stream.write_all(&reply).await?;
        stream.flush().await?;
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", peer, e);
        }
        outcome
    }

    async fn read_frame<R>(&self, reader: &mut R) -> Result<Frame, ConnectionError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::with_capacity(1024);
        let mut chunk = [0u8; 4096];

        loop {
            let n = timeout(self.read_timeout, reader.read(&mut chunk))
                .await
                .map_err(|_| ConnectionError::Timeout(self.read_timeout))??;
            if n == 0 {
                return Err(ConnectionError::Closed);
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(frame) = self.try_frame(&buf) {
                return Ok(frame);
            }
            if buf.len() > self.max_request_bytes {
                return Ok(Frame::TooLarge {
                    http: self.looks_like_http(&buf),
                });
            }
        }
    }

    fn looks_like_http(&self, buf: &[u8]) -> bool {
        match self.mode {
            ProtocolMode::Http => true,
            ProtocolMode::Line => false,
            ProtocolMode::Auto => first_line(buf).map_or(false, |line| is_request_line(&line)),
        }
    }

    fn try_frame(&self, buf: &[u8]) -> Option<Frame> {
        let line = first_line(buf)?;
        match self.mode {
            ProtocolMode::Line => Some(Frame::Line(line.trim().to_string())),
            ProtocolMode::Http if !is_request_line(&line) => Some(Frame::BadHttp(
                ServerError::Protocol("Bad Request".to_string()),
            )),
            ProtocolMode::Http => self.try_frame_http(buf),
            ProtocolMode::Auto if is_request_line(&line) => self.try_frame_http(buf),
            ProtocolMode::Auto => Some(Frame::Line(line.trim().to_string())),
        }
    }

    fn try_frame_http(&self, buf: &[u8]) -> Option<Frame> {
        let head_end = find(buf, RESPONSE_TERMINATOR)?;
        let head = String::from_utf8_lossy(&buf[..head_end]);

        let mut request = match HttpRequest::parse_head(&head) {
            Ok(request) => request,
            Err(e) => return Some(Frame::BadHttp(e)),
        };
        let length = match request.content_length() {
            Ok(length) => length,
            Err(e) => return Some(Frame::BadHttp(e)),
        };
        if length > self.max_request_bytes {
            return Some(Frame::TooLarge { http: true });
        }

        let body_start = head_end + RESPONSE_TERMINATOR.len();
        if buf.len() < body_start + length {
            return None;
        }
        request.body = buf[body_start..body_start + length].to_vec();
        Some(Frame::Http(request))
    }
}

fn line_bytes(reply: &serde_json::Value) -> Vec<u8> {
    let mut out = reply.to_string().into_bytes();
    out.extend_from_slice(RESPONSE_TERMINATOR);
    out
}
