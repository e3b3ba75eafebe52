//! Minimal HTTP trigger: each request to `/` or `/invoke` runs one invocation.
//!
//! Endpoints:
//!   POST|GET /, /invoke - run one buy, answer with `{body, statusCode}`
//!   GET /health         - liveness

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::config::Config;
use crate::handler::{handle, InvocationRequest};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::secrets::ParameterStore;

/// Largest request head accepted; bodies are truncated to the same size.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub content_length: usize,
}

/// Parse the request line and headers of a raw HTTP/1.1 request head.
pub fn parse_head(head: &str) -> Option<RequestHead> {
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0);

    Some(RequestHead { method, path, content_length })
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// What came off the socket before routing.
#[derive(Debug)]
enum Incoming {
    Request(RequestHead, Vec<u8>),
    /// Peer closed before sending a complete head.
    Closed,
    /// Head larger than `MAX_REQUEST_BYTES` or not an HTTP request line.
    BadHead,
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Incoming> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        if let Some(end) = find_head_end(&buf) {
            break end;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Ok(Incoming::BadHead);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Incoming::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = match parse_head(&String::from_utf8_lossy(&buf[..head_end])) {
        Some(h) => h,
        None => return Ok(Incoming::BadHead),
    };
    let wanted = head.content_length.min(MAX_REQUEST_BYTES);
    let mut body = buf[head_end..].to_vec();
    while body.len() < wanted {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(wanted);
    Ok(Incoming::Request(head, body))
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        _ => "Error",
    }
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

async fn serve_connection(
    mut stream: TcpStream,
    cfg: Arc<Config>,
    store: Arc<dyn ParameterStore>,
) -> std::io::Result<()> {
    // The deadline covers reading the request only, not the invocation.
    let incoming = timeout(cfg.http_timeout(), read_request(&mut stream)).await;
    let (head, body) = match incoming {
        Err(_) => return write_response(&mut stream, 408, r#"{"error":"request timeout"}"#).await,
        Ok(incoming) => match incoming? {
            Incoming::Request(head, body) => (head, body),
            Incoming::Closed => return Ok(()),
            Incoming::BadHead => return write_response(&mut stream, 400, r#"{"error":"bad request"}"#).await,
        },
    };

    match (head.method.as_str(), head.path.as_str()) {
        ("GET", "/health") => write_response(&mut stream, 200, r#"{"status":"ok"}"#).await,
        ("GET" | "POST", "/" | "/invoke") => {
            let request = InvocationRequest::from_body(&body);
            let resp = handle(&cfg, store.as_ref(), &request).await;
            let json = serde_json::to_string(&resp)?;
            write_response(&mut stream, resp.status_code, &json).await
        }
        _ => write_response(&mut stream, 404, r#"{"error":"not found"}"#).await,
    }
}

/// Accept connections until the process is stopped.
pub async fn serve(cfg: Config, store: Box<dyn ParameterStore>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    log(
        Level::Info,
        Domain::System,
        "listening",
        obj(&[("addr", v_str(&cfg.listen_addr)), ("exchange", v_str(&cfg.exchange))]),
    );

    let cfg = Arc::new(cfg);
    let store: Arc<dyn ParameterStore> = Arc::from(store);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                log(Level::Warn, Domain::System, "accept_failed", obj(&[("msg", v_str(&err.to_string()))]));
                continue;
            }
        };
        let cfg = cfg.clone();
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(stream, cfg, store).await {
                log(
                    Level::Warn,
                    Domain::System,
                    "connection_failed",
                    obj(&[("peer", v_str(&peer.to_string())), ("msg", v_str(&err.to_string()))]),
                );
            }
        });
    }
}
