//! Canned exchange: a local HTTP server answering fixed bodies per path and
//! recording every request it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use buy_btc::secrets::StaticParameterStore;
use buy_btc::Config;

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: String,
}

pub fn route(path: &'static str, body: &str) -> Route {
    Route { path, status: 200, body: body.to_string() }
}

pub struct CannedExchange {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedExchange {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let recorded = recorded.clone();
                let routes = routes.clone();
                tokio::spawn(async move {
                    let _ = answer(stream, &routes, &recorded).await;
                });
            }
        });

        Self { base: format!("http://{}", addr), requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_to(&self, path: &str) -> Option<Recorded> {
        self.requests().into_iter().find(|r| r.path == path)
    }
}

async fn answer(
    mut stream: TcpStream,
    routes: &[Route],
    recorded: &Mutex<Vec<Recorded>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target.clone(), String::new()),
    };

    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    recorded.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, reply) = match routes.iter().find(|r| r.path == path) {
        Some(r) => (r.status, r.body.clone()),
        None => (404, "not found".to_string()),
    };
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

pub fn store_with_budget(budget: &str) -> StaticParameterStore {
    StaticParameterStore::new()
        .with("buy-btc-apikey", API_KEY)
        .with("buy-btc-apisecret", API_SECRET)
        .with("buy-btc-oneshotbuybudget", budget)
}

pub fn bitbank_config(base: &str) -> Config {
    Config {
        exchange: "bitbank".to_string(),
        bitbank_public_base: base.to_string(),
        bitbank_private_base: base.to_string(),
        http_timeout_secs: 5,
        ..Config::default()
    }
}

pub fn gmocoin_config(base: &str) -> Config {
    Config {
        exchange: "gmocoin".to_string(),
        gmocoin_public_base: base.to_string(),
        gmocoin_private_base: base.to_string(),
        http_timeout_secs: 5,
        ..Config::default()
    }
}

/// An address nothing listens on.
pub fn closed_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
