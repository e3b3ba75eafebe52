//! Structured JSON-lines logging.
//!
//! One record per line on stdout, where the function runtime collects it.
//! Records carry a run id and sequence number so the lines of one invocation
//! can be grouped and ordered. Credential fields are redacted before output.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::exchange::{OrderResult, Ticker};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Market,  // Ticker fetches
    Sizing,  // Budget to quantity
    Exec,    // Order submission and result
    Secrets, // Parameter store lookups
    System,  // Invocation lifecycle, server
    Profile, // Outbound call timing
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Market => "market",
            Domain::Sizing => "sizing",
            Domain::Exec => "exec",
            Domain::Secrets => "secrets",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    file: Option<Mutex<File>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));

        // Optional copy of every record, e.g. for local runs
        let file = std::env::var("LOG_FILE").ok().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(f) => Some(Mutex::new(f)),
                Err(err) => {
                    eprintln!("[log] failed to open {}: {}", path, err);
                    None
                }
            }
        });

        RunContext { run_id, file }
    })
}

const REDACTED_KEYS: [&str; 7] = [
    "ACCESS-KEY",
    "ACCESS-SIGNATURE",
    "ACCESS-SIGN",
    "api_key",
    "api_secret",
    "signature",
    "authorization",
];

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in REDACTED_KEYS {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["exchange", "pair", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    emit_record(level, domain.as_str(), event, fields);
}

fn build_record(
    run_id: &str,
    level: Level,
    component: &str,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let line = build_record(&ctx.run_id, level, component, event, fields).to_string();

    if let Some(file) = &ctx.file {
        if let Ok(mut f) = file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    }
    println!("{}", line);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

fn v_opt(n: Option<f64>) -> Value {
    n.map(v_num).unwrap_or(Value::Null)
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_ticker(exchange: &str, pair: &str, ticker: &Ticker) {
    log(
        Level::Info,
        Domain::Market,
        "ticker",
        obj(&[
            ("exchange", v_str(exchange)),
            ("pair", v_str(pair)),
            ("last", v_num(ticker.last)),
            ("bid", v_opt(ticker.bid)),
            ("ask", v_opt(ticker.ask)),
            ("high", v_opt(ticker.high)),
            ("low", v_opt(ticker.low)),
            ("volume", v_opt(ticker.volume)),
            ("exchange_ts", ticker.timestamp_ms.map(|t| json!(t)).unwrap_or(Value::Null)),
        ]),
    );
}

pub fn log_sizing(exchange: &str, price: f64, budget: f64, minimum: f64, precision: u32, amount: f64) {
    log(
        Level::Info,
        Domain::Sizing,
        "amount",
        obj(&[
            ("exchange", v_str(exchange)),
            ("price", v_num(price)),
            ("budget", v_num(budget)),
            ("minimum", v_num(minimum)),
            ("precision", json!(precision)),
            ("amount", v_num(amount)),
            ("floored", json!(amount == minimum)),
        ]),
    );
}

pub fn log_order_submit(exchange: &str, pair: &str, amount: &str, payload: &str) {
    log(
        Level::Info,
        Domain::Exec,
        "submit",
        obj(&[
            ("exchange", v_str(exchange)),
            ("pair", v_str(pair)),
            ("amount", v_str(amount)),
            ("payload", v_str(payload)),
        ]),
    );
}

pub fn log_order_result(result: &OrderResult) {
    log(
        Level::Info,
        Domain::Exec,
        "accepted",
        obj(&[
            ("exchange", v_str(result.exchange)),
            ("pair", v_str(&result.pair)),
            ("order_id", v_str(&result.order_id)),
            ("status", v_str(&result.status)),
            ("amount", v_str(&result.amount)),
        ]),
    );
}

pub fn log_invocation(status_code: u16, error_kind: Option<&str>, detail: &str, elapsed_ms: f64) {
    let level = if status_code == 200 { Level::Info } else { Level::Error };
    log(
        level,
        Domain::System,
        "invocation",
        obj(&[
            ("status_code", json!(status_code)),
            ("error_kind", error_kind.map(v_str).unwrap_or(Value::Null)),
            ("msg", v_str(detail)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits the elapsed time of a scope when dropped.
pub struct ProfileScope {
    label: &'static str,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
            enabled: Self::should_sample(),
        }
    }

    fn should_sample() -> bool {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|p| {
                if p >= 1.0 {
                    true
                } else if p <= 0.0 {
                    false
                } else {
                    let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
                    let bucket = (seq % 10_000) as f64 / 10_000.0;
                    bucket < p
                }
            })
            .unwrap_or(true)
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Trace,
            Domain::Profile,
            "profile",
            obj(&[("label", v_str(self.label)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
