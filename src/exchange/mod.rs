use async_trait::async_trait;
use reqwest::Client;
use std::fmt;

use crate::config::Config;
use crate::error::{parse_decimal, Result, TradeError};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::secrets::Secrets;
use crate::sizing::OrderLimits;

pub mod bitbank;
pub mod gmocoin;
pub mod signing;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    Bitbank,
    GmoCoin,
}

impl ExchangeKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bitbank" => Ok(ExchangeKind::Bitbank),
            "gmocoin" | "gmo" => Ok(ExchangeKind::GmoCoin),
            other => Err(TradeError::invalid_parameter(
                "EXCHANGE",
                format!("unknown exchange {:?}", other),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Bitbank => "bitbank",
            ExchangeKind::GmoCoin => "gmocoin",
        }
    }

    pub fn build(self, cfg: &Config, secrets: &Secrets) -> Result<Box<dyn Exchange>> {
        let client = http_client(cfg)?;
        match self {
            ExchangeKind::Bitbank => Ok(Box::new(bitbank::Bitbank::new(cfg, secrets, client))),
            ExchangeKind::GmoCoin => Ok(Box::new(gmocoin::GmoCoin::new(cfg, secrets, client))),
        }
    }
}

fn http_client(cfg: &Config) -> Result<Client> {
    Ok(Client::builder().timeout(cfg.http_timeout()).build()?)
}

/// Quote snapshot. Only `last` is guaranteed; the rest depends on the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub last: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
    pub timestamp_ms: Option<i64>,
}

impl Ticker {
    pub fn from_last(last: f64) -> Self {
        Self {
            last,
            bid: None,
            ask: None,
            high: None,
            low: None,
            volume: None,
            timestamp_ms: None,
        }
    }
}

/// Parse an informational quote field. Sizing only reads `last`, so a bad
/// value here is logged and dropped rather than failing the invocation.
pub(crate) fn optional_decimal(exchange: &str, field: &'static str, value: Option<&str>) -> Option<f64> {
    let raw = value?;
    match parse_decimal(field, raw) {
        Ok(v) => Some(v),
        Err(err) => {
            log(
                Level::Warn,
                Domain::Market,
                "ticker_field_ignored",
                obj(&[("exchange", v_str(exchange)), ("field", v_str(field)), ("msg", v_str(&err.to_string()))]),
            );
            None
        }
    }
}

/// What the exchange told us about an accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub exchange: &'static str,
    pub order_id: String,
    pub status: String,
    pub pair: String,
    pub side: String,
    pub order_type: String,
    pub amount: String,
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{exchange:{} order_id:{} status:{} pair:{} side:{} type:{} amount:{}}}",
            self.exchange, self.order_id, self.status, self.pair, self.side, self.order_type, self.amount
        )
    }
}

#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &'static str;

    /// Instrument the orders are placed on, as the exchange spells it.
    fn pair(&self) -> &str;

    fn order_limits(&self) -> OrderLimits;

    async fn fetch_ticker(&self) -> Result<Ticker>;

    async fn fetch_last_price(&self) -> Result<f64> {
        Ok(self.fetch_ticker().await?.last)
    }

    /// Buy `amount` units at market. `amount` is already sized and rounded.
    async fn place_market_order(&self, amount: f64) -> Result<OrderResult>;
}
