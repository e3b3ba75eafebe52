use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{parse_decimal, Result, TradeError};
use crate::exchange::signing::{gmocoin_signature, unix_nonce};
use crate::exchange::{optional_decimal, Exchange, OrderResult, Ticker};
use crate::logging::{log_order_submit, ProfileScope};
use crate::secrets::Secrets;
use crate::sizing::{round_to_places, OrderLimits};

const TICKER_PATH: &str = "/public/v1/ticker";
const ORDER_PATH: &str = "/v1/me/sendchildorder";
// 3 days
const MINUTE_TO_EXPIRE: u32 = 4320;

pub const LIMITS: OrderLimits = OrderLimits {
    minimum: 0.001,
    precision: 4,
};

pub struct GmoCoin {
    client: Client,
    public_base: String,
    private_base: String,
    symbol: String,
    product_code: String,
    api_key: String,
    api_secret: String,
}

impl GmoCoin {
    pub fn new(cfg: &Config, secrets: &Secrets, client: Client) -> Self {
        Self {
            client,
            public_base: cfg.gmocoin_public_base.trim_end_matches('/').to_string(),
            private_base: cfg.gmocoin_private_base.trim_end_matches('/').to_string(),
            symbol: cfg.gmocoin_symbol.clone(),
            product_code: cfg.gmocoin_product_code.clone(),
            api_key: secrets.api_key.clone(),
            api_secret: secrets.api_secret.clone(),
        }
    }

    fn market_buy(&self, amount: f64) -> ChildOrder {
        ChildOrder {
            product_code: self.product_code.clone(),
            child_order_type: "MARKET".to_string(),
            side: "BUY".to_string(),
            price: None,
            size: round_to_places(amount, LIMITS.precision),
            minute_to_expire: MINUTE_TO_EXPIRE,
            time_in_force: "GTC".to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
struct ChildOrder {
    product_code: String,
    child_order_type: String,
    side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    size: f64,
    minute_to_expire: u32,
    time_in_force: String,
}

#[derive(Deserialize, Debug)]
struct GmoResp {
    #[serde(default)]
    data: Vec<GmoTicker>,
}

#[derive(Deserialize, Debug)]
struct GmoTicker {
    ask: Option<String>,
    bid: Option<String>,
    high: Option<String>,
    last: String,
    low: Option<String>,
    // Absent only on single-symbol answers; see `select_ticker`.
    #[serde(default)]
    symbol: String,
    timestamp: Option<String>,
    volume: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChildOrderAccepted {
    #[serde(default)]
    child_order_acceptance_id: String,
}

/// Entry quoting `symbol`. A lone entry without a `symbol` field is taken as
/// the answer to the symbol we queried; any other mismatch is an error so one
/// coin is never sized from another coin's price.
fn select_ticker<'a>(data: &'a [GmoTicker], symbol: &str) -> Option<&'a GmoTicker> {
    if let Some(t) = data.iter().find(|t| t.symbol == symbol) {
        return Some(t);
    }
    match data {
        [only] if only.symbol.is_empty() => Some(only),
        _ => None,
    }
}

/// Decode a ticker body, picking the entry for `symbol`.
pub(crate) fn parse_ticker(body: &str, symbol: &str) -> Result<Ticker> {
    let envelope: serde_json::Value = serde_json::from_str(body)?;
    let status = envelope.get("status").and_then(|s| s.as_i64()).unwrap_or(-1);
    if status != 0 {
        return Err(TradeError::Rejected(body.to_string()));
    }
    let resp: GmoResp = serde_json::from_value(envelope)?;

    let t = select_ticker(&resp.data, symbol).ok_or_else(|| TradeError::Rejected(body.to_string()))?;

    let timestamp_ms = t
        .timestamp
        .as_deref()
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.timestamp_millis());

    Ok(Ticker {
        last: parse_decimal("last", &t.last)?,
        bid: optional_decimal("gmocoin", "bid", t.bid.as_deref()),
        ask: optional_decimal("gmocoin", "ask", t.ask.as_deref()),
        high: optional_decimal("gmocoin", "high", t.high.as_deref()),
        low: optional_decimal("gmocoin", "low", t.low.as_deref()),
        volume: optional_decimal("gmocoin", "volume", t.volume.as_deref()),
        timestamp_ms,
    })
}

/// Decode an order response. Accepted only when an acceptance id comes back.
pub(crate) fn parse_order_response(body: &str, product_code: &str, size: f64) -> Result<OrderResult> {
    let accepted: ChildOrderAccepted = serde_json::from_str(body)
        .map_err(|_| TradeError::Rejected(body.to_string()))?;
    if accepted.child_order_acceptance_id.is_empty() {
        return Err(TradeError::Rejected(body.to_string()));
    }

    Ok(OrderResult {
        exchange: "gmocoin",
        order_id: accepted.child_order_acceptance_id,
        status: "ACCEPTED".to_string(),
        pair: product_code.to_string(),
        side: "BUY".to_string(),
        order_type: "MARKET".to_string(),
        amount: size.to_string(),
    })
}

#[async_trait::async_trait]
impl Exchange for GmoCoin {
    fn name(&self) -> &'static str {
        "gmocoin"
    }

    fn pair(&self) -> &str {
        &self.product_code
    }

    fn order_limits(&self) -> OrderLimits {
        LIMITS
    }

    async fn fetch_ticker(&self) -> Result<Ticker> {
        let _scope = ProfileScope::new("gmocoin.ticker");
        let url = format!("{}{}", self.public_base, TICKER_PATH);
        let resp = self.client
            .get(&url)
            .query(&[("symbol", self.symbol.as_str())])
            .send()
            .await?;
        let body = resp.text().await?;
        parse_ticker(&body, &self.symbol)
    }

    async fn place_market_order(&self, amount: f64) -> Result<OrderResult> {
        let _scope = ProfileScope::new("gmocoin.order");
        let order = self.market_buy(amount);
        let body = serde_json::to_vec(&order)?;

        let method = "POST";
        let timestamp = unix_nonce();
        let signature = gmocoin_signature(&self.api_secret, &timestamp, method, ORDER_PATH, &body)?;
        let url = format!("{}{}", self.private_base, ORDER_PATH);

        log_order_submit(
            "gmocoin",
            &self.product_code,
            &order.size.to_string(),
            &String::from_utf8_lossy(&body),
        );

        let resp = self.client
            .post(&url)
            .header("ACCESS-KEY", &self.api_key)
            .header("ACCESS-TIMESTAMP", &timestamp)
            .header("ACCESS-SIGN", &signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let text = resp.text().await?;
        parse_order_response(&text, &self.product_code, order.size)
    }
}
