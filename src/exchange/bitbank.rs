use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{parse_decimal, Result, TradeError};
use crate::exchange::signing::{bitbank_signature, unix_nonce};
use crate::exchange::{optional_decimal, Exchange, OrderResult, Ticker};
use crate::logging::{log_order_submit, ProfileScope};
use crate::secrets::Secrets;
use crate::sizing::{format_amount, OrderLimits};

const ORDER_PATH: &str = "/v1/user/spot/order";

pub const LIMITS: OrderLimits = OrderLimits {
    minimum: 0.0001,
    precision: 4,
};

pub struct Bitbank {
    client: Client,
    public_base: String,
    private_base: String,
    pair: String,
    api_key: String,
    api_secret: String,
}

impl Bitbank {
    pub fn new(cfg: &Config, secrets: &Secrets, client: Client) -> Self {
        Self {
            client,
            public_base: cfg.bitbank_public_base.trim_end_matches('/').to_string(),
            private_base: cfg.bitbank_private_base.trim_end_matches('/').to_string(),
            pair: cfg.bitbank_pair.clone(),
            api_key: secrets.api_key.clone(),
            api_secret: secrets.api_secret.clone(),
        }
    }

    fn market_buy(&self, amount: f64) -> BitbankOrder {
        BitbankOrder {
            pair: self.pair.clone(),
            amount: format_amount(amount, LIMITS.precision),
            side: "buy".to_string(),
            order_type: "market".to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
struct BitbankOrder {
    pair: String,
    amount: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
}

#[derive(Deserialize, Debug)]
struct BitbankResp<T> {
    success: i64,
    data: Option<T>,
}

#[derive(Deserialize, Debug)]
struct BitbankTicker {
    sell: Option<String>,
    buy: Option<String>,
    high: Option<String>,
    low: Option<String>,
    last: String,
    vol: Option<String>,
    timestamp: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct BitbankOrderData {
    order_id: i64,
    #[serde(default)]
    pair: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    #[serde(rename = "type")]
    order_type: String,
    #[serde(default)]
    start_amount: Option<String>,
    #[serde(default)]
    status: String,
}

/// Decode a `/{pair}/ticker` body.
pub(crate) fn parse_ticker(body: &str) -> Result<Ticker> {
    let resp: BitbankResp<serde_json::Value> = serde_json::from_str(body)?;
    if resp.success != 1 {
        return Err(TradeError::Rejected(body.to_string()));
    }
    let data = resp.data.ok_or_else(|| TradeError::Rejected(body.to_string()))?;
    let t: BitbankTicker = serde_json::from_value(data)?;

    Ok(Ticker {
        last: parse_decimal("last", &t.last)?,
        // bitbank's "buy" is the best bid, "sell" the best ask
        bid: optional_decimal("bitbank", "buy", t.buy.as_deref()),
        ask: optional_decimal("bitbank", "sell", t.sell.as_deref()),
        high: optional_decimal("bitbank", "high", t.high.as_deref()),
        low: optional_decimal("bitbank", "low", t.low.as_deref()),
        volume: optional_decimal("bitbank", "vol", t.vol.as_deref()),
        timestamp_ms: t.timestamp,
    })
}

/// Decode an order response. Anything but `success == 1` is a rejection carrying the raw body.
pub(crate) fn parse_order_response(body: &str, requested_amount: &str) -> Result<OrderResult> {
    let envelope: BitbankResp<serde_json::Value> = serde_json::from_str(body)
        .map_err(|_| TradeError::Rejected(body.to_string()))?;
    if envelope.success != 1 {
        return Err(TradeError::Rejected(body.to_string()));
    }
    let data = envelope.data.ok_or_else(|| TradeError::Rejected(body.to_string()))?;
    let order: BitbankOrderData = serde_json::from_value(data)?;

    Ok(OrderResult {
        exchange: "bitbank",
        order_id: order.order_id.to_string(),
        status: order.status,
        pair: order.pair,
        side: order.side,
        order_type: order.order_type,
        amount: order.start_amount.unwrap_or_else(|| requested_amount.to_string()),
    })
}

#[async_trait::async_trait]
impl Exchange for Bitbank {
    fn name(&self) -> &'static str {
        "bitbank"
    }

    fn pair(&self) -> &str {
        &self.pair
    }

    fn order_limits(&self) -> OrderLimits {
        LIMITS
    }

    async fn fetch_ticker(&self) -> Result<Ticker> {
        let _scope = ProfileScope::new("bitbank.ticker");
        let url = format!("{}/{}/ticker", self.public_base, self.pair);
        let resp = self.client.get(&url).send().await?;
        let body = resp.text().await?;
        parse_ticker(&body)
    }

    async fn place_market_order(&self, amount: f64) -> Result<OrderResult> {
        let _scope = ProfileScope::new("bitbank.order");
        let order = self.market_buy(amount);
        let body = serde_json::to_vec(&order)?;

        let nonce = unix_nonce();
        let signature = bitbank_signature(&self.api_secret, &nonce, &body)?;
        let url = format!("{}{}", self.private_base, ORDER_PATH);

        log_order_submit("bitbank", &self.pair, &order.amount, &String::from_utf8_lossy(&body));

        let resp = self.client
            .post(&url)
            .header("ACCESS-KEY", &self.api_key)
            .header("ACCESS-NONCE", &nonce)
            .header("ACCESS-SIGNATURE", &signature)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let text = resp.text().await?;
        parse_order_response(&text, &order.amount)
    }
}
