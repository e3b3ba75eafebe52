//! One buy invocation: ticker, size, order, mapped to a response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::exchange::{Exchange, ExchangeKind, OrderResult};
use crate::logging::{log_invocation, log_order_result, log_sizing, log_ticker};
use crate::secrets::{ParameterNames, ParameterStore, Secrets};
use crate::sizing::calc_amount;

/// Trigger payload. Any JSON object is accepted; its content is not used.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvocationRequest {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl InvocationRequest {
    /// Lenient parse: an empty or non-object body is treated as an empty request.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub body: String,
    pub status_code: u16,
}

impl InvocationResponse {
    pub fn ok(result: &OrderResult) -> Self {
        Self {
            body: format!("res:{}", result),
            status_code: 200,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            body: message.into(),
            status_code: 400,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Fetch the last price, size the order from `budget`, place it.
pub async fn execute_buy(exchange: &dyn Exchange, budget: f64) -> Result<OrderResult> {
    let ticker = exchange.fetch_ticker().await?;
    log_ticker(exchange.name(), exchange.pair(), &ticker);

    let limits = exchange.order_limits();
    let amount = calc_amount(ticker.last, budget, limits)?;
    log_sizing(exchange.name(), ticker.last, budget, limits.minimum, limits.precision, amount);

    let result = exchange.place_market_order(amount).await?;
    log_order_result(&result);
    Ok(result)
}

/// Load secrets, build the configured exchange and buy.
pub async fn invoke(cfg: &Config, store: &dyn ParameterStore) -> Result<OrderResult> {
    let kind = ExchangeKind::from_name(&cfg.exchange)?;
    let secrets = Secrets::load(store, &ParameterNames::from_config(cfg)).await?;
    let exchange = kind.build(cfg, &secrets)?;
    execute_buy(exchange.as_ref(), secrets.budget).await
}

/// Run one invocation and map the outcome to `{body, statusCode}`.
pub async fn handle(
    cfg: &Config,
    store: &dyn ParameterStore,
    _request: &InvocationRequest,
) -> InvocationResponse {
    let started = Instant::now();
    let outcome = invoke(cfg, store).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(result) => {
            let resp = InvocationResponse::ok(&result);
            log_invocation(resp.status_code, None, &resp.body, elapsed_ms);
            resp
        }
        Err(err) => {
            let resp = InvocationResponse::error(err.to_string());
            log_invocation(resp.status_code, Some(err.kind()), &resp.body, elapsed_ms);
            resp
        }
    }
}
