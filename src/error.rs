use thiserror::Error;

/// Every way a single buy invocation can fail.
///
/// Exchange and transport errors display verbatim so the caller sees the
/// exchange's own words in the failure response.
#[derive(Error, Debug)]
pub enum TradeError {
    /// DNS, connect, TLS or timeout failure talking to the exchange.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the JSON shape we expected.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// A numeric field arrived as a string that does not parse.
    #[error("malformed {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    /// The exchange answered but did not accept the request. Holds the raw body.
    #[error("{0}")]
    Rejected(String),

    #[error("parameter not found: {0}")]
    MissingParameter(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("parameter store error: {0}")]
    ParameterStore(String),

    #[error("invalid price: {0}")]
    InvalidPrice(f64),

    #[error("invalid budget: {0}")]
    InvalidBudget(f64),

    /// Sized quantity is not a finite number, e.g. `budget / price` overflowed.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("signing error: {0}")]
    Signing(String),
}

impl TradeError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        TradeError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly tag used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TradeError::Transport(_) => "transport",
            TradeError::Decode(_) | TradeError::MalformedField { .. } => "decode",
            TradeError::Rejected(_) => "rejected",
            TradeError::MissingParameter(_)
            | TradeError::InvalidParameter { .. }
            | TradeError::ParameterStore(_) => "config",
            TradeError::InvalidPrice(_)
            | TradeError::InvalidBudget(_)
            | TradeError::InvalidAmount(_) => "sizing",
            TradeError::Signing(_) => "signing",
        }
    }
}

pub type Result<T> = std::result::Result<T, TradeError>;

/// Parse a decimal string field from an exchange payload.
pub fn parse_decimal(field: &'static str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| TradeError::MalformedField {
            field,
            value: value.to_string(),
        })
}
