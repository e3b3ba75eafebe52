/// Runtime configuration, read from the environment on every start.
///
/// Secrets never live here: the API key, secret and budget come from the
/// parameter store named by `param_*` at invocation time.
#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: String,
    pub bitbank_public_base: String,
    pub bitbank_private_base: String,
    pub bitbank_pair: String,
    pub gmocoin_public_base: String,
    pub gmocoin_private_base: String,
    pub gmocoin_symbol: String,
    pub gmocoin_product_code: String,
    pub param_api_key: String,
    pub param_api_secret: String,
    pub param_budget: String,
    pub param_source: String,
    pub param_file: String,
    pub http_timeout_secs: u64,
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: "bitbank".to_string(),
            bitbank_public_base: "https://public.bitbank.cc".to_string(),
            bitbank_private_base: "https://api.bitbank.cc".to_string(),
            bitbank_pair: "eth_jpy".to_string(),
            gmocoin_public_base: "https://api.coin.z.com".to_string(),
            gmocoin_private_base: "https://api.coin.z.com".to_string(),
            gmocoin_symbol: "ETH".to_string(),
            gmocoin_product_code: "ETH_JPY".to_string(),
            param_api_key: "buy-btc-apikey".to_string(),
            param_api_secret: "buy-btc-apisecret".to_string(),
            param_budget: "buy-btc-oneshotbuybudget".to_string(),
            param_source: "env".to_string(),
            param_file: "./parameters.json".to_string(),
            http_timeout_secs: 10,
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            exchange: std::env::var("EXCHANGE").map(|v| v.to_lowercase()).unwrap_or(d.exchange),
            bitbank_public_base: std::env::var("BITBANK_PUBLIC_BASE").unwrap_or(d.bitbank_public_base),
            bitbank_private_base: std::env::var("BITBANK_PRIVATE_BASE").unwrap_or(d.bitbank_private_base),
            bitbank_pair: std::env::var("BITBANK_PAIR").unwrap_or(d.bitbank_pair),
            gmocoin_public_base: std::env::var("GMOCOIN_PUBLIC_BASE").unwrap_or(d.gmocoin_public_base),
            gmocoin_private_base: std::env::var("GMOCOIN_PRIVATE_BASE").unwrap_or(d.gmocoin_private_base),
            gmocoin_symbol: std::env::var("GMOCOIN_SYMBOL").unwrap_or(d.gmocoin_symbol),
            gmocoin_product_code: std::env::var("GMOCOIN_PRODUCT_CODE").unwrap_or(d.gmocoin_product_code),
            param_api_key: std::env::var("PARAM_API_KEY").unwrap_or(d.param_api_key),
            param_api_secret: std::env::var("PARAM_API_SECRET").unwrap_or(d.param_api_secret),
            param_budget: std::env::var("PARAM_BUDGET").unwrap_or(d.param_budget),
            param_source: std::env::var("PARAM_SOURCE").map(|v| v.to_lowercase()).unwrap_or(d.param_source),
            param_file: std::env::var("PARAM_FILE").unwrap_or(d.param_file),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.http_timeout_secs),
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(d.listen_addr),
        }
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs.max(1))
    }
}
