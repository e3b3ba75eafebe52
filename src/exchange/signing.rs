use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Result, TradeError};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `message` keyed by `secret`, hex-encoded.
pub fn sign_hex(secret: &str, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TradeError::Signing(format!("HMAC error: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// bitbank style: HMAC over `nonce || body`.
pub fn bitbank_signature(secret: &str, nonce: &str, body: &[u8]) -> Result<String> {
    let mut message = Vec::with_capacity(nonce.len() + body.len());
    message.extend_from_slice(nonce.as_bytes());
    message.extend_from_slice(body);
    sign_hex(secret, &message)
}

/// gmocoin style: HMAC over `timestamp || method || path || body`.
pub fn gmocoin_signature(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &[u8],
) -> Result<String> {
    let mut message = Vec::with_capacity(timestamp.len() + method.len() + path.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(method.as_bytes());
    message.extend_from_slice(path.as_bytes());
    message.extend_from_slice(body);
    sign_hex(secret, &message)
}

/// Unix time in seconds as a decimal string. Doubles as nonce and timestamp.
pub fn unix_nonce() -> String {
    chrono::Utc::now().timestamp().to_string()
}
