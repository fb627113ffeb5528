//! Naver Search Ad request signing.
//!
//! Each call carries `X-Timestamp` (epoch millis) and an `X-Signature` computed as
//! `base64(HMAC-SHA256(secret, "{timestamp}.{method}.{uri}"))`. Headers are built
//! fresh for every request since the timestamp is part of the signed message.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use sha2::Sha256;

use crate::config::NaverCredentials;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

pub fn sign(timestamp: &str, method: &str, uri: &str, secret_key: &str) -> Result<String> {
    if secret_key.is_empty() {
        return Err(AppError::Config("NAVER_AD_SECRET_KEY is not set".to_string()));
    }
    let message = format!("{timestamp}.{method}.{uri}");
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| AppError::Config(format!("invalid secret key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Authentication headers for one request, stamped with the current time.
pub fn auth_headers(creds: &NaverCredentials, method: &str, uri: &str) -> Result<HeaderMap> {
    auth_headers_at(creds, method, uri, &now_millis().to_string())
}

pub fn auth_headers_at(
    creds: &NaverCredentials,
    method: &str,
    uri: &str,
    timestamp: &str,
) -> Result<HeaderMap> {
    let signature = sign(timestamp, method, uri, &creds.secret_key)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=UTF-8"),
    );
    insert(&mut headers, "x-timestamp", timestamp)?;
    insert(&mut headers, "x-api-key", &creds.api_key)?;
    insert(&mut headers, "x-customer", &creds.customer_id)?;
    insert(&mut headers, "x-signature", &signature)?;
    Ok(headers)
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| AppError::Config(format!("{name} contains characters not allowed in a header")))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
