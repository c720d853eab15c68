use std::{env, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;

use crate::pricing::PricingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24);
        Ok(Self {
            port,
            jwt_secret,
            host,
            token_ttl_hours,
        })
    }
}

/// Where and how the storefront reaches the cart API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Pause before the single retry of a failed network round-trip.
    pub retry_backoff: Duration,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout: Duration::from_millis(30_000),
            retry_backoff: Duration::from_millis(250),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url =
            lookup("API_BASE_URL").unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
        let defaults = Self::new(api_base_url);
        let request_timeout =
            millis(&lookup, "API_TIMEOUT_MS")?.unwrap_or(defaults.request_timeout);
        let retry_backoff =
            millis(&lookup, "API_RETRY_BACKOFF_MS")?.unwrap_or(defaults.retry_backoff);
        Ok(Self {
            request_timeout,
            retry_backoff,
            ..defaults
        })
    }
}

impl PricingPolicy {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let discount_rate = match lookup("CART_DISCOUNT_RATE") {
            Some(raw) => raw
                .trim()
                .parse::<Decimal>()
                .with_context(|| format!("CART_DISCOUNT_RATE is not a decimal: {raw}"))?,
            None => defaults.discount_rate(),
        };
        let threshold = integer(&lookup, "CART_FREE_SHIPPING_THRESHOLD")?
            .unwrap_or(defaults.free_shipping_threshold);
        let fee = integer(&lookup, "CART_FLAT_SHIPPING_FEE")?.unwrap_or(defaults.flat_shipping_fee);
        Ok(Self::new(discount_rate, threshold, fee))
    }
}

fn integer(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<i64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .with_context(|| format!("{key} is not an integer: {raw}"))
        })
        .transpose()
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    Ok(integer(lookup, key)?.map(|ms| Duration::from_millis(ms.max(0).unsigned_abs())))
}
