//! Relay API credentials and request signing

use base64::prelude::*;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::{
    config::Config,
    errors::{GridError, GridResult},
};

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_KEY: &str = "ACCESS-KEY";
pub const HEADER_SIGN: &str = "ACCESS-SIGN";
pub const HEADER_TIMESTAMP: &str = "ACCESS-TIMESTAMP";
pub const HEADER_PASSPHRASE: &str = "ACCESS-PASSPHRASE";

#[derive(Clone)]
pub struct Credential {
    pub api_key: String,
    pub api_passphrase: String,
    mac: HmacSha256,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("api_passphrase", &self.api_passphrase)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn new(api_key: String, api_secret: &str, api_passphrase: String) -> GridResult<Self> {
        let mac = HmacSha256::new_from_slice(api_secret.as_bytes())
            .map_err(|e| GridError::Config(format!("invalid relay API secret: {e}")))?;
        Ok(Self {
            api_key,
            api_passphrase,
            mac,
        })
    }

    /// `None` unless both key and secret are configured.
    pub fn from_config(config: &Config) -> GridResult<Option<Self>> {
        match (&config.relay_api_key, &config.relay_api_secret) {
            (Some(key), Some(secret)) => Self::new(
                key.clone(),
                secret,
                config.relay_api_passphrase.clone().unwrap_or_default(),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    /// Base64 HMAC-SHA256 over `timestamp + method + path + body`.
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(timestamp.as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        BASE64_STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Headers for one request, signed at `now`.
    pub fn headers(&self, now: DateTime<Utc>, method: &str, path: &str, body: &str) -> Vec<(&'static str, String)> {
        let timestamp = format_timestamp(now);
        let signature = self.sign(&timestamp, method, path, body);
        vec![
            (HEADER_KEY, self.api_key.clone()),
            (HEADER_SIGN, signature),
            (HEADER_TIMESTAMP, timestamp),
            (HEADER_PASSPHRASE, self.api_passphrase.clone()),
        ]
    }
}

/// Millisecond-precision UTC ISO-8601, e.g. `2020-12-08T09:08:57.715Z`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const API_KEY: &str = "985d5b66-57ce-40fb-b714-afc0b9787083";
    const API_SECRET: &str = "chNOOS4KvNXR_Xq4k4c9qsfoKWvnDecLATCRlcBwyKDYnWgO";
    const API_PASSPHRASE: &str = "1234567890";

    fn credential() -> Credential {
        Credential::new(API_KEY.to_string(), API_SECRET, API_PASSPHRASE.to_string()).unwrap()
    }

    #[test]
    fn signs_known_vector() {
        let signature = credential().sign("2020-12-08T09:08:57.715Z", "GET", "/api/v5/account/balance", "");
        assert_eq!(signature, "PJ61e1nb2F2Qd7D8SPiaIcx2gjdELc+o0ygzre9z33k=");
    }

    #[test]
    fn body_changes_signature() {
        let c = credential();
        let empty = c.sign("2025-01-20T10:30:45.123Z", "POST", "/quote", "");
        let body = c.sign("2025-01-20T10:30:45.123Z", "POST", "/quote", r#"{"amount":"1"}"#);
        assert_ne!(empty, body);
        assert!(BASE64_STANDARD.decode(&body).is_ok());
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let now = Utc.with_ymd_and_hms(2020, 12, 8, 9, 8, 57).unwrap() + chrono::Duration::milliseconds(715);
        assert_eq!(format_timestamp(now), "2020-12-08T09:08:57.715Z");
    }

    #[test]
    fn headers_carry_key_and_passphrase() {
        let headers = credential().headers(Utc::now(), "POST", "/quote", "{}");
        assert!(headers.contains(&(HEADER_KEY, API_KEY.to_string())));
        assert!(headers.contains(&(HEADER_PASSPHRASE, API_PASSPHRASE.to_string())));
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn missing_secret_disables_signing() {
        let config = Config {
            relay_api_key: Some("key".to_string()),
            ..Config::default()
        };
        assert!(Credential::from_config(&config).unwrap().is_none());
    }
}
