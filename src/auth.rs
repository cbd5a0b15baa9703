//! Verification of signed mini-app init data.
//!
//! The chat platform hands the mini app a URL-encoded `initData` string whose
//! `hash` field is an HMAC-SHA256 over every other field. The secret is itself
//! HMAC-SHA256 of the bot token keyed by the constant `WebAppData`. Callers
//! verify before trusting the embedded user id; the sync core never calls this.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::INIT_DATA_KEY_CONSTANT;
use crate::error::{Result, SellerError};

type HmacSha256 = Hmac<Sha256>;

const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";
const USER_FIELD: &str = "user";

/// Init data that passed signature and freshness checks
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedInitData {
    /// Every signed field, `hash` excluded
    pub fields: BTreeMap<String, String>,
    pub auth_date: i64,
    pub user_id: Option<i64>,
}

pub struct InitDataVerifier {
    bot_token: String,
    max_age_seconds: i64,
}

impl InitDataVerifier {
    pub fn new(bot_token: impl Into<String>, max_age_seconds: u64) -> Self {
        Self {
            bot_token: bot_token.into(),
            max_age_seconds: i64::try_from(max_age_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Check signature and age of `init_data` as of `now` (unix seconds).
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn verify(&self, init_data: &str, now: i64) -> Result<VerifiedInitData> {
        let mut fields: BTreeMap<String, String> = url::form_urlencoded::parse(init_data.trim().as_bytes())
            .into_owned()
            .collect();

        let provided = fields
            .remove(HASH_FIELD)
            .ok_or_else(|| unauthorized("init data has no hash"))?;
        let provided = hex::decode(provided.trim()).map_err(|_| unauthorized("hash is not hex"))?;

        let mut mac = self.mac()?;
        mac.update(check_string(&fields).as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| unauthorized("signature mismatch"))?;

        let auth_date = fields
            .get(AUTH_DATE_FIELD)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| unauthorized("auth_date missing or invalid"))?;
        if now.saturating_sub(auth_date) > self.max_age_seconds {
            return Err(unauthorized("init data is stale"));
        }

        let user_id = fields.get(USER_FIELD).and_then(|raw| parse_user_id(raw));
        debug!(auth_date, ?user_id, "Init data verified");

        Ok(VerifiedInitData {
            fields,
            auth_date,
            user_id,
        })
    }

    /// Hex signature for the given fields; what the platform puts in `hash`.
    pub fn sign(&self, fields: &BTreeMap<String, String>) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(check_string(fields).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha256> {
        let mut secret = HmacSha256::new_from_slice(INIT_DATA_KEY_CONSTANT.as_bytes())
            .map_err(|_| unauthorized("invalid key"))?;
        secret.update(self.bot_token.as_bytes());
        let secret = secret.finalize().into_bytes();
        HmacSha256::new_from_slice(&secret).map_err(|_| unauthorized("invalid key"))
    }
}

/// `key=value` lines sorted by key, joined with `\n`
fn check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_user_id(raw: &str) -> Option<i64> {
    let user: Value = serde_json::from_str(raw).ok()?;
    match user.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unauthorized(reason: &str) -> SellerError {
    SellerError::Unauthorized(reason.to_string())
}
