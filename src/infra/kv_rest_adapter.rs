use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use std::time::Duration;

use crate::app::ports::KeyValuePort;
use crate::error::{Result, SellerError};

/// Key/value backend speaking the command-over-HTTP protocol: each call POSTs
/// a JSON array such as `["SET", key, value]` and reads `{"result": ...}`.
pub struct RestKeyValueAdapter {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestKeyValueAdapter {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SellerError::Config(format!("Failed to build KV client: {}", e)))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, args: Value) -> Result<Value> {
        let resp = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&args)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SellerError::external(
                Some(status.as_u16()),
                format!("KV store returned {}: {}", status.as_u16(), body),
            ));
        }
        parse_reply(&body)
    }
}

/// Extract `result` from a reply, turning `{"error": ...}` into a failure.
pub fn parse_reply(body: &str) -> Result<Value> {
    let reply: Value = serde_json::from_str(body)
        .map_err(|_| SellerError::external(None, "KV store returned a non-JSON reply"))?;
    if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(SellerError::external(None, format!("KV store error: {}", message)));
    }
    Ok(reply.get("result").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl KeyValuePort for RestKeyValueAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.command(json!(["GET", key])).await?;
        Ok(match result {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(json!(["SET", key, value])).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = self.command(json!(["DEL", key])).await?;
        Ok(result.as_i64().unwrap_or(0) > 0)
    }
}
