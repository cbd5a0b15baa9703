use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, warn};

use crate::app::ports::{ApiHost, ApiMethod, ApiRequest, SellerApiPort};
use crate::config::SellerApiConfig;
use crate::error::{Result, SellerError};
use crate::observability::metrics;
use crate::types::Credential;

// How much of an error body is echoed back in the error message
const ERROR_BODY_PREVIEW: usize = 300;

pub struct ReqwestSellerApi {
    client: reqwest::Client,
    content_base_url: String,
    feedback_base_url: String,
}

impl ReqwestSellerApi {
    pub fn new(config: &SellerApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SellerError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            content_base_url: config.content_base_url.trim_end_matches('/').to_string(),
            feedback_base_url: config.feedback_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, host: ApiHost, path: &str) -> String {
        let base = match host {
            ApiHost::Content => &self.content_base_url,
            ApiHost::Feedback => &self.feedback_base_url,
        };
        format!("{}{}", base, path)
    }
}

#[async_trait]
impl SellerApiPort for ReqwestSellerApi {
    async fn send(&self, credential: &Credential, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(request.host, request.path);
        debug!(%url, method = ?request.method, "Seller API request");

        let builder = match request.method {
            ApiMethod::Get => self.client.get(&url),
            ApiMethod::Post => self.client.post(&url),
        };
        let mut builder = builder
            .header(AUTHORIZATION, credential.as_str())
            .header(ACCEPT, "application/json")
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            metrics::api::request_failed(request.path);
            SellerError::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            metrics::api::request_failed(request.path);
            warn!(%url, status = status.as_u16(), "Seller API returned an error status");
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(SellerError::external(
                Some(status.as_u16()),
                format!("Seller API returned {}: {}", status.as_u16(), preview),
            ));
        }

        let payload = decode_payload(&text).map_err(|e| {
            metrics::api::request_failed(request.path);
            e
        })?;
        metrics::api::request_succeeded(request.path);
        Ok(payload)
    }
}

/// Decode a 2xx body, surfacing application-level error flags as failures.
pub fn decode_payload(text: &str) -> Result<Value> {
    let payload: Value = serde_json::from_str(text)
        .map_err(|_| SellerError::external(None, "Seller API returned a non-JSON response"))?;

    let Some(object) = payload.as_object() else {
        return Err(SellerError::external(None, "Unexpected Seller API response format"));
    };

    if object.get("error").and_then(Value::as_bool) == Some(true) {
        let message = object
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown Seller API error");
        return Err(SellerError::external(None, message));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_object() {
        let payload = decode_payload(r#"{"data":{"questions":[]},"error":false}"#).unwrap();
        assert!(payload["data"]["questions"].is_array());
    }

    #[test]
    fn test_decode_surfaces_error_flag() {
        let err = decode_payload(r#"{"error":true,"errorText":"token expired"}"#).unwrap_err();
        match err {
            SellerError::ExternalApi { status, message } => {
                assert_eq!(status, None);
                assert_eq!(message, "token expired");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_error_flag_without_text() {
        let err = decode_payload(r#"{"error":true,"errorText":""}"#).unwrap_err();
        assert_eq!(err.to_string(), "Seller API error: Unknown Seller API error");
    }

    #[test]
    fn test_decode_rejects_non_json_and_non_object() {
        assert!(matches!(decode_payload("<html>"), Err(SellerError::ExternalApi { .. })));
        assert!(matches!(decode_payload("[1,2]"), Err(SellerError::ExternalApi { .. })));
    }

    #[test]
    fn test_url_for_joins_without_double_slash() {
        let config = SellerApiConfig {
            content_base_url: "https://content.example.com/".to_string(),
            ..SellerApiConfig::default()
        };
        let api = ReqwestSellerApi::new(&config).unwrap();
        assert_eq!(
            api.url_for(ApiHost::Content, "/content/v2/get/cards/list"),
            "https://content.example.com/content/v2/get/cards/list"
        );
    }
}
