use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::Credential;

/// Which of the two seller API hosts a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiHost {
    Content,
    Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub host: ApiHost,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(host: ApiHost, path: &'static str) -> Self {
        Self {
            method: ApiMethod::Get,
            host,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(host: ApiHost, path: &'static str, body: Value) -> Self {
        Self {
            method: ApiMethod::Post,
            host,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP capability the sync use cases depend on.
///
/// Implementations return the decoded JSON object on success and map every
/// failure (transport, non-2xx, `error: true` payloads, non-object bodies) to
/// `SellerError::ExternalApi`.
#[async_trait]
pub trait SellerApiPort: Send + Sync {
    async fn send(&self, credential: &Credential, request: ApiRequest) -> Result<Value>;
}

/// Command-style key/value backend (GET / SET / DEL)
#[async_trait]
pub trait KeyValuePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether a value was removed
    async fn delete(&self, key: &str) -> Result<bool>;
}
