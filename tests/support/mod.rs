#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use wb_seller_export::app::ports::{ApiRequest, KeyValuePort, SellerApiPort};
use wb_seller_export::error::{Result, SellerError};
use wb_seller_export::types::Credential;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value> + Send + Sync>;

/// Seller API double answering from a closure and recording every request.
pub struct ScriptedSellerApi {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedSellerApi {
    pub fn new(handler: impl Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SellerApiPort for ScriptedSellerApi {
    async fn send(&self, _credential: &Credential, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// Key/value backend that fails every call, like an unreachable store.
pub struct FailingKeyValue;

#[async_trait]
impl KeyValuePort for FailingKeyValue {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(SellerError::external(None, "connection refused"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(SellerError::external(Some(503), "service unavailable"))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(SellerError::external(None, "connection refused"))
    }
}

pub fn credential() -> Credential {
    Credential::parse("test-seller-token").unwrap()
}

pub fn query_usize(request: &ApiRequest, key: &str) -> usize {
    request.query_param(key).unwrap().parse().unwrap()
}
