pub mod http_client;
pub mod kv_rest_adapter;

pub use http_client::ReqwestSellerApi;
pub use kv_rest_adapter::RestKeyValueAdapter;
