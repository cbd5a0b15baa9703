//! Endpoint and protocol constants for the seller API.
//! Tunable limits live in `config.rs`; these are fixed by the external service.

pub const DEFAULT_CONTENT_BASE_URL: &str = "https://content-api.wildberries.ru";
pub const DEFAULT_FEEDBACK_BASE_URL: &str = "https://feedbacks-api.wildberries.ru";

pub const CARDS_LIST_PATH: &str = "/content/v2/get/cards/list";
pub const FEEDBACKS_PATH: &str = "/api/v1/feedbacks";
pub const QUESTIONS_PATH: &str = "/api/v1/questions";

// Response keys under `data` for each feedback kind
pub const FEEDBACKS_ITEM_KEY: &str = "feedbacks";
pub const QUESTIONS_ITEM_KEY: &str = "questions";

/// The cards endpoint refuses larger pages.
pub const MAX_CATALOG_PAGE_SIZE: usize = 100;

pub const ORDER_NEWEST_FIRST: &str = "dateDesc";

/// Query parameter appended to photo URLs so clients refetch after card edits.
pub const PHOTO_VERSION_PARAM: &str = "wbv";

pub const UNTITLED_PRODUCT: &str = "Untitled";
pub const MISSING_VENDOR_CODE: &str = "-";

/// Store key prefix for per-user seller credentials
pub const CREDENTIAL_KEY_PREFIX: &str = "wb_token:";

/// Constant key used to derive the init-data secret from the bot token.
pub const INIT_DATA_KEY_CONSTANT: &str = "WebAppData";

// Environment variable names
pub const ENV_CONFIG_PATH: &str = "WB_EXPORT_CONFIG";
pub const ENV_CONTENT_BASE_URL: &str = "WB_CONTENT_BASE_URL";
pub const ENV_FEEDBACK_BASE_URL: &str = "WB_FEEDBACK_BASE_URL";
pub const ENV_KV_REST_URL: &str = "KV_REST_API_URL";
pub const ENV_KV_REST_TOKEN: &str = "KV_REST_API_TOKEN";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_API_TOKENS: [&str; 2] = ["WB_API_TOKEN", "B_API_TOKEN"];
