use thiserror::Error;

#[derive(Error, Debug)]
pub enum SellerError {
    /// The seller API answered with a non-success status, an `error: true` payload,
    /// an unexpected shape, or could not be reached at all.
    #[error("Seller API error: {message}")]
    ExternalApi { status: Option<u16>, message: String },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SellerError {
    pub fn external(status: Option<u16>, message: impl Into<String>) -> Self {
        SellerError::ExternalApi {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SellerError::MalformedInput(message.into())
    }

    /// HTTP status carried by an `ExternalApi` error, if the source sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SellerError::ExternalApi { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SellerError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            format!("network error: {}", err)
        };
        SellerError::ExternalApi { status, message }
    }
}

pub type Result<T> = std::result::Result<T, SellerError>;
