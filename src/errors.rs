use thiserror::Error;

/// Errors owned by the core. Authentication failures and quota rejections
/// are deliberately NOT here: those surface as `bool` so the UI decides
/// messaging. Corrupt persisted state is recovered in place (treated as
/// absent) and only logged.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}
