use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Account '{account_id}' declares segment '{segment}' which has no registered centroid")]
    UnknownSegment { account_id: String, segment: String },

    #[error("Invalid policy: block={block_threshold} review={review_threshold}: {reason}")]
    InvalidPolicy {
        block_threshold:  u16,
        review_threshold: u16,
        reason:           String,
    },

    #[error("Malformed account record #{index} ({}): {reason}", account_id.as_deref().unwrap_or("<no id>"))]
    MalformedAccount {
        index:      usize,
        account_id: Option<String>,
        reason:     String,
    },

    #[error("Invalid config '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
