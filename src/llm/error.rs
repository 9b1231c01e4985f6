use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Empty key, model or base URL; client construction failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection refused, DNS, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status or a response without choices.
    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),
}
