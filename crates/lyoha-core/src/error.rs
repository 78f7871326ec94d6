use thiserror::Error;

#[derive(Debug, Error)]
pub enum LyohaError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value that makes the bot unusable (zero context capacity, no trigger words, …).
    /// Raised at construction time; never recovered from.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type Result<T> = std::result::Result<T, LyohaError>;
