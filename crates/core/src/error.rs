/// Result alias that carries the crate-wide [`BeatlaneError`] type.
pub type Result<T> = std::result::Result<T, BeatlaneError>;

/// Common error type for the scheduler core.
#[derive(Debug, thiserror::Error)]
pub enum BeatlaneError {
    /// Free-form message for failures that have no dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration could not be decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// A caller handed the core something it cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Every slot of the note pool is occupied.
    #[error("note pool exhausted ({capacity} slots in use)")]
    PoolExhausted { capacity: usize },
    /// A shared lock was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
}

impl BeatlaneError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for BeatlaneError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatlaneError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
