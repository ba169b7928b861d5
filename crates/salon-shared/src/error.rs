use thiserror::Error;

/// Rejections raised by channel lifecycle operations. None of these are
/// fatal: the offending command becomes a no-op for everyone but the issuer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("No channel named '{0}'")]
    NotFound(String),

    #[error("A channel named '{0}' already exists")]
    DuplicateName(String),

    #[error("The General channel cannot be deleted")]
    Protected,

    #[error("Channel names cannot be empty")]
    InvalidName,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
