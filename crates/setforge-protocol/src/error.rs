//! Error types for the protocol layer.

/// Errors raised while encoding or decoding shared types.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Malformed, truncated, or mistyped input.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Decoded fine but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
