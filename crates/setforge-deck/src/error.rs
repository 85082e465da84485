//! Error types for the deck layer.

/// Errors produced while interpreting card data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    /// A string could not be parsed as a card id.
    #[error("invalid card id: {0:?}")]
    InvalidCardId(String),
}
