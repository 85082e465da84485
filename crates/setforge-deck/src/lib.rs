//! Deck and triple rules for Setforge.
//!
//! Everything here is a pure function of its inputs:
//!
//! - [`generate_deck`]: the 81-card deck, in a fixed order
//! - [`shuffle`]: unbiased Fisher–Yates permutation
//! - [`is_valid_triple`]: the per-attribute "all same or all different" rule
//! - [`find_valid_triples`]: every valid triple on a board
//!
//! The game engine, bots and tests all build on these; none of them keep
//! their own copy of the rules.

mod card;
mod error;
mod rules;

pub use card::{Attribute, Card, Color, Count, Shading, Shape};
pub use error::DeckError;
pub use rules::{
    DECK_SIZE, complete_triple, find_valid_triples, generate_deck, has_valid_triple,
    is_valid_triple, shuffle, shuffle_in_place,
};
