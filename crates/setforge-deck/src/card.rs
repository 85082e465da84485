//! The card model: four independent attributes with three values each.
//!
//! A card's identity is the string encoding of its attributes, e.g.
//! `"2-oval-striped-green"`. The same encoding is what clients send back
//! when they claim a triple, so [`Card::id`] and [`Card::from_str`] must
//! stay exact inverses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DeckError;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Implemented by every attribute enum so the rules can treat the four
/// attributes uniformly.
pub trait Attribute: Copy + Eq + 'static {
    /// All three values, in canonical order.
    const ALL: [Self; 3];

    /// The lowercase token used in card ids.
    fn token(self) -> &'static str;

    /// Parses the token produced by [`Attribute::token`].
    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.token() == token)
    }
}

/// How many symbols are printed on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Count {
    One,
    Two,
    Three,
}

impl Count {
    /// Numeric value (1, 2 or 3).
    pub fn value(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl Attribute for Count {
    const ALL: [Self; 3] = [Self::One, Self::Two, Self::Three];

    fn token(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Diamond,
    Squiggle,
    Oval,
}

impl Attribute for Shape {
    const ALL: [Self; 3] = [Self::Diamond, Self::Squiggle, Self::Oval];

    fn token(self) -> &'static str {
        match self {
            Self::Diamond => "diamond",
            Self::Squiggle => "squiggle",
            Self::Oval => "oval",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shading {
    Solid,
    Striped,
    Open,
}

impl Attribute for Shading {
    const ALL: [Self; 3] = [Self::Solid, Self::Striped, Self::Open];

    fn token(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Striped => "striped",
            Self::Open => "open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Purple,
}

impl Attribute for Color {
    const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Purple];

    fn token(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Purple => "purple",
        }
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// An immutable card value.
///
/// Two cards with the same attributes are the same card; the full deck
/// contains each combination exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub count: Count,
    pub shape: Shape,
    pub shading: Shading,
    pub color: Color,
}

impl Card {
    pub const fn new(count: Count, shape: Shape, shading: Shading, color: Color) -> Self {
        Self {
            count,
            shape,
            shading,
            color,
        }
    }

    /// Deterministic identity string: `count-shape-shading-color`.
    pub fn id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.count.token(),
            self.shape.token(),
            self.shading.token(),
            self.color.token()
        )
    }

    /// Number of attributes on which `self` and `other` agree (0..=4).
    pub fn shared_attributes(&self, other: &Card) -> usize {
        usize::from(self.count == other.count)
            + usize::from(self.shape == other.shape)
            + usize::from(self.shading == other.shading)
            + usize::from(self.color == other.color)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Card {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DeckError::InvalidCardId(s.to_string());
        let mut parts = s.split('-');
        let count = parts.next().and_then(Count::from_token).ok_or_else(invalid)?;
        let shape = parts.next().and_then(Shape::from_token).ok_or_else(invalid)?;
        let shading = parts.next().and_then(Shading::from_token).ok_or_else(invalid)?;
        let color = parts.next().and_then(Color::from_token).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Card::new(count, shape, shading, color))
    }
}
