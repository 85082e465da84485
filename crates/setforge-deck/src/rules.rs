//! Pure deck and triple rules. No state, no I/O.

use std::collections::HashSet;

use rand::Rng;

use crate::card::{Attribute, Card, Color, Count, Shading, Shape};

/// Number of cards in a full deck (3^4).
pub const DECK_SIZE: usize = 81;

/// Produces all 81 cards, one per attribute combination.
///
/// The order is fixed (count, then shape, shading, color), so two calls
/// always return identical sequences. Shuffle separately.
pub fn generate_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for count in Count::ALL {
        for shape in Shape::ALL {
            for shading in Shading::ALL {
                for color in Color::ALL {
                    deck.push(Card::new(count, shape, shading, color));
                }
            }
        }
    }
    deck
}

/// Unbiased Fisher–Yates shuffle, in place.
///
/// Walks from the last index down to 1, swapping each slot with a
/// uniformly drawn index in `[0, i]`.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Returns a shuffled permutation of `items`.
pub fn shuffle<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    shuffle_in_place(&mut items, rng);
    items
}

/// `true` if three values are all equal or pairwise distinct.
fn uniform_or_distinct<T: Eq>(a: T, b: T, c: T) -> bool {
    let all_same = a == b && b == c;
    let all_different = a != b && b != c && a != c;
    all_same || all_different
}

/// Whether `a`, `b`, `c` form a valid triple.
///
/// For each of the four attributes the three values must be all equal or
/// all distinct. Argument order never matters.
pub fn is_valid_triple(a: &Card, b: &Card, c: &Card) -> bool {
    uniform_or_distinct(a.count, b.count, c.count)
        && uniform_or_distinct(a.shape, b.shape, c.shape)
        && uniform_or_distinct(a.shading, b.shading, c.shading)
        && uniform_or_distinct(a.color, b.color, c.color)
}

/// The unique third card that completes a triple with `a` and `b`.
pub fn complete_triple(a: &Card, b: &Card) -> Card {
    Card::new(
        third(a.count, b.count),
        third(a.shape, b.shape),
        third(a.shading, b.shading),
        third(a.color, b.color),
    )
}

fn third<A: Attribute>(a: A, b: A) -> A {
    if a == b {
        return a;
    }
    A::ALL
        .into_iter()
        .find(|v| *v != a && *v != b)
        .unwrap_or(a)
}

/// Dedup key: the three ids in sorted order.
fn triple_key(triple: &[Card; 3]) -> [String; 3] {
    let mut ids = [triple[0].id(), triple[1].id(), triple[2].id()];
    ids.sort();
    ids
}

/// Enumerates every valid triple among `cards`.
///
/// Brute force over all 3-combinations; with a 12-card board that is at
/// most 220 checks. Results come back in enumeration order, deduplicated
/// by sorted id, and callers must not rely on which one comes first.
pub fn find_valid_triples(cards: &[Card]) -> Vec<[Card; 3]> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            for k in (j + 1)..cards.len() {
                let (a, b, c) = (&cards[i], &cards[j], &cards[k]);
                if !is_valid_triple(a, b, c) {
                    continue;
                }
                let triple = [*a, *b, *c];
                if seen.insert(triple_key(&triple)) {
                    found.push(triple);
                }
            }
        }
    }
    found
}

/// `true` if at least one valid triple exists among `cards`.
///
/// Short-circuits, so it is cheaper than `find_valid_triples` when only
/// existence matters.
pub fn has_valid_triple(cards: &[Card]) -> bool {
    let ids: HashSet<Card> = cards.iter().copied().collect();
    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            let needed = complete_triple(&cards[i], &cards[j]);
            if needed != cards[i] && needed != cards[j] && ids.contains(&needed) {
                return true;
            }
        }
    }
    false
}
