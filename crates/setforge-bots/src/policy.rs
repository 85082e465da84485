//! How a bot picks which set to claim.
//!
//! Every policy sees only the face-up board, exactly like a human.

use std::sync::Mutex;

use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use setforge_deck::{Attribute, Card, find_valid_triples};
use setforge_protocol::Difficulty;

/// Picks one valid triple from a board, or `None` if there is none.
pub trait ClaimPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn choose(&self, board: &[Card]) -> Option<[Card; 3]>;
}

/// Builds the policy for a difficulty.
pub fn policy_for(difficulty: Difficulty, seed: Option<u64>) -> Box<dyn ClaimPolicy> {
    match difficulty {
        Difficulty::Easy => Box::new(RandomPolicy::new(seed)),
        Difficulty::Medium => Box::new(SimilarityPolicy::new(seed)),
        Difficulty::Hard => Box::new(GreedyPolicy),
    }
}

fn seeded(seed: Option<u64>) -> Mutex<StdRng> {
    Mutex::new(match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    })
}

// ---------------------------------------------------------------------------
// Random
// ---------------------------------------------------------------------------

/// Uniform choice among all sets on the board.
pub struct RandomPolicy {
    rng: Mutex<StdRng>,
}

impl RandomPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

impl ClaimPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&self, board: &[Card]) -> Option<[Card; 3]> {
        let triples = find_valid_triples(board);
        let mut rng = self.rng.lock().ok()?;
        triples.choose(&mut *rng).copied()
    }
}

// ---------------------------------------------------------------------------
// Similarity-weighted
// ---------------------------------------------------------------------------

/// Favours sets whose cards look alike, the ones people spot first.
///
/// Weight is `1 + number of attributes shared by all three cards`.
pub struct SimilarityPolicy {
    rng: Mutex<StdRng>,
}

impl SimilarityPolicy {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

/// Number of attributes on which all three cards agree.
pub fn uniform_attributes(t: &[Card; 3]) -> usize {
    fn same<A: Attribute>(a: A, b: A, c: A) -> bool {
        a == b && b == c
    }
    let [a, b, c] = t;
    [
        same(a.count, b.count, c.count),
        same(a.shape, b.shape, c.shape),
        same(a.shading, b.shading, c.shading),
        same(a.color, b.color, c.color),
    ]
    .into_iter()
    .filter(|s| *s)
    .count()
}

impl ClaimPolicy for SimilarityPolicy {
    fn name(&self) -> &'static str {
        "similarity"
    }

    fn choose(&self, board: &[Card]) -> Option<[Card; 3]> {
        let triples = find_valid_triples(board);
        if triples.is_empty() {
            return None;
        }
        let weights = triples.iter().map(|t| 1 + uniform_attributes(t));
        let dist = WeightedIndex::new(weights).ok()?;
        let mut rng = self.rng.lock().ok()?;
        Some(triples[dist.sample(&mut *rng)])
    }
}

// ---------------------------------------------------------------------------
// Greedy
// ---------------------------------------------------------------------------

/// Takes the set that destroys the most other sets on the board, leaving
/// opponents as little as possible. Deterministic.
pub struct GreedyPolicy;

impl ClaimPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn choose(&self, board: &[Card]) -> Option<[Card; 3]> {
        let triples = find_valid_triples(board);
        triples
            .iter()
            .enumerate()
            .max_by_key(|(i, t)| {
                let overlap = triples.iter().filter(|o| o.iter().any(|c| t.contains(c))).count();
                // Earlier wins ties.
                (overlap, std::cmp::Reverse(*i))
            })
            .map(|(_, t)| *t)
    }
}
