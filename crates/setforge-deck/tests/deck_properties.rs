//! Property tests for the deck rules.

use std::collections::HashMap;

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use setforge_deck::{
    Card, DECK_SIZE, find_valid_triples, generate_deck, is_valid_triple, shuffle,
};

fn any_card() -> impl Strategy<Value = Card> {
    (0..DECK_SIZE).prop_map(|i| generate_deck()[i])
}

/// Reference rule: per attribute, the three values sum to 0 mod 3 exactly
/// when they are all equal or all distinct.
fn reference_rule(a: &Card, b: &Card, c: &Card) -> bool {
    let idx = |card: &Card| -> [usize; 4] {
        [
            card.count as usize,
            card.shape as usize,
            card.shading as usize,
            card.color as usize,
        ]
    };
    let (x, y, z) = (idx(a), idx(b), idx(c));
    (0..4).all(|i| (x[i] + y[i] + z[i]) % 3 == 0)
}

fn multiset(cards: &[Card]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for card in cards {
        *counts.entry(card.id()).or_insert(0) += 1;
    }
    counts
}

proptest! {
    #[test]
    fn shuffle_preserves_multiset(seed in any::<u64>()) {
        let deck = generate_deck();
        let shuffled = shuffle(deck.clone(), &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(shuffled.len(), deck.len());
        prop_assert_eq!(multiset(&shuffled), multiset(&deck));
    }

    #[test]
    fn triple_validity_is_symmetric(a in any_card(), b in any_card(), c in any_card()) {
        let expected = is_valid_triple(&a, &b, &c);
        prop_assert_eq!(is_valid_triple(&a, &c, &b), expected);
        prop_assert_eq!(is_valid_triple(&b, &a, &c), expected);
        prop_assert_eq!(is_valid_triple(&b, &c, &a), expected);
        prop_assert_eq!(is_valid_triple(&c, &a, &b), expected);
        prop_assert_eq!(is_valid_triple(&c, &b, &a), expected);
    }

    #[test]
    fn triple_validity_matches_reference(a in any_card(), b in any_card(), c in any_card()) {
        prop_assert_eq!(is_valid_triple(&a, &b, &c), reference_rule(&a, &b, &c));
    }

    #[test]
    fn found_triples_are_valid_and_unique(seed in any::<u64>()) {
        let board: Vec<Card> = shuffle(generate_deck(), &mut StdRng::seed_from_u64(seed))
            .into_iter()
            .take(12)
            .collect();
        let triples = find_valid_triples(&board);
        let mut keys = std::collections::HashSet::new();
        for t in &triples {
            prop_assert!(is_valid_triple(&t[0], &t[1], &t[2]));
            let mut ids = [t[0].id(), t[1].id(), t[2].id()];
            ids.sort();
            prop_assert!(keys.insert(ids));
        }
    }
}

#[test]
fn test_full_deck_contains_1080_triples() {
    // Any two distinct cards determine exactly one third: 81*80/6.
    assert_eq!(find_valid_triples(&generate_deck()).len(), 1080);
}
