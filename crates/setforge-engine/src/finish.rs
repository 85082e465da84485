//! Terminal conditions and final ranking.

use setforge_deck::has_valid_triple;
use setforge_protocol::{FinishReason, GameState, Standing};

/// Whether `state` is over by the board/deck rules.
///
/// `NoSetsRemain` and `TimeExpired` are decided elsewhere (board repair
/// and the countdown); this only looks at what is left to play.
pub fn termination(state: &GameState) -> Option<FinishReason> {
    if state.board.is_empty() {
        return Some(FinishReason::BoardCleared);
    }
    if state.deck.is_empty() && !has_valid_triple(&state.board) {
        return Some(FinishReason::DeckExhausted);
    }
    None
}

/// Players ranked by score, highest first.
///
/// The sort is stable over `players`, so equal scores keep join order.
/// Ranks are 1..=n with no shared places.
pub fn standings(state: &GameState) -> Vec<Standing> {
    let mut ranked: Vec<_> = state
        .players
        .iter()
        .map(|p| (p.clone(), state.score_of(p)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (player_id, score))| Standing {
            player_id,
            score,
            rank: i as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use setforge_deck::{Card, Color, Count, Shading, Shape, generate_deck};
    use setforge_protocol::{GameStatus, PlayerId, RoomId};

    use super::*;

    fn state(board: Vec<Card>, deck: Vec<Card>) -> GameState {
        let now = Utc::now();
        GameState {
            room_id: RoomId::new("r1"),
            match_id: None,
            status: GameStatus::Active,
            deck,
            board,
            scores: HashMap::new(),
            players: Vec::new(),
            bots: Vec::new(),
            created_at: now,
            updated_at: now,
            sequence_number: 0,
            last_snapshot: None,
            countdown_secs: None,
            finish_reason: None,
        }
    }

    fn no_set_board() -> Vec<Card> {
        vec![
            Card::new(Count::One, Shape::Diamond, Shading::Solid, Color::Red),
            Card::new(Count::One, Shape::Diamond, Shading::Solid, Color::Green),
            Card::new(Count::One, Shape::Diamond, Shading::Striped, Color::Red),
            Card::new(Count::One, Shape::Squiggle, Shading::Solid, Color::Red),
        ]
    }

    #[test]
    fn test_termination_empty_board() {
        let s = state(Vec::new(), generate_deck());
        assert_eq!(termination(&s), Some(FinishReason::BoardCleared));
    }

    #[test]
    fn test_termination_empty_deck_without_sets() {
        let s = state(no_set_board(), Vec::new());
        assert_eq!(termination(&s), Some(FinishReason::DeckExhausted));
    }

    #[test]
    fn test_termination_empty_deck_with_a_set_left() {
        let deck = generate_deck();
        let s = state(deck[..3].to_vec(), Vec::new());
        assert_eq!(termination(&s), None);
    }

    #[test]
    fn test_termination_deck_left_means_not_over() {
        let s = state(no_set_board(), generate_deck()[40..].to_vec());
        assert_eq!(termination(&s), None);
    }

    #[test]
    fn test_standings_break_ties_by_join_order() {
        let mut s = state(Vec::new(), Vec::new());
        s.players = ["a", "b", "c", "d"].into_iter().map(PlayerId::new).collect();
        s.scores = HashMap::from([
            (PlayerId::new("a"), 1),
            (PlayerId::new("b"), 3),
            (PlayerId::new("c"), 1),
        ]);

        let ranked = standings(&s);
        let order: Vec<_> = ranked.iter().map(|r| r.player_id.as_str()).collect();
        assert_eq!(order, ["b", "a", "c", "d"]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 2, 3, 4]);
        assert_eq!(ranked[3].score, 0);
    }
}
