//! Board maintenance: dealing, replacing claimed cards, and repairing a
//! board that holds no set while the deck still does.

use std::collections::HashSet;

use setforge_deck::{Card, complete_triple, has_valid_triple};
use setforge_protocol::BOARD_SIZE;

/// Outcome of [`repair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// The board already held a set; nothing moved.
    Playable,
    /// Deck cards were swapped onto the board to create a set.
    Swapped(usize),
    /// Neither the board nor the deck can produce a set.
    Exhausted,
}

/// Deals from the top of `deck` until the board is full or the deck is empty.
pub fn fill(board: &mut Vec<Card>, deck: &mut Vec<Card>) {
    while board.len() < BOARD_SIZE {
        match deck.pop() {
            Some(card) => board.push(card),
            None => break,
        }
    }
}

/// Removes the cards at `positions` and refills.
///
/// Drawn cards take the vacated positions so the rest of the board keeps
/// its order; once the deck runs dry the vacated slots close up.
pub fn replace(board: &mut Vec<Card>, deck: &mut Vec<Card>, positions: &[usize]) {
    let mut vacated = Vec::new();
    for &pos in positions {
        match deck.pop() {
            Some(card) => board[pos] = card,
            None => vacated.push(pos),
        }
    }
    if !vacated.is_empty() {
        vacated.sort_unstable();
        for pos in vacated.into_iter().rev() {
            board.remove(pos);
        }
    }
    fill(board, deck);
}

/// Ensures the board holds at least one set when one can be made.
///
/// Searches board ∪ deck for the triple needing the fewest deck cards,
/// moves those cards onto the board and puts the cards they displace at
/// the bottom of the deck. Board size never changes.
pub fn repair(board: &mut Vec<Card>, deck: &mut Vec<Card>) -> Repair {
    if has_valid_triple(board) {
        return Repair::Playable;
    }
    if deck.is_empty() {
        return Repair::Exhausted;
    }

    let on_board: HashSet<Card> = board.iter().copied().collect();
    let in_deck: HashSet<Card> = deck.iter().copied().collect();
    let pool: Vec<Card> = board.iter().chain(deck.iter()).copied().collect();

    let mut best: Option<[Card; 3]> = None;
    let mut best_cost = usize::MAX;
    'search: for i in 0..pool.len() {
        for j in (i + 1)..pool.len() {
            let third = complete_triple(&pool[i], &pool[j]);
            if third == pool[i] || third == pool[j] {
                continue;
            }
            if !on_board.contains(&third) && !in_deck.contains(&third) {
                continue;
            }
            let triple = [pool[i], pool[j], third];
            let cost = triple.iter().filter(|c| !on_board.contains(c)).count();
            if cost < best_cost {
                best = Some(triple);
                best_cost = cost;
                if cost == 1 {
                    break 'search;
                }
            }
        }
    }

    let Some(triple) = best else {
        return Repair::Exhausted;
    };

    let incoming: Vec<Card> = triple
        .iter()
        .copied()
        .filter(|c| !on_board.contains(c))
        .collect();
    deck.retain(|c| !incoming.contains(c));

    for card in &incoming {
        if board.len() < BOARD_SIZE {
            board.push(*card);
            continue;
        }
        let slot = board.iter().position(|c| !triple.contains(c));
        if let Some(slot) = slot {
            let displaced = std::mem::replace(&mut board[slot], *card);
            deck.insert(0, displaced);
        }
    }

    Repair::Swapped(incoming.len())
}
