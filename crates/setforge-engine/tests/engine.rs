//! Integration tests for the game engine against in-process collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use setforge_deck::{find_valid_triples, is_valid_triple};
use setforge_engine::{
    EngineError, GameEngine, GameSettings, HistoryWriter, InMemoryDirectory, InMemoryHistory,
    MatchStatus, RoomDirectory,
};
use setforge_protocol::{
    BOARD_SIZE, BotSeat, ClaimError, Difficulty, FinishReason, GameState, GameStatus, PlayerId, PlayerKind, RoomId,
};
use setforge_store::{ResilientStore, StateStore};

// =========================================================================
// Helpers
// =========================================================================

struct Harness {
    engine: Arc<GameEngine>,
    history: Arc<InMemoryHistory>,
    directory: Arc<InMemoryDirectory>,
}

fn harness() -> Harness {
    let history = Arc::new(InMemoryHistory::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let engine = GameEngine::new(
        Arc::new(ResilientStore::memory_only()),
        history.clone(),
        directory.clone(),
    );
    Harness {
        engine: Arc::new(engine),
        history,
        directory,
    }
}

fn ids(names: &[&str]) -> Vec<PlayerId> {
    names.iter().map(|n| PlayerId::new(*n)).collect()
}

fn room() -> RoomId {
    RoomId::new("r1")
}

fn seeded() -> GameSettings {
    GameSettings::default().with_seed(7)
}

/// Ids of some valid triple on the board.
fn a_valid_claim(state: &GameState) -> Vec<String> {
    let triples = find_valid_triples(&state.board);
    let triple = triples.first().expect("active board always holds a set");
    triple.iter().map(|c| c.id()).collect()
}

/// Ids of three board cards that do not form a set.
fn an_invalid_claim(state: &GameState) -> Vec<String> {
    let b = &state.board;
    for i in 0..b.len() {
        for j in (i + 1)..b.len() {
            for k in (j + 1)..b.len() {
                if !is_valid_triple(&b[i], &b[j], &b[k]) {
                    return vec![b[i].id(), b[j].id(), b[k].id()];
                }
            }
        }
    }
    panic!("board made only of sets");
}

// =========================================================================
// create_game
// =========================================================================

#[tokio::test]
async fn test_create_game_deals_twelve_and_zeroes_scores() {
    let h = harness();
    let state = h
        .engine
        .create_game(&room(), &ids(&["p1", "p2"]), &seeded())
        .await
        .unwrap();

    assert_eq!(state.status, GameStatus::Active);
    assert_eq!(state.board.len(), BOARD_SIZE);
    assert_eq!(state.deck.len(), 69);
    assert_eq!(state.sequence_number, 0);
    assert_eq!(state.score_of(&PlayerId::new("p1")), 0);
    assert_eq!(state.score_of(&PlayerId::new("p2")), 0);
    assert_eq!(state.scores.len(), 2);
    assert!(!find_valid_triples(&state.board).is_empty());
}

#[tokio::test]
async fn test_create_game_persists_snapshot_zero() {
    let h = harness();
    let state = h
        .engine
        .create_game(&room(), &ids(&["p1"]), &seeded())
        .await
        .unwrap();

    let match_id = state.match_id.unwrap();
    let (snapshot_id, snapshot) = h.history.latest_snapshot(match_id).await.unwrap().unwrap();
    assert_eq!(state.last_snapshot, Some(snapshot_id));
    assert_eq!(snapshot.sequence_number, 0);
    assert_eq!(snapshot.board, state.board);

    let current = h.directory.current_match(&room()).await.unwrap().unwrap();
    assert_eq!(current.id, match_id);
    assert_eq!(current.started_at, state.created_at);
}

#[tokio::test]
async fn test_create_game_same_seed_same_deal() {
    let a = harness();
    let b = harness();
    let sa = a.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let sb = b.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    assert_eq!(sa.board, sb.board);
    assert_eq!(sa.deck, sb.deck);
}

#[tokio::test]
async fn test_create_game_rejects_bad_rosters() {
    let h = harness();
    let empty = h.engine.create_game(&room(), &[], &seeded()).await;
    assert!(matches!(empty, Err(EngineError::EmptyRoster)));

    let dup = h
        .engine
        .create_game(&room(), &ids(&["p1", "p1"]), &seeded())
        .await;
    assert!(matches!(dup, Err(EngineError::DuplicatePlayer(p)) if p == PlayerId::new("p1")));
}

// =========================================================================
// submit_claim: rejections
// =========================================================================

#[tokio::test]
async fn test_claim_unknown_room_is_game_not_found() {
    let h = harness();
    let result = h
        .engine
        .submit_claim(&RoomId::new("nowhere"), &PlayerId::new("p1"), &[])
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(ClaimError::GameNotFound));
}

#[tokio::test]
async fn test_claim_wrong_size_is_rejected_without_mutation() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let two = vec![state.board[0].id(), state.board[1].id()];

    let result = h.engine.submit_claim(&room(), &PlayerId::new("p1"), &two).await;

    assert_eq!(result.error, Some(ClaimError::InvalidClaimSize { got: 2 }));
    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after, state);
}

#[tokio::test]
async fn test_claim_card_not_on_board_names_the_card() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let undealt = state.deck[0].id();
    let claim = vec![state.board[0].id(), undealt.clone(), state.board[1].id()];

    let result = h.engine.submit_claim(&room(), &PlayerId::new("p1"), &claim).await;

    assert_eq!(result.error, Some(ClaimError::CardNotOnBoard { card_id: undealt }));
}

#[tokio::test]
async fn test_claim_invalid_set_is_rejected() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();

    let result = h
        .engine
        .submit_claim(&room(), &PlayerId::new("p1"), &an_invalid_claim(&state))
        .await;

    assert_eq!(result.error, Some(ClaimError::InvalidSet));
    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after.sequence_number, 0);
    assert_eq!(after.score_of(&PlayerId::new("p1")), 0);
}

#[tokio::test]
async fn test_claim_same_card_three_times_is_invalid() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let id = state.board[0].id();

    let result = h
        .engine
        .submit_claim(&room(), &PlayerId::new("p1"), &[id.clone(), id.clone(), id])
        .await;

    assert_eq!(result.error, Some(ClaimError::InvalidSet));
}

// =========================================================================
// submit_claim: acceptance
// =========================================================================

#[tokio::test]
async fn test_accepted_claim_bumps_sequence_and_replaces_cards() {
    let h = harness();
    let before = h.engine.create_game(&room(), &ids(&["p1", "p2"]), &seeded()).await.unwrap();
    let claim = a_valid_claim(&before);

    let result = h.engine.submit_claim(&room(), &PlayerId::new("p1"), &claim).await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.sequence_number, Some(1));
    assert_eq!(result.score, Some(1));

    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after.sequence_number, before.sequence_number + 1);
    assert_eq!(after.board.len(), BOARD_SIZE);
    assert_eq!(after.deck.len(), 66);
    for id in &claim {
        assert!(after.board_position(id).is_none());
    }
    // Untouched cards stay, unless a board repair moved them to the
    // bottom of the deck.
    for card in before.board.iter().filter(|c| !claim.contains(&c.id())) {
        assert!(after.board.contains(card) || after.deck.iter().take(2).any(|d| d == card));
    }
}

#[tokio::test]
async fn test_accepted_claim_writes_move_referencing_prior_snapshot() {
    let h = harness();
    let before = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let claim = a_valid_claim(&before);

    h.engine.submit_claim(&room(), &PlayerId::new("p1"), &claim).await;

    let match_id = before.match_id.unwrap();
    let moves = h.history.moves(match_id).await.unwrap();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].player_id, PlayerId::new("p1"));
    assert_eq!(moves[0].previous_snapshot, before.last_snapshot);
    assert_eq!(moves[0].card_ids.to_vec(), claim);

    let snapshots = h.history.snapshots(match_id).await;
    assert_eq!(snapshots.len(), 2);
    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after.last_snapshot, Some(snapshots[1].0));
}

#[tokio::test]
async fn test_overlapping_claims_only_first_wins() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1", "p2"]), &seeded()).await.unwrap();
    let claim = a_valid_claim(&state);

    let first = h.engine.submit_claim(&room(), &PlayerId::new("p1"), &claim).await;
    let second = h.engine.submit_claim(&room(), &PlayerId::new("p2"), &claim).await;

    assert!(first.success);
    assert!(!second.success);
    assert!(matches!(second.error, Some(ClaimError::CardNotOnBoard { .. })));
    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after.score_of(&PlayerId::new("p2")), 0);
    assert_eq!(after.sequence_number, 1);
}

#[tokio::test]
async fn test_concurrent_claims_on_same_cards_have_one_winner() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1", "p2"]), &seeded()).await.unwrap();
    let claim = a_valid_claim(&state);

    let (a, b) = {
        let ea = h.engine.clone();
        let eb = h.engine.clone();
        let ca = claim.clone();
        let cb = claim.clone();
        tokio::join!(
            tokio::spawn(async move { ea.submit_claim(&room(), &PlayerId::new("p1"), &ca).await }),
            tokio::spawn(async move { eb.submit_claim(&room(), &PlayerId::new("p2"), &cb).await }),
        )
    };
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.success ^ b.success);
    let loser = if a.success { b } else { a };
    assert!(matches!(loser.error, Some(ClaimError::CardNotOnBoard { .. })));
    assert_eq!(h.engine.get_state(&room()).await.unwrap().sequence_number, 1);
}

// =========================================================================
// Full game
// =========================================================================

#[tokio::test]
async fn test_play_until_finished() {
    let h = harness();
    let players = ids(&["p1", "p2"]);
    h.engine.create_game(&room(), &players, &seeded()).await.unwrap();

    let mut claims: HashMap<PlayerId, u32> = HashMap::new();
    let mut turns = 0u64;
    let mut last = None;
    while let Some(state) = h.engine.get_state(&room()).await {
        if !state.status.is_active() {
            break;
        }
        assert!(turns < 27, "more claims than the deck allows");
        let player = &players[(turns % 2) as usize];
        let result = h.engine.submit_claim(&room(), player, &a_valid_claim(&state)).await;
        assert!(result.success, "{}", result.message);
        *claims.entry(player.clone()).or_default() += 1;
        turns += 1;
        last = Some(result);
    }

    let final_state = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(final_state.status, GameStatus::Finished);
    assert_eq!(final_state.sequence_number, turns);
    for p in &players {
        assert_eq!(final_state.score_of(p), claims.get(p).copied().unwrap_or(0));
    }

    let game_over = last.and_then(|r| r.game_over).expect("last claim ends the game");
    assert_eq!(Some(game_over.reason), final_state.finish_reason);
    assert_eq!(game_over.standings.len(), 2);
    assert!(game_over.standings[0].score >= game_over.standings[1].score);

    let match_id = final_state.match_id.unwrap();
    let record = h.directory.match_record(match_id).await.unwrap();
    assert_eq!(record.status, MatchStatus::Finished);
    assert_eq!(h.directory.results(match_id).await.len(), 2);
    assert_eq!(h.history.moves(match_id).await.unwrap().len() as u64, turns);

    let late = h.engine.submit_claim(&room(), &players[0], &[]).await;
    assert_eq!(late.error, Some(ClaimError::GameNotActive));
}

// =========================================================================
// add_player / expire / close_room
// =========================================================================

#[tokio::test]
async fn test_add_player_keeps_sequence() {
    let h = harness();
    h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();

    let state = h
        .engine
        .add_player(&room(), &PlayerId::new("bot-easy-1"), PlayerKind::Bot(Difficulty::Easy))
        .await
        .unwrap();

    assert_eq!(state.sequence_number, 0);
    assert_eq!(state.players, ids(&["p1", "bot-easy-1"]));
    assert!(state.is_bot(&PlayerId::new("bot-easy-1")));
    assert_eq!(state.score_of(&PlayerId::new("bot-easy-1")), 0);

    let again = h
        .engine
        .add_player(&room(), &PlayerId::new("p1"), PlayerKind::Human)
        .await
        .unwrap();
    assert_eq!(again.players.len(), 2);
}

#[tokio::test]
async fn test_add_player_to_missing_room_fails() {
    let h = harness();
    let result = h
        .engine
        .add_player(&room(), &PlayerId::new("p1"), PlayerKind::Human)
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn test_expire_finishes_once_and_records_humans_only() {
    let h = harness();
    let state = h
        .engine
        .create_game(&room(), &ids(&["p1", "p2"]), &GameSettings::timed(60).with_seed(7))
        .await
        .unwrap();
    h.engine
        .add_player(&room(), &PlayerId::new("bot-hard-1"), PlayerKind::Bot(Difficulty::Hard))
        .await
        .unwrap();
    h.engine
        .submit_claim(&room(), &PlayerId::new("p2"), &a_valid_claim(&state))
        .await;

    let over = h.engine.expire(&room(), state.match_id).await.unwrap();
    assert_eq!(over.reason, FinishReason::TimeExpired);
    assert_eq!(over.standings[0].player_id, PlayerId::new("p2"));
    assert_eq!(over.standings.len(), 3);

    assert!(h.engine.expire(&room(), state.match_id).await.is_none());

    let after = h.engine.get_state(&room()).await.unwrap();
    assert_eq!(after.status, GameStatus::Finished);
    assert_eq!(after.sequence_number, 1);

    let results = h.directory.results(state.match_id.unwrap()).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.player_id.as_str() != "bot-hard-1"));
}

#[tokio::test]
async fn test_expire_ignores_other_match() {
    let h = harness();
    h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let stale = Some(setforge_protocol::MatchId(999));
    assert!(h.engine.expire(&room(), stale).await.is_none());
    assert!(h.engine.get_state(&room()).await.unwrap().status.is_active());
}

#[tokio::test]
async fn test_close_room_removes_live_state() {
    let h = harness();
    h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    h.engine.close_room(&room()).await;
    assert!(h.engine.get_state(&room()).await.is_none());
}

// =========================================================================
// recover_state
// =========================================================================

#[tokio::test]
async fn test_recover_prefers_live_state() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let recovered = h.engine.recover_state(&room()).await.unwrap();
    assert_eq!(recovered, state);
}

#[tokio::test]
async fn test_recover_rebuilds_from_latest_snapshot_after_restart() {
    let h = harness();
    let state = h
        .engine
        .create_game(&room(), &ids(&["p1", "p2"]), &GameSettings::timed(120).with_seed(7))
        .await
        .unwrap();
    for p in ["p1", "p2"] {
        h.directory
            .add_participant(&room(), &PlayerId::new(p), p, PlayerKind::Human)
            .await
            .unwrap();
    }
    h.engine
        .submit_claim(&room(), &PlayerId::new("p1"), &a_valid_claim(&state))
        .await;
    let live = h.engine.get_state(&room()).await.unwrap();

    // New process: same durable collaborators, empty fast store.
    let store = Arc::new(ResilientStore::memory_only());
    let restarted = GameEngine::new(store.clone(), h.history.clone(), h.directory.clone());
    let recovered = restarted.recover_state(&room()).await.unwrap();

    assert_eq!(recovered.board, live.board);
    assert!(recovered.deck.is_empty());
    assert_eq!(recovered.sequence_number, 1);
    assert_eq!(recovered.players, ids(&["p1", "p2"]));
    assert_eq!(recovered.score_of(&PlayerId::new("p1")), 1);
    assert_eq!(recovered.created_at, state.created_at);
    assert_eq!(recovered.countdown_secs, Some(120));
    assert_eq!(recovered.match_id, state.match_id);
    assert_eq!(store.get(&room()).await, Some(recovered));
}

#[tokio::test]
async fn test_recover_restores_bot_difficulty_from_directory() {
    let h = harness();
    h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    let bot = PlayerId::new("sharp-eyed");
    h.engine
        .add_player(&room(), &bot, PlayerKind::Bot(Difficulty::Hard))
        .await
        .unwrap();
    h.directory
        .add_participant(&room(), &PlayerId::new("p1"), "p1", PlayerKind::Human)
        .await
        .unwrap();
    h.directory
        .add_participant(&room(), &bot, "Bot (hard)", PlayerKind::Bot(Difficulty::Hard))
        .await
        .unwrap();

    let restarted = GameEngine::new(
        Arc::new(ResilientStore::memory_only()),
        h.history.clone(),
        h.directory.clone(),
    );
    let recovered = restarted.recover_state(&room()).await.unwrap();

    assert_eq!(
        recovered.bots,
        vec![BotSeat::new(bot.clone(), Difficulty::Hard)]
    );
    assert_eq!(recovered.players, vec![PlayerId::new("p1"), bot]);
}

#[tokio::test]
async fn test_recover_without_match_is_absent() {
    let h = harness();
    assert!(h.engine.recover_state(&room()).await.is_none());
}

#[tokio::test]
async fn test_recover_skips_finished_match() {
    let h = harness();
    let state = h.engine.create_game(&room(), &ids(&["p1"]), &seeded()).await.unwrap();
    h.engine.expire(&room(), state.match_id).await.unwrap();
    h.engine.close_room(&room()).await;

    assert!(h.engine.recover_state(&room()).await.is_none());
}
