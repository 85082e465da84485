//! Events the service pushes to connections.
//!
//! `#[serde(tag = "type")]` gives clients a flat object with a `type`
//! discriminator, e.g. `{ "type": "Timer", "room_id": "r1", "remaining_secs": 42 }`.

use serde::{Deserialize, Serialize};

use crate::{ClaimResult, GameOver, GameState, PlayerId, RoomId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Full state, sent on join, on reconnect and after every accepted claim.
    GameState { state: GameState },

    /// Outcome of a claim, sent to the room when accepted and to the
    /// claimant's connection when rejected.
    Claim {
        room_id: RoomId,
        player_id: PlayerId,
        card_ids: Vec<String>,
        result: ClaimResult,
    },

    /// Countdown tick.
    Timer { room_id: RoomId, remaining_secs: u64 },

    GameOver { room_id: RoomId, summary: GameOver },

    PlayerJoined {
        room_id: RoomId,
        player_id: PlayerId,
        display_name: String,
    },

    PlayerLeft { room_id: RoomId, player_id: PlayerId },

    /// `code` follows HTTP conventions (400, 404, 409 …).
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_event_json_shape() {
        let event = ServerEvent::Timer {
            room_id: RoomId::new("r1"),
            remaining_secs: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Timer");
        assert_eq!(json["room_id"], "r1");
        assert_eq!(json["remaining_secs"], 42);
    }

    #[test]
    fn test_error_event_round_trip() {
        let event = ServerEvent::Error {
            code: 404,
            message: "room not found".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
