use async_trait::async_trait;
use setforge_deck::Card;
use setforge_protocol::{ClaimResult, GameStatus, PlayerId, RoomId};

/// What a bot can see and do in a room.
///
/// The service implements this over its engine so that a bot's claims go
/// through the same path, and are broadcast the same way, as a human's.
#[async_trait]
pub trait BotArena: Send + Sync {
    /// Status and face-up cards of the room's game, `None` if there is none.
    async fn board(&self, room: &RoomId) -> Option<(GameStatus, Vec<Card>)>;

    async fn claim(&self, room: &RoomId, player: &PlayerId, card_ids: Vec<String>) -> ClaimResult;
}
