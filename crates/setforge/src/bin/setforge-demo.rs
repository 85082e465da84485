//! Runs one room of bots to completion and logs everything that happens.
//!
//! ```text
//! setforge-demo --bots easy,hard --countdown-secs 120 --seed 7
//! ```

use clap::Parser;
use setforge::prelude::*;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "setforge-demo")]
#[command(about = "Watch autonomous players race through one Set game")]
struct Args {
    /// Bot difficulties, comma separated
    #[arg(long, value_delimiter = ',', default_value = "easy,medium,hard")]
    bots: Vec<Difficulty>,

    /// End the game after this many seconds
    #[arg(long)]
    countdown_secs: Option<u64>,

    /// Fix the shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Fast cache, overrides SETFORGE_REDIS_URL
    #[arg(long)]
    redis_url: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let args = Args::parse();

    let mut config = ServiceConfig::from_env()?;
    if args.redis_url.is_some() {
        config.redis_url = args.redis_url;
    }
    if args.verbose {
        config.log_filter = "debug".to_string();
    }
    setforge::telemetry::init(&config.log_filter);

    if args.bots.is_empty() && args.countdown_secs.is_none() {
        return Err(ServiceError::Config(
            "a game without bots needs --countdown-secs to end".to_string(),
        ));
    }

    let service = GameService::new(config, TrustingAuthenticator)?;
    let settings = GameSettings {
        countdown_secs: args.countdown_secs,
        bots: args.bots,
        seed: args.seed,
    };
    let room = service.open_room(settings).await?;
    info!(room_id = %room.id, code = %room.code, "room opened");

    let mut observer = service.connect("observer:Observer").await?;
    let state = service
        .join_room(observer.connection, RoomRef::Code(room.code.clone()))
        .await?;
    info!(
        board = state.board.len(),
        deck = state.deck.len(),
        players = state.players.len(),
        "game started"
    );

    while let Some(event) = observer.events.recv().await {
        match event {
            ServerEvent::Claim {
                player_id, result, ..
            } => {
                info!(player_id = %player_id, score = ?result.score, "set claimed");
            }
            ServerEvent::GameState { state } => {
                debug!(
                    sequence = state.sequence_number,
                    board = state.board.len(),
                    deck = state.deck.len(),
                    "state"
                );
            }
            ServerEvent::Timer { remaining_secs, .. } => {
                debug!(remaining_secs, "tick");
            }
            ServerEvent::PlayerJoined {
                player_id,
                display_name,
                ..
            } => {
                info!(player_id = %player_id, name = %display_name, "player joined");
            }
            ServerEvent::PlayerLeft { player_id, .. } => {
                info!(player_id = %player_id, "player left");
            }
            ServerEvent::Error { code, message } => {
                warn!(code, message = %message, "error");
            }
            ServerEvent::GameOver { summary, .. } => {
                info!(reason = ?summary.reason, "game over");
                for standing in &summary.standings {
                    info!(
                        rank = standing.rank,
                        player_id = %standing.player_id,
                        score = standing.score,
                        "standing"
                    );
                }
                break;
            }
        }
    }
    Ok(())
}
