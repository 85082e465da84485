//! Per-room countdowns for Setforge.
//!
//! A countdown is anchored to the absolute instant its match started, not
//! to when the timer task was spawned. [`CountdownCoordinator::resume`]
//! can therefore rebuild a timer after a reconnect or a process restart
//! without handing players extra time.
//!
//! The coordinator knows nothing about games. It reports through a typed
//! channel of [`CountdownEvent`]s; whoever owns the receiver decides what
//! a tick or an expiry means:
//!
//! ```ignore
//! let (countdowns, mut events) = CountdownCoordinator::new(CountdownConfig::default());
//! countdowns.start(room.clone(), match_id, 180);
//! while let Some(event) = events.recv().await {
//!     match event {
//!         CountdownEvent::Tick { room, remaining_secs, .. } => { /* broadcast */ }
//!         CountdownEvent::Expired { room, match_id } => { /* end the game */ }
//!     }
//! }
//! ```

mod config;
mod coordinator;

pub use config::CountdownConfig;
pub use coordinator::{CountdownCoordinator, CountdownEvent, remaining_ms, remaining_secs};
