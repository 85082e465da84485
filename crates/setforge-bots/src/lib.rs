//! Autonomous players.
//!
//! Three difficulties, each a pairing of a [`ClaimPolicy`] (which set to
//! take) and a [`BotTiming`] (how long to look first). The
//! [`BotCoordinator`] runs each bot as its own task against a
//! [`BotArena`].

mod arena;
mod coordinator;
mod policy;
mod timing;

pub use arena::BotArena;
pub use coordinator::BotCoordinator;
pub use policy::{
    ClaimPolicy, GreedyPolicy, RandomPolicy, SimilarityPolicy, policy_for, uniform_attributes,
};
pub use timing::{BotTiming, BotTimings};
