//! Room state persistence for Setforge.
//!
//! - [`StateStore`]: what the engine talks to
//! - [`ResilientStore`]: cache first, in-process map when the cache fails
//! - [`RedisStore`]: the cache backend
//! - [`MemoryStore`]: the in-process backend
//!
//! Cache trouble is never surfaced to players. It is logged, and the room
//! keeps going on the fallback.

mod backend;
mod config;
mod error;
mod redis_store;
mod resilient;

pub use backend::{MemoryStore, StateStore, StoreBackend};
pub use config::StoreConfig;
pub use error::StoreError;
pub use redis_store::RedisStore;
pub use resilient::{ResilientStore, SaveTarget};
