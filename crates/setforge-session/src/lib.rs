//! Who is connected, and how to reach them.
//!
//! 1. **Identity**: an [`Authenticator`] resolves a token to an [`Identity`]
//! 2. **Sessions**: the [`SessionManager`] tracks connected and recently
//!    dropped players, with token-based reconnection inside a grace period
//! 3. **Broadcast**: the [`RoomHub`] fans [`ServerEvent`]s out to the
//!    connections in a room through the [`Broadcaster`] trait
//!
//! [`ServerEvent`]: setforge_protocol::ServerEvent

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod hub;
mod manager;
mod session;

pub use auth::{Authenticator, Identity, TrustingAuthenticator};
pub use error::SessionError;
pub use hub::{Broadcaster, RoomHub};
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
