//! Identity resolution.
//!
//! Setforge does not authenticate anyone itself. A connection presents a
//! token, an [`Authenticator`] turns it into an [`Identity`], and from then
//! on the service trusts that identity for everything the connection does.

use setforge_protocol::PlayerId;

use crate::SessionError;

/// A verified player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub player_id: PlayerId,
    pub display_name: String,
}

impl Identity {
    pub fn new(player_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            player_id: PlayerId::new(player_id),
            display_name: display_name.into(),
        }
    }
}

/// Turns a client's token into an [`Identity`].
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection for the life of the service.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Trusts the token itself: `"alice"` or `"alice:Alice Liddell"`.
///
/// For local play, the demo binary and tests. Never expose it publicly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustingAuthenticator;

impl Authenticator for TrustingAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        let (id, name) = match token.split_once(':') {
            Some((id, name)) => (id.trim(), name.trim()),
            None => (token.trim(), token.trim()),
        };
        if id.is_empty() {
            return Err(SessionError::AuthFailed("empty player id".into()));
        }
        if id.starts_with("bot-") {
            return Err(SessionError::AuthFailed("`bot-` ids are reserved".into()));
        }
        let name = if name.is_empty() { id } else { name };
        Ok(Identity::new(id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trusting_authenticator_splits_display_name() {
        let identity = TrustingAuthenticator.authenticate("alice:Alice L").await.unwrap();
        assert_eq!(identity, Identity::new("alice", "Alice L"));
    }

    #[tokio::test]
    async fn test_trusting_authenticator_defaults_name_to_id() {
        let identity = TrustingAuthenticator.authenticate("bob").await.unwrap();
        assert_eq!(identity.display_name, "bob");
    }

    #[tokio::test]
    async fn test_trusting_authenticator_rejects_empty_and_reserved_ids() {
        assert!(matches!(
            TrustingAuthenticator.authenticate("  ").await,
            Err(SessionError::AuthFailed(_))
        ));
        assert!(matches!(
            TrustingAuthenticator.authenticate("bot-hard-1").await,
            Err(SessionError::AuthFailed(_))
        ));
    }
}
