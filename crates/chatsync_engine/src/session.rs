//! Session accessor consumed by the transport and the controller.

use parking_lot::RwLock;

/// Source of the bearer credential and the signed-in agent.
///
/// Redirecting an unauthenticated user is the provider's job; the engine only
/// reports the missing credential and calls [`SessionProvider::logout`] when
/// the server rejects it.
pub trait SessionProvider: Send + Sync {
    /// Bearer token, if signed in.
    fn token(&self) -> Option<String>;

    /// Id of the signed-in agent, if known.
    fn user(&self) -> Option<String>;

    /// Drops the credential.
    fn logout(&self);
}

/// Session held in memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
    user: RwLock<Option<String>>,
}

impl MemorySession {
    /// Creates a session with the given credential.
    pub fn new(token: Option<String>, user: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
            user: RwLock::new(user),
        }
    }

    /// Creates a signed-out session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Stores a new credential.
    pub fn sign_in(&self, token: impl Into<String>, user: impl Into<String>) {
        *self.token.write() = Some(token.into());
        *self.user.write() = Some(user.into());
    }
}

impl SessionProvider for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn user(&self) -> Option<String> {
        self.user.read().clone()
    }

    fn logout(&self) {
        *self.token.write() = None;
        *self.user.write() = None;
    }
}
