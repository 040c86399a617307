use parking_lot::RwLock;

use super::credential::SessionCredential;

/// Holder of the current session credential.
///
/// The client owns one store for its whole lifetime; it is a trait so tests
/// and hosts can inject their own.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<SessionCredential>;

    fn save(&self, credential: Option<SessionCredential>);
}

/// In-memory store; nothing is persisted.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: RwLock<Option<SessionCredential>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<SessionCredential> {
        self.credential.read().clone()
    }

    fn save(&self, credential: Option<SessionCredential>) {
        *self.credential.write() = credential;
    }
}
