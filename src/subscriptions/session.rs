//! Access to the current viewer's session.

use parking_lot::RwLock;

/// Supplies the session id of the viewer on whose behalf a read happens.
///
/// `None` means there is no channel to deliver to, and subscribe calls do
/// nothing.
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<String>;
}

impl<F> SessionProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_session(&self) -> Option<String> {
        self()
    }
}

/// Session holder that request adapters (or tests) swap in and out.
#[derive(Debug, Default)]
pub struct FixedSession {
    session: RwLock<Option<String>>,
}

impl FixedSession {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Some(session.into())),
        }
    }

    /// No active session.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn set(&self, session: Option<String>) {
        *self.session.write() = session;
    }
}

impl SessionProvider for FixedSession {
    fn current_session(&self) -> Option<String> {
        self.session.read().clone()
    }
}
