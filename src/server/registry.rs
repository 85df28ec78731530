//! Registry of live sessions.
//!
//! `LiveSessions` maps each running session to the token that force-closes
//! it. The accept loop inserts entries, session teardown removes them, and
//! shutdown cancels whatever remains.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::session::SessionId;

/// Concurrent registry of close tokens keyed by [`SessionId`].
#[derive(Debug, Default)]
pub struct LiveSessions(DashMap<SessionId, CancellationToken>);

impl LiveSessions {
    /// Register a newly accepted session.
    pub fn insert(&self, id: SessionId, close: CancellationToken) { self.0.insert(id, close); }

    /// Remove a session, typically on teardown.
    pub fn remove(&self, id: &SessionId) { self.0.remove(id); }

    /// Number of sessions currently registered.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns `true` if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Identifiers of the registered sessions, in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.0.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Cancel every registered session and return how many were signalled.
    ///
    /// Entries stay registered until each session finishes its teardown.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for entry in self.0.iter() {
            entry.value().cancel();
            closed += 1;
        }
        closed
    }
}
