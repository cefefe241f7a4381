//! SessionRegistry: live media sessions keyed by connection id
//!
//! Backed by a sharded concurrent map so connections never contend on a
//! single lock. Closures passed to [`SessionRegistry::with_session`] run
//! under a shard lock and must not block; nothing here holds a map guard
//! across an await point.

use dashmap::DashMap;
use tracing::warn;

use super::state::MirrorSession;
use crate::media::WebRtcEndpoint;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, MirrorSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its id
    ///
    /// Returns the session previously stored under the same id, which the
    /// caller is responsible for releasing.
    pub fn put(&self, session: MirrorSession) -> Option<MirrorSession> {
        let id = session.id().to_string();
        let previous = self.sessions.insert(id.clone(), session);
        if previous.is_some() {
            warn!(session_id = %id, "Replaced a session that was still registered");
        }
        previous
    }

    /// Remove a session without releasing it
    pub fn remove(&self, id: &str) -> Option<MirrorSession> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Run `f` against the session stored under `id`
    pub fn with_session<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut MirrorSession) -> R,
    {
        self.sessions.get_mut(id).map(|mut session| f(&mut session))
    }

    /// Endpoint handle for the session stored under `id`
    pub fn endpoint(&self, id: &str) -> Option<WebRtcEndpoint> {
        self.sessions.get(id).map(|session| session.endpoint())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Remove and release the session stored under `id`
    ///
    /// Returns false when there was nothing to release.
    pub async fn release(&self, id: &str) -> bool {
        match self.remove(id) {
            Some(session) => {
                session.release().await;
                true
            }
            None => false,
        }
    }

    /// Release every registered session, returning how many there were
    pub async fn release_all(&self) -> usize {
        let mut released = 0;
        for id in self.ids() {
            if self.release(&id).await {
                released += 1;
            }
        }
        released
    }
}
