//! In-memory store of validation sessions.

use std::path::PathBuf;

use archive_validator_core::new_token;
use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session with ID '{0}' was not found")]
    NotFound(String),
}

/// Progress of a session. Derived from which fields are set; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Created, nothing recorded yet.
    Open,
    /// Archive and digest recorded.
    Initialised,
    /// Backend accepted the archive and issued a report URL.
    Uploaded,
}

/// Data recorded for one front-end transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSession {
    /// Temporary copy of the archive. Owned by the archive store.
    pub archive_path: Option<PathBuf>,
    pub digest: Option<String>,
    pub report_url: Option<String>,
}

impl ValidationSession {
    pub fn state(&self) -> SessionState {
        if self.report_url.is_some() {
            SessionState::Uploaded
        } else if self.archive_path.is_some() && self.digest.is_some() {
            SessionState::Initialised
        } else {
            SessionState::Open
        }
    }
}

/// Concurrent keyed store of sessions.
///
/// Writes to one session are serialized by the map's shard lock; sessions in
/// different shards never contend. Guards are never held across an await.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, ValidationSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an empty session under a fresh token.
    pub fn create(&self) -> String {
        loop {
            let token = new_token();
            if let Entry::Vacant(slot) = self.sessions.entry(token.clone()) {
                slot.insert(ValidationSession::default());
                return token;
            }
        }
    }

    /// Snapshot of a session's fields.
    pub fn get(&self, token: &str) -> Result<ValidationSession, SessionError> {
        self.sessions
            .get(token)
            .map(|s| s.value().clone())
            .ok_or_else(|| SessionError::NotFound(token.to_string()))
    }

    /// Atomic read-modify-write of one session.
    pub fn update<R>(
        &self,
        token: &str,
        mutate: impl FnOnce(&mut ValidationSession) -> R,
    ) -> Result<R, SessionError> {
        let mut session = self
            .sessions
            .get_mut(token)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))?;
        Ok(mutate(session.value_mut()))
    }

    /// Removes a session, returning it if it existed. Unknown tokens are a no-op.
    pub fn delete(&self, token: &str) -> Option<ValidationSession> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn create_starts_open() {
        let store = SessionStore::new();
        let token = store.create();
        let session = store.get(&token).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = SessionStore::new();
        assert_eq!(
            store.get("nope"),
            Err(SessionError::NotFound("nope".into()))
        );
    }

    #[test]
    fn update_moves_state_forward() {
        let store = SessionStore::new();
        let token = store.create();

        store
            .update(&token, |s| {
                s.archive_path = Some(PathBuf::from("/tmp/a.zip"));
                s.digest = Some("d".into());
            })
            .unwrap();
        assert_eq!(store.get(&token).unwrap().state(), SessionState::Initialised);

        store
            .update(&token, |s| s.report_url = Some("http://x/r1".into()))
            .unwrap();
        assert_eq!(store.get(&token).unwrap().state(), SessionState::Uploaded);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let store = SessionStore::new();
        let res = store.update("nope", |s| s.digest = Some("d".into()));
        assert!(matches!(res, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = SessionStore::new();
        let token = store.create();
        assert!(store.delete(&token).is_some());
        assert!(store.delete(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_creates_yield_distinct_tokens() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || (0..100).map(|_| store.create()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for h in handles {
            for token in h.join().unwrap() {
                assert!(all.insert(token));
            }
        }
        assert_eq!(store.len(), 800);
    }

    #[test]
    fn concurrent_updates_to_one_session_are_serialized() {
        let store = Arc::new(SessionStore::new());
        let token = store.create();
        store.update(&token, |s| s.digest = Some(String::new())).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let token = token.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .update(&token, |s| s.digest.get_or_insert_with(String::new).push('x'))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(&token).unwrap().digest.unwrap().len(), 400);
    }
}
