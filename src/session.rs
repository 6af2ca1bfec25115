//! Per-user conversation sessions and the store that owns them.
//!
//! A session exists only while a multi-step flow is in progress: `Idle` is
//! represented by the *absence* of a session, so "exactly one session per
//! identity" and "cleared on completion" are both just map operations on the
//! same key.
//!
//! ## File ownership
//!
//! [`StagedFile`] owns its local artifact and removes it on `Drop`, the same
//! way a `TempDir` guarantees cleanup when it goes out of scope. The
//! pipeline only ever borrows staged files; dropping
//! the session (success, failure, or cancel) is the single point where
//! inputs are released, which makes double-deletes unrepresentable.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Identity a session is keyed by: one user in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
}

/// Conversation states of an active flow. `Idle` has no variant — an idle
/// identity simply has no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    AwaitingConvertInput,
    AwaitingCompressInput,
    AwaitingRotateInput,
    AwaitingRotateOption,
    AwaitingMergeFirst,
    AwaitingMergeSecond,
    AwaitingOperationChoice,
}

/// A locally materialized copy of a user upload, owned by its session.
///
/// The backing file is deleted exactly once, when this value drops.
#[derive(Debug)]
pub struct StagedFile {
    /// Opaque platform handle the file was downloaded from.
    pub file_id: String,
    /// Name the file had on the user's device.
    pub original_name: String,
    /// Where the bytes live under the input root.
    pub local_path: PathBuf,
    pub size_bytes: u64,
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.local_path) {
            Ok(()) => debug!("released staged input {}", self.local_path.display()),
            Err(e) => warn!(
                "failed to remove staged input {}: {e}",
                self.local_path.display()
            ),
        }
    }
}

/// One active conversation flow.
#[derive(Debug)]
pub struct Session {
    pub state: FlowState,
    /// Staged inputs in upload order; at most two (merge), usually one.
    pub inputs: Vec<StagedFile>,
    /// Locale chosen mid-flow, if any.
    pub locale_override: Option<String>,
}

impl Session {
    pub fn new(state: FlowState) -> Self {
        Self {
            state,
            inputs: Vec::new(),
            locale_override: None,
        }
    }
}

/// Slot for one identity: the session, or `None` while idle.
///
/// The slot-level async mutex is what serializes event handling per session
/// — it is held for the entire handling of one event, including a pipeline
/// invocation, so a slow job suspends only its own conversation.
pub type SessionSlot = Arc<Mutex<Option<Session>>>;

/// Keyed store of conversation sessions.
///
/// The outer lock guards only the map shape and is never held across an
/// await; per-key work happens under the slot mutex.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionKey, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot for an identity.
    pub fn slot(&self, key: SessionKey) -> SessionSlot {
        if let Some(slot) = self
            .slots
            .read()
            .expect("session store lock poisoned")
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut map = self.slots.write().expect("session store lock poisoned");
        Arc::clone(map.entry(key).or_default())
    }

    /// Number of identities currently inside a flow.
    ///
    /// Counts only slots whose session is present; idle slots are skipped.
    /// Best-effort: slots locked by in-flight handlers are counted as
    /// active, since a handler only holds the lock while doing flow work.
    pub fn active_sessions(&self) -> usize {
        self.slots
            .read()
            .expect("session store lock poisoned")
            .values()
            .filter(|slot| match slot.try_lock() {
                Ok(guard) => guard.is_some(),
                Err(_) => true,
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &std::path::Path) {
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn staged_file_removes_artifact_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc_input.pdf");
        touch(&path);

        let staged = StagedFile {
            file_id: "abc".into(),
            original_name: "input.pdf".into(),
            local_path: path.clone(),
            size_bytes: 1,
        };
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists(), "drop must delete the staged artifact");
    }

    #[test]
    fn clearing_a_session_releases_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("id1_a.pdf");
        let b = dir.path().join("id2_b.pdf");
        touch(&a);
        touch(&b);

        let mut session = Session::new(FlowState::AwaitingMergeSecond);
        session.inputs.push(StagedFile {
            file_id: "id1".into(),
            original_name: "a.pdf".into(),
            local_path: a.clone(),
            size_bytes: 1,
        });
        session.inputs.push(StagedFile {
            file_id: "id2".into(),
            original_name: "b.pdf".into(),
            local_path: b.clone(),
            size_bytes: 1,
        });

        drop(session);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[tokio::test]
    async fn same_key_yields_same_slot() {
        let store = SessionStore::new();
        let key = SessionKey {
            chat_id: 1,
            user_id: 2,
        };
        let s1 = store.slot(key);
        let s2 = store.slot(key);
        assert!(Arc::ptr_eq(&s1, &s2));

        let other = store.slot(SessionKey {
            chat_id: 1,
            user_id: 3,
        });
        assert!(!Arc::ptr_eq(&s1, &other));
    }

    #[tokio::test]
    async fn active_sessions_counts_only_flows() {
        let store = SessionStore::new();
        let busy = SessionKey {
            chat_id: 1,
            user_id: 1,
        };
        let idle = SessionKey {
            chat_id: 1,
            user_id: 2,
        };

        *store.slot(busy).lock().await = Some(Session::new(FlowState::AwaitingCompressInput));
        let _idle_slot = store.slot(idle);

        assert_eq!(store.active_sessions(), 1);
    }
}
