//! Per-user locale store with a process-wide default.
//!
//! The original bot kept this as a bare module-level dict; here it is an
//! explicitly owned store with a defined concurrency contract: a read-write
//! lock around the map, never held across an await point, so one user's
//! locale switch cannot stall another session's message handling.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Maps user ids to locale codes, falling back to the configured default.
pub struct LocaleStore {
    default: String,
    by_user: RwLock<HashMap<i64, String>>,
}

impl LocaleStore {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            by_user: RwLock::new(HashMap::new()),
        }
    }

    /// The user's chosen locale, or the process default.
    pub fn get(&self, user_id: i64) -> String {
        self.by_user
            .read()
            .expect("locale store lock poisoned")
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Remember a locale choice for a user.
    pub fn set(&self, user_id: i64, code: impl Into<String>) {
        let code = code.into();
        debug!("locale for user {user_id} set to {code}");
        self.by_user
            .write()
            .expect("locale store lock poisoned")
            .insert(user_id, code);
    }

    pub fn default_code(&self) -> &str {
        &self.default
    }
}
