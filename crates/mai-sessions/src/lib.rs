//! Session manager (spec §4.8). The in-memory map is this crate's only
//! state; everything durable lives in `mai-memory` behind [`MemoryStore`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use mai_config::ConfigStore;
use mai_memory::{MemoryError, MemoryStore};
use rand::Rng;
use tracing::debug;

pub type Result<T> = std::result::Result<T, MemoryError>;

pub struct SessionManager {
    store: Arc<MemoryStore>,
    config: Arc<ConfigStore>,
    /// Process-local cache of `user_name -> session_id`, step 1 of the
    /// lookup order (spec §4.8). Guarded per-entry by `DashMap`.
    active: DashMap<String, String>,
}

impl SessionManager {
    pub fn new(store: Arc<MemoryStore>, config: Arc<ConfigStore>) -> Self {
        Self { store, config, active: DashMap::new() }
    }

    /// Resolve the logical session id for `user_name`, following the
    /// four-step lookup order (spec §4.8).
    pub fn get_or_create(&self, user_name: &str) -> Result<String> {
        // Step 1 + 2: cached session, still active in the DB.
        if let Some(session_id) = self.active.get(user_name).map(|v| v.clone()) {
            if let Some(row) = self.store.get_session(&session_id)? {
                if row.state == mai_core::SessionState::Active {
                    self.store.touch_session(&session_id)?;
                    return Ok(session_id);
                }
            }
        }

        // Step 3: reactivate a recent idle session.
        let reactivation_window = Duration::minutes(self.config.session_reactivation_minutes());
        if let Some(row) = self.store.find_reactivatable_session(user_name, Utc::now(), reactivation_window)? {
            self.store.touch_session(&row.session_id)?;
            self.active.insert(user_name.to_string(), row.session_id.clone());
            debug!(user_name, session_id = %row.session_id, "reactivated idle session");
            return Ok(row.session_id);
        }

        // Step 4: mint a new session.
        let session_id = new_session_id(user_name);
        self.store.create_session(&session_id, user_name)?;
        self.active.insert(user_name.to_string(), session_id.clone());
        debug!(user_name, session_id = %session_id, "minted new session");
        Ok(session_id)
    }

    /// Move sessions untouched beyond `session_timeout_minutes` to `idle`
    /// (spec §4.8). Intended to run on a 5-minute timer.
    pub fn sweep_idle(&self) -> Result<usize> {
        let idle_after = Duration::minutes(self.config.session_timeout_minutes());
        let swept = self.store.sweep_idle_sessions(Utc::now(), idle_after)?;
        for session_id in &swept {
            self.active.retain(|_, v| v != session_id);
        }
        Ok(swept.len())
    }
}

/// `<user>_<random>_<epoch>` per spec §4.8.
fn new_session_id(user_name: &str) -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("{user_name}_{random:08x}_{}", Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mai_core::SessionState;
    use rusqlite::Connection;

    fn manager() -> SessionManager {
        let store = Arc::new(MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let config = Arc::new(ConfigStore::new(Arc::clone(&store)));
        SessionManager::new(store, config)
    }

    #[test]
    fn repeated_calls_reuse_the_same_session() {
        let mgr = manager();
        let a = mgr.get_or_create("alice").unwrap();
        let b = mgr.get_or_create("alice").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_users_get_different_sessions() {
        let mgr = manager();
        let a = mgr.get_or_create("alice").unwrap();
        let b = mgr.get_or_create("bob").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_idle_then_reactivate() {
        let mgr = manager();
        let first = mgr.get_or_create("alice").unwrap();
        mgr.store.set_session_state(&first, SessionState::Idle).unwrap();
        mgr.active.remove("alice");

        let second = mgr.get_or_create("alice").unwrap();
        assert_eq!(first, second, "should reactivate the idle session rather than mint a new one");
        assert_eq!(mgr.store.get_session(&second).unwrap().unwrap().state, SessionState::Active);
    }

    #[test]
    fn sweep_idle_moves_stale_sessions_and_clears_cache() {
        let mgr = manager();
        mgr.config.set("session_timeout_minutes", "0").unwrap();
        let session_id = mgr.get_or_create("alice").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let n = mgr.sweep_idle().unwrap();
        assert_eq!(n, 1);
        assert!(!mgr.active.contains_key("alice"));
        assert_eq!(mgr.store.get_session(&session_id).unwrap().unwrap().state, SessionState::Idle);
    }
}
