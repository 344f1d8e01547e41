//! Session tokens gating the control API
//!
//! The engine never looks at sessions itself. The server holds a
//! [`SessionStore`] and checks every request against it.

use crate::config::SessionConfig;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;
use tracing::debug;

/// A freshly issued credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue, check and revoke opaque session tokens
pub trait SessionStore: Send + Sync {
    fn issue(&self) -> Session;
    fn validate(&self, token: &str) -> bool;
    fn revoke(&self, token: &str);
}

/// In-memory token → expiry map
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
    validity: chrono::Duration,
}

impl MemorySessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let validity = chrono::Duration::from_std(config.validity)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            sessions: RwLock::new(HashMap::new()),
            validity,
        }
    }

    /// Drop every expired token
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, expires_at| now < *expires_at);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn issue(&self) -> Session {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE.encode(bytes);
        let expires_at = Utc::now()
            .checked_add_signed(self.validity)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.sessions.write().insert(token.clone(), expires_at);
        debug!("Issued session expiring at {}", expires_at);
        Session { token, expires_at }
    }

    fn validate(&self, token: &str) -> bool {
        let expires_at = match self.sessions.read().get(token) {
            Some(expires_at) => *expires_at,
            None => return false,
        };

        if Utc::now() < expires_at {
            return true;
        }

        self.sessions.write().remove(token);
        false
    }

    fn revoke(&self, token: &str) {
        self.sessions.write().remove(token);
    }
}
