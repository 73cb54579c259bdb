use std::collections::HashMap;
use std::time::Duration;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, Session, SessionManagerLayer};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sessionid";

/// Builds the session layer: in-memory store, `sessionid` cookie, expiring
/// after `idle` without activity.
pub fn layer(idle: Duration) -> SessionManagerLayer<MemoryStore> {
    let idle = time::Duration::seconds(i64::try_from(idle.as_secs()).unwrap_or(i64::MAX));
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(idle))
}

/// Per-visitor key/value state. Values are always strings; callers parse them.
///
/// Handlers copy the keys they manage out of the request [`Session`], pass
/// this value explicitly, and write it back before responding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionState {
    values: HashMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Copies `keys` out of the session; absent keys stay absent.
    pub async fn load(session: &Session, keys: &[&str]) -> Result<Self, tower_sessions::session::Error> {
        let mut state = Self::new();
        for key in keys {
            if let Some(value) = session.get::<String>(key).await? {
                state.set(*key, value);
            }
        }
        Ok(state)
    }

    pub async fn store(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for (key, value) in &self.values {
            session.insert(key, value.clone()).await?;
        }
        Ok(())
    }
}
