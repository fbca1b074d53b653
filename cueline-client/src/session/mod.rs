mod store;

use std::fmt::Debug;

pub use store::*;

/// The access and refresh credential pair of a logged in user.
///
/// Both credentials are always present and non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access: String,
    refresh: String,
}

/// Persists the current [Session] in a [KeyValueStore]
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
}

impl Session {
    /// Creates a session, if both credentials are non-empty
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Option<Self> {
        let access = access.into();
        let refresh = refresh.into();

        if access.is_empty() || refresh.is_empty() {
            return None;
        }

        Some(Self { access, refresh })
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn refresh(&self) -> &str {
        &self.refresh
    }

    /// Returns the session with a new access credential, and a rotated refresh credential if given.
    pub fn renewed(&self, access: String, refresh: Option<String>) -> Option<Self> {
        let refresh = refresh
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.refresh.clone());

        Self::new(access, refresh)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

impl SessionStore {
    pub const ACCESS_KEY: &'static str = "token";
    pub const REFRESH_KEY: &'static str = "refreshToken";

    pub fn new<S: KeyValueStore>(store: S) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Loads the stored session. Absence of either credential means there is none.
    pub fn load(&self) -> Result<Option<Session>, StoreError> {
        let access = self.store.get(Self::ACCESS_KEY)?;
        let refresh = self.store.get(Self::REFRESH_KEY)?;

        Ok(access
            .zip(refresh)
            .and_then(|(access, refresh)| Session::new(access, refresh)))
    }

    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.store.set(Self::ACCESS_KEY, &session.access)?;
        self.store.set(Self::REFRESH_KEY, &session.refresh)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(Self::ACCESS_KEY)?;
        self.store.remove(Self::REFRESH_KEY)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_requires_both_credentials() {
        assert!(Session::new("a", "b").is_some());
        assert!(Session::new("", "b").is_none());
        assert!(Session::new("a", "").is_none());
    }

    #[test]
    fn test_renewed_keeps_refresh_unless_rotated() {
        let session = Session::new("a", "r1").unwrap();

        let renewed = session.renewed("b".to_string(), None).unwrap();
        assert_eq!(renewed.access(), "b");
        assert_eq!(renewed.refresh(), "r1");

        let rotated = session
            .renewed("c".to_string(), Some("r2".to_string()))
            .unwrap();
        assert_eq!(rotated.refresh(), "r2");

        assert!(session.renewed(String::new(), None).is_none());
    }

    #[test]
    fn test_store_round_trip_and_partial_state() {
        let memory = MemoryStore::new();
        memory.set(SessionStore::ACCESS_KEY, "a").unwrap();

        let store = SessionStore::new(memory);
        assert_eq!(store.load().unwrap(), None, "refresh credential is missing");

        let session = Session::new("a", "b").unwrap();
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_debug_is_redacted() {
        let session = Session::new("secret-a", "secret-b").unwrap();
        let debug = format!("{:?}", session);

        assert!(!debug.contains("secret"));
    }
}
