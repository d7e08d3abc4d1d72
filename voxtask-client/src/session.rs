use uuid::Uuid;

const APP_ID: &str = "com.voxtask.client";
const ANONYMOUS: &str = "anonymous";

/// Who the engine is acting for. Passed to every engine call so the cache and
/// queue keys, and the bearer token, never depend on ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Option<String>,
    token: Option<String>,
}

impl Session {
    /// Local-only mode: no token, records kept under the anonymous namespace.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            token: None,
        }
    }

    pub fn authenticated(identity: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
            token: Some(token.into()),
        }
    }

    pub fn new(identity: Option<String>, token: Option<String>) -> Self {
        Self { identity, token }
    }

    pub fn identity(&self) -> &str {
        self.identity.as_deref().unwrap_or(ANONYMOUS)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Stable per-identity namespace (UUID v5 under the application namespace).
    pub fn namespace(&self) -> Uuid {
        let app_namespace = Uuid::new_v5(&Uuid::NAMESPACE_DNS, APP_ID.as_bytes());
        Uuid::new_v5(&app_namespace, self.identity().as_bytes())
    }

    pub fn cache_key(&self) -> String {
        format!("tasks:{}", self.namespace())
    }

    pub fn queue_key(&self) -> String {
        format!("sync_queue:{}", self.namespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced_per_identity() {
        let alice = Session::authenticated("alice@example.com", "t1");
        let alice_again = Session::authenticated("alice@example.com", "t2");
        let bob = Session::authenticated("bob@example.com", "t1");

        assert_eq!(alice.cache_key(), alice_again.cache_key());
        assert_ne!(alice.cache_key(), bob.cache_key());
        assert_ne!(alice.cache_key(), alice.queue_key());
        assert!(!alice.cache_key().contains("alice"));
    }

    #[test]
    fn test_anonymous_session() {
        let anon = Session::anonymous();
        assert_eq!(anon.identity(), "anonymous");
        assert_eq!(anon.token(), None);
        assert_eq!(anon.namespace(), Session::new(None, None).namespace());
    }
}
