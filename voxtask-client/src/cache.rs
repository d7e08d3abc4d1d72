use crate::database::ClientDatabase;
use crate::errors::ClientResult;
use crate::session::Session;
use std::sync::Arc;
use voxtask_core::models::Task;

/// Last known task snapshot for an identity, with local mutations applied on top.
pub struct LocalCache {
    db: Arc<ClientDatabase>,
}

impl LocalCache {
    pub fn new(db: Arc<ClientDatabase>) -> Self {
        Self { db }
    }

    /// Snapshot for the session. Never fails: an unreadable record reads as empty.
    pub async fn read(&self, session: &Session) -> Vec<Task> {
        match self.load(session).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(
                    "CACHE: failed to read snapshot for {}: {}",
                    session.namespace(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Like `read`, but surfaces storage errors. Used before read-modify-write.
    pub async fn load(&self, session: &Session) -> ClientResult<Vec<Task>> {
        match self.db.get_value(&session.cache_key()).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the whole snapshot.
    pub async fn write(&self, session: &Session, tasks: &[Task]) -> ClientResult<()> {
        let json = serde_json::to_string(tasks)?;
        self.db.put_value(&session.cache_key(), &json).await
    }

    pub async fn clear(&self, session: &Session) -> ClientResult<()> {
        self.db.delete_value(&session.cache_key()).await
    }
}
