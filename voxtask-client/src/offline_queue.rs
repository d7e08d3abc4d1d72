use crate::database::ClientDatabase;
use crate::errors::ClientResult;
use crate::session::Session;
use std::sync::Arc;
use voxtask_core::models::is_local_id;
use voxtask_core::pending::{PendingAction, PendingOp};

/// Ordered log of mutations the task service has not confirmed, per identity.
/// Order is insertion order and is never rearranged.
pub struct OfflineQueue {
    db: Arc<ClientDatabase>,
}

impl OfflineQueue {
    pub fn new(db: Arc<ClientDatabase>) -> Self {
        Self { db }
    }

    pub async fn load(&self, session: &Session) -> ClientResult<Vec<PendingAction>> {
        match self.db.get_value(&session.queue_key()).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save(&self, session: &Session, actions: &[PendingAction]) -> ClientResult<()> {
        let json = serde_json::to_string(actions)?;
        self.db.put_value(&session.queue_key(), &json).await
    }

    pub async fn enqueue(&self, session: &Session, action: PendingAction) -> ClientResult<()> {
        tracing::debug!(
            "QUEUE: enqueue {} {} ({})",
            action.kind(),
            action.task_id(),
            action.id
        );
        let mut actions = self.load(session).await?;
        actions.push(action);
        self.save(session, &actions).await
    }

    /// Drop everything queued for a task that only ever existed locally: its
    /// create and any updates or deletes aimed at it. Returns how many went.
    pub async fn cancel_local(&self, session: &Session, local_id: &str) -> ClientResult<usize> {
        debug_assert!(is_local_id(local_id));

        let mut actions = self.load(session).await?;
        let before = actions.len();
        actions.retain(|action| match &action.op {
            PendingOp::Create { temp_id, .. } => temp_id != local_id,
            PendingOp::Update { target_id, .. } | PendingOp::Delete { target_id } => {
                target_id != local_id
            }
        });
        let removed = before - actions.len();

        if removed > 0 {
            self.save(session, &actions).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self, session: &Session) -> ClientResult<()> {
        self.db.delete_value(&session.queue_key()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use voxtask_core::models::{TaskFormData, TaskStatus, TaskUpdate};

    fn form(title: &str) -> TaskFormData {
        TaskFormData::new(title, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    }

    #[tokio::test]
    async fn test_enqueue_preserves_order() {
        let queue = OfflineQueue::new(Arc::new(ClientDatabase::in_memory().await.unwrap()));
        let session = Session::anonymous();

        queue
            .enqueue(&session, PendingAction::create("local-a", form("A")))
            .await
            .unwrap();
        queue
            .enqueue(&session, PendingAction::delete("srv-1"))
            .await
            .unwrap();
        queue
            .enqueue(
                &session,
                PendingAction::update("local-a", TaskUpdate::status(TaskStatus::Done)),
            )
            .await
            .unwrap();

        let ids: Vec<String> = queue
            .load(&session)
            .await
            .unwrap()
            .iter()
            .map(|a| format!("{}:{}", a.kind(), a.task_id()))
            .collect();
        assert_eq!(ids, vec!["CREATE:local-a", "DELETE:srv-1", "UPDATE:local-a"]);
    }

    #[tokio::test]
    async fn test_cancel_local_removes_create_and_followups() {
        let queue = OfflineQueue::new(Arc::new(ClientDatabase::in_memory().await.unwrap()));
        let session = Session::anonymous();

        queue
            .enqueue(&session, PendingAction::create("local-a", form("A")))
            .await
            .unwrap();
        queue
            .enqueue(&session, PendingAction::create("local-b", form("B")))
            .await
            .unwrap();
        queue
            .enqueue(
                &session,
                PendingAction::update("local-a", TaskUpdate::status(TaskStatus::OnHold)),
            )
            .await
            .unwrap();

        let removed = queue.cancel_local(&session, "local-a").await.unwrap();
        assert_eq!(removed, 2);

        let remaining = queue.load(&session).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].temp_id(), Some("local-b"));

        assert_eq!(queue.cancel_local(&session, "local-zzz").await.unwrap(), 0);
    }
}
