use crate::models::{TaskFormData, TaskUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

/// A mutation intent that the remote service has not confirmed yet.
///
/// The variant fixes which id a mutation carries: a create knows the local
/// id it minted (`tempId`), updates and deletes name the task they act on
/// (`targetId`), which may itself be a local id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum PendingOp {
    #[serde(rename_all = "camelCase")]
    Create { temp_id: String, payload: TaskFormData },
    #[serde(rename_all = "camelCase")]
    Update { target_id: String, payload: TaskUpdate },
    #[serde(rename_all = "camelCase")]
    Delete { target_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    #[serde(flatten)]
    pub op: PendingOp,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub enqueued_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(op: PendingOp) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            op,
            enqueued_at: Utc::now(),
        }
    }

    pub fn create(temp_id: impl Into<String>, payload: TaskFormData) -> Self {
        Self::new(PendingOp::Create {
            temp_id: temp_id.into(),
            payload,
        })
    }

    pub fn update(target_id: impl Into<String>, payload: TaskUpdate) -> Self {
        Self::new(PendingOp::Update {
            target_id: target_id.into(),
            payload,
        })
    }

    pub fn delete(target_id: impl Into<String>) -> Self {
        Self::new(PendingOp::Delete {
            target_id: target_id.into(),
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self.op {
            PendingOp::Create { .. } => ActionKind::Create,
            PendingOp::Update { .. } => ActionKind::Update,
            PendingOp::Delete { .. } => ActionKind::Delete,
        }
    }

    pub fn temp_id(&self) -> Option<&str> {
        match &self.op {
            PendingOp::Create { temp_id, .. } => Some(temp_id),
            _ => None,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        match &self.op {
            PendingOp::Update { target_id, .. } | PendingOp::Delete { target_id } => {
                Some(target_id)
            }
            PendingOp::Create { .. } => None,
        }
    }

    /// The task id this action refers to, whichever side of the invariant it sits on.
    pub fn task_id(&self) -> &str {
        match &self.op {
            PendingOp::Create { temp_id, .. } => temp_id,
            PendingOp::Update { target_id, .. } | PendingOp::Delete { target_id } => target_id,
        }
    }

    /// Point an update or delete at a different task id.
    pub fn retarget(&mut self, id: &str) {
        match &mut self.op {
            PendingOp::Update { target_id, .. } | PendingOp::Delete { target_id } => {
                *target_id = id.to_string();
            }
            PendingOp::Create { .. } => {}
        }
    }
}
