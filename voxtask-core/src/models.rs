use crate::errors::SyncError;
use crate::SyncResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Prefix reserved for ids minted on the client before the server confirms a create.
pub const LOCAL_ID_PREFIX: &str = "local-";

pub fn generate_local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4().simple())
}

/// True when `id` was minted locally and has not been replaced by a server id yet.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "todo")]
    #[strum(to_string = "todo")]
    Todo,
    #[serde(rename = "in progress", alias = "in_progress")]
    #[strum(to_string = "in progress", serialize = "in_progress")]
    InProgress,
    #[serde(rename = "on hold", alias = "on_hold")]
    #[strum(to_string = "on hold", serialize = "on_hold")]
    OnHold,
    #[serde(rename = "done")]
    #[strum(to_string = "done")]
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(with = "float_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "owner_id", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl Task {
    /// Build a task from create input under the given id.
    pub fn from_form(id: String, data: &TaskFormData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: data.title.clone(),
            description: data.description.clone(),
            deadline: data.deadline,
            tags: data.tags.clone(),
            status: data.status,
            created_at,
            owner_id: None,
        }
    }

    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }

    /// Overwrite every field set in `update`, leaving the rest untouched.
    pub fn apply_update(&mut self, update: &TaskUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Input for creating a task. This is also the payload of a queued create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFormData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl TaskFormData {
    pub fn new(title: impl Into<String>, deadline: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            deadline,
            tags: Vec::new(),
            status: TaskStatus::Todo,
        }
    }

    /// Trim the title, normalize tags, and reject an empty title.
    pub fn validated(mut self) -> SyncResult<Self> {
        self.title = validate_title(&self.title)?;
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }
}

/// Partial update of a task. Only fields that are `Some` go on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.tags.is_none()
            && self.status.is_none()
    }

    pub fn validated(mut self) -> SyncResult<Self> {
        if self.is_empty() {
            return Err(SyncError::Validation(
                "update must set at least one field".to_string(),
            ));
        }
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        self.tags = self.tags.map(normalize_tags);
        Ok(self)
    }
}

fn validate_title(title: &str) -> SyncResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Tags form an ordered set: trimmed, blanks dropped, first occurrence wins.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// `createdAt` travels as float seconds since the epoch.
mod float_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1_000_000.0;
        serializer.serialize_f64(secs)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000.0).round() as u32 * 1_000;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", secs)))
    }
}
