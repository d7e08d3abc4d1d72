use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use voxtask_client::{ClientDatabase, ClientError, ClientResult, Session, SyncEngine, TaskRemote};
use voxtask_core::models::{Task, TaskFormData, TaskUpdate};

/// One call as observed by the fake task service.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum RemoteCall {
    Health,
    List,
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Default)]
struct FakeState {
    online: bool,
    tasks: Vec<Task>,
    calls: Vec<RemoteCall>,
    quota: Option<usize>,
    next_id: u64,
    // Go offline after this many more answered calls.
    offline_after: Option<usize>,
    delay_ms: u64,
    // Calls answered with a fixed failure status instead of being served.
    forced: Vec<(RemoteCall, u16)>,
    // Calls served normally but answered with an unreadable body.
    garbled: Vec<RemoteCall>,
}

/// Scripted in-process task service. Records every call, answered or not.
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                online: true,
                ..Default::default()
            }),
        }
    }

    pub fn set_online(&self, online: bool) {
        let mut state = self.state.lock().unwrap();
        state.online = online;
        state.offline_after = None;
    }

    pub fn go_offline_after(&self, answered_calls: usize) {
        self.state.lock().unwrap().offline_after = Some(answered_calls);
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        self.state.lock().unwrap().quota = quota;
    }

    pub fn set_delay_ms(&self, delay_ms: u64) {
        self.state.lock().unwrap().delay_ms = delay_ms;
    }

    /// Answer every matching call with `status` until cleared.
    pub fn force_status(&self, call: RemoteCall, status: u16) {
        self.state.lock().unwrap().forced.push((call, status));
    }

    /// Serve matching calls, then answer with a body that cannot be decoded.
    pub fn garble(&self, call: RemoteCall) {
        self.state.lock().unwrap().garbled.push(call);
    }

    pub fn clear_forced(&self) {
        let mut state = self.state.lock().unwrap();
        state.forced.clear();
        state.garbled.clear();
    }

    pub fn seed(&self, title: &str) -> Task {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let task = Task::from_form(format!("srv-{}", state.next_id), &form(title), Utc::now());
        state.tasks.push(task.clone());
        task
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub fn server_task(&self, id: &str) -> Option<Task> {
        self.server_tasks().into_iter().find(|t| t.id == id)
    }

    // Record the call and decide how it is answered. `Ok(true)` asks the
    // caller to serve it and then garble the body.
    async fn enter(&self, call: RemoteCall) -> ClientResult<bool> {
        let (delay_ms, forced, garbled) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            if let Some(left) = state.offline_after {
                if left == 0 {
                    state.online = false;
                    state.offline_after = None;
                } else {
                    state.offline_after = Some(left - 1);
                }
            }
            if !state.online {
                return Err(ClientError::Unreachable("connection refused".to_string()));
            }
            let forced = state
                .forced
                .iter()
                .find(|(c, _)| *c == call)
                .map(|(_, status)| *status);
            (state.delay_ms, forced, state.garbled.contains(&call))
        };
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
        match forced {
            Some(404) => Err(ClientError::NotFound(format!("{:?}", call))),
            Some(status) => Err(ClientError::RemoteRejected {
                status,
                message: format!("forced status {}", status),
            }),
            None => Ok(garbled),
        }
    }
}

fn unreadable() -> ClientError {
    ClientError::MalformedResponse("expected value at line 1 column 1".to_string())
}

#[async_trait]
impl TaskRemote for FakeRemote {
    async fn check_health(&self) -> bool {
        self.enter(RemoteCall::Health).await.is_ok()
    }

    async fn list_tasks(&self, _session: &Session) -> ClientResult<Vec<Task>> {
        if self.enter(RemoteCall::List).await? {
            return Err(unreadable());
        }
        Ok(self.server_tasks())
    }

    async fn create_task(&self, _session: &Session, data: &TaskFormData) -> ClientResult<Task> {
        let garbled = self.enter(RemoteCall::Create(data.title.clone())).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(quota) = state.quota {
            if state.tasks.len() >= quota {
                return Err(ClientError::RemoteRejected {
                    status: 403,
                    message: "Task quota exceeded".to_string(),
                });
            }
        }
        state.next_id += 1;
        let task = Task::from_form(format!("srv-{}", state.next_id), data, Utc::now());
        state.tasks.push(task.clone());
        if garbled {
            return Err(unreadable());
        }
        Ok(task)
    }

    async fn update_task(
        &self,
        _session: &Session,
        id: &str,
        update: &TaskUpdate,
    ) -> ClientResult<Task> {
        let garbled = self.enter(RemoteCall::Update(id.to_string())).await?;
        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("/tasks/{}", id)))?;
        task.apply_update(update);
        if garbled {
            return Err(unreadable());
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, _session: &Session, id: &str) -> ClientResult<()> {
        self.enter(RemoteCall::Delete(id.to_string())).await?;
        let mut state = self.state.lock().unwrap();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(ClientError::NotFound(format!("/tasks/{}", id)));
        }
        Ok(())
    }
}

#[allow(dead_code)]
pub fn form(title: &str) -> TaskFormData {
    TaskFormData::new(title, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
}

/// Engine over a fresh in-memory database and an online fake service.
#[allow(dead_code)]
pub async fn setup_engine() -> SyncEngine<FakeRemote> {
    let db = Arc::new(ClientDatabase::in_memory().await.unwrap());
    SyncEngine::new(db, FakeRemote::new())
}
