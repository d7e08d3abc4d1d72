use crate::{
    cache::LocalCache,
    config::ClientConfig,
    database::ClientDatabase,
    errors::{ClientError, ClientResult},
    offline_queue::OfflineQueue,
    remote::{HttpRemote, TaskRemote},
    session::Session,
};
use std::collections::{HashMap, HashSet};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use voxtask_core::{
    models::{generate_local_id, is_local_id, Task, TaskFormData, TaskUpdate},
    pending::{PendingAction, PendingOp},
};

/// Why a replay pass stopped before reaching the end of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// A queued create hit a policy refusal (quota). Nothing after it was tried.
    PolicyRejected { action_id: String, message: String },
    /// A queued create failed for another reason; the service is assumed down.
    CreateFailed { action_id: String, error: String },
    /// Transport failure or timeout on any action.
    Unreachable { action_id: String, error: String },
}

/// Outcome of one `process_sync_queue` call.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Another pass held the guard; nothing was done.
    pub already_running: bool,
    pub processed: usize,
    /// Left queued because their target is still a local id.
    pub skipped: usize,
    /// Left queued because the service refused them.
    pub rejected: usize,
    /// Queue length after the pass was persisted.
    pub remaining: usize,
    /// Tasks created during the pass whose create was cancelled meanwhile,
    /// removed again from the service (or queued for removal).
    pub discarded: usize,
    pub halted: Option<HaltReason>,
    /// Local id -> server id for every create confirmed in this pass.
    pub id_map: HashMap<String, String>,
}

// Holds the replay flag for the duration of a pass.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Offline-first front door for task mutations.
///
/// Writes land in the local cache first, then the engine tries the task
/// service once; anything the service did not confirm goes to the pending
/// queue and is replayed, in order, by `process_sync_queue`. The engine
/// never schedules replay itself.
pub struct SyncEngine<R = HttpRemote> {
    db: Arc<ClientDatabase>,
    cache: LocalCache,
    queue: OfflineQueue,
    remote: R,
    backend_available: AtomicBool,
    syncing: AtomicBool,
}

impl SyncEngine<HttpRemote> {
    /// Open (and migrate) the local database and point at the configured service.
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let db = Arc::new(ClientDatabase::new(&config.database_url).await?);
        db.run_migrations().await?;
        Ok(Self::new(db, HttpRemote::new(config)?))
    }
}

impl<R: TaskRemote> SyncEngine<R> {
    pub fn new(db: Arc<ClientDatabase>, remote: R) -> Self {
        Self {
            cache: LocalCache::new(db.clone()),
            queue: OfflineQueue::new(db.clone()),
            db,
            remote,
            backend_available: AtomicBool::new(false),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn database(&self) -> Arc<ClientDatabase> {
        self.db.clone()
    }

    /// Whether the last remote interaction reached the service.
    pub fn is_backend_available(&self) -> bool {
        self.backend_available.load(Ordering::Relaxed)
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    fn set_backend_available(&self, available: bool) {
        let was = self.backend_available.swap(available, Ordering::Relaxed);
        if was != available {
            tracing::info!(
                "SYNC: task service is now {}",
                if available { "reachable" } else { "unreachable" }
            );
        }
    }

    // A failure status still proves the service is up.
    fn note_failure(&self, error: &ClientError) {
        self.set_backend_available(error.is_remote_answer());
    }

    pub async fn check_health(&self) -> bool {
        let healthy = self.remote.check_health().await;
        self.set_backend_available(healthy);
        healthy
    }

    /// Tasks from the service, or the cached snapshot when it cannot be read.
    pub async fn get_tasks(&self, session: &Session) -> Vec<Task> {
        match self.remote.list_tasks(session).await {
            Ok(tasks) => {
                self.set_backend_available(true);
                if let Err(e) = self.cache.write(session, &tasks).await {
                    tracing::error!("SYNC: failed to refresh cache: {}", e);
                }
                tasks
            }
            Err(e) => {
                tracing::warn!("SYNC: listing tasks failed, serving cache: {}", e);
                self.set_backend_available(false);
                self.cache.read(session).await
            }
        }
    }

    pub async fn cached_tasks(&self, session: &Session) -> Vec<Task> {
        self.cache.read(session).await
    }

    pub async fn pending_actions(&self, session: &Session) -> ClientResult<Vec<PendingAction>> {
        self.queue.load(session).await
    }

    /// Create a task. The returned task carries a local id when the service
    /// could not confirm it yet. Only a policy refusal, or a success answer
    /// whose body cannot be read, is returned as an error.
    pub async fn create_task(&self, session: &Session, data: TaskFormData) -> ClientResult<Task> {
        let data = data.validated()?;
        let local = Task::from_form(generate_local_id(), &data, chrono::Utc::now());

        let mut tasks = self.cache.load(session).await?;
        tasks.push(local.clone());
        self.cache.write(session, &tasks).await?;

        match self.remote.create_task(session, &data).await {
            Ok(server_task) => {
                self.set_backend_available(true);
                let mut tasks = self.cache.load(session).await?;
                for task in tasks.iter_mut().filter(|t| t.id == local.id) {
                    *task = server_task.clone();
                }
                self.cache.write(session, &tasks).await?;
                tracing::debug!("SYNC: created {} (was {})", server_task.id, local.id);
                Ok(server_task)
            }
            Err(e) if e.is_policy_rejection() || e.is_malformed_response() => {
                // A malformed 2xx means the service created the task but its id
                // is unknown; queueing would create it twice. The next
                // `get_tasks` brings it back under its real id.
                self.set_backend_available(true);
                let mut tasks = self.cache.load(session).await?;
                tasks.retain(|t| t.id != local.id);
                self.cache.write(session, &tasks).await?;
                Err(e)
            }
            Err(e) => {
                tracing::warn!("SYNC: create queued for later, {}: {}", local.id, e);
                self.note_failure(&e);
                self.queue
                    .enqueue(session, PendingAction::create(local.id.clone(), data))
                    .await?;
                Ok(local)
            }
        }
    }

    /// Apply `updates` to the cached task, if any, and try to confirm remotely.
    /// Tasks still on a local id are never sent; their update waits in the queue.
    ///
    /// Returns the service's copy when it confirmed, otherwise the cached copy
    /// with the update applied. `None` means the update was queued for a task
    /// the cache does not hold.
    pub async fn update_task(
        &self,
        session: &Session,
        id: &str,
        updates: TaskUpdate,
    ) -> ClientResult<Option<Task>> {
        let updates = updates.validated()?;

        let mut tasks = self.cache.load(session).await?;
        let previous = match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                let previous = task.clone();
                task.apply_update(&updates);
                Some((previous, task.clone()))
            }
            None => {
                tracing::debug!("SYNC: {} not cached, update goes straight through", id);
                None
            }
        };
        if previous.is_some() {
            self.cache.write(session, &tasks).await?;
        }
        let updated = previous.as_ref().map(|(_, task)| task.clone());

        if is_local_id(id) {
            tracing::debug!("SYNC: {} not confirmed yet, update deferred", id);
            self.queue
                .enqueue(session, PendingAction::update(id, updates))
                .await?;
            return Ok(updated);
        }

        match self.remote.update_task(session, id, &updates).await {
            Ok(server_task) => {
                self.set_backend_available(true);
                Ok(Some(server_task))
            }
            Err(ClientError::MalformedResponse(e)) => {
                // 2xx: the service applied it, only the echo was unreadable.
                self.set_backend_available(true);
                tracing::warn!("SYNC: update of {} confirmed with unreadable body: {}", id, e);
                Ok(updated)
            }
            Err(e) if e.is_policy_rejection() => {
                self.set_backend_available(true);
                if let Some((previous, _)) = previous {
                    let mut tasks = self.cache.load(session).await?;
                    for task in tasks.iter_mut().filter(|t| t.id == id) {
                        *task = previous.clone();
                    }
                    self.cache.write(session, &tasks).await?;
                }
                Err(e)
            }
            Err(e) => {
                tracing::warn!("SYNC: update queued for later, {}: {}", id, e);
                self.note_failure(&e);
                self.queue
                    .enqueue(session, PendingAction::update(id, updates))
                    .await?;
                Ok(updated)
            }
        }
    }

    /// Remove a task. Deleting a task that never reached the service cancels
    /// its queued create instead of queueing a delete.
    pub async fn delete_task(&self, session: &Session, id: &str) -> ClientResult<()> {
        let mut tasks = self.cache.load(session).await?;
        let removed = tasks
            .iter()
            .position(|t| t.id == id)
            .map(|pos| (pos, tasks.remove(pos)));
        self.cache.write(session, &tasks).await?;

        if is_local_id(id) {
            let cancelled = self.queue.cancel_local(session, id).await?;
            tracing::debug!("SYNC: {} deleted before sync, cancelled {} actions", id, cancelled);
            return Ok(());
        }

        match self.remote.delete_task(session, id).await {
            Ok(()) | Err(ClientError::NotFound(_)) => {
                self.set_backend_available(true);
                Ok(())
            }
            Err(e) if e.is_policy_rejection() => {
                self.set_backend_available(true);
                if let Some((pos, task)) = removed {
                    let mut tasks = self.cache.load(session).await?;
                    if !tasks.iter().any(|t| t.id == id) {
                        tasks.insert(pos.min(tasks.len()), task);
                        self.cache.write(session, &tasks).await?;
                    }
                }
                Err(e)
            }
            Err(e) => {
                tracing::warn!("SYNC: delete queued for later, {}: {}", id, e);
                self.note_failure(&e);
                self.queue
                    .enqueue(session, PendingAction::delete(id))
                    .await?;
                Ok(())
            }
        }
    }

    /// Replay the pending queue once, strictly in enqueue order.
    ///
    /// Creates confirmed during the pass feed `id_map`, which later updates and
    /// deletes resolve their target through. Never returns an error: failures
    /// are logged, reflected in the reachability flag, and left in the queue.
    pub async fn process_sync_queue(&self, session: &Session) -> SyncReport {
        let mut report = SyncReport::default();

        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            tracing::debug!("SYNC: replay already in progress");
            report.already_running = true;
            return report;
        };

        let queue = match self.queue.load(session).await {
            Ok(queue) => queue,
            Err(e) => {
                tracing::error!("SYNC: could not read pending queue: {}", e);
                return report;
            }
        };
        if queue.is_empty() {
            return report;
        }

        tracing::info!("SYNC: processing {} pending actions", queue.len());

        let queued_creates: HashSet<&str> = queue.iter().filter_map(|a| a.temp_id()).collect();
        let mut processed: HashSet<String> = HashSet::new();
        let mut confirmed: HashMap<String, Task> = HashMap::new();
        // Creates the service accepted without a readable task in the answer.
        let mut unreadable: HashSet<String> = HashSet::new();

        for action in &queue {
            match &action.op {
                PendingOp::Create { temp_id, payload } => {
                    match self.remote.create_task(session, payload).await {
                        Ok(task) => {
                            self.set_backend_available(true);
                            tracing::debug!("SYNC: replayed create {} -> {}", temp_id, task.id);
                            report.id_map.insert(temp_id.clone(), task.id.clone());
                            confirmed.insert(temp_id.clone(), task);
                            processed.insert(action.id.clone());
                        }
                        Err(e) if e.is_malformed_response() => {
                            self.set_backend_available(true);
                            tracing::warn!(
                                "SYNC: create {} accepted but unreadable, dropping it: {}",
                                temp_id,
                                e
                            );
                            unreadable.insert(temp_id.clone());
                            processed.insert(action.id.clone());
                        }
                        Err(e) if e.is_policy_rejection() => {
                            // TODO: revisit whether a quota refusal should block unrelated
                            // edits queued behind it; for now it stops the whole pass.
                            self.set_backend_available(true);
                            tracing::warn!("SYNC: create {} refused by policy: {}", temp_id, e);
                            report.halted = Some(HaltReason::PolicyRejected {
                                action_id: action.id.clone(),
                                message: e.to_string(),
                            });
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("SYNC: create {} failed, stopping pass: {}", temp_id, e);
                            self.note_failure(&e);
                            report.halted = Some(if e.is_remote_answer() {
                                HaltReason::CreateFailed {
                                    action_id: action.id.clone(),
                                    error: e.to_string(),
                                }
                            } else {
                                HaltReason::Unreachable {
                                    action_id: action.id.clone(),
                                    error: e.to_string(),
                                }
                            });
                            break;
                        }
                    }
                }
                PendingOp::Update { target_id, payload } => {
                    let id = resolve(&report.id_map, target_id);
                    if is_local_id(id) {
                        tracing::debug!("SYNC: update for unconfirmed {} skipped", id);
                        report.skipped += 1;
                        continue;
                    }
                    match self.remote.update_task(session, id, payload).await {
                        Ok(_) | Err(ClientError::MalformedResponse(_)) => {
                            self.set_backend_available(true);
                            processed.insert(action.id.clone());
                        }
                        Err(e) if e.is_remote_answer() => {
                            self.set_backend_available(true);
                            tracing::warn!("SYNC: update {} refused, kept queued: {}", id, e);
                            report.rejected += 1;
                        }
                        Err(e) => {
                            self.halt_unreachable(&mut report, action, e);
                            break;
                        }
                    }
                }
                PendingOp::Delete { target_id } => {
                    let id = resolve(&report.id_map, target_id);
                    if is_local_id(id) {
                        if queued_creates.contains(id) {
                            report.skipped += 1;
                        } else {
                            // Never created remotely, nothing left to delete.
                            processed.insert(action.id.clone());
                        }
                        continue;
                    }
                    match self.remote.delete_task(session, id).await {
                        Ok(()) | Err(ClientError::NotFound(_)) => {
                            self.set_backend_available(true);
                            processed.insert(action.id.clone());
                        }
                        Err(e) if e.is_remote_answer() => {
                            self.set_backend_available(true);
                            tracing::warn!("SYNC: delete {} refused, kept queued: {}", id, e);
                            report.rejected += 1;
                        }
                        Err(e) => {
                            self.halt_unreachable(&mut report, action, e);
                            break;
                        }
                    }
                }
            }
        }

        report.processed = processed.len();
        let (remaining, orphaned) = self
            .persist_remaining(session, &queue, &processed, &report.id_map, &unreadable)
            .await;
        report.remaining = remaining;
        self.adopt_confirmed(session, &confirmed, &unreadable).await;
        report.discarded = orphaned.len();
        for server_id in orphaned {
            if self.discard_orphan(session, &server_id).await {
                report.remaining += 1;
            }
        }

        tracing::info!(
            "SYNC: finished, {} processed, {} remaining in queue",
            report.processed,
            report.remaining
        );
        report
    }

    fn halt_unreachable(&self, report: &mut SyncReport, action: &PendingAction, e: ClientError) {
        tracing::warn!(
            "SYNC: {} {} failed, stopping pass: {}",
            action.kind(),
            action.task_id(),
            e
        );
        self.note_failure(&e);
        report.halted = Some(HaltReason::Unreachable {
            action_id: action.id.clone(),
            error: e.to_string(),
        });
    }

    // Re-read the queue so actions enqueued while the pass awaited the
    // network survive, then drop what was processed and carry the id remapping
    // into whatever is left. Returns the persisted length and the server ids of
    // creates that were cancelled while in flight.
    async fn persist_remaining(
        &self,
        session: &Session,
        snapshot: &[PendingAction],
        processed: &HashSet<String>,
        id_map: &HashMap<String, String>,
        unreadable: &HashSet<String>,
    ) -> (usize, Vec<String>) {
        let (mut remaining, orphaned) = match self.queue.load(session).await {
            Ok(current) => {
                let still_queued: HashSet<&str> = current.iter().map(|a| a.id.as_str()).collect();
                let orphaned = snapshot
                    .iter()
                    .filter(|a| processed.contains(&a.id) && !still_queued.contains(a.id.as_str()))
                    .filter_map(|a| a.temp_id().and_then(|t| id_map.get(t)).cloned())
                    .collect();
                (current, orphaned)
            }
            Err(e) => {
                tracing::error!("SYNC: could not re-read pending queue: {}", e);
                (snapshot.to_vec(), Vec::new())
            }
        };
        remaining.retain(|a| !processed.contains(&a.id));
        // Nothing can resolve these targets any more.
        remaining.retain(|a| !a.target_id().is_some_and(|t| unreadable.contains(t)));
        for action in remaining.iter_mut() {
            let mapped = action.target_id().and_then(|t| id_map.get(t)).cloned();
            if let Some(server_id) = mapped {
                action.retarget(&server_id);
            }
        }

        if let Err(e) = self.queue.save(session, &remaining).await {
            tracing::error!("SYNC: could not persist pending queue: {}", e);
        }
        (remaining.len(), orphaned)
    }

    // The local task was deleted while its create was on the wire. Remove the
    // server copy now, or queue the delete when that fails. True when queued.
    async fn discard_orphan(&self, session: &Session, server_id: &str) -> bool {
        tracing::info!("SYNC: {} was deleted during replay, removing it remotely", server_id);
        match self.remote.delete_task(session, server_id).await {
            Ok(()) | Err(ClientError::NotFound(_)) => false,
            Err(e) => {
                tracing::warn!("SYNC: delete of {} queued for later: {}", server_id, e);
                self.note_failure(&e);
                match self
                    .queue
                    .enqueue(session, PendingAction::delete(server_id))
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("SYNC: could not queue delete of {}: {}", server_id, e);
                        false
                    }
                }
            }
        }
    }

    // Swap confirmed local ids for server ids in the cached snapshot. Field
    // values stay local: queued updates will bring the service up to them.
    async fn adopt_confirmed(
        &self,
        session: &Session,
        confirmed: &HashMap<String, Task>,
        unreadable: &HashSet<String>,
    ) {
        if confirmed.is_empty() && unreadable.is_empty() {
            return;
        }
        let mut tasks = match self.cache.load(session).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("SYNC: could not read cache to adopt server ids: {}", e);
                return;
            }
        };
        tasks.retain(|t| !unreadable.contains(&t.id));
        for task in tasks.iter_mut() {
            if let Some(server) = confirmed.get(&task.id) {
                task.id = server.id.clone();
                task.created_at = server.created_at;
                task.owner_id = server.owner_id.clone();
            }
        }
        if let Err(e) = self.cache.write(session, &tasks).await {
            tracing::error!("SYNC: could not write cache after replay: {}", e);
        }
    }

    /// Forget everything stored for the session (sign-out).
    pub async fn clear_session(&self, session: &Session) -> ClientResult<()> {
        self.cache.clear(session).await?;
        self.queue.clear(session).await
    }
}

fn resolve<'a>(id_map: &'a HashMap<String, String>, id: &'a str) -> &'a str {
    id_map.get(id).map(String::as_str).unwrap_or(id)
}
