//! Repository: the data-access object screens talk to.
//!
//! Owns the local store, the remote collection and the connectivity signal.
//! Reads come from the local store only. Mutations commit locally first and
//! then mirror the change to the remote collection on a spawned task; a
//! mirror that fails or is not attempted lands in the outbox, and later
//! writes for the same task queue behind it.

use crate::connectivity::ConnectivitySignal;
use crate::error::Result;
use crate::now_millis;
use crate::outbox::{FlushReport, PendingKind, PendingWrite};
use crate::remote::{RemoteCollection, RemoteError};
use crate::store::SqliteStore;
use std::sync::Arc;
use tasklist_engine::{
    Changeset, FieldUpdate, ReconcileStats, Reconciler, Task, TaskPatch, UserId,
};
use tokio::task::JoinHandle;

/// Result of a sync or refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The local store now mirrors the remote collection
    Completed(ReconcileStats),
    /// The remote fetch failed; nothing changed locally
    RemoteUnavailable,
    /// The connectivity signal reported offline; nothing was attempted
    Offline,
    /// Queued writes could not be flushed, so the remote set was not
    /// treated as authoritative
    Deferred { pending: usize },
}

impl SyncOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }
}

/// What became of a mirrored remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWriteOutcome {
    /// Accepted by the remote collection
    Sent,
    /// Recorded in the outbox: it failed, the client was offline, or older
    /// writes for the same task were still queued
    Queued,
    /// A delete that cancelled the queued writes of a task never created
    /// remotely; nothing is left to send
    Squashed,
    /// Failed and could not be recorded either
    Lost,
}

/// Handle on a remote write.
///
/// Dropping it detaches the write.
#[derive(Debug)]
pub struct RemoteWrite {
    state: WriteState,
}

#[derive(Debug)]
enum WriteState {
    Settled(RemoteWriteOutcome),
    Spawned(JoinHandle<RemoteWriteOutcome>),
}

impl RemoteWrite {
    fn settled(outcome: RemoteWriteOutcome) -> Self {
        Self {
            state: WriteState::Settled(outcome),
        }
    }

    /// Wait for the write to finish.
    pub async fn wait(self) -> RemoteWriteOutcome {
        let handle = match self.state {
            WriteState::Settled(outcome) => return outcome,
            WriteState::Spawned(handle) => handle,
        };

        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "Remote write task failed");
                RemoteWriteOutcome::Lost
            }
        }
    }
}

/// Local-first task repository.
pub struct Repository {
    store: SqliteStore,
    remote: Arc<dyn RemoteCollection>,
    connectivity: ConnectivitySignal,
}

impl Repository {
    pub fn new(
        store: SqliteStore,
        remote: Arc<dyn RemoteCollection>,
        connectivity: ConnectivitySignal,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Close the local store. Writes still in flight may fail to queue.
    pub async fn close(&self) {
        self.store.close().await;
    }

    /// The owner's tasks ordered by creation time.
    pub async fn tasks(&self, owner: &str) -> Result<Vec<Task>> {
        self.store.tasks_for(owner).await
    }

    pub async fn task(&self, owner: &str, id: &str) -> Result<Option<Task>> {
        self.store.get(owner, id).await
    }

    pub async fn contains(&self, owner: &str, id: &str) -> Result<bool> {
        Ok(self.store.count(owner, id).await? > 0)
    }

    /// Queued remote writes of `owner`, oldest first.
    pub async fn pending_writes(&self, owner: &str) -> Result<Vec<PendingWrite>> {
        self.store.pending(owner).await
    }

    /// Create a task and mirror it remotely.
    pub async fn create(&self, owner: &str, title: &str) -> Result<(Task, RemoteWrite)> {
        let id = self.remote.new_document_id();
        let task = Task::new(id, owner, title, now_millis());

        self.store
            .commit(&Changeset::new(owner).insert(task.clone()))
            .await?;
        tracing::info!(owner = %owner, task_id = %task.id, "Task created");

        let write = self
            .dispatch(
                owner,
                &task.id,
                PendingKind::Create {
                    document: task.to_document(),
                },
            )
            .await?;
        Ok((task, write))
    }

    /// Change a task's title. `None` when the task does not exist.
    pub async fn rename(
        &self,
        owner: &str,
        id: &str,
        title: &str,
    ) -> Result<Option<(Task, RemoteWrite)>> {
        self.update(owner, id, |_| FieldUpdate::Title(title.to_string()))
            .await
    }

    /// Flip a task's done flag. `None` when the task does not exist.
    pub async fn toggle(&self, owner: &str, id: &str) -> Result<Option<(Task, RemoteWrite)>> {
        self.update(owner, id, |task| FieldUpdate::IsDone(!task.is_done))
            .await
    }

    /// Delete a task. `None` when the task does not exist.
    pub async fn delete(&self, owner: &str, id: &str) -> Result<Option<RemoteWrite>> {
        if id.is_empty() || !self.contains(owner, id).await? {
            tracing::debug!(owner = %owner, task_id = %id, "Delete of unknown task ignored");
            return Ok(None);
        }

        self.store.commit(&Changeset::new(owner).delete(id)).await?;
        tracing::info!(owner = %owner, task_id = %id, "Task deleted");

        Ok(Some(self.dispatch(owner, id, PendingKind::Delete).await?))
    }

    async fn update<F>(&self, owner: &str, id: &str, change: F) -> Result<Option<(Task, RemoteWrite)>>
    where
        F: FnOnce(&Task) -> FieldUpdate,
    {
        if id.is_empty() {
            return Ok(None);
        }
        let Some(mut task) = self.store.get(owner, id).await? else {
            tracing::debug!(owner = %owner, task_id = %id, "Update of unknown task ignored");
            return Ok(None);
        };

        let update = change(&task);
        task.apply(&update);
        self.store
            .commit(&Changeset::new(owner).update(TaskPatch::from_task(&task)))
            .await?;
        tracing::info!(owner = %owner, task_id = %id, field = update.field(), "Task updated");

        let write = self
            .dispatch(owner, id, PendingKind::Update { update })
            .await?;
        Ok(Some((task, write)))
    }

    /// Align the local store with the remote collection. Remote wins.
    pub async fn sync(&self, owner: &str) -> Result<SyncOutcome> {
        if !self.connectivity.is_connected() {
            tracing::debug!(owner = %owner, "Offline, sync skipped");
            return Ok(SyncOutcome::Offline);
        }

        let remote = match self.remote.fetch_all(owner).await {
            Ok(documents) => documents,
            Err(err) => {
                tracing::warn!(owner = %owner, error = %err, "Remote fetch failed, sync aborted");
                return Ok(SyncOutcome::RemoteUnavailable);
            }
        };

        let local = self.store.tasks_for(owner).await?;
        let plan = Reconciler::new(now_millis()).reconcile(owner, &local, &remote);

        for reason in &plan.skipped {
            tracing::warn!(owner = %owner, error = %reason, "Skipping remote document");
        }

        self.store.commit(&plan.changeset).await?;

        tracing::info!(
            owner = %owner,
            inserted = plan.stats.inserted,
            updated = plan.stats.updated,
            deleted = plan.stats.deleted,
            unchanged = plan.stats.unchanged,
            "Sync completed"
        );

        Ok(SyncOutcome::Completed(plan.stats))
    }

    /// Replay queued writes in order, stopping at the first failure.
    pub async fn flush_outbox(&self, owner: &str) -> Result<FlushReport> {
        let mut report = FlushReport::default();

        if self.connectivity.is_connected() {
            for pending in self.store.pending(owner).await? {
                match send(self.remote.as_ref(), owner, &pending.task_id, &pending.kind).await {
                    Ok(()) => {
                        self.store.remove_pending(pending.seq).await?;
                        report.sent += 1;
                    }
                    Err(RemoteError::NotFound(_)) => {
                        tracing::debug!(
                            owner = %owner,
                            task_id = %pending.task_id,
                            "Dropping update of a document gone remotely"
                        );
                        self.store.remove_pending(pending.seq).await?;
                        report.dropped += 1;
                    }
                    Err(err) => {
                        tracing::warn!(
                            owner = %owner,
                            task_id = %pending.task_id,
                            kind = pending.kind.label(),
                            error = %err,
                            "Outbox replay failed"
                        );
                        self.store.mark_failed(pending.seq, &err.to_string()).await?;
                        break;
                    }
                }
            }
        }

        report.remaining = self.store.pending_count(owner).await?;
        if report.sent + report.dropped > 0 {
            tracing::info!(
                owner = %owner,
                sent = report.sent,
                dropped = report.dropped,
                remaining = report.remaining,
                "Outbox flushed"
            );
        }
        Ok(report)
    }

    /// Push queued writes, then sync.
    ///
    /// Sync is deferred while writes remain queued so that tasks created
    /// locally are not deleted before they reach the remote collection.
    pub async fn refresh(&self, owner: &str) -> Result<SyncOutcome> {
        if !self.connectivity.is_connected() {
            return Ok(SyncOutcome::Offline);
        }

        let report = self.flush_outbox(owner).await?;
        if !report.is_drained() {
            tracing::warn!(owner = %owner, pending = report.remaining, "Sync deferred");
            return Ok(SyncOutcome::Deferred {
                pending: report.remaining,
            });
        }

        self.sync(owner).await
    }

    /// Mirror a committed change to the remote collection.
    ///
    /// Writes for one task reach the remote in commit order: while any
    /// write for the task is queued, later ones queue behind it.
    async fn dispatch(&self, owner: &str, task_id: &str, kind: PendingKind) -> Result<RemoteWrite> {
        let queued = self.store.pending_for_task(owner, task_id).await?;

        let never_created = queued
            .iter()
            .any(|pending| matches!(pending.kind, PendingKind::Create { .. }));
        if never_created && matches!(kind, PendingKind::Delete) {
            let discarded = self.store.discard_pending(owner, task_id).await?;
            tracing::debug!(owner = %owner, task_id = %task_id, discarded, "Queued writes cancelled by delete");
            return Ok(RemoteWrite::settled(RemoteWriteOutcome::Squashed));
        }

        if !queued.is_empty() || !self.connectivity.is_connected() {
            let seq = self
                .store
                .enqueue(owner, task_id, &kind, now_millis(), None)
                .await?;
            tracing::debug!(
                owner = %owner,
                task_id = %task_id,
                kind = kind.label(),
                seq,
                behind = queued.len(),
                "Remote write queued"
            );
            return Ok(RemoteWrite::settled(RemoteWriteOutcome::Queued));
        }

        let store = self.store.clone();
        let remote = Arc::clone(&self.remote);
        let owner: UserId = owner.to_string();
        let task_id = task_id.to_string();

        let handle = tokio::spawn(async move {
            let error = match send(remote.as_ref(), &owner, &task_id, &kind).await {
                Ok(()) => {
                    tracing::debug!(owner = %owner, task_id = %task_id, kind = kind.label(), "Remote write sent");
                    return RemoteWriteOutcome::Sent;
                }
                Err(err) => {
                    tracing::warn!(
                        owner = %owner,
                        task_id = %task_id,
                        kind = kind.label(),
                        error = %err,
                        "Remote write failed"
                    );
                    err.to_string()
                }
            };

            match store
                .enqueue(&owner, &task_id, &kind, now_millis(), Some(&error))
                .await
            {
                Ok(seq) => {
                    tracing::debug!(owner = %owner, task_id = %task_id, seq, "Remote write queued");
                    RemoteWriteOutcome::Queued
                }
                Err(err) => {
                    tracing::error!(owner = %owner, task_id = %task_id, error = %err, "Failed to queue remote write");
                    RemoteWriteOutcome::Lost
                }
            }
        });

        Ok(RemoteWrite {
            state: WriteState::Spawned(handle),
        })
    }
}

async fn send(
    remote: &dyn RemoteCollection,
    owner: &str,
    task_id: &str,
    kind: &PendingKind,
) -> std::result::Result<(), RemoteError> {
    match kind {
        PendingKind::Create { document } => remote.create(owner, document).await,
        PendingKind::Update { update } => remote.update_field(owner, task_id, update).await,
        PendingKind::Delete => remote.delete(owner, task_id).await,
    }
}
