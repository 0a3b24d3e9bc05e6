//! Repository behaviour against an in-memory store and remote.

use serde_json::json;
use std::sync::Arc;
use tasklist::{
    ConnectivitySignal, FieldUpdate, MemoryRemote, RemoteCall, RemoteCollection,
    RemoteWriteOutcome, Repository, SqliteStore, SyncOutcome, Task, TaskDocument,
};

const ALICE: &str = "alice";

async fn setup() -> (Repository, Arc<MemoryRemote>, ConnectivitySignal) {
    let store = SqliteStore::in_memory().await.unwrap();
    let remote = Arc::new(MemoryRemote::new());
    let signal = ConnectivitySignal::new(true);
    let repo = Repository::new(
        store,
        remote.clone() as Arc<dyn RemoteCollection>,
        signal.clone(),
    );
    (repo, remote, signal)
}

fn doc(id: &str, title: &str, is_done: bool) -> TaskDocument {
    TaskDocument {
        id: id.into(),
        title: title.into(),
        created_at: 1_706_745_600_000,
        is_done,
    }
}

async fn seed_local(repo: &Repository, tasks: &[Task]) {
    let mut changeset = tasklist_engine::Changeset::new(ALICE);
    for task in tasks {
        changeset = changeset.insert(task.clone());
    }
    repo.store().commit(&changeset).await.unwrap();
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn sync_inserts_remote_only_tasks() {
    let (repo, remote, _) = setup().await;
    remote.insert_document(ALICE, &doc("r1", "From the web", true));

    let outcome = repo.sync(ALICE).await.unwrap();
    let SyncOutcome::Completed(stats) = outcome else {
        panic!("expected completed sync, got {outcome:?}");
    };
    assert_eq!(stats.inserted, 1);

    let task = repo.task(ALICE, "r1").await.unwrap().unwrap();
    assert_eq!(task.title, "From the web");
    assert!(task.is_done);
    assert_eq!(task.created_at, 1_706_745_600_000);
}

#[tokio::test]
async fn sync_deletes_local_only_tasks() {
    let (repo, _, _) = setup().await;
    seed_local(&repo, &[Task::new("gone", ALICE, "Deleted elsewhere", 1)]).await;

    repo.sync(ALICE).await.unwrap();
    assert!(!repo.contains(ALICE, "gone").await.unwrap());
}

#[tokio::test]
async fn sync_overwrites_local_values() {
    let (repo, remote, _) = setup().await;
    seed_local(&repo, &[Task::new("t1", ALICE, "Local title", 5)]).await;
    remote.insert_document(ALICE, &doc("t1", "Remote title", true));

    repo.sync(ALICE).await.unwrap();

    let task = repo.task(ALICE, "t1").await.unwrap().unwrap();
    assert_eq!(task.title, "Remote title");
    assert!(task.is_done);
    // Creation time is never rewritten
    assert_eq!(task.created_at, 5);
}

#[tokio::test]
async fn second_sync_stages_nothing() {
    let (repo, remote, _) = setup().await;
    remote.insert_document(ALICE, &doc("a", "One", false));
    remote.insert_document(ALICE, &doc("b", "Two", true));
    seed_local(&repo, &[Task::new("c", ALICE, "Three", 1)]).await;

    assert!(repo.sync(ALICE).await.unwrap().is_completed());
    let before = repo.tasks(ALICE).await.unwrap();

    let SyncOutcome::Completed(stats) = repo.sync(ALICE).await.unwrap() else {
        panic!("expected completed sync");
    };
    assert_eq!(stats.changes(), 0);
    assert_eq!(stats.unchanged, 2);
    assert_eq!(repo.tasks(ALICE).await.unwrap(), before);
}

#[tokio::test]
async fn failed_fetch_leaves_local_untouched() {
    let (repo, remote, _) = setup().await;
    seed_local(&repo, &[Task::new("t1", ALICE, "Keep me", 1)]).await;
    remote.set_failing(true);

    assert_eq!(
        repo.sync(ALICE).await.unwrap(),
        SyncOutcome::RemoteUnavailable
    );
    let tasks = repo.tasks(ALICE).await.unwrap();
    assert_eq!(tasks, vec![Task::new("t1", ALICE, "Keep me", 1)]);
}

#[tokio::test]
async fn sync_reads_legacy_and_partial_documents() {
    let (repo, remote, _) = setup().await;
    remote.insert_raw(ALICE, "legacy", json!({"id": "legacy", "name": "Old field"}));
    remote.insert_raw(ALICE, "bare", json!({}));
    remote.insert_raw(ALICE, "broken", json!("not an object"));

    let SyncOutcome::Completed(stats) = repo.sync(ALICE).await.unwrap() else {
        panic!("expected completed sync");
    };
    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.skipped, 1);

    let legacy = repo.task(ALICE, "legacy").await.unwrap().unwrap();
    assert_eq!(legacy.title, "Old field");
    assert!(!legacy.is_done);

    let bare = repo.task(ALICE, "bare").await.unwrap().unwrap();
    assert_eq!(bare.title, "");
}

#[tokio::test]
async fn sync_is_scoped_to_the_owner() {
    let (repo, remote, _) = setup().await;
    let bob_task = Task::new("b1", "bob", "Bob's", 1);
    repo.store()
        .commit(&tasklist_engine::Changeset::new("bob").insert(bob_task.clone()))
        .await
        .unwrap();
    remote.insert_document(ALICE, &doc("a1", "Alice's", false));

    repo.sync(ALICE).await.unwrap();

    assert_eq!(repo.tasks("bob").await.unwrap(), vec![bob_task]);
    assert_eq!(repo.tasks(ALICE).await.unwrap().len(), 1);
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn created_task_survives_sync() {
    let (repo, remote, _) = setup().await;
    let before = chrono::Utc::now().timestamp_millis() as u64;

    let (task, write) = repo.create(ALICE, "Buy milk").await.unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Sent);

    assert_eq!(task.title, "Buy milk");
    assert!(!task.is_done);
    assert!(!task.id.is_empty());
    assert!(task.created_at >= before);
    assert_eq!(
        remote.document(ALICE, &task.id).unwrap()["title"],
        json!("Buy milk")
    );

    let SyncOutcome::Completed(stats) = repo.sync(ALICE).await.unwrap() else {
        panic!("expected completed sync");
    };
    assert_eq!(stats.changes(), 0);
    assert_eq!(repo.task(ALICE, &task.id).await.unwrap(), Some(task));
}

#[tokio::test]
async fn toggle_flips_only_is_done_and_sends_one_update() {
    let (repo, remote, _) = setup().await;
    let (task, write) = repo.create(ALICE, "Walk dog").await.unwrap();
    write.wait().await;
    remote.clear_calls();

    let (toggled, write) = repo.toggle(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Sent);

    assert!(toggled.is_done);
    assert_eq!(toggled.title, task.title);
    assert_eq!(toggled.created_at, task.created_at);
    assert_eq!(repo.task(ALICE, &task.id).await.unwrap(), Some(toggled));
    assert_eq!(
        remote.calls(),
        vec![RemoteCall::UpdateField {
            owner: ALICE.into(),
            task_id: task.id.clone(),
            update: FieldUpdate::IsDone(true),
        }]
    );

    let (again, write) = repo.toggle(ALICE, &task.id).await.unwrap().unwrap();
    write.wait().await;
    assert!(!again.is_done);
}

#[tokio::test]
async fn delete_removes_both_sides() {
    let (repo, remote, _) = setup().await;
    let (task, write) = repo.create(ALICE, "Temp").await.unwrap();
    write.wait().await;

    let write = repo.delete(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Sent);

    assert!(!repo.contains(ALICE, &task.id).await.unwrap());
    assert!(remote.document(ALICE, &task.id).is_none());
}

#[tokio::test]
async fn remote_failure_keeps_local_change() {
    let (repo, remote, _) = setup().await;
    remote.set_failing(true);

    let (task, write) = repo.create(ALICE, "Offline-ish").await.unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    assert!(repo.contains(ALICE, &task.id).await.unwrap());
}

// ============================================================================
// Outbox and refresh
// ============================================================================

#[tokio::test]
async fn refresh_pushes_pending_create_before_sync() {
    let (repo, remote, signal) = setup().await;
    signal.set(false);

    let (task, write) = repo.create(ALICE, "Made offline").await.unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    let (_, write) = repo.toggle(ALICE, &task.id).await.unwrap().unwrap();
    write.wait().await;
    assert_eq!(repo.pending_writes(ALICE).await.unwrap().len(), 2);

    signal.set(true);
    let outcome = repo.refresh(ALICE).await.unwrap();
    assert!(outcome.is_completed());

    assert!(repo.pending_writes(ALICE).await.unwrap().is_empty());
    let local = repo.task(ALICE, &task.id).await.unwrap().unwrap();
    assert!(local.is_done);
    assert_eq!(remote.document(ALICE, &task.id).unwrap()["isDone"], json!(true));
}

#[tokio::test]
async fn plain_sync_drops_unpushed_creates() {
    let (repo, remote, _) = setup().await;
    remote.set_failing(true);
    let (task, write) = repo.create(ALICE, "Never pushed").await.unwrap();
    write.wait().await;
    remote.set_failing(false);

    // Remote wins: the task is absent remotely, so sync deletes it
    repo.sync(ALICE).await.unwrap();
    assert!(!repo.contains(ALICE, &task.id).await.unwrap());
    assert_eq!(repo.pending_writes(ALICE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn outbox_replays_in_order() {
    let (repo, remote, signal) = setup().await;
    let (task, write) = repo.create(ALICE, "Draft").await.unwrap();
    write.wait().await;

    signal.set(false);
    let (_, write) = repo.rename(ALICE, &task.id, "Final").await.unwrap().unwrap();
    write.wait().await;
    let (_, write) = repo.toggle(ALICE, &task.id).await.unwrap().unwrap();
    write.wait().await;
    let write = repo.delete(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    remote.clear_calls();

    signal.set(true);
    let report = repo.flush_outbox(ALICE).await.unwrap();
    assert_eq!(report.sent, 3);
    assert!(report.is_drained());

    let calls = remote.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], RemoteCall::UpdateField { .. }));
    assert!(matches!(calls[1], RemoteCall::UpdateField { .. }));
    assert!(matches!(calls[2], RemoteCall::Delete { .. }));
    assert_eq!(remote.len(ALICE), 0);
}

#[tokio::test]
async fn deleting_an_unpushed_task_cancels_its_queued_writes() {
    let (repo, remote, _) = setup().await;
    remote.set_failing(true);
    let (task, write) = repo.create(ALICE, "Oops").await.unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    remote.set_failing(false);
    remote.clear_calls();

    let write = repo.delete(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Squashed);
    assert!(repo.pending_writes(ALICE).await.unwrap().is_empty());

    assert!(repo.refresh(ALICE).await.unwrap().is_completed());
    assert!(!repo.contains(ALICE, &task.id).await.unwrap());
    assert!(remote.document(ALICE, &task.id).is_none());
    assert!(!remote
        .calls()
        .iter()
        .any(|call| matches!(call, RemoteCall::Create { .. })));
}

#[tokio::test]
async fn delete_waits_behind_queued_update() {
    let (repo, remote, _) = setup().await;
    let (task, write) = repo.create(ALICE, "Pushed").await.unwrap();
    write.wait().await;

    remote.set_failing(true);
    let (_, write) = repo.toggle(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    remote.set_failing(false);

    let write = repo.delete(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    // Still on the remote until the queue drains
    assert!(remote.document(ALICE, &task.id).is_some());

    assert!(repo.refresh(ALICE).await.unwrap().is_completed());
    assert!(!repo.contains(ALICE, &task.id).await.unwrap());
    assert!(remote.document(ALICE, &task.id).is_none());
}

#[tokio::test]
async fn newer_rename_is_not_overwritten_by_queued_one() {
    let (repo, remote, _) = setup().await;
    let (task, write) = repo.create(ALICE, "A").await.unwrap();
    write.wait().await;

    remote.set_failing(true);
    let (_, write) = repo.rename(ALICE, &task.id, "B").await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    remote.set_failing(false);
    remote.clear_calls();

    let (_, write) = repo.rename(ALICE, &task.id, "C").await.unwrap().unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Queued);
    assert!(remote.calls().is_empty());

    assert!(repo.refresh(ALICE).await.unwrap().is_completed());
    let local = repo.task(ALICE, &task.id).await.unwrap().unwrap();
    assert_eq!(local.title, "C");
    assert_eq!(remote.document(ALICE, &task.id).unwrap()["title"], json!("C"));
}

#[tokio::test]
async fn writes_for_other_tasks_are_not_held_back() {
    let (repo, remote, _) = setup().await;
    remote.set_failing(true);
    let (stuck, write) = repo.create(ALICE, "Stuck").await.unwrap();
    write.wait().await;
    remote.set_failing(false);

    let (other, write) = repo.create(ALICE, "Other").await.unwrap();
    assert_eq!(write.wait().await, RemoteWriteOutcome::Sent);
    assert!(remote.document(ALICE, &other.id).is_some());

    let pending = repo.pending_writes(ALICE).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_id, stuck.id);
}
