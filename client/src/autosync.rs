//! Refresh on reconnect.

use crate::connectivity::ConnectivitySignal;
use crate::repository::{Repository, SyncOutcome};
use std::sync::Arc;
use tasklist_engine::UserId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Background task running [`Repository::refresh`] on every offline to
/// online transition of a [`ConnectivitySignal`].
///
/// Each outcome is sent on the returned channel. The task stops when
/// dropped or when the receiver goes away.
#[derive(Debug)]
pub struct AutoSync {
    handle: JoinHandle<()>,
}

impl AutoSync {
    pub fn spawn(
        repository: Arc<Repository>,
        owner: impl Into<UserId>,
        signal: ConnectivitySignal,
    ) -> (Self, mpsc::UnboundedReceiver<SyncOutcome>) {
        let owner = owner.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut changes = signal.subscribe();
        let mut connected = *changes.borrow_and_update();

        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let now_connected = *changes.borrow_and_update();
                let reconnected = now_connected && !connected;
                connected = now_connected;
                if !reconnected {
                    continue;
                }

                tracing::info!(owner = %owner, "Reconnected, refreshing");
                match repository.refresh(&owner).await {
                    Ok(outcome) => {
                        if tx.send(outcome).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!(owner = %owner, error = %err, "Refresh failed");
                    }
                }
            }
        });

        (Self { handle }, rx)
    }

    pub fn shutdown(self) {
        // Drop aborts the task
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
