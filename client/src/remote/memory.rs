//! In-process remote collection.
//!
//! Keeps documents in memory, records every call made against it and can
//! be switched into a failing or unreachable state.

use super::{RemoteCollection, RemoteError};
use crate::connectivity::Probe;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tasklist_engine::{FieldUpdate, RawDocument, TaskDocument, TaskId, UserId};

/// A call made against a [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create {
        owner: UserId,
        document: TaskDocument,
    },
    UpdateField {
        owner: UserId,
        task_id: TaskId,
        update: FieldUpdate,
    },
    FetchAll {
        owner: UserId,
    },
    Delete {
        owner: UserId,
        task_id: TaskId,
    },
}

#[derive(Debug)]
struct State {
    collections: HashMap<UserId, BTreeMap<String, Value>>,
    calls: Vec<RemoteCall>,
    next_id: u64,
    failing: bool,
    reachable: bool,
}

/// Remote collection held in process memory.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Create an empty, reachable, healthy remote.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                collections: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                failing: false,
                reachable: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store raw document data under `key`, bypassing call recording.
    pub fn insert_raw(&self, owner: &str, key: &str, data: Value) {
        self.lock()
            .collections
            .entry(owner.to_string())
            .or_default()
            .insert(key.to_string(), data);
    }

    /// Store a document under its id, bypassing call recording.
    pub fn insert_document(&self, owner: &str, document: &TaskDocument) {
        let data = serde_json::to_value(document).unwrap_or(Value::Null);
        self.insert_raw(owner, &document.id, data);
    }

    /// Remove a document, bypassing call recording.
    pub fn remove_raw(&self, owner: &str, key: &str) {
        if let Some(collection) = self.lock().collections.get_mut(owner) {
            collection.remove(key);
        }
    }

    /// Raw data of one document.
    pub fn document(&self, owner: &str, key: &str) -> Option<Value> {
        self.lock().collections.get(owner)?.get(key).cloned()
    }

    /// Number of documents in the owner's collection.
    pub fn len(&self, owner: &str) -> usize {
        self.lock()
            .collections
            .get(owner)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Make every subsequent call fail with [`RemoteError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Change what [`Probe::is_reachable`] reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Record `call`; fails when the remote is set to fail.
    fn record(&self, call: RemoteCall) -> Result<MutexGuard<'_, State>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.failing {
            return Err(RemoteError::Unavailable);
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteCollection for MemoryRemote {
    fn new_document_id(&self) -> TaskId {
        let mut state = self.lock();
        state.next_id += 1;
        format!("mem-{:06}", state.next_id)
    }

    async fn create(&self, owner: &str, document: &TaskDocument) -> Result<(), RemoteError> {
        let data = serde_json::to_value(document).map_err(|e| RemoteError::Status {
            status: 400,
            body: e.to_string(),
        })?;

        let mut state = self.record(RemoteCall::Create {
            owner: owner.to_string(),
            document: document.clone(),
        })?;
        state
            .collections
            .entry(owner.to_string())
            .or_default()
            .insert(document.id.clone(), data);
        Ok(())
    }

    async fn update_field(
        &self,
        owner: &str,
        task_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), RemoteError> {
        let mut state = self.record(RemoteCall::UpdateField {
            owner: owner.to_string(),
            task_id: task_id.to_string(),
            update: update.clone(),
        })?;

        let document = state
            .collections
            .get_mut(owner)
            .and_then(|c| c.get_mut(task_id))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| RemoteError::NotFound(task_id.to_string()))?;

        let value = match update {
            FieldUpdate::Title(title) => Value::from(title.clone()),
            FieldUpdate::IsDone(is_done) => Value::from(*is_done),
        };
        document.insert(update.field().to_string(), value);
        Ok(())
    }

    async fn fetch_all(&self, owner: &str) -> Result<Vec<RawDocument>, RemoteError> {
        let state = self.record(RemoteCall::FetchAll {
            owner: owner.to_string(),
        })?;

        Ok(state
            .collections
            .get(owner)
            .map(|c| {
                c.iter()
                    .map(|(key, data)| RawDocument::new(key.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, owner: &str, task_id: &str) -> Result<(), RemoteError> {
        let mut state = self.record(RemoteCall::Delete {
            owner: owner.to_string(),
            task_id: task_id.to_string(),
        })?;

        if let Some(collection) = state.collections.get_mut(owner) {
            collection.remove(task_id);
        }
        Ok(())
    }
}

#[async_trait]
impl Probe for MemoryRemote {
    async fn is_reachable(&self) -> bool {
        self.lock().reachable
    }
}
