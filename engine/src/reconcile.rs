//! Reconciliation of the local task set against the remote collection.
//!
//! The remote collection is the source of truth. Given the local tasks of
//! one owner and the documents fetched from that owner's remote collection,
//! this module produces the [`Changeset`] that aligns local with remote.
//!
//! # Algorithm
//!
//! 1. Parse remote documents, skipping those without an id
//! 2. Collect the set of remote task ids (last document wins on duplicates)
//! 3. Remote task present locally: overwrite `title` and `is_done`
//! 4. Remote task absent locally: insert it, `created_at` defaulting to now
//! 5. Local task absent remotely: delete it
//!
//! There is no timestamp or version comparison. Updates are only staged
//! when a field actually differs, which makes a second pass over unchanged
//! remote state produce an empty changeset.

use crate::{Changeset, Error, RawDocument, RemoteDocument, Task, TaskPatch, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Counters describing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileStats {
    /// Documents returned by the remote collection
    pub remote_total: usize,
    /// Remote tasks inserted locally
    pub inserted: usize,
    /// Local tasks overwritten from remote values
    pub updated: usize,
    /// Local tasks already matching their remote document
    pub unchanged: usize,
    /// Local tasks deleted because they are absent remotely
    pub deleted: usize,
    /// Remote documents skipped as unparseable
    pub skipped: usize,
}

impl ReconcileStats {
    /// Number of local writes the pass stages.
    pub fn changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Output of [`Reconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Local writes to commit as one unit
    pub changeset: Changeset,
    /// What the pass found
    pub stats: ReconcileStats,
    /// Why each skipped document was rejected
    pub skipped: Vec<Error>,
}

/// Computes reconciliation plans.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    now: Timestamp,
}

impl Reconciler {
    /// Create a reconciler. `now` stamps inserted tasks whose remote
    /// document carries no creation time.
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }

    /// Diff `local` against `remote` for `owner`.
    ///
    /// Local tasks belonging to other owners are ignored.
    pub fn reconcile(&self, owner: &str, local: &[Task], remote: &[RawDocument]) -> ReconcilePlan {
        let mut stats = ReconcileStats {
            remote_total: remote.len(),
            ..ReconcileStats::default()
        };
        let mut skipped = Vec::new();

        // Dedupe by id, keeping first-seen order and last-seen values.
        let mut documents: Vec<RemoteDocument> = Vec::with_capacity(remote.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(remote.len());
        for raw in remote {
            match RemoteDocument::parse(raw) {
                Ok(doc) => match index.get(&doc.id) {
                    Some(&i) => documents[i] = doc,
                    None => {
                        index.insert(doc.id.clone(), documents.len());
                        documents.push(doc);
                    }
                },
                Err(err) => {
                    stats.skipped += 1;
                    skipped.push(err);
                }
            }
        }

        let local_by_id: HashMap<&str, &Task> = local
            .iter()
            .filter(|t| t.owner_id == owner)
            .map(|t| (t.id.as_str(), t))
            .collect();

        let mut changeset = Changeset::new(owner);
        let mut remote_ids: HashSet<&str> = HashSet::with_capacity(documents.len());

        for doc in &documents {
            remote_ids.insert(doc.id.as_str());
            let title = doc.title_or_default();
            let is_done = doc.is_done_or_default();

            match local_by_id.get(doc.id.as_str()) {
                Some(existing) if existing.title == title && existing.is_done == is_done => {
                    stats.unchanged += 1;
                }
                Some(_) => {
                    changeset.updates.push(TaskPatch {
                        id: doc.id.clone(),
                        title: title.to_owned(),
                        is_done,
                    });
                    stats.updated += 1;
                }
                None => {
                    changeset.inserts.push(Task {
                        id: doc.id.clone(),
                        owner_id: owner.to_owned(),
                        title: title.to_owned(),
                        created_at: doc.created_at_or(self.now),
                        is_done,
                    });
                    stats.inserted += 1;
                }
            }
        }

        let mut deletes: Vec<_> = local_by_id
            .keys()
            .filter(|id| !remote_ids.contains(*id))
            .map(|id| id.to_string())
            .collect();
        deletes.sort();
        stats.deleted = deletes.len();
        changeset.deletes = deletes;

        ReconcilePlan {
            changeset,
            stats,
            skipped,
        }
    }
}
