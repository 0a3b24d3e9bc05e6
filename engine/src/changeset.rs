//! Changesets: the unit of atomic local commit.
//!
//! Both the reconciler and the local mutations express their writes as a
//! [`Changeset`] scoped to one owner. A store applies a changeset all at
//! once or not at all.

use crate::{error::Result, Error, Task, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// Overwrite of a task's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub id: TaskId,
    pub title: String,
    pub is_done: bool,
}

impl TaskPatch {
    /// Patch carrying the current mutable fields of `task`.
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            is_done: task.is_done,
        }
    }
}

/// A set of staged local writes for a single owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub owner_id: UserId,
    pub inserts: Vec<Task>,
    pub updates: Vec<TaskPatch>,
    pub deletes: Vec<TaskId>,
}

impl Changeset {
    /// Create an empty changeset for `owner_id`.
    pub fn new(owner_id: impl Into<UserId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    /// Stage a new task.
    pub fn insert(mut self, task: Task) -> Self {
        self.inserts.push(task);
        self
    }

    /// Stage an overwrite of an existing task.
    pub fn update(mut self, patch: TaskPatch) -> Self {
        self.updates.push(patch);
        self
    }

    /// Stage a deletion.
    pub fn delete(mut self, id: impl Into<TaskId>) -> Self {
        self.deletes.push(id.into());
        self
    }

    /// Total number of staged writes.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// Check if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every insert belongs to this changeset's owner.
    pub fn validate_owner(&self) -> Result<()> {
        match self.inserts.iter().find(|t| t.owner_id != self.owner_id) {
            Some(task) => Err(Error::OwnerMismatch {
                expected: self.owner_id.clone(),
                actual: task.owner_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Apply to an in-memory task list. Tasks of other owners are left
    /// alone. Either every write applies or `tasks` is unchanged.
    ///
    /// Order: inserts, then updates, then deletes.
    pub fn apply_to(&self, tasks: &mut Vec<Task>) -> Result<()> {
        self.validate_owner()?;

        let mut staged = tasks.clone();
        let owner = self.owner_id.as_str();

        for task in &self.inserts {
            if position(&staged, owner, &task.id).is_some() {
                return Err(Error::DuplicateTask(task.id.clone()));
            }
            staged.push(task.clone());
        }

        for patch in &self.updates {
            let idx = position(&staged, owner, &patch.id)
                .ok_or_else(|| Error::TaskNotFound(patch.id.clone()))?;
            staged[idx].title = patch.title.clone();
            staged[idx].is_done = patch.is_done;
        }

        for id in &self.deletes {
            let idx = position(&staged, owner, id).ok_or_else(|| Error::TaskNotFound(id.clone()))?;
            staged.remove(idx);
        }

        *tasks = staged;
        Ok(())
    }
}

fn position(tasks: &[Task], owner: &str, id: &str) -> Option<usize> {
    tasks.iter().position(|t| t.owner_id == owner && t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<Task> {
        vec![
            Task::new("a", "alice", "First", 1),
            Task::new("b", "alice", "Second", 2),
            Task::new("a", "bob", "Bob's first", 3),
        ]
    }

    #[test]
    fn empty_changeset() {
        let changeset = Changeset::new("alice");
        assert!(changeset.is_empty());
        assert_eq!(changeset.len(), 0);
    }

    #[test]
    fn apply_insert_update_delete() {
        let mut list = tasks();
        let changeset = Changeset::new("alice")
            .insert(Task::new("c", "alice", "Third", 4))
            .update(TaskPatch {
                id: "a".into(),
                title: "First!".into(),
                is_done: true,
            })
            .delete("b");
        assert_eq!(changeset.len(), 3);

        changeset.apply_to(&mut list).unwrap();

        let alice: Vec<_> = list.iter().filter(|t| t.owner_id == "alice").collect();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].title, "First!");
        assert!(alice[0].is_done);
        assert_eq!(alice[1].id, "c");

        // Bob's task with the same id is untouched
        let bob = list.iter().find(|t| t.owner_id == "bob").unwrap();
        assert_eq!(bob.title, "Bob's first");
    }

    #[test]
    fn failure_leaves_list_unchanged() {
        let mut list = tasks();
        let before = list.clone();
        let changeset = Changeset::new("alice")
            .insert(Task::new("c", "alice", "Third", 4))
            .delete("missing");

        let result = changeset.apply_to(&mut list);
        assert_eq!(result, Err(Error::TaskNotFound("missing".into())));
        assert_eq!(list, before);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut list = tasks();
        let changeset = Changeset::new("alice").insert(Task::new("a", "alice", "Again", 9));
        assert_eq!(
            changeset.apply_to(&mut list),
            Err(Error::DuplicateTask("a".into()))
        );
    }

    #[test]
    fn foreign_owner_rejected() {
        let changeset = Changeset::new("alice").insert(Task::new("z", "bob", "Sneaky", 1));
        assert!(matches!(
            changeset.validate_owner(),
            Err(Error::OwnerMismatch { .. })
        ));
    }
}
