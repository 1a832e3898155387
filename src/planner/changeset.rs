//! Change sets: the field-level differences that drive update calls.
//!
//! A [`ChangeSet`] is an ordered list of patch operations, each tagged with the
//! sub-resource ([`Scope`]) it applies to. Changes sharing a scope are sent as
//! one batched update; scopes are applied in the order they first appear.

use serde::Serialize;

use crate::gateway::{PatchOp, PatchOperation};

/// Name of the scope addressing the reconciled resource itself.
pub const ROOT_SCOPE: &str = "root";

/// The sub-resource a change applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    /// Scope name (`root`, `integration`, `method_response`, `tags`, ...).
    pub name: &'static str,
    /// Natural key of the entry within the scope, e.g. a status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Scope {
    /// The reconciled resource itself.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            name: ROOT_SCOPE,
            key: None,
        }
    }

    /// A singular sub-resource.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self { name, key: None }
    }

    /// An entry of a keyed sub-resource collection.
    #[must_use]
    pub fn keyed(name: &'static str, key: impl Into<String>) -> Self {
        Self {
            name,
            key: Some(key.into()),
        }
    }

    /// Returns true for the root scope.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name == ROOT_SCOPE
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{key}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A single field-level change.
///
/// An empty `path` addresses the whole scope entry: `add` creates it from the
/// descriptor, `remove` deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Sub-resource the change applies to.
    pub scope: Scope,
    /// Operation.
    pub op: PatchOp,
    /// Patch path within the scope.
    pub path: String,
    /// New value, stringified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Change {
    /// Returns true if the change creates or deletes a whole scope entry.
    #[must_use]
    pub fn is_whole_entry(&self) -> bool {
        self.path.is_empty()
    }

    /// Converts the change to a patch operation.
    #[must_use]
    pub fn to_patch(&self) -> PatchOperation {
        PatchOperation {
            op: self.op,
            path: self.path.clone(),
            value: self.value.clone(),
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.scope.is_root() {
            write!(f, "{} ", self.scope)?;
        }
        if self.is_whole_entry() {
            return match self.op {
                PatchOp::Remove => write!(f, "delete"),
                _ => write!(f, "put"),
            };
        }
        write!(f, "{} {}", self.op, self.path)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        Ok(())
    }
}

/// Changes for one scope, applied together.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Scope of every change in the batch.
    pub scope: Scope,
    /// The changes, in order.
    pub changes: Vec<Change>,
}

impl Batch {
    /// Returns true if the batch creates the whole scope entry.
    #[must_use]
    pub fn is_put(&self) -> bool {
        self.changes
            .iter()
            .any(|c| c.is_whole_entry() && c.op != PatchOp::Remove)
    }

    /// Returns true if the batch deletes the whole scope entry.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.changes
            .iter()
            .any(|c| c.is_whole_entry() && c.op == PatchOp::Remove)
    }

    /// Patch operations of the batch.
    #[must_use]
    pub fn patches(&self) -> Vec<PatchOperation> {
        self.changes
            .iter()
            .filter(|c| !c.is_whole_entry())
            .map(Change::to_patch)
            .collect()
    }
}

impl std::fmt::Display for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.is_put() {
            "put"
        } else if self.is_delete() {
            "delete"
        } else {
            "update"
        };
        write!(f, "{verb} {}", self.scope)
    }
}

/// Ordered list of changes computed for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self { changes: Vec::new() }
    }

    /// Appends a change.
    pub fn push(&mut self, scope: &Scope, op: PatchOp, path: impl Into<String>, value: Option<String>) {
        self.changes.push(Change {
            scope: scope.clone(),
            op,
            path: path.into(),
            value,
        });
    }

    /// Appends an `add`.
    pub fn add(&mut self, scope: &Scope, path: impl Into<String>, value: impl Into<String>) {
        self.push(scope, PatchOp::Add, path, Some(value.into()));
    }

    /// Appends a `replace`.
    pub fn replace(&mut self, scope: &Scope, path: impl Into<String>, value: impl Into<String>) {
        self.push(scope, PatchOp::Replace, path, Some(value.into()));
    }

    /// Appends a `remove`.
    pub fn remove(&mut self, scope: &Scope, path: impl Into<String>) {
        self.push(scope, PatchOp::Remove, path, None);
    }

    /// Appends a `remove` carrying a value, as used by list-valued fields.
    pub fn remove_value(&mut self, scope: &Scope, path: impl Into<String>, value: impl Into<String>) {
        self.push(scope, PatchOp::Remove, path, Some(value.into()));
    }

    /// Records that a whole scope entry must be created.
    pub fn put_entry(&mut self, scope: &Scope) {
        self.push(scope, PatchOp::Add, "", None);
    }

    /// Records that a whole scope entry must be deleted.
    pub fn delete_entry(&mut self, scope: &Scope) {
        self.push(scope, PatchOp::Remove, "", None);
    }

    /// Returns true if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The changes in order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Patch operations of the root scope.
    #[must_use]
    pub fn root_patches(&self) -> Vec<PatchOperation> {
        self.changes
            .iter()
            .filter(|c| c.scope.is_root())
            .map(Change::to_patch)
            .collect()
    }

    /// Groups the changes by scope, in order of first appearance.
    #[must_use]
    pub fn batches(&self) -> Vec<Batch> {
        let mut batches: Vec<Batch> = Vec::new();
        for change in &self.changes {
            match batches.iter_mut().find(|b| b.scope == change.scope) {
                Some(batch) => batch.changes.push(change.clone()),
                None => batches.push(Batch {
                    scope: change.scope.clone(),
                    changes: vec![change.clone()],
                }),
            }
        }
        batches
    }

    /// Renders each change for display.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_group_by_scope_in_order() {
        let root = Scope::root();
        let integration = Scope::named("integration");
        let ok = Scope::keyed("method_response", "200");

        let mut changes = ChangeSet::new();
        changes.replace(&root, "/authorizationType", "NONE");
        changes.replace(&integration, "/uri", "https://example.com");
        changes.put_entry(&ok);
        changes.add(&root, "/requestParameters/method.request.header.X", "true");

        let batches = changes.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].scope, root);
        assert_eq!(batches[0].patches().len(), 2);
        assert_eq!(batches[1].scope, integration);
        assert!(batches[2].is_put());
        assert!(batches[2].patches().is_empty());
    }

    #[test]
    fn test_change_display() {
        let mut changes = ChangeSet::new();
        changes.replace(&Scope::root(), "/quota/limit", "333");
        changes.delete_entry(&Scope::keyed("integration_response", "500"));

        assert_eq!(
            changes.describe(),
            vec![
                "replace /quota/limit = 333".to_string(),
                "integration_response[500] delete".to_string(),
            ]
        );
    }

    #[test]
    fn test_root_patches_skip_sub_resources() {
        let mut changes = ChangeSet::new();
        changes.remove(&Scope::root(), "/throttle");
        changes.add(&Scope::named("tags"), "/env", "prod");

        let patches = changes.root_patches();
        assert_eq!(patches, vec![PatchOperation::remove("/throttle")]);
    }
}
