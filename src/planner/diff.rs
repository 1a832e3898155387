//! Diff engine for comparing a descriptor against the observed resource.
//!
//! Scalar fields are described by static [`FieldSpec`] tables and compared
//! through JSON pointers into the serialized descriptor and resource. Maps,
//! string sets and keyed collections have dedicated helpers that honor the
//! caller's purge flags.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApigwError, ReconcileError, Result};
use crate::gateway::PatchOp;

use super::changeset::{ChangeSet, Scope};

/// Whether a field can be patched after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// Patchable.
    Mutable,
    /// Fixed at creation; a differing descriptor is an error.
    Immutable,
}

/// One row of a field mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Descriptor field name.
    pub name: &'static str,
    /// JSON pointer into the serialized remote resource.
    pub observed: &'static str,
    /// API Gateway patch path.
    pub patch_path: &'static str,
    /// Mutability.
    pub mutability: Mutability,
}

impl FieldSpec {
    /// A patchable field.
    #[must_use]
    pub const fn mutable(name: &'static str, observed: &'static str, patch_path: &'static str) -> Self {
        Self {
            name,
            observed,
            patch_path,
            mutability: Mutability::Mutable,
        }
    }

    /// A field fixed at creation.
    #[must_use]
    pub const fn immutable(name: &'static str, observed: &'static str) -> Self {
        Self {
            name,
            observed,
            patch_path: "",
            mutability: Mutability::Immutable,
        }
    }
}

/// How a string set is encoded in patch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetEncoding {
    /// The member goes in `value`, e.g. `add /apiStages abcd:live`.
    Value,
    /// The member is appended to the path, e.g. `add /binaryMediaTypes/image~1png`.
    PathSuffix,
}

/// Escapes a key for use as a patch path segment.
#[must_use]
pub fn escape_key(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Stringifies a JSON value the way patch operations carry it.
#[must_use]
pub fn patch_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Numbers compare by value so `100` and `100.0` are equal.
fn same_value(desired: &Value, observed: &Value) -> bool {
    match (desired, observed) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => desired == observed,
    }
}

/// Entries of two keyed collections, split by natural key.
#[derive(Debug)]
pub struct Matched<'a, D, O> {
    /// Desired entries with no remote counterpart.
    pub added: Vec<&'a D>,
    /// Remote entries with no desired counterpart.
    pub removed: Vec<&'a O>,
    /// Entries present on both sides.
    pub matched: Vec<(&'a D, &'a O)>,
}

/// Matches desired and observed entries by natural key.
pub fn match_entries<'a, D, O, K>(
    desired: &'a [D],
    observed: &'a [O],
    desired_key: impl Fn(&D) -> K,
    observed_key: impl Fn(&O) -> K,
) -> Matched<'a, D, O>
where
    K: Ord,
{
    let remote: BTreeMap<K, &O> = observed.iter().map(|o| (observed_key(o), o)).collect();
    let wanted: BTreeSet<K> = desired.iter().map(&desired_key).collect();

    let mut added = Vec::new();
    let mut matched = Vec::new();
    for entry in desired {
        match remote.get(&desired_key(entry)) {
            Some(current) => matched.push((entry, *current)),
            None => added.push(entry),
        }
    }
    let removed = observed
        .iter()
        .filter(|o| !wanted.contains(&observed_key(o)))
        .collect();

    Matched {
        added,
        removed,
        matched,
    }
}

/// Splits a tag diff into tags to set and keys to remove.
///
/// Keys missing from `desired` are only removed when `purge` is set.
#[must_use]
pub fn diff_tags(
    desired: Option<&BTreeMap<String, String>>,
    observed: &BTreeMap<String, String>,
    purge: bool,
) -> (BTreeMap<String, String>, Vec<String>) {
    let Some(desired) = desired else {
        return (BTreeMap::new(), Vec::new());
    };
    let to_set = desired
        .iter()
        .filter(|(k, v)| observed.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let to_remove = if purge {
        observed
            .keys()
            .filter(|k| !desired.contains_key(*k))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    (to_set, to_remove)
}

/// Accumulates the change set of one resource.
#[derive(Debug)]
pub struct DiffEngine {
    /// Resource kind, for errors.
    kind: &'static str,
    /// Resource identity, for errors.
    identity: String,
    /// Changes found so far.
    changes: ChangeSet,
}

impl DiffEngine {
    /// Creates an engine for one resource.
    #[must_use]
    pub fn new(kind: &'static str, identity: impl Into<String>) -> Self {
        Self {
            kind,
            identity: identity.into(),
            changes: ChangeSet::new(),
        }
    }

    /// Compares scalar fields of serializable descriptor and resource.
    ///
    /// # Errors
    ///
    /// Returns an error if an immutable field differs or serialization fails.
    pub fn fields<D, O>(&mut self, scope: &Scope, table: &[FieldSpec], desired: &D, observed: &O) -> Result<()>
    where
        D: Serialize + ?Sized,
        O: Serialize + ?Sized,
    {
        let desired = to_value(desired)?;
        let observed = to_value(observed)?;
        self.fields_at(scope, "", table, &desired, &observed)
    }

    /// Compares scalar fields, prefixing every patch path with `prefix`.
    ///
    /// Desired values are read at `/{name}`. Unset desired values are skipped;
    /// a missing remote value yields `add`, a differing one `replace`.
    ///
    /// # Errors
    ///
    /// Returns an error if an immutable field differs.
    pub fn fields_at(
        &mut self,
        scope: &Scope,
        prefix: &str,
        table: &[FieldSpec],
        desired: &Value,
        observed: &Value,
    ) -> Result<()> {
        for field in table {
            let Some(wanted) = desired.get(field.name).filter(|v| !is_unset(v)) else {
                continue;
            };
            let current = observed.pointer(field.observed).filter(|v| !v.is_null());

            if current.is_some_and(|c| same_value(wanted, c)) {
                continue;
            }
            if field.mutability == Mutability::Immutable {
                // Not reported remotely, nothing to compare against.
                if current.is_none() {
                    continue;
                }
                return Err(ReconcileError::immutable(self.kind, &self.identity, field.name).into());
            }

            let path = format!("{prefix}{}", field.patch_path);
            debug!("{} '{}': {} differs", self.kind, self.identity, field.name);
            if current.is_some() {
                self.changes.replace(scope, path, patch_value(wanted));
            } else {
                self.changes.add(scope, path, patch_value(wanted));
            }
        }
        Ok(())
    }

    /// Compares a string-keyed map. Missing keys are added, differing values
    /// replaced, and remote-only keys removed when `purge` is set.
    ///
    /// A `None` descriptor leaves the map untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be serialized.
    pub fn map<V>(
        &mut self,
        scope: &Scope,
        prefix: &str,
        desired: Option<&BTreeMap<String, V>>,
        observed: &BTreeMap<String, V>,
        purge: bool,
    ) -> Result<()>
    where
        V: Serialize + PartialEq,
    {
        let Some(desired) = desired else {
            return Ok(());
        };
        for (key, value) in desired {
            let path = format!("{prefix}/{}", escape_key(key));
            match observed.get(key) {
                Some(current) if current == value => {}
                Some(_) => self.changes.replace(scope, path, patch_value(&to_value(value)?)),
                None => self.changes.add(scope, path, patch_value(&to_value(value)?)),
            }
        }
        if purge {
            for key in observed.keys().filter(|k| !desired.contains_key(*k)) {
                self.changes.remove(scope, format!("{prefix}/{}", escape_key(key)));
            }
        }
        Ok(())
    }

    /// Compares a set of strings. Missing members are added and remote-only
    /// members removed when `purge` is set. A `None` descriptor leaves the
    /// set untouched.
    pub fn set(
        &mut self,
        scope: &Scope,
        path: &str,
        encoding: SetEncoding,
        desired: Option<&[String]>,
        observed: &[String],
        purge: bool,
    ) {
        let Some(desired) = desired else {
            return;
        };
        if purge {
            for member in observed.iter().filter(|m| !desired.contains(m)) {
                match encoding {
                    SetEncoding::Value => self.changes.remove_value(scope, path, member.clone()),
                    SetEncoding::PathSuffix => {
                        self.changes.remove(scope, format!("{path}/{}", escape_key(member)));
                    }
                }
            }
        }
        for member in desired.iter().filter(|m| !observed.contains(m)) {
            match encoding {
                SetEncoding::Value => self.changes.add(scope, path, member.clone()),
                SetEncoding::PathSuffix => {
                    self.changes
                        .push(scope, PatchOp::Add, format!("{path}/{}", escape_key(member)), None);
                }
            }
        }
    }

    /// Fails if a set-valued immutable field differs.
    ///
    /// # Errors
    ///
    /// Returns an error if both sides are set and differ as sets.
    pub fn immutable_set(&self, field: &str, desired: Option<&[String]>, observed: &[String]) -> Result<()> {
        let Some(desired) = desired else {
            return Ok(());
        };
        let wanted: BTreeSet<&String> = desired.iter().collect();
        let current: BTreeSet<&String> = observed.iter().collect();
        if wanted == current {
            Ok(())
        } else {
            Err(ReconcileError::immutable(self.kind, &self.identity, field).into())
        }
    }

    /// Gives direct access to the change set, for resource-specific rules.
    pub const fn changes_mut(&mut self) -> &mut ChangeSet {
        &mut self.changes
    }

    /// Returns the accumulated change set.
    #[must_use]
    pub fn finish(self) -> ChangeSet {
        self.changes
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ApigwError::internal(format!("failed to serialize for diff: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &[FieldSpec] = &[
        FieldSpec::mutable("description", "/description", "/description"),
        FieldSpec::mutable("quota_limit", "/quota/limit", "/quota/limit"),
        FieldSpec::mutable("quota_period", "/quota/period", "/quota/period"),
        FieldSpec::immutable("value", "/value"),
    ];

    #[test]
    fn test_unset_fields_are_skipped() {
        let mut engine = DiffEngine::new("usage_plan", "gold");
        engine
            .fields_at(
                &Scope::root(),
                "",
                TABLE,
                &json!({ "description": null, "quota_limit": 100 }),
                &json!({ "description": "kept", "quota": { "limit": 100 } }),
            )
            .expect("diff");
        assert!(engine.finish().is_empty());
    }

    #[test]
    fn test_missing_remote_value_is_added() {
        let mut engine = DiffEngine::new("usage_plan", "gold");
        engine
            .fields_at(
                &Scope::root(),
                "",
                TABLE,
                &json!({ "quota_limit": 333, "quota_period": "WEEK" }),
                &json!({ "quota": { "limit": 100, "period": null } }),
            )
            .expect("diff");
        let changes = engine.finish();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.changes()[0].op, PatchOp::Replace);
        assert_eq!(changes.changes()[0].value.as_deref(), Some("333"));
        assert_eq!(changes.changes()[1].op, PatchOp::Add);
    }

    #[test]
    fn test_empty_string_counts_as_unset() {
        let mut engine = DiffEngine::new("rest_api", "orders");
        engine
            .fields_at(&Scope::root(), "", TABLE, &json!({ "description": "" }), &json!({}))
            .expect("diff");
        assert!(engine.finish().is_empty());
    }

    #[test]
    fn test_immutable_field_change_is_an_error() {
        let mut engine = DiffEngine::new("api_key", "partner");
        let err = engine
            .fields_at(&Scope::root(), "", TABLE, &json!({ "value": "new" }), &json!({ "value": "old" }))
            .expect_err("immutable");
        assert!(err.to_string().contains("cannot change value after creation"));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let mut engine = DiffEngine::new("usage_plan", "gold");
        engine
            .fields_at(
                &Scope::root(),
                "",
                &[FieldSpec::mutable("rate", "/rate", "/throttle/rateLimit")],
                &json!({ "rate": 100 }),
                &json!({ "rate": 100.0 }),
            )
            .expect("diff");
        assert!(engine.finish().is_empty());
    }

    #[test]
    fn test_map_purge() {
        let observed: BTreeMap<String, String> = [
            ("application/json".to_string(), "{}".to_string()),
            ("text/plain".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();
        let desired: BTreeMap<String, String> =
            [("application/json".to_string(), "{}".to_string())].into_iter().collect();

        let mut keep = DiffEngine::new("method", "GET /pets");
        keep.map(&Scope::root(), "/requestTemplates", Some(&desired), &observed, false)
            .expect("diff");
        assert!(keep.finish().is_empty());

        let mut purge = DiffEngine::new("method", "GET /pets");
        purge
            .map(&Scope::root(), "/requestTemplates", Some(&desired), &observed, true)
            .expect("diff");
        let changes = purge.finish();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].op, PatchOp::Remove);
        assert_eq!(changes.changes()[0].path, "/requestTemplates/text~1plain");
    }

    #[test]
    fn test_set_encodings() {
        let observed = vec!["image/png".to_string()];
        let desired = vec!["image/gif".to_string()];

        let mut engine = DiffEngine::new("rest_api", "orders");
        engine.set(
            &Scope::root(),
            "/binaryMediaTypes",
            SetEncoding::PathSuffix,
            Some(&desired),
            &observed,
            true,
        );
        let changes = engine.finish();
        assert_eq!(changes.changes()[0].path, "/binaryMediaTypes/image~1png");
        assert_eq!(changes.changes()[0].op, PatchOp::Remove);
        assert_eq!(changes.changes()[1].path, "/binaryMediaTypes/image~1gif");

        let mut engine = DiffEngine::new("authorizer", "cognito");
        engine.set(&Scope::root(), "/providerARNs", SetEncoding::Value, Some(&desired), &observed, false);
        let changes = engine.finish();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].value.as_deref(), Some("image/gif"));
    }

    #[test]
    fn test_match_entries() {
        let desired = vec!["200", "400"];
        let observed = vec!["200", "500"];
        let matched = match_entries(&desired, &observed, |d| d.to_string(), |o| o.to_string());

        assert_eq!(matched.added, vec![&"400"]);
        assert_eq!(matched.removed, vec![&"500"]);
        assert_eq!(matched.matched.len(), 1);
    }

    #[test]
    fn test_diff_tags() {
        let observed: BTreeMap<String, String> = [
            ("env".to_string(), "dev".to_string()),
            ("team".to_string(), "edge".to_string()),
        ]
        .into_iter()
        .collect();
        let desired: BTreeMap<String, String> =
            [("env".to_string(), "prod".to_string())].into_iter().collect();

        let (set, remove) = diff_tags(Some(&desired), &observed, false);
        assert_eq!(set.get("env").map(String::as_str), Some("prod"));
        assert!(remove.is_empty());

        let (_, remove) = diff_tags(Some(&desired), &observed, true);
        assert_eq!(remove, vec!["team".to_string()]);

        let (set, remove) = diff_tags(None, &observed, true);
        assert!(set.is_empty() && remove.is_empty());
    }
}
