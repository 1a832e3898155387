//! Reconciler for converging remote resources to their descriptors.
//!
//! This module implements the lookup → diff → patch routine shared by every
//! resource type. Each type plugs in through [`ResourceKind`], which supplies
//! its lookup, field diff and create/update/delete calls.
//!
//! | target  | found | action                                   |
//! |---------|-------|------------------------------------------|
//! | present | none  | create with the full descriptor          |
//! | present | one   | diff; patch when the change set is non-empty |
//! | absent  | none  | nothing                                  |
//! | absent  | one   | delete                                   |
//!
//! More than one match is always an error, whatever the target.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApigwError, ReconcileError, Result};
use crate::gateway::ApiGateway;
use crate::planner::ChangeSet;

/// Target state of a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// The resource must exist and match the descriptor.
    #[default]
    Present,
    /// The resource must not exist.
    Absent,
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// How a resource type comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Created when the lookup finds nothing.
    OnMissing,
    /// Created on every `present` run, without lookup.
    Always,
    /// Never created directly; the reason tells the caller what creates it.
    Never(&'static str),
}

/// A reconcilable API Gateway resource type.
#[async_trait]
pub trait ResourceKind: Send + Sync {
    /// Descriptor type.
    type Spec: Clone + Send + Sync;
    /// Remote resource type.
    type Observed: Clone + Serialize + Send + Sync;

    /// Kind name used in logs, errors and manifests.
    const KIND: &'static str;

    /// How the resource is created.
    const CREATE: CreateMode = CreateMode::OnMissing;

    /// Target state of the descriptor.
    fn state(&self, spec: &Self::Spec) -> DesiredState;

    /// Human-readable identity of the descriptor.
    fn identity(&self, spec: &Self::Spec) -> String;

    /// Identifier of a remote resource, used to report ambiguous matches.
    fn observed_id(&self, observed: &Self::Observed) -> String;

    /// Checks the descriptor before any network call.
    ///
    /// # Errors
    ///
    /// Returns an error if required identity fields are missing or the
    /// descriptor is inconsistent.
    fn validate(&self, spec: &Self::Spec) -> Result<()>;

    /// Resolves references given by name into ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference is ambiguous or a remote call fails.
    async fn resolve(&self, _gateway: &dyn ApiGateway, spec: Self::Spec) -> Result<Self::Spec> {
        Ok(spec)
    }

    /// Returns every remote resource matching the descriptor's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote call fails.
    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &Self::Spec) -> Result<Vec<Self::Observed>>;

    /// Computes the changes needed to make `observed` match `spec`.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor asks for an impossible change.
    fn diff(&self, spec: &Self::Spec, observed: &Self::Observed) -> Result<ChangeSet>;

    /// Creates the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote call fails.
    async fn create(&self, gateway: &dyn ApiGateway, spec: &Self::Spec) -> Result<Self::Observed>;

    /// Applies a non-empty change set and returns the updated resource.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote call fails.
    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &Self::Spec,
        observed: &Self::Observed,
        changes: &ChangeSet,
    ) -> Result<Self::Observed>;

    /// Deletes the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote call fails.
    async fn delete(&self, gateway: &dyn ApiGateway, spec: &Self::Spec, observed: &Self::Observed) -> Result<()>;

    /// Checks the converged resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is in a failed state.
    fn verify(&self, _spec: &Self::Spec, _observed: &Self::Observed) -> Result<()> {
        Ok(())
    }
}

/// Action taken by a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The resource was created.
    Create,
    /// The resource was patched.
    Update,
    /// The resource was deleted.
    Delete,
    /// Nothing to do.
    Noop,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Noop => write!(f, "noop"),
        }
    }
}

/// Result of reconciling one descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    /// Resource kind.
    pub kind: &'static str,
    /// Descriptor identity.
    pub identity: String,
    /// Action taken (or planned, in check mode).
    pub action: Action,
    /// Whether anything changed (or would change).
    pub changed: bool,
    /// Field-level changes of an update.
    pub changes: ChangeSet,
    /// Final remote state; `None` when the resource is absent.
    pub resource: Option<T>,
}

/// Picks the single candidate, failing when several match.
///
/// # Errors
///
/// Returns [`ReconcileError::AmbiguousMatch`] listing every candidate id when
/// more than one matches.
pub fn single_match<T>(
    kind: &'static str,
    identity: &str,
    mut candidates: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Result<Option<T>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => Err(ReconcileError::AmbiguousMatch {
            kind,
            identity: identity.to_string(),
            matches: candidates.iter().map(id_of).collect(),
        }
        .into()),
    }
}

/// Tracks applied steps of a multi-call update so a late failure reports
/// what already went through.
#[derive(Debug)]
pub struct Progress {
    kind: &'static str,
    identity: String,
    total: usize,
    applied: usize,
}

impl Progress {
    /// Starts tracking `total` steps.
    #[must_use]
    pub fn new(kind: &'static str, identity: impl Into<String>, total: usize) -> Self {
        Self {
            kind,
            identity: identity.into(),
            total,
            applied: 0,
        }
    }

    /// Records the outcome of one step.
    ///
    /// A failure of the first step is returned as is. A failure after some
    /// steps succeeded becomes [`ReconcileError::PartialApply`].
    ///
    /// # Errors
    ///
    /// Returns the step's error, wrapped when earlier steps were applied.
    pub fn step<T>(&mut self, step: impl std::fmt::Display, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.applied += 1;
                Ok(value)
            }
            Err(err) if self.applied == 0 => Err(err),
            Err(err) => Err(ReconcileError::PartialApply {
                kind: self.kind,
                identity: self.identity.clone(),
                applied: self.applied,
                total: self.total,
                failed_step: step.to_string(),
                reason: err.to_string(),
            }
            .into()),
        }
    }
}

/// Drives the reconciliation of descriptors against one gateway.
pub struct Reconciler<'a> {
    /// Remote API.
    gateway: &'a dyn ApiGateway,
    /// Plan only; issue no mutating call.
    check_mode: bool,
}

impl<'a> Reconciler<'a> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(gateway: &'a dyn ApiGateway) -> Self {
        Self {
            gateway,
            check_mode: false,
        }
    }

    /// Enables check mode: lookups and diffs run, mutations are only reported.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Reconciles one descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, the lookup is ambiguous, a remote
    /// call fails, or the resource cannot be converged.
    pub async fn reconcile<K: ResourceKind>(&self, kind: &K, spec: &K::Spec) -> Result<Outcome<K::Observed>> {
        let identity = kind.identity(spec);
        kind.validate(spec)?;
        let state = kind.state(spec);
        debug!("Reconciling {} '{}' to {}", K::KIND, identity, state);

        if state == DesiredState::Present && K::CREATE == CreateMode::Always {
            return self.create(kind, spec, identity).await;
        }

        let spec = kind.resolve(self.gateway, spec.clone()).await?;
        let candidates = kind.lookup(self.gateway, &spec).await?;
        let found = single_match(K::KIND, &identity, candidates, |o| kind.observed_id(o))?;

        match (state, found) {
            (DesiredState::Present, None) => match K::CREATE {
                CreateMode::Never(reason) => Err(ReconcileError::CreateUnsupported {
                    kind: K::KIND,
                    identity,
                    reason: reason.to_string(),
                }
                .into()),
                _ => self.create(kind, &spec, identity).await,
            },
            (DesiredState::Present, Some(current)) => self.converge(kind, &spec, identity, current).await,
            (DesiredState::Absent, None) => {
                debug!("{} '{}' already absent", K::KIND, identity);
                Ok(Outcome {
                    kind: K::KIND,
                    identity,
                    action: Action::Noop,
                    changed: false,
                    changes: ChangeSet::new(),
                    resource: None,
                })
            }
            (DesiredState::Absent, Some(current)) => {
                if !self.check_mode {
                    kind.delete(self.gateway, &spec, &current).await?;
                    info!("Deleted {} '{}' ({})", K::KIND, identity, kind.observed_id(&current));
                }
                Ok(Outcome {
                    kind: K::KIND,
                    identity,
                    action: Action::Delete,
                    changed: true,
                    changes: ChangeSet::new(),
                    resource: None,
                })
            }
        }
    }

    async fn create<K: ResourceKind>(
        &self,
        kind: &K,
        spec: &K::Spec,
        identity: String,
    ) -> Result<Outcome<K::Observed>> {
        let resource = if self.check_mode {
            None
        } else {
            let created = kind.create(self.gateway, spec).await?;
            info!("Created {} '{}' ({})", K::KIND, identity, kind.observed_id(&created));
            kind.verify(spec, &created)?;
            Some(created)
        };
        Ok(Outcome {
            kind: K::KIND,
            identity,
            action: Action::Create,
            changed: true,
            changes: ChangeSet::new(),
            resource,
        })
    }

    async fn converge<K: ResourceKind>(
        &self,
        kind: &K,
        spec: &K::Spec,
        identity: String,
        current: K::Observed,
    ) -> Result<Outcome<K::Observed>> {
        let changes = kind.diff(spec, &current)?;
        if changes.is_empty() {
            debug!("{} '{}' is up to date", K::KIND, identity);
            kind.verify(spec, &current)?;
            return Ok(Outcome {
                kind: K::KIND,
                identity,
                action: Action::Noop,
                changed: false,
                changes,
                resource: Some(current),
            });
        }

        let resource = if self.check_mode {
            current
        } else {
            info!("Updating {} '{}': {} change(s)", K::KIND, identity, changes.len());
            let updated = kind.update(self.gateway, spec, &current, &changes).await?;
            kind.verify(spec, &updated)?;
            updated
        };
        Ok(Outcome {
            kind: K::KIND,
            identity,
            action: Action::Update,
            changed: true,
            changes,
            resource: Some(resource),
        })
    }
}

impl<T: Serialize> Outcome<T> {
    /// Serializes the resource for reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be serialized.
    pub fn resource_json(&self) -> Result<Option<serde_json::Value>> {
        self.resource
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ApigwError::internal(format!("failed to serialize {}: {e}", self.kind)))
    }
}

impl<T> std::fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.identity, self.action)?;
        if !self.changes.is_empty() {
            write!(f, " ({} change(s))", self.changes.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_single_match() {
        let none: Vec<String> = vec![];
        assert!(single_match("rest_api", "orders", none, Clone::clone).expect("ok").is_none());

        let one = vec!["a1".to_string()];
        assert_eq!(
            single_match("rest_api", "orders", one, Clone::clone).expect("ok").as_deref(),
            Some("a1")
        );

        let two = vec!["a1".to_string(), "b2".to_string()];
        let err = single_match("rest_api", "orders", two, Clone::clone).expect_err("ambiguous");
        match err {
            ApigwError::Reconcile(ReconcileError::AmbiguousMatch { matches, .. }) => {
                assert_eq!(matches, vec!["a1".to_string(), "b2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_progress_first_failure_passes_through() {
        let mut progress = Progress::new("method", "GET /pets", 3);
        let err = progress
            .step("update root", Err::<(), _>(GatewayError::network("UpdateMethod", "reset").into()))
            .expect_err("fails");
        assert!(matches!(err, ApigwError::Gateway(GatewayError::Network { .. })));
    }

    #[test]
    fn test_progress_late_failure_is_partial() {
        let mut progress = Progress::new("method", "GET /pets", 3);
        progress.step("update root", Ok(())).expect("ok");
        let err = progress
            .step(
                "put integration",
                Err::<(), _>(GatewayError::api("PutIntegration", "BadRequestException", "bad uri").into()),
            )
            .expect_err("fails");
        match err {
            ApigwError::Reconcile(ReconcileError::PartialApply {
                applied, total, failed_step, ..
            }) => {
                assert_eq!(applied, 1);
                assert_eq!(total, 3);
                assert_eq!(failed_step, "put integration");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ApigwError::from(ReconcileError::PartialApply {
            kind: "method",
            identity: String::new(),
            applied: 1,
            total: 2,
            failed_step: String::new(),
            reason: String::new(),
        })
        .is_retryable());
    }

    #[test]
    fn test_desired_state_default_and_serde() {
        assert_eq!(DesiredState::default(), DesiredState::Present);
        let state: DesiredState = serde_yaml::from_str("absent").expect("parse");
        assert_eq!(state, DesiredState::Absent);
    }
}
