//! Deployments.
//!
//! Deployments are snapshots and every `present` run creates a new one.
//! `absent` deletes the deployment named by `deployment_id`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::gateway::{ApiGateway, CreateDeployment, Deployment};
use crate::planner::ChangeSet;
use crate::reconciler::{CreateMode, DesiredState, ResourceKind};

use super::{given, require};

/// Descriptor of a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning REST API.
    pub rest_api_id: String,
    /// Deployment to delete; required for `absent`.
    pub deployment_id: Option<String>,
    /// Deployment description.
    pub description: Option<String>,
    /// Stage to create or point at the new deployment.
    pub stage_name: Option<String>,
    /// Description of that stage.
    pub stage_description: Option<String>,
    /// Enable the stage cache cluster.
    pub cache_cluster_enabled: Option<bool>,
    /// Stage cache cluster size.
    pub cache_cluster_size: Option<String>,
    /// Stage variables.
    pub variables: Option<BTreeMap<String, String>>,
    /// Enable X-Ray tracing on the stage.
    pub tracing_enabled: Option<bool>,
}

/// Deployment reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentKind;

#[async_trait]
impl ResourceKind for DeploymentKind {
    type Spec = DeploymentSpec;
    type Observed = Deployment;

    const KIND: &'static str = "deployment";
    const CREATE: CreateMode = CreateMode::Always;

    fn state(&self, spec: &DeploymentSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &DeploymentSpec) -> String {
        match given(spec.deployment_id.as_ref()) {
            Some(id) => format!("{}/{id}", spec.rest_api_id),
            None => spec.rest_api_id.clone(),
        }
    }

    fn observed_id(&self, observed: &Deployment) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &DeploymentSpec) -> Result<()> {
        require(Self::KIND, "rest_api_id", &spec.rest_api_id)?;
        if spec.state == DesiredState::Absent && given(spec.deployment_id.as_ref()).is_none() {
            return Err(ReconcileError::missing_identity(Self::KIND, "deployment_id is required to delete").into());
        }
        Ok(())
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &DeploymentSpec) -> Result<Vec<Deployment>> {
        let Some(id) = given(spec.deployment_id.as_ref()) else {
            return Ok(Vec::new());
        };
        Ok(gateway.get_deployment(&spec.rest_api_id, id).await?.into_iter().collect())
    }

    fn diff(&self, _spec: &DeploymentSpec, _observed: &Deployment) -> Result<ChangeSet> {
        Ok(ChangeSet::new())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &DeploymentSpec) -> Result<Deployment> {
        let request = CreateDeployment {
            stage_name: spec.stage_name.clone(),
            stage_description: spec.stage_description.clone(),
            description: spec.description.clone(),
            cache_cluster_enabled: spec.cache_cluster_enabled,
            cache_cluster_size: spec.cache_cluster_size.clone(),
            variables: spec.variables.clone().unwrap_or_default(),
            tracing_enabled: spec.tracing_enabled,
        };
        gateway.create_deployment(&spec.rest_api_id, &request).await
    }

    async fn update(
        &self,
        _gateway: &dyn ApiGateway,
        _spec: &DeploymentSpec,
        observed: &Deployment,
        _changes: &ChangeSet,
    ) -> Result<Deployment> {
        Ok(observed.clone())
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &DeploymentSpec, observed: &Deployment) -> Result<()> {
        gateway.delete_deployment(&spec.rest_api_id, &observed.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockApiGateway;
    use crate::reconciler::{Action, Reconciler};

    fn deployment(id: &str) -> Deployment {
        Deployment {
            id: id.to_string(),
            ..Deployment::default()
        }
    }

    #[tokio::test]
    async fn test_present_always_creates_without_lookup() {
        let mut gw = MockApiGateway::new();
        gw.expect_create_deployment()
            .times(2)
            .withf(|api, req| api == "abcd1234" && req.stage_name.as_deref() == Some("live"))
            .returning(|_, _| Ok(deployment("d1")));

        let spec = DeploymentSpec {
            rest_api_id: "abcd1234".to_string(),
            deployment_id: Some("d0".to_string()),
            stage_name: Some("live".to_string()),
            ..DeploymentSpec::default()
        };
        let reconciler = Reconciler::new(&gw);
        for _ in 0..2 {
            let outcome = reconciler.reconcile(&DeploymentKind, &spec).await.expect("reconcile");
            assert_eq!(outcome.action, Action::Create);
            assert!(outcome.changed);
        }
    }

    #[tokio::test]
    async fn test_absent_requires_deployment_id() {
        let gw = MockApiGateway::new();
        let spec = DeploymentSpec {
            rest_api_id: "abcd1234".to_string(),
            state: DesiredState::Absent,
            ..DeploymentSpec::default()
        };
        let err = Reconciler::new(&gw)
            .reconcile(&DeploymentKind, &spec)
            .await
            .expect_err("missing id");
        assert!(err.to_string().contains("deployment_id is required"));
    }

    #[tokio::test]
    async fn test_absent_twice() {
        let spec = DeploymentSpec {
            rest_api_id: "abcd1234".to_string(),
            deployment_id: Some("d1".to_string()),
            state: DesiredState::Absent,
            ..DeploymentSpec::default()
        };

        let mut gw = MockApiGateway::new();
        gw.expect_get_deployment().times(1).returning(|_, id| Ok(Some(deployment(id))));
        gw.expect_delete_deployment()
            .times(1)
            .withf(|api, id| api == "abcd1234" && id == "d1")
            .returning(|_, _| Ok(()));
        let outcome = Reconciler::new(&gw).reconcile(&DeploymentKind, &spec).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);

        let mut gw = MockApiGateway::new();
        gw.expect_get_deployment().times(1).returning(|_, _| Ok(None));
        let outcome = Reconciler::new(&gw).reconcile(&DeploymentKind, &spec).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
    }
}
