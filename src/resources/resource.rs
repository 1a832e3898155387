//! Resources (path nodes) of a REST API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, GatewayError, Result};
use crate::gateway::{ApiGateway, ApiResource};
use crate::planner::ChangeSet;
use crate::reconciler::{DesiredState, Progress, ResourceKind};

use super::{normalize_path, require};

/// Descriptor of a resource path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiResourceSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning REST API.
    pub rest_api_id: String,
    /// Full path, e.g. `/pets/{id}`.
    pub path: String,
}

/// Resource path reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiResourceKind;

#[async_trait]
impl ResourceKind for ApiResourceKind {
    type Spec = ApiResourceSpec;
    type Observed = ApiResource;

    const KIND: &'static str = "resource";

    fn state(&self, spec: &ApiResourceSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &ApiResourceSpec) -> String {
        normalize_path(&spec.path)
    }

    fn observed_id(&self, observed: &ApiResource) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &ApiResourceSpec) -> Result<()> {
        require(Self::KIND, "rest_api_id", &spec.rest_api_id)?;
        if spec.state == DesiredState::Absent && normalize_path(&spec.path) == "/" {
            return Err(ConfigError::validation("the root resource cannot be deleted", "path").into());
        }
        Ok(())
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &ApiResourceSpec) -> Result<Vec<ApiResource>> {
        let path = normalize_path(&spec.path);
        Ok(gateway
            .get_resources(&spec.rest_api_id)
            .await?
            .into_iter()
            .filter(|r| r.path == path)
            .collect())
    }

    fn diff(&self, _spec: &ApiResourceSpec, _observed: &ApiResource) -> Result<ChangeSet> {
        Ok(ChangeSet::new())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &ApiResourceSpec) -> Result<ApiResource> {
        let existing: BTreeMap<String, ApiResource> = gateway
            .get_resources(&spec.rest_api_id)
            .await?
            .into_iter()
            .map(|r| (r.path.clone(), r))
            .collect();
        let mut parent = existing
            .get("/")
            .cloned()
            .ok_or_else(|| GatewayError::invalid_response("GetResources", "REST API has no root resource"))?;

        let target = normalize_path(&spec.path);
        let mut steps = Vec::new();
        let mut path = String::new();
        for segment in target.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            path.push_str(segment);
            steps.push((path.clone(), segment));
        }

        let missing = steps.iter().filter(|(path, _)| !existing.contains_key(path)).count();
        let mut progress = Progress::new(Self::KIND, target.clone(), missing);
        for (path, segment) in steps {
            parent = match existing.get(&path) {
                Some(node) => node.clone(),
                None => {
                    debug!("Creating resource {} under {}", path, parent.id);
                    let created = gateway.create_resource(&spec.rest_api_id, &parent.id, segment).await;
                    progress.step(format!("create {path}"), created)?
                }
            };
        }
        Ok(parent)
    }

    async fn update(
        &self,
        _gateway: &dyn ApiGateway,
        _spec: &ApiResourceSpec,
        observed: &ApiResource,
        _changes: &ChangeSet,
    ) -> Result<ApiResource> {
        Ok(observed.clone())
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &ApiResourceSpec, observed: &ApiResource) -> Result<()> {
        gateway.delete_resource(&spec.rest_api_id, &observed.id).await
    }
}
