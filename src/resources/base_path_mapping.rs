//! Base path mappings from a custom domain to a REST API stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::gateway::{ApiGateway, BasePathMapping};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope};
use crate::reconciler::{DesiredState, ResourceKind};

use super::{find_rest_api_id, given, require, require_one};

/// Descriptor of a base path mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasePathMappingSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Custom domain name.
    #[serde(alias = "domain_name")]
    pub name: String,
    /// Base path; empty maps the domain root.
    #[serde(default)]
    pub base_path: String,
    /// Target REST API id.
    pub rest_api_id: Option<String>,
    /// Target REST API name, resolved to an id.
    pub rest_api: Option<String>,
    /// Target stage.
    pub stage: Option<String>,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("rest_api_id", "/rest_api_id", "/restapiId"),
    FieldSpec::mutable("stage", "/stage", "/stage"),
];

/// Base path mapping reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasePathMappingKind;

#[async_trait]
impl ResourceKind for BasePathMappingKind {
    type Spec = BasePathMappingSpec;
    type Observed = BasePathMapping;

    const KIND: &'static str = "base_path_mapping";

    fn state(&self, spec: &BasePathMappingSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &BasePathMappingSpec) -> String {
        format!("{}/{}", spec.name, spec.base_path)
    }

    fn observed_id(&self, observed: &BasePathMapping) -> String {
        observed.base_path.clone()
    }

    fn validate(&self, spec: &BasePathMappingSpec) -> Result<()> {
        require(Self::KIND, "name", &spec.name)?;
        if spec.state == DesiredState::Present {
            require_one(
                Self::KIND,
                &[("rest_api_id", spec.rest_api_id.as_ref()), ("rest_api", spec.rest_api.as_ref())],
            )?;
        }
        Ok(())
    }

    async fn resolve(&self, gateway: &dyn ApiGateway, mut spec: BasePathMappingSpec) -> Result<BasePathMappingSpec> {
        if given(spec.rest_api_id.as_ref()).is_some() {
            return Ok(spec);
        }
        let Some(name) = given(spec.rest_api.as_ref()).map(str::to_string) else {
            return Ok(spec);
        };
        match find_rest_api_id(gateway, &name).await? {
            Some(id) => {
                debug!("Resolved rest_api '{}' to {}", name, id);
                spec.rest_api_id = Some(id);
            }
            None if spec.state == DesiredState::Present => {
                return Err(ReconcileError::reference_not_found(
                    Self::KIND,
                    self.identity(&spec),
                    format!("rest_api '{name}'"),
                )
                .into());
            }
            None => {}
        }
        Ok(spec)
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &BasePathMappingSpec) -> Result<Vec<BasePathMapping>> {
        Ok(gateway
            .get_base_path_mapping(&spec.name, &spec.base_path)
            .await?
            .into_iter()
            .collect())
    }

    fn diff(&self, spec: &BasePathMappingSpec, observed: &BasePathMapping) -> Result<ChangeSet> {
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&Scope::root(), FIELDS, spec, observed)?;
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &BasePathMappingSpec) -> Result<BasePathMapping> {
        let mapping = BasePathMapping {
            base_path: spec.base_path.clone(),
            rest_api_id: spec.rest_api_id.clone(),
            stage: spec.stage.clone(),
        };
        gateway.create_base_path_mapping(&spec.name, &mapping).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &BasePathMappingSpec,
        _observed: &BasePathMapping,
        changes: &ChangeSet,
    ) -> Result<BasePathMapping> {
        gateway
            .update_base_path_mapping(&spec.name, &spec.base_path, &changes.root_patches())
            .await
    }

    async fn delete(
        &self,
        gateway: &dyn ApiGateway,
        spec: &BasePathMappingSpec,
        _observed: &BasePathMapping,
    ) -> Result<()> {
        gateway.delete_base_path_mapping(&spec.name, &spec.base_path).await
    }
}
