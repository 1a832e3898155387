//! VPC links to network load balancers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::gateway::{ApiGateway, CreateVpcLink, VpcLink};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope};
use crate::reconciler::{DesiredState, ResourceKind};

use super::{found_by_id, given, require_one};

/// Statuses a link does not recover from.
const UNHEALTHY: &[&str] = &["DELETING", "FAILED"];

/// Descriptor of a VPC link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpcLinkSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Link id; takes precedence over the name for lookup.
    pub id: Option<String>,
    /// Link name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Target network load balancer ARNs. Fixed at creation.
    pub target_arns: Option<Vec<String>>,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("name", "/name", "/name"),
    FieldSpec::mutable("description", "/description", "/description"),
];

/// VPC link reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct VpcLinkKind;

#[async_trait]
impl ResourceKind for VpcLinkKind {
    type Spec = VpcLinkSpec;
    type Observed = VpcLink;

    const KIND: &'static str = "vpc_link";

    fn state(&self, spec: &VpcLinkSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &VpcLinkSpec) -> String {
        given(spec.id.as_ref())
            .or_else(|| given(spec.name.as_ref()))
            .unwrap_or_default()
            .to_string()
    }

    fn observed_id(&self, observed: &VpcLink) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &VpcLinkSpec) -> Result<()> {
        require_one(Self::KIND, &[("id", spec.id.as_ref()), ("name", spec.name.as_ref())])
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &VpcLinkSpec) -> Result<Vec<VpcLink>> {
        if let Some(id) = given(spec.id.as_ref()) {
            return found_by_id(Self::KIND, id, spec.state, gateway.get_vpc_link(id).await?);
        }
        let name = given(spec.name.as_ref()).unwrap_or_default();
        Ok(gateway
            .get_vpc_links()
            .await?
            .into_iter()
            .filter(|link| link.name == name)
            .collect())
    }

    fn diff(&self, spec: &VpcLinkSpec, observed: &VpcLink) -> Result<ChangeSet> {
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.immutable_set("target_arns", spec.target_arns.as_deref(), &observed.target_arns)?;
        engine.fields(&Scope::root(), FIELDS, spec, observed)?;
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &VpcLinkSpec) -> Result<VpcLink> {
        let name = given(spec.name.as_ref()).ok_or_else(|| {
            ReconcileError::missing_identity(Self::KIND, "name is required to create a vpc link")
        })?;
        let request = CreateVpcLink {
            name: name.to_string(),
            description: spec.description.clone(),
            target_arns: spec.target_arns.clone().unwrap_or_default(),
        };
        gateway.create_vpc_link(&request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        _spec: &VpcLinkSpec,
        observed: &VpcLink,
        changes: &ChangeSet,
    ) -> Result<VpcLink> {
        gateway.update_vpc_link(&observed.id, &changes.root_patches()).await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, _spec: &VpcLinkSpec, observed: &VpcLink) -> Result<()> {
        gateway.delete_vpc_link(&observed.id).await
    }

    fn verify(&self, spec: &VpcLinkSpec, observed: &VpcLink) -> Result<()> {
        let status = observed.status.as_deref().unwrap_or_default();
        if UNHEALTHY.contains(&status) {
            return Err(ReconcileError::UnhealthyResource {
                kind: Self::KIND,
                identity: self.identity(spec),
                status: status.to_string(),
                message: observed.status_message.clone().unwrap_or_default(),
            }
            .into());
        }
        Ok(())
    }
}

/// Lists every VPC link of the account and region.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn list_vpc_links(gateway: &dyn ApiGateway) -> Result<Vec<VpcLink>> {
    let links = gateway.get_vpc_links().await?;
    debug!("Found {} vpc links", links.len());
    Ok(links)
}
