//! API keys.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gateway::{ApiGateway, ApiKey, CreateApiKey};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope};
use crate::reconciler::{DesiredState, ResourceKind};

use super::{found_by_id, given, require_one};

/// Descriptor of an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeySpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Key id; takes precedence over the name for lookup.
    pub id: Option<String>,
    /// Key name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Whether the key can be used; `false` on creation when unset.
    pub enabled: Option<bool>,
    /// AWS Marketplace customer id.
    pub customer_id: Option<String>,
    /// Explicit key value; generated when unset. Cannot change later.
    pub value: Option<String>,
    /// Make the key id distinct from its value. Creation only.
    pub generate_distinct_id: Option<bool>,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("name", "/name", "/name"),
    FieldSpec::mutable("description", "/description", "/description"),
    FieldSpec::mutable("enabled", "/enabled", "/enabled"),
    FieldSpec::mutable("customer_id", "/customer_id", "/customerId"),
    FieldSpec::immutable("value", "/value"),
];

/// API key reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiKeyKind;

#[async_trait]
impl ResourceKind for ApiKeyKind {
    type Spec = ApiKeySpec;
    type Observed = ApiKey;

    const KIND: &'static str = "api_key";

    fn state(&self, spec: &ApiKeySpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &ApiKeySpec) -> String {
        given(spec.id.as_ref())
            .or_else(|| given(spec.name.as_ref()))
            .unwrap_or_default()
            .to_string()
    }

    fn observed_id(&self, observed: &ApiKey) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &ApiKeySpec) -> Result<()> {
        require_one(Self::KIND, &[("id", spec.id.as_ref()), ("name", spec.name.as_ref())])
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &ApiKeySpec) -> Result<Vec<ApiKey>> {
        if let Some(id) = given(spec.id.as_ref()) {
            return found_by_id(Self::KIND, id, spec.state, gateway.get_api_key(id).await?);
        }
        let name = given(spec.name.as_ref()).unwrap_or_default();
        Ok(gateway
            .get_api_keys(name)
            .await?
            .into_iter()
            .filter(|key| key.name.as_deref() == Some(name))
            .collect())
    }

    fn diff(&self, spec: &ApiKeySpec, observed: &ApiKey) -> Result<ChangeSet> {
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&Scope::root(), FIELDS, spec, observed)?;
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &ApiKeySpec) -> Result<ApiKey> {
        let request = CreateApiKey {
            name: spec.name.clone(),
            description: spec.description.clone(),
            value: spec.value.clone(),
            enabled: spec.enabled.unwrap_or(false),
            generate_distinct_id: spec.generate_distinct_id.unwrap_or(false),
            customer_id: spec.customer_id.clone(),
        };
        gateway.create_api_key(&request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        _spec: &ApiKeySpec,
        observed: &ApiKey,
        changes: &ChangeSet,
    ) -> Result<ApiKey> {
        gateway.update_api_key(&observed.id, &changes.root_patches()).await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, _spec: &ApiKeySpec, observed: &ApiKey) -> Result<()> {
        gateway.delete_api_key(&observed.id).await
    }
}
