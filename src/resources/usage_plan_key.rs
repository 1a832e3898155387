//! API keys attached to usage plans.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApigwError, ReconcileError, Result};
use crate::gateway::{ApiGateway, UsagePlanKey};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope};
use crate::reconciler::{DesiredState, ResourceKind, single_match};

use super::api_key::ApiKeyKind;
use super::usage_plan::UsagePlanKind;
use super::{given, require_one};

/// Descriptor of a usage plan key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsagePlanKeySpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Usage plan id.
    pub usage_plan_id: Option<String>,
    /// Usage plan name, resolved to an id.
    pub usage_plan: Option<String>,
    /// API key id.
    pub api_key_id: Option<String>,
    /// API key name, resolved to an id.
    pub api_key: Option<String>,
    /// Key type.
    #[serde(default = "api_key_type")]
    pub key_type: String,
}

fn api_key_type() -> String {
    "API_KEY".to_string()
}

impl Default for UsagePlanKeySpec {
    fn default() -> Self {
        Self {
            state: DesiredState::default(),
            usage_plan_id: None,
            usage_plan: None,
            api_key_id: None,
            api_key: None,
            key_type: api_key_type(),
        }
    }
}

const FIELDS: &[FieldSpec] = &[FieldSpec::immutable("key_type", "/key_type")];

/// Usage plan key reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsagePlanKeyKind;

impl UsagePlanKeyKind {
    fn ids<'a>(&self, spec: &'a UsagePlanKeySpec) -> Result<(&'a str, &'a str)> {
        match (given(spec.usage_plan_id.as_ref()), given(spec.api_key_id.as_ref())) {
            (Some(plan), Some(key)) => Ok((plan, key)),
            _ => Err(ApigwError::internal(format!("{} is not resolved", self.identity(spec)))),
        }
    }

    /// A reference that did not resolve is an error for `present` and means
    /// the association is absent otherwise.
    fn unresolved(&self, spec: &UsagePlanKeySpec, reference: String) -> Result<()> {
        if spec.state == DesiredState::Present {
            return Err(ReconcileError::reference_not_found(Self::KIND, self.identity(spec), reference).into());
        }
        debug!("{} not found, usage plan key is absent", reference);
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for UsagePlanKeyKind {
    type Spec = UsagePlanKeySpec;
    type Observed = UsagePlanKey;

    const KIND: &'static str = "usage_plan_key";

    fn state(&self, spec: &UsagePlanKeySpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &UsagePlanKeySpec) -> String {
        let plan = given(spec.usage_plan_id.as_ref())
            .or_else(|| given(spec.usage_plan.as_ref()))
            .unwrap_or_default();
        let key = given(spec.api_key_id.as_ref())
            .or_else(|| given(spec.api_key.as_ref()))
            .unwrap_or_default();
        format!("{plan}/{key}")
    }

    fn observed_id(&self, observed: &UsagePlanKey) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &UsagePlanKeySpec) -> Result<()> {
        require_one(
            Self::KIND,
            &[("usage_plan_id", spec.usage_plan_id.as_ref()), ("usage_plan", spec.usage_plan.as_ref())],
        )?;
        require_one(
            Self::KIND,
            &[("api_key_id", spec.api_key_id.as_ref()), ("api_key", spec.api_key.as_ref())],
        )
    }

    async fn resolve(&self, gateway: &dyn ApiGateway, mut spec: UsagePlanKeySpec) -> Result<UsagePlanKeySpec> {
        if given(spec.usage_plan_id.as_ref()).is_none() {
            let name = given(spec.usage_plan.as_ref()).unwrap_or_default().to_string();
            let plans: Vec<_> = gateway
                .get_usage_plans()
                .await?
                .into_iter()
                .filter(|p| p.name == name)
                .collect();
            match single_match(UsagePlanKind::KIND, &name, plans, |p| p.id.clone())? {
                Some(plan) => spec.usage_plan_id = Some(plan.id),
                None => self.unresolved(&spec, format!("usage_plan '{name}'"))?,
            }
        }
        if given(spec.api_key_id.as_ref()).is_none() {
            let name = given(spec.api_key.as_ref()).unwrap_or_default().to_string();
            let keys: Vec<_> = gateway
                .get_api_keys(&name)
                .await?
                .into_iter()
                .filter(|k| k.name.as_deref() == Some(name.as_str()))
                .collect();
            match single_match(ApiKeyKind::KIND, &name, keys, |k| k.id.clone())? {
                Some(key) => spec.api_key_id = Some(key.id),
                None => self.unresolved(&spec, format!("api_key '{name}'"))?,
            }
        }
        Ok(spec)
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &UsagePlanKeySpec) -> Result<Vec<UsagePlanKey>> {
        let Ok((plan, key)) = self.ids(spec) else {
            return Ok(Vec::new());
        };
        Ok(gateway.get_usage_plan_key(plan, key).await?.into_iter().collect())
    }

    fn diff(&self, spec: &UsagePlanKeySpec, observed: &UsagePlanKey) -> Result<ChangeSet> {
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&Scope::root(), FIELDS, spec, observed)?;
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &UsagePlanKeySpec) -> Result<UsagePlanKey> {
        let (plan, key) = self.ids(spec)?;
        gateway.create_usage_plan_key(plan, key, &spec.key_type).await
    }

    async fn update(
        &self,
        _gateway: &dyn ApiGateway,
        _spec: &UsagePlanKeySpec,
        observed: &UsagePlanKey,
        _changes: &ChangeSet,
    ) -> Result<UsagePlanKey> {
        Ok(observed.clone())
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &UsagePlanKeySpec, observed: &UsagePlanKey) -> Result<()> {
        let (plan, _) = self.ids(spec)?;
        gateway.delete_usage_plan_key(plan, &observed.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ApiKey, MockApiGateway, UsagePlan};
    use crate::reconciler::{Action, Reconciler};

    fn by_names() -> UsagePlanKeySpec {
        UsagePlanKeySpec {
            usage_plan: Some("partner-plan".to_string()),
            api_key: Some("partner".to_string()),
            ..UsagePlanKeySpec::default()
        }
    }

    fn plan() -> UsagePlan {
        UsagePlan {
            id: "p1".to_string(),
            name: "partner-plan".to_string(),
            ..UsagePlan::default()
        }
    }

    fn key() -> ApiKey {
        ApiKey {
            id: "k1".to_string(),
            name: Some("partner".to_string()),
            ..ApiKey::default()
        }
    }

    #[tokio::test]
    async fn test_names_resolve_and_key_is_attached() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().times(1).returning(|| Ok(vec![plan()]));
        gw.expect_get_api_keys()
            .times(1)
            .withf(|query| query == "partner")
            .returning(|_| Ok(vec![key()]));
        gw.expect_get_usage_plan_key().times(1).returning(|_, _| Ok(None));
        gw.expect_create_usage_plan_key()
            .times(1)
            .withf(|plan, key, key_type| plan == "p1" && key == "k1" && key_type == "API_KEY")
            .returning(|plan, key, key_type| {
                Ok(UsagePlanKey {
                    id: key.to_string(),
                    name: Some("partner".to_string()),
                    key_type: Some(key_type.to_string()),
                    usage_plan_id: plan.to_string(),
                })
            });

        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKeyKind, &by_names()).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Create);
    }

    #[tokio::test]
    async fn test_unresolved_names() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().returning(|| Ok(vec![plan()]));
        gw.expect_get_api_keys().returning(|_| Ok(Vec::new()));

        let err = Reconciler::new(&gw)
            .reconcile(&UsagePlanKeyKind, &by_names())
            .await
            .expect_err("missing key");
        assert!(err.to_string().contains("api_key 'partner'"));

        let mut desired = by_names();
        desired.state = DesiredState::Absent;
        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKeyKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
    }

    #[tokio::test]
    async fn test_attached_key_is_noop_then_detached() {
        let attached = UsagePlanKey {
            id: "k1".to_string(),
            key_type: Some("API_KEY".to_string()),
            usage_plan_id: "p1".to_string(),
            ..UsagePlanKey::default()
        };
        let mut desired = UsagePlanKeySpec {
            usage_plan_id: Some("p1".to_string()),
            api_key_id: Some("k1".to_string()),
            ..UsagePlanKeySpec::default()
        };

        let mut gw = MockApiGateway::new();
        let found = attached.clone();
        gw.expect_get_usage_plan_key()
            .times(1)
            .returning(move |_, _| Ok(Some(found.clone())));
        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKeyKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);

        desired.state = DesiredState::Absent;
        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plan_key()
            .times(1)
            .returning(move |_, _| Ok(Some(attached.clone())));
        gw.expect_delete_usage_plan_key()
            .times(1)
            .withf(|plan, key| plan == "p1" && key == "k1")
            .returning(|_, _| Ok(()));
        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKeyKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);
    }
}
