//! REST APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ApigwError, ConfigError, ReconcileError, Result};
use crate::gateway::{ApiGateway, CreateRestApi, RestApi};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope, SetEncoding};
use crate::reconciler::{DesiredState, ResourceKind, single_match};

use super::{found_by_id, given, require_one};

/// Descriptor of a REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestApiSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// API id; takes precedence over the name for lookup.
    pub id: Option<String>,
    /// API name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Version label.
    pub version: Option<String>,
    /// Id or name of an API to clone on creation.
    pub clone_from: Option<String>,
    /// API key source (`HEADER` or `AUTHORIZER`).
    pub api_key_source: Option<String>,
    /// Minimum compression size in bytes.
    pub minimum_compression_size: Option<i32>,
    /// Resource policy, as a JSON document or its string form.
    pub policy: Option<Value>,
    /// Endpoint types; API Gateway accepts a single entry.
    pub endpoint_types: Option<Vec<String>>,
    /// Binary media types.
    pub binary_media_types: Option<Vec<String>>,
    /// Remove binary media types not listed.
    #[serde(default)]
    pub purge_binary_media_types: bool,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("name", "/name", "/name"),
    FieldSpec::mutable("description", "/description", "/description"),
    FieldSpec::mutable("version", "/version", "/version"),
    FieldSpec::mutable("api_key_source", "/api_key_source", "/apiKeySource"),
    FieldSpec::mutable("minimum_compression_size", "/minimum_compression_size", "/minimumCompressionSize"),
];

/// Parses a policy given either as a document or as JSON text.
fn desired_policy(policy: &Value) -> Result<Value> {
    match policy {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| ConfigError::validation(format!("invalid policy document: {e}"), "policy").into()),
        other => Ok(other.clone()),
    }
}

/// Parses the policy returned by API Gateway, which escapes its quotes.
fn observed_policy(raw: &str) -> Option<Value> {
    serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&raw.replace("\\\"", "\"")))
        .ok()
}

/// REST API reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestApiKind;

#[async_trait]
impl ResourceKind for RestApiKind {
    type Spec = RestApiSpec;
    type Observed = RestApi;

    const KIND: &'static str = "rest_api";

    fn state(&self, spec: &RestApiSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &RestApiSpec) -> String {
        given(spec.id.as_ref())
            .or_else(|| given(spec.name.as_ref()))
            .unwrap_or_default()
            .to_string()
    }

    fn observed_id(&self, observed: &RestApi) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &RestApiSpec) -> Result<()> {
        require_one(Self::KIND, &[("id", spec.id.as_ref()), ("name", spec.name.as_ref())])?;
        if let Some(policy) = &spec.policy {
            desired_policy(policy)?;
        }
        Ok(())
    }

    async fn resolve(&self, gateway: &dyn ApiGateway, mut spec: RestApiSpec) -> Result<RestApiSpec> {
        let Some(source) = given(spec.clone_from.as_ref()).map(str::to_string) else {
            return Ok(spec);
        };
        if spec.state == DesiredState::Absent {
            return Ok(spec);
        }
        if gateway.get_rest_api(&source).await?.is_some() {
            return Ok(spec);
        }
        let by_name: Vec<_> = gateway
            .get_rest_apis()
            .await?
            .into_iter()
            .filter(|api| api.name == source)
            .collect();
        match single_match(Self::KIND, &source, by_name, |api| api.id.clone())? {
            Some(api) => {
                debug!("Resolved clone_from '{}' to {}", source, api.id);
                spec.clone_from = Some(api.id);
                Ok(spec)
            }
            None => Err(ReconcileError::reference_not_found(
                Self::KIND,
                self.identity(&spec),
                format!("clone_from '{source}'"),
            )
            .into()),
        }
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &RestApiSpec) -> Result<Vec<RestApi>> {
        if let Some(id) = given(spec.id.as_ref()) {
            return found_by_id(Self::KIND, id, spec.state, gateway.get_rest_api(id).await?);
        }
        let name = given(spec.name.as_ref()).unwrap_or_default();
        Ok(gateway
            .get_rest_apis()
            .await?
            .into_iter()
            .filter(|api| api.name == name)
            .collect())
    }

    fn diff(&self, spec: &RestApiSpec, observed: &RestApi) -> Result<ChangeSet> {
        let root = Scope::root();
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&root, FIELDS, spec, observed)?;

        if let Some(policy) = &spec.policy {
            let wanted = desired_policy(policy)?;
            let current = observed.policy.as_deref().and_then(observed_policy);
            if current.as_ref() != Some(&wanted) {
                engine.changes_mut().replace(&root, "/policy", wanted.to_string());
            }
        }

        if let Some(wanted) = spec.endpoint_types.as_ref().and_then(|t| t.first()) {
            match observed.endpoint_types.first() {
                Some(current) if current == wanted => {}
                Some(current) => {
                    engine
                        .changes_mut()
                        .replace(&root, format!("/endpointConfiguration/types/{current}"), wanted.clone());
                }
                None => engine.changes_mut().add(&root, "/endpointConfiguration/types", wanted.clone()),
            }
        }

        engine.set(
            &root,
            "/binaryMediaTypes",
            SetEncoding::PathSuffix,
            spec.binary_media_types.as_deref(),
            &observed.binary_media_types,
            spec.purge_binary_media_types,
        );
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &RestApiSpec) -> Result<RestApi> {
        let name = given(spec.name.as_ref()).ok_or_else(|| {
            ApigwError::from(ReconcileError::missing_identity(Self::KIND, "name is required to create an API"))
        })?;
        let policy = spec.policy.as_ref().map(desired_policy).transpose()?;
        let request = CreateRestApi {
            name: name.to_string(),
            description: spec.description.clone(),
            version: spec.version.clone(),
            clone_from: spec.clone_from.clone(),
            binary_media_types: spec.binary_media_types.clone().unwrap_or_default(),
            minimum_compression_size: spec.minimum_compression_size,
            api_key_source: spec.api_key_source.clone(),
            endpoint_types: spec.endpoint_types.clone().unwrap_or_default(),
            policy: policy.map(|p| p.to_string()),
        };
        gateway.create_rest_api(&request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        _spec: &RestApiSpec,
        observed: &RestApi,
        changes: &ChangeSet,
    ) -> Result<RestApi> {
        gateway.update_rest_api(&observed.id, &changes.root_patches()).await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, _spec: &RestApiSpec, observed: &RestApi) -> Result<()> {
        gateway.delete_rest_api(&observed.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockApiGateway, PatchOp};
    use crate::reconciler::{Action, Reconciler};

    fn api(id: &str, name: &str) -> RestApi {
        RestApi {
            id: id.to_string(),
            name: name.to_string(),
            description: Some("orders api".to_string()),
            endpoint_types: vec!["REGIONAL".to_string()],
            binary_media_types: vec!["image/png".to_string()],
            ..RestApi::default()
        }
    }

    fn spec(name: &str) -> RestApiSpec {
        RestApiSpec {
            name: Some(name.to_string()),
            ..RestApiSpec::default()
        }
    }

    #[tokio::test]
    async fn test_create_when_missing() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_apis().times(1).returning(|| Ok(vec![api("x1", "other")]));
        gw.expect_create_rest_api()
            .times(1)
            .withf(|req| req.name == "orders" && req.description.as_deref() == Some("v1"))
            .returning(|req| Ok(api("a1", &req.name)));

        let mut desired = spec("orders");
        desired.description = Some("v1".to_string());
        let outcome = Reconciler::new(&gw)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect("reconcile");

        assert_eq!(outcome.action, Action::Create);
        assert!(outcome.changed);
        assert_eq!(outcome.resource.map(|r| r.id).as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_apis().times(1).returning(|| Ok(vec![api("a1", "orders")]));

        let mut desired = spec("orders");
        desired.description = Some("orders api".to_string());
        desired.endpoint_types = Some(vec!["REGIONAL".to_string()]);
        let outcome = Reconciler::new(&gw)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect("reconcile");

        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
        assert!(outcome.changes.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous() {
        for state in [DesiredState::Present, DesiredState::Absent] {
            let mut gw = MockApiGateway::new();
            gw.expect_get_rest_apis()
                .returning(|| Ok(vec![api("a1", "orders"), api("b2", "orders")]));

            let mut desired = spec("orders");
            desired.state = state;
            let err = Reconciler::new(&gw)
                .reconcile(&RestApiKind, &desired)
                .await
                .expect_err("ambiguous");
            assert!(err.to_string().contains("a1, b2"), "{err}");
        }
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_created() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_api().times(1).returning(|_| Ok(None));

        let desired = RestApiSpec {
            id: Some("missing".to_string()),
            ..RestApiSpec::default()
        };
        let err = Reconciler::new(&gw)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect_err("not found");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_absent_deletes_then_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_apis().times(1).returning(|| Ok(vec![api("a1", "orders")]));
        gw.expect_delete_rest_api()
            .times(1)
            .withf(|id| id == "a1")
            .returning(|_| Ok(()));

        let mut desired = spec("orders");
        desired.state = DesiredState::Absent;
        let outcome = Reconciler::new(&gw)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);
        assert!(outcome.resource.is_none());

        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_apis().times(1).returning(|| Ok(Vec::new()));
        let outcome = Reconciler::new(&gw)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
    }

    #[tokio::test]
    async fn test_check_mode_issues_no_update() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_rest_apis().times(1).returning(|| Ok(vec![api("a1", "orders")]));

        let mut desired = spec("orders");
        desired.version = Some("2".to_string());
        let outcome = Reconciler::new(&gw)
            .with_check_mode(true)
            .reconcile(&RestApiKind, &desired)
            .await
            .expect("reconcile");

        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.changes.describe(), vec!["add /version = 2".to_string()]);
    }

    #[test]
    fn test_binary_media_types_purge() {
        let mut desired = spec("orders");
        desired.binary_media_types = Some(vec!["image/gif".to_string()]);

        let changes = RestApiKind.diff(&desired, &api("a1", "orders")).expect("diff");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].path, "/binaryMediaTypes/image~1gif");

        desired.purge_binary_media_types = true;
        let changes = RestApiKind.diff(&desired, &api("a1", "orders")).expect("diff");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.changes()[0].op, PatchOp::Remove);
        assert_eq!(changes.changes()[0].path, "/binaryMediaTypes/image~1png");
    }

    #[test]
    fn test_endpoint_type_is_replaced_by_path() {
        let mut desired = spec("orders");
        desired.endpoint_types = Some(vec!["EDGE".to_string()]);
        let changes = RestApiKind.diff(&desired, &api("a1", "orders")).expect("diff");
        assert_eq!(
            changes.describe(),
            vec!["replace /endpointConfiguration/types/REGIONAL = EDGE".to_string()]
        );
    }

    #[test]
    fn test_policy_compared_as_json() {
        let mut observed = api("a1", "orders");
        observed.policy = Some(r#"{\"Version\":\"2012-10-17\",\"Statement\":[]}"#.to_string());

        let mut desired = spec("orders");
        desired.policy = Some(serde_json::json!({ "Statement": [], "Version": "2012-10-17" }));
        assert!(RestApiKind.diff(&desired, &observed).expect("diff").is_empty());

        desired.policy = Some(Value::String(r#"{"Version":"2012-10-17","Statement":[{}]}"#.to_string()));
        let changes = RestApiKind.diff(&desired, &observed).expect("diff");
        assert_eq!(changes.changes()[0].path, "/policy");
    }
}
