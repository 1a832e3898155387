//! Authorizers of a REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::gateway::{ApiGateway, Authorizer, CreateAuthorizer};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope, SetEncoding};
use crate::reconciler::{DesiredState, ResourceKind};

use super::{enabled, found_by_id, given, require, require_one};

/// Descriptor of an authorizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizerSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning REST API.
    pub rest_api_id: String,
    /// Authorizer id; takes precedence over the name for lookup.
    pub id: Option<String>,
    /// Authorizer name.
    pub name: Option<String>,
    /// Authorizer type (`TOKEN`, `REQUEST`, `COGNITO_USER_POOLS`).
    #[serde(rename = "type")]
    pub authorizer_type: Option<String>,
    /// Cognito user pool ARNs.
    pub provider_arns: Option<Vec<String>>,
    /// Remove provider ARNs not listed.
    #[serde(default = "enabled")]
    pub purge_provider_arns: bool,
    /// Customer-defined auth type.
    pub auth_type: Option<String>,
    /// Lambda invocation URI.
    pub authorizer_uri: Option<String>,
    /// Credentials used to invoke the authorizer.
    pub authorizer_credentials: Option<String>,
    /// Identity source expression.
    pub identity_source: Option<String>,
    /// Identity validation regex.
    pub identity_validation_expression: Option<String>,
    /// Result cache TTL.
    pub authorizer_result_ttl_in_seconds: Option<i32>,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("name", "/name", "/name"),
    FieldSpec::mutable("type", "/type", "/type"),
    FieldSpec::mutable("auth_type", "/auth_type", "/authType"),
    FieldSpec::mutable("authorizer_uri", "/authorizer_uri", "/authorizerUri"),
    FieldSpec::mutable("authorizer_credentials", "/authorizer_credentials", "/authorizerCredentials"),
    FieldSpec::mutable("identity_source", "/identity_source", "/identitySource"),
    FieldSpec::mutable(
        "identity_validation_expression",
        "/identity_validation_expression",
        "/identityValidationExpression",
    ),
    FieldSpec::mutable(
        "authorizer_result_ttl_in_seconds",
        "/authorizer_result_ttl_in_seconds",
        "/authorizerResultTtlInSeconds",
    ),
];

/// Builds the create request, checking what each authorizer type needs.
fn create_request(spec: &AuthorizerSpec) -> Result<CreateAuthorizer> {
    let name = given(spec.name.as_ref())
        .ok_or_else(|| ConfigError::validation("name is required to create an authorizer", "name"))?;
    let authorizer_type = given(spec.authorizer_type.as_ref())
        .ok_or_else(|| ConfigError::validation("type is required to create an authorizer", "type"))?;
    let provider_arns = spec.provider_arns.clone().unwrap_or_default();

    match authorizer_type {
        "TOKEN" | "REQUEST" if given(spec.authorizer_uri.as_ref()).is_none() => {
            return Err(ConfigError::validation(
                format!("{authorizer_type} authorizers require authorizer_uri"),
                "authorizer_uri",
            )
            .into());
        }
        "COGNITO_USER_POOLS" if provider_arns.is_empty() => {
            return Err(ConfigError::validation(
                "COGNITO_USER_POOLS authorizers require provider_arns",
                "provider_arns",
            )
            .into());
        }
        _ => {}
    }

    Ok(CreateAuthorizer {
        name: name.to_string(),
        authorizer_type: authorizer_type.to_string(),
        provider_arns,
        auth_type: spec.auth_type.clone(),
        authorizer_uri: spec.authorizer_uri.clone(),
        authorizer_credentials: spec.authorizer_credentials.clone(),
        identity_source: spec.identity_source.clone(),
        identity_validation_expression: spec.identity_validation_expression.clone(),
        authorizer_result_ttl_in_seconds: spec.authorizer_result_ttl_in_seconds,
    })
}

/// Authorizer reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizerKind;

#[async_trait]
impl ResourceKind for AuthorizerKind {
    type Spec = AuthorizerSpec;
    type Observed = Authorizer;

    const KIND: &'static str = "authorizer";

    fn state(&self, spec: &AuthorizerSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &AuthorizerSpec) -> String {
        let id = given(spec.id.as_ref())
            .or_else(|| given(spec.name.as_ref()))
            .unwrap_or_default();
        format!("{}/{id}", spec.rest_api_id)
    }

    fn observed_id(&self, observed: &Authorizer) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &AuthorizerSpec) -> Result<()> {
        require(Self::KIND, "rest_api_id", &spec.rest_api_id)?;
        require_one(Self::KIND, &[("id", spec.id.as_ref()), ("name", spec.name.as_ref())])
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &AuthorizerSpec) -> Result<Vec<Authorizer>> {
        if let Some(id) = given(spec.id.as_ref()) {
            let found = gateway.get_authorizer(&spec.rest_api_id, id).await?;
            return found_by_id(Self::KIND, &self.identity(spec), spec.state, found);
        }
        let name = given(spec.name.as_ref()).unwrap_or_default();
        Ok(gateway
            .get_authorizers(&spec.rest_api_id)
            .await?
            .into_iter()
            .filter(|a| a.name == name)
            .collect())
    }

    fn diff(&self, spec: &AuthorizerSpec, observed: &Authorizer) -> Result<ChangeSet> {
        let root = Scope::root();
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&root, FIELDS, spec, observed)?;
        engine.set(
            &root,
            "/providerARNs",
            SetEncoding::Value,
            spec.provider_arns.as_deref(),
            &observed.provider_arns,
            spec.purge_provider_arns,
        );
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &AuthorizerSpec) -> Result<Authorizer> {
        let request = create_request(spec)?;
        gateway.create_authorizer(&spec.rest_api_id, &request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &AuthorizerSpec,
        observed: &Authorizer,
        changes: &ChangeSet,
    ) -> Result<Authorizer> {
        gateway
            .update_authorizer(&spec.rest_api_id, &observed.id, &changes.root_patches())
            .await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &AuthorizerSpec, observed: &Authorizer) -> Result<()> {
        gateway.delete_authorizer(&spec.rest_api_id, &observed.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApigwError, ReconcileError};
    use crate::gateway::{MockApiGateway, PatchOp};
    use crate::reconciler::{Action, Reconciler};

    const POOL_A: &str = "arn:aws:cognito-idp:eu-west-1:123:userpool/eu-west-1_A";
    const POOL_B: &str = "arn:aws:cognito-idp:eu-west-1:123:userpool/eu-west-1_B";

    fn spec(authorizer_type: &str) -> AuthorizerSpec {
        AuthorizerSpec {
            rest_api_id: "abcd1234".to_string(),
            name: Some("users".to_string()),
            authorizer_type: Some(authorizer_type.to_string()),
            purge_provider_arns: true,
            ..AuthorizerSpec::default()
        }
    }

    fn remote() -> Authorizer {
        Authorizer {
            id: "au1".to_string(),
            name: "users".to_string(),
            authorizer_type: Some("COGNITO_USER_POOLS".to_string()),
            provider_arns: vec![POOL_A.to_string()],
            identity_source: Some("method.request.header.Authorization".to_string()),
            ..Authorizer::default()
        }
    }

    #[test]
    fn test_create_requirements_per_type() {
        let err = create_request(&spec("TOKEN")).expect_err("uri required");
        assert!(err.to_string().contains("authorizer_uri"));

        let err = create_request(&spec("COGNITO_USER_POOLS")).expect_err("arns required");
        assert!(err.to_string().contains("provider_arns"));

        let mut cognito = spec("COGNITO_USER_POOLS");
        cognito.provider_arns = Some(vec![POOL_A.to_string()]);
        let request = create_request(&cognito).expect("request");
        assert_eq!(request.authorizer_type, "COGNITO_USER_POOLS");

        let mut unnamed = spec("REQUEST");
        unnamed.name = None;
        assert!(create_request(&unnamed).is_err());
    }

    #[test]
    fn test_provider_arns_purge() {
        let mut desired = spec("COGNITO_USER_POOLS");
        desired.provider_arns = Some(vec![POOL_B.to_string()]);

        let changes = AuthorizerKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.changes()[0].op, PatchOp::Remove);
        assert_eq!(changes.changes()[0].path, "/providerARNs");
        assert_eq!(changes.changes()[0].value.as_deref(), Some(POOL_A));

        desired.purge_provider_arns = false;
        let changes = AuthorizerKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].op, PatchOp::Add);
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_authorizers()
            .times(1)
            .withf(|api| api == "abcd1234")
            .returning(|_| Ok(vec![remote()]));

        let mut desired = spec("COGNITO_USER_POOLS");
        desired.provider_arns = Some(vec![POOL_A.to_string()]);
        let outcome = Reconciler::new(&gw).reconcile(&AuthorizerKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
    }

    #[tokio::test]
    async fn test_absent_by_id() {
        let mut desired = spec("TOKEN");
        desired.id = Some("au1".to_string());
        desired.state = DesiredState::Absent;

        let mut gw = MockApiGateway::new();
        gw.expect_get_authorizer().times(1).returning(|_, _| Ok(Some(remote())));
        gw.expect_delete_authorizer()
            .times(1)
            .withf(|api, id| api == "abcd1234" && id == "au1")
            .returning(|_, _| Ok(()));
        let outcome = Reconciler::new(&gw).reconcile(&AuthorizerKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);

        let mut gw = MockApiGateway::new();
        gw.expect_get_authorizer().times(1).returning(|_, _| Ok(None));
        let outcome = Reconciler::new(&gw).reconcile(&AuthorizerKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_created() {
        let mut desired = spec("COGNITO_USER_POOLS");
        desired.id = Some("au-missing".to_string());
        desired.provider_arns = Some(vec![POOL_A.to_string()]);

        let mut gw = MockApiGateway::new();
        gw.expect_get_authorizer()
            .times(1)
            .withf(|api, id| api == "abcd1234" && id == "au-missing")
            .returning(|_, _| Ok(None));

        let err = Reconciler::new(&gw)
            .reconcile(&AuthorizerKind, &desired)
            .await
            .expect_err("not found");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::NotFound { .. })));
        assert!(err.to_string().contains("abcd1234/au-missing"));
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous() {
        for state in [DesiredState::Present, DesiredState::Absent] {
            let mut gw = MockApiGateway::new();
            gw.expect_get_authorizers().times(1).returning(|_| {
                let mut other = remote();
                other.id = "au2".to_string();
                Ok(vec![remote(), other])
            });

            let mut desired = spec("COGNITO_USER_POOLS");
            desired.state = state;
            let err = Reconciler::new(&gw)
                .reconcile(&AuthorizerKind, &desired)
                .await
                .expect_err("ambiguous");
            assert!(err.to_string().contains("au1, au2"));
        }
    }
}
