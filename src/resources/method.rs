//! Methods, with their integration and responses.
//!
//! A method is reconciled as one unit across four scopes: the method itself,
//! its integration, method responses keyed by status code and integration
//! responses keyed by status code. Changes are applied in this order:
//!
//! 1. method patch
//! 2. integration put or patch
//! 3. method response puts and patches
//! 4. integration response deletes, puts and patches
//! 5. method response deletes
//!
//! Integration responses reference method responses, so new method responses
//! go first and stale ones go last.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApigwError, GatewayError, ReconcileError, Result};
use crate::gateway::{ApiGateway, Integration, IntegrationResponse, Method, MethodResponse};
use crate::planner::{Batch, ChangeSet, DiffEngine, FieldSpec, ROOT_SCOPE, Scope, SetEncoding, match_entries};
use crate::reconciler::{DesiredState, Progress, ResourceKind};

use super::{enabled, find_resource, given, normalize_path, require, require_one};

const INTEGRATION: &str = "integration";
const METHOD_RESPONSE: &str = "method_response";
const INTEGRATION_RESPONSE: &str = "integration_response";

/// Descriptor of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning REST API.
    pub rest_api_id: String,
    /// Resource id; takes precedence over `resource_path`.
    pub resource_id: Option<String>,
    /// Resource path, resolved to an id.
    pub resource_path: Option<String>,
    /// HTTP method (`GET`, `POST`, ..., `ANY`).
    pub http_method: String,
    /// Authorization type; `NONE` on creation when unset.
    pub authorization_type: Option<String>,
    /// Authorizer id for `CUSTOM` and `COGNITO_USER_POOLS`.
    pub authorizer_id: Option<String>,
    /// Whether an API key is required.
    pub api_key_required: Option<bool>,
    /// Operation name.
    pub operation_name: Option<String>,
    /// Request validator id.
    pub request_validator_id: Option<String>,
    /// Request parameters and whether each is required.
    pub request_parameters: Option<BTreeMap<String, bool>>,
    /// Request models by content type.
    pub request_models: Option<BTreeMap<String, String>>,
    /// Remove request parameters and models not listed, on the method and
    /// its integration.
    #[serde(default)]
    pub purge_request_parameters: bool,
    /// Backend integration.
    pub integration: Option<IntegrationSpec>,
    /// Remove integration request templates not listed.
    #[serde(default)]
    pub purge_request_templates: bool,
    /// Method responses.
    pub method_responses: Option<Vec<MethodResponseSpec>>,
    /// Remove method responses not listed.
    #[serde(default = "enabled")]
    pub purge_method_responses: bool,
    /// Remove integration responses not listed.
    #[serde(default = "enabled")]
    pub purge_integration_responses: bool,
}

/// Descriptor of a method integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSpec {
    /// Integration type (`AWS`, `AWS_PROXY`, `HTTP`, `HTTP_PROXY`, `MOCK`).
    #[serde(rename = "type")]
    pub integration_type: Option<String>,
    /// HTTP method used against the backend.
    pub http_method: Option<String>,
    /// Backend URI.
    pub uri: Option<String>,
    /// Connection type (`INTERNET` or `VPC_LINK`).
    pub connection_type: Option<String>,
    /// VPC link id.
    pub connection_id: Option<String>,
    /// Credentials ARN.
    pub credentials: Option<String>,
    /// Passthrough behavior.
    pub passthrough_behavior: Option<String>,
    /// Content handling strategy.
    pub content_handling: Option<String>,
    /// Cache namespace.
    pub cache_namespace: Option<String>,
    /// Timeout in milliseconds.
    pub timeout_in_millis: Option<i32>,
    /// Request parameter mappings.
    pub request_parameters: Option<BTreeMap<String, String>>,
    /// Request templates by content type.
    pub request_templates: Option<BTreeMap<String, String>>,
    /// Cache key parameters; the list is authoritative when given.
    pub cache_key_parameters: Option<Vec<String>>,
    /// Integration responses.
    pub integration_responses: Option<Vec<IntegrationResponseSpec>>,
}

/// Descriptor of a method response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodResponseSpec {
    /// Status code.
    pub status_code: String,
    /// Response parameters and whether each is required.
    pub response_parameters: Option<BTreeMap<String, bool>>,
    /// Response models by content type.
    pub response_models: Option<BTreeMap<String, String>>,
}

/// Descriptor of an integration response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationResponseSpec {
    /// Status code of the method response it maps to.
    pub status_code: String,
    /// Backend response selection regex.
    pub selection_pattern: Option<String>,
    /// Response parameter mappings.
    pub response_parameters: Option<BTreeMap<String, String>>,
    /// Response templates by content type.
    pub response_templates: Option<BTreeMap<String, String>>,
    /// Content handling strategy.
    pub content_handling: Option<String>,
}

const METHOD_FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("authorization_type", "/authorization_type", "/authorizationType"),
    FieldSpec::mutable("authorizer_id", "/authorizer_id", "/authorizerId"),
    FieldSpec::mutable("api_key_required", "/api_key_required", "/apiKeyRequired"),
    FieldSpec::mutable("operation_name", "/operation_name", "/operationName"),
    FieldSpec::mutable("request_validator_id", "/request_validator_id", "/requestValidatorId"),
];

const INTEGRATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("type", "/type", "/type"),
    FieldSpec::mutable("http_method", "/http_method", "/httpMethod"),
    FieldSpec::mutable("uri", "/uri", "/uri"),
    FieldSpec::mutable("connection_type", "/connection_type", "/connectionType"),
    FieldSpec::mutable("connection_id", "/connection_id", "/connectionId"),
    FieldSpec::mutable("credentials", "/credentials", "/credentials"),
    FieldSpec::mutable("passthrough_behavior", "/passthrough_behavior", "/passthroughBehavior"),
    FieldSpec::mutable("content_handling", "/content_handling", "/contentHandling"),
    FieldSpec::mutable("cache_namespace", "/cache_namespace", "/cacheNamespace"),
    FieldSpec::mutable("timeout_in_millis", "/timeout_in_millis", "/timeoutInMillis"),
];

const INTEGRATION_RESPONSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("selection_pattern", "/selection_pattern", "/selectionPattern"),
    FieldSpec::mutable("content_handling", "/content_handling", "/contentHandling"),
];

fn method_of(spec: &MethodSpec) -> Method {
    Method {
        http_method: spec.http_method.clone(),
        authorization_type: spec.authorization_type.clone().or_else(|| Some("NONE".to_string())),
        authorizer_id: spec.authorizer_id.clone(),
        api_key_required: spec.api_key_required.unwrap_or(false),
        operation_name: spec.operation_name.clone(),
        request_validator_id: spec.request_validator_id.clone(),
        request_parameters: spec.request_parameters.clone().unwrap_or_default(),
        request_models: spec.request_models.clone().unwrap_or_default(),
        method_responses: Vec::new(),
        integration: None,
    }
}

fn integration_of(spec: &IntegrationSpec) -> Integration {
    Integration {
        integration_type: spec.integration_type.clone(),
        http_method: spec.http_method.clone(),
        uri: spec.uri.clone(),
        connection_type: spec.connection_type.clone(),
        connection_id: spec.connection_id.clone(),
        credentials: spec.credentials.clone(),
        request_parameters: spec.request_parameters.clone().unwrap_or_default(),
        request_templates: spec.request_templates.clone().unwrap_or_default(),
        passthrough_behavior: spec.passthrough_behavior.clone(),
        content_handling: spec.content_handling.clone(),
        cache_namespace: spec.cache_namespace.clone(),
        cache_key_parameters: spec.cache_key_parameters.clone().unwrap_or_default(),
        timeout_in_millis: spec.timeout_in_millis,
        integration_responses: Vec::new(),
    }
}

fn method_response_of(spec: &MethodResponseSpec) -> MethodResponse {
    MethodResponse {
        status_code: spec.status_code.clone(),
        response_parameters: spec.response_parameters.clone().unwrap_or_default(),
        response_models: spec.response_models.clone().unwrap_or_default(),
    }
}

fn integration_response_of(spec: &IntegrationResponseSpec) -> IntegrationResponse {
    IntegrationResponse {
        status_code: spec.status_code.clone(),
        selection_pattern: spec.selection_pattern.clone(),
        response_parameters: spec.response_parameters.clone().unwrap_or_default(),
        response_templates: spec.response_templates.clone().unwrap_or_default(),
        content_handling: spec.content_handling.clone(),
    }
}

/// Method reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodKind;

/// Coordinates of a method once its resource is resolved.
struct Target<'a> {
    rest_api_id: &'a str,
    resource_id: &'a str,
    http_method: &'a str,
}

impl MethodKind {
    fn target<'a>(&self, spec: &'a MethodSpec) -> Result<Target<'a>> {
        let resource_id = given(spec.resource_id.as_ref()).ok_or_else(|| {
            ApigwError::from(ReconcileError::reference_not_found(
                Self::KIND,
                self.identity(spec),
                "resource",
            ))
        })?;
        Ok(Target {
            rest_api_id: &spec.rest_api_id,
            resource_id,
            http_method: &spec.http_method,
        })
    }

    async fn fetch(&self, gateway: &dyn ApiGateway, spec: &MethodSpec, target: &Target<'_>) -> Result<Method> {
        gateway
            .get_method(target.rest_api_id, target.resource_id, target.http_method)
            .await?
            .ok_or_else(|| {
                GatewayError::invalid_response("GetMethod", format!("{} missing after write", self.identity(spec)))
                    .into()
            })
    }

    async fn apply_batch(
        &self,
        gateway: &dyn ApiGateway,
        spec: &MethodSpec,
        target: &Target<'_>,
        batch: &Batch,
    ) -> Result<()> {
        let Target {
            rest_api_id,
            resource_id,
            http_method,
        } = *target;
        let status = batch.scope.key.as_deref().unwrap_or_default();
        match batch.scope.name {
            ROOT_SCOPE => {
                gateway
                    .update_method(rest_api_id, resource_id, http_method, &batch.patches())
                    .await
            }
            INTEGRATION if batch.is_put() => {
                let integration = spec
                    .integration
                    .as_ref()
                    .map(integration_of)
                    .ok_or_else(|| ApigwError::internal("integration put without a descriptor"))?;
                gateway
                    .put_integration(rest_api_id, resource_id, http_method, &integration)
                    .await
            }
            INTEGRATION => {
                gateway
                    .update_integration(rest_api_id, resource_id, http_method, &batch.patches())
                    .await
            }
            METHOD_RESPONSE if batch.is_delete() => {
                gateway
                    .delete_method_response(rest_api_id, resource_id, http_method, status)
                    .await
            }
            METHOD_RESPONSE if batch.is_put() => {
                let response = spec
                    .method_responses
                    .iter()
                    .flatten()
                    .find(|r| r.status_code == status)
                    .map(method_response_of)
                    .ok_or_else(|| ApigwError::internal(format!("no method response {status} to put")))?;
                gateway
                    .put_method_response(rest_api_id, resource_id, http_method, &response)
                    .await
            }
            METHOD_RESPONSE => {
                gateway
                    .update_method_response(rest_api_id, resource_id, http_method, status, &batch.patches())
                    .await
            }
            INTEGRATION_RESPONSE if batch.is_delete() => {
                gateway
                    .delete_integration_response(rest_api_id, resource_id, http_method, status)
                    .await
            }
            INTEGRATION_RESPONSE if batch.is_put() => {
                let response = spec
                    .integration
                    .iter()
                    .flat_map(|i| i.integration_responses.iter().flatten())
                    .find(|r| r.status_code == status)
                    .map(integration_response_of)
                    .ok_or_else(|| ApigwError::internal(format!("no integration response {status} to put")))?;
                gateway
                    .put_integration_response(rest_api_id, resource_id, http_method, &response)
                    .await
            }
            INTEGRATION_RESPONSE => {
                gateway
                    .update_integration_response(rest_api_id, resource_id, http_method, status, &batch.patches())
                    .await
            }
            other => Err(ApigwError::internal(format!("unexpected method scope {other}"))),
        }
    }
}

#[async_trait]
impl ResourceKind for MethodKind {
    type Spec = MethodSpec;
    type Observed = Method;

    const KIND: &'static str = "method";

    fn state(&self, spec: &MethodSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &MethodSpec) -> String {
        let location = given(spec.resource_path.as_ref())
            .map(normalize_path)
            .or_else(|| spec.resource_id.clone())
            .unwrap_or_default();
        format!("{} {location}", spec.http_method.to_uppercase())
    }

    fn observed_id(&self, observed: &Method) -> String {
        observed.http_method.clone()
    }

    fn validate(&self, spec: &MethodSpec) -> Result<()> {
        require(Self::KIND, "rest_api_id", &spec.rest_api_id)?;
        require(Self::KIND, "http_method", &spec.http_method)?;
        require_one(
            Self::KIND,
            &[
                ("resource_id", spec.resource_id.as_ref()),
                ("resource_path", spec.resource_path.as_ref()),
            ],
        )
    }

    async fn resolve(&self, gateway: &dyn ApiGateway, mut spec: MethodSpec) -> Result<MethodSpec> {
        spec.http_method = spec.http_method.to_uppercase();
        if given(spec.resource_id.as_ref()).is_some() {
            return Ok(spec);
        }
        let path = normalize_path(given(spec.resource_path.as_ref()).unwrap_or_default());
        match find_resource(gateway, &spec.rest_api_id, &path).await? {
            Some(node) => spec.resource_id = Some(node.id),
            None if spec.state == DesiredState::Present => {
                return Err(ReconcileError::reference_not_found(
                    Self::KIND,
                    self.identity(&spec),
                    format!("resource path '{path}'"),
                )
                .into());
            }
            None => debug!("Resource {} does not exist, method is absent", path),
        }
        Ok(spec)
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &MethodSpec) -> Result<Vec<Method>> {
        let Some(resource_id) = given(spec.resource_id.as_ref()) else {
            return Ok(Vec::new());
        };
        Ok(gateway
            .get_method(&spec.rest_api_id, resource_id, &spec.http_method)
            .await?
            .into_iter()
            .collect())
    }

    fn diff(&self, spec: &MethodSpec, observed: &Method) -> Result<ChangeSet> {
        let root = Scope::root();
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&root, METHOD_FIELDS, spec, observed)?;
        engine.map(
            &root,
            "/requestParameters",
            spec.request_parameters.as_ref(),
            &observed.request_parameters,
            spec.purge_request_parameters,
        )?;
        engine.map(
            &root,
            "/requestModels",
            spec.request_models.as_ref(),
            &observed.request_models,
            spec.purge_request_parameters,
        )?;

        if let Some(integration) = &spec.integration {
            let scope = Scope::named(INTEGRATION);
            match &observed.integration {
                None => engine.changes_mut().put_entry(&scope),
                Some(current) => {
                    engine.fields(&scope, INTEGRATION_FIELDS, integration, current)?;
                    engine.map(
                        &scope,
                        "/requestParameters",
                        integration.request_parameters.as_ref(),
                        &current.request_parameters,
                        spec.purge_request_parameters,
                    )?;
                    engine.map(
                        &scope,
                        "/requestTemplates",
                        integration.request_templates.as_ref(),
                        &current.request_templates,
                        spec.purge_request_templates,
                    )?;
                    engine.set(
                        &scope,
                        "/cacheKeyParameters",
                        SetEncoding::PathSuffix,
                        integration.cache_key_parameters.as_deref(),
                        &current.cache_key_parameters,
                        true,
                    );
                }
            }
        }

        let method_responses = spec.method_responses.as_deref().map(|desired| {
            match_entries(
                desired,
                &observed.method_responses,
                |d| d.status_code.clone(),
                |o| o.status_code.clone(),
            )
        });
        if let Some(matched) = &method_responses {
            for added in &matched.added {
                engine.changes_mut().put_entry(&Scope::keyed(METHOD_RESPONSE, &added.status_code));
            }
            for (desired, current) in &matched.matched {
                let scope = Scope::keyed(METHOD_RESPONSE, &desired.status_code);
                engine.map(
                    &scope,
                    "/responseParameters",
                    desired.response_parameters.as_ref(),
                    &current.response_parameters,
                    spec.purge_method_responses,
                )?;
                engine.map(
                    &scope,
                    "/responseModels",
                    desired.response_models.as_ref(),
                    &current.response_models,
                    spec.purge_method_responses,
                )?;
            }
        }

        let desired_integration_responses = spec
            .integration
            .as_ref()
            .and_then(|i| i.integration_responses.as_deref());
        if let Some(desired) = desired_integration_responses {
            let current = observed
                .integration
                .as_ref()
                .map_or(&[][..], |i| i.integration_responses.as_slice());
            let matched = match_entries(desired, current, |d| d.status_code.clone(), |o| o.status_code.clone());
            if spec.purge_integration_responses {
                for removed in &matched.removed {
                    engine
                        .changes_mut()
                        .delete_entry(&Scope::keyed(INTEGRATION_RESPONSE, &removed.status_code));
                }
            }
            for added in &matched.added {
                engine
                    .changes_mut()
                    .put_entry(&Scope::keyed(INTEGRATION_RESPONSE, &added.status_code));
            }
            for (wanted, existing) in &matched.matched {
                let scope = Scope::keyed(INTEGRATION_RESPONSE, &wanted.status_code);
                engine.fields(&scope, INTEGRATION_RESPONSE_FIELDS, *wanted, *existing)?;
                engine.map(
                    &scope,
                    "/responseParameters",
                    wanted.response_parameters.as_ref(),
                    &existing.response_parameters,
                    spec.purge_integration_responses,
                )?;
                engine.map(
                    &scope,
                    "/responseTemplates",
                    wanted.response_templates.as_ref(),
                    &existing.response_templates,
                    spec.purge_integration_responses,
                )?;
            }
        }

        if let Some(matched) = &method_responses {
            if spec.purge_method_responses {
                for removed in &matched.removed {
                    engine
                        .changes_mut()
                        .delete_entry(&Scope::keyed(METHOD_RESPONSE, &removed.status_code));
                }
            }
        }

        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &MethodSpec) -> Result<Method> {
        let target = self.target(spec)?;
        let method_responses = spec.method_responses.as_deref().unwrap_or_default();
        let integration_responses = spec
            .integration
            .as_ref()
            .and_then(|i| i.integration_responses.as_deref())
            .unwrap_or_default();
        let total =
            1 + usize::from(spec.integration.is_some()) + method_responses.len() + integration_responses.len();
        let mut progress = Progress::new(Self::KIND, self.identity(spec), total);

        progress.step(
            "put method",
            gateway
                .put_method(target.rest_api_id, target.resource_id, &method_of(spec))
                .await,
        )?;
        if let Some(integration) = &spec.integration {
            progress.step(
                "put integration",
                gateway
                    .put_integration(
                        target.rest_api_id,
                        target.resource_id,
                        target.http_method,
                        &integration_of(integration),
                    )
                    .await,
            )?;
        }
        for response in method_responses {
            progress.step(
                format!("put {METHOD_RESPONSE}[{}]", response.status_code),
                gateway
                    .put_method_response(
                        target.rest_api_id,
                        target.resource_id,
                        target.http_method,
                        &method_response_of(response),
                    )
                    .await,
            )?;
        }
        for response in integration_responses {
            progress.step(
                format!("put {INTEGRATION_RESPONSE}[{}]", response.status_code),
                gateway
                    .put_integration_response(
                        target.rest_api_id,
                        target.resource_id,
                        target.http_method,
                        &integration_response_of(response),
                    )
                    .await,
            )?;
        }
        self.fetch(gateway, spec, &target).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &MethodSpec,
        _observed: &Method,
        changes: &ChangeSet,
    ) -> Result<Method> {
        let target = self.target(spec)?;
        let batches = changes.batches();
        let mut progress = Progress::new(Self::KIND, self.identity(spec), batches.len());
        for batch in &batches {
            debug!("{}: {}", self.identity(spec), batch);
            let result = self.apply_batch(gateway, spec, &target, batch).await;
            progress.step(batch, result)?;
        }
        self.fetch(gateway, spec, &target).await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &MethodSpec, _observed: &Method) -> Result<()> {
        let target = self.target(spec)?;
        gateway
            .delete_method(target.rest_api_id, target.resource_id, target.http_method)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ApiResource, MockApiGateway};
    use crate::reconciler::{Action, Reconciler};

    fn response(code: &str) -> MethodResponse {
        MethodResponse {
            status_code: code.to_string(),
            ..MethodResponse::default()
        }
    }

    fn remote() -> Method {
        Method {
            http_method: "GET".to_string(),
            authorization_type: Some("NONE".to_string()),
            method_responses: vec![response("200"), response("500")],
            integration: Some(Integration {
                integration_type: Some("MOCK".to_string()),
                request_templates: [("application/json".to_string(), "{\"statusCode\": 200}".to_string())]
                    .into_iter()
                    .collect(),
                integration_responses: vec![IntegrationResponse {
                    status_code: "200".to_string(),
                    ..IntegrationResponse::default()
                }],
                ..Integration::default()
            }),
            ..Method::default()
        }
    }

    fn spec() -> MethodSpec {
        MethodSpec {
            rest_api_id: "abcd1234".to_string(),
            resource_id: Some("r1".to_string()),
            http_method: "get".to_string(),
            authorization_type: Some("NONE".to_string()),
            method_responses: Some(vec![
                MethodResponseSpec {
                    status_code: "200".to_string(),
                    ..MethodResponseSpec::default()
                },
                MethodResponseSpec {
                    status_code: "500".to_string(),
                    ..MethodResponseSpec::default()
                },
            ]),
            integration: Some(IntegrationSpec {
                integration_type: Some("MOCK".to_string()),
                integration_responses: Some(vec![IntegrationResponseSpec {
                    status_code: "200".to_string(),
                    ..IntegrationResponseSpec::default()
                }]),
                ..IntegrationSpec::default()
            }),
            purge_method_responses: true,
            purge_integration_responses: true,
            ..MethodSpec::default()
        }
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_method()
            .times(1)
            .withf(|api, res, http| api == "abcd1234" && res == "r1" && http == "GET")
            .returning(|_, _, _| Ok(Some(remote())));

        let outcome = Reconciler::new(&gw).reconcile(&MethodKind, &spec()).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(outcome.changes.is_empty());
    }

    #[tokio::test]
    async fn test_purge_removes_unlisted_method_response() {
        let mut desired = spec();
        if let Some(responses) = desired.method_responses.as_mut() {
            responses.retain(|r| r.status_code == "200");
        }

        let mut gw = MockApiGateway::new();
        gw.expect_get_method().times(2).returning(|_, _, _| Ok(Some(remote())));
        gw.expect_delete_method_response()
            .times(1)
            .withf(|_, _, _, code| code == "500")
            .returning(|_, _, _, _| Ok(()));

        let outcome = Reconciler::new(&gw).reconcile(&MethodKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.changes.describe(), vec!["method_response[500] delete".to_string()]);

        desired.purge_method_responses = false;
        let changes = MethodKind.diff(&desired, &remote()).expect("diff");
        assert!(changes.is_empty());
    }

    #[test]
    fn test_scopes_follow_dependency_order() {
        let mut desired = spec();
        desired.authorization_type = Some("AWS_IAM".to_string());
        desired.method_responses = Some(vec![MethodResponseSpec {
            status_code: "404".to_string(),
            ..MethodResponseSpec::default()
        }]);
        if let Some(integration) = desired.integration.as_mut() {
            integration.uri = Some("https://example.com".to_string());
            integration.integration_responses = Some(vec![IntegrationResponseSpec {
                status_code: "404".to_string(),
                selection_pattern: Some(".*not found.*".to_string()),
                ..IntegrationResponseSpec::default()
            }]);
        }

        let changes = MethodKind.diff(&desired, &remote()).expect("diff");
        let order: Vec<String> = changes.batches().iter().map(ToString::to_string).collect();
        assert_eq!(
            order,
            vec![
                "update root",
                "update integration",
                "put method_response[404]",
                "delete integration_response[200]",
                "put integration_response[404]",
                "delete method_response[200]",
                "delete method_response[500]",
            ]
        );
    }

    #[tokio::test]
    async fn test_create_puts_every_part() {
        let mut gw = MockApiGateway::new();
        let mut calls = mockall::Sequence::new();
        gw.expect_get_method()
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_, _, _| Ok(None));
        gw.expect_put_method()
            .times(1)
            .in_sequence(&mut calls)
            .withf(|_, _, m| m.http_method == "GET" && m.authorization_type.as_deref() == Some("NONE"))
            .returning(|_, _, _| Ok(()));
        gw.expect_put_integration()
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_, _, _, _| Ok(()));
        gw.expect_put_method_response()
            .times(2)
            .in_sequence(&mut calls)
            .returning(|_, _, _, _| Ok(()));
        gw.expect_put_integration_response()
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_, _, _, _| Ok(()));
        gw.expect_get_method()
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_, _, _| Ok(Some(remote())));

        let outcome = Reconciler::new(&gw).reconcile(&MethodKind, &spec()).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Create);
        assert_eq!(outcome.resource.map(|m| m.method_responses.len()), Some(2));
    }

    #[tokio::test]
    async fn test_missing_resource_path() {
        let mut desired = spec();
        desired.resource_id = None;
        desired.resource_path = Some("/pets".to_string());

        let mut gw = MockApiGateway::new();
        gw.expect_get_resources().returning(|_| {
            Ok(vec![ApiResource {
                id: "r0".to_string(),
                path: "/".to_string(),
                ..ApiResource::default()
            }])
        });

        let err = Reconciler::new(&gw)
            .reconcile(&MethodKind, &desired)
            .await
            .expect_err("missing resource");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::ReferenceNotFound { .. })));

        desired.state = DesiredState::Absent;
        let outcome = Reconciler::new(&gw).reconcile(&MethodKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
    }

    #[tokio::test]
    async fn test_late_failure_reports_partial_apply() {
        let mut desired = spec();
        desired.authorization_type = Some("AWS_IAM".to_string());
        if let Some(integration) = desired.integration.as_mut() {
            integration.uri = Some("https://example.com".to_string());
        }

        let mut gw = MockApiGateway::new();
        gw.expect_get_method().times(1).returning(|_, _, _| Ok(Some(remote())));
        gw.expect_update_method().times(1).returning(|_, _, _, _| Ok(()));
        gw.expect_update_integration()
            .times(1)
            .returning(|_, _, _, _| Err(GatewayError::api("UpdateIntegration", "BadRequestException", "bad uri").into()));

        let err = Reconciler::new(&gw)
            .reconcile(&MethodKind, &desired)
            .await
            .expect_err("partial");
        match err {
            ApigwError::Reconcile(ReconcileError::PartialApply { applied, total, .. }) => {
                assert_eq!((applied, total), (1, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
