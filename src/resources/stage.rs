//! Stages.
//!
//! Stages only come into existence through a deployment, so this kind updates
//! and deletes but never creates.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApigwError, Result};
use crate::gateway::{ApiGateway, MethodSetting, Stage};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope, escape_key, match_entries};
use crate::reconciler::{CreateMode, DesiredState, ResourceKind};

use super::require;

/// Key addressing every method of a stage.
const ALL_METHODS: &str = "*";

/// Descriptor of a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning REST API.
    pub rest_api_id: String,
    /// Stage name.
    pub stage_name: String,
    /// Description.
    pub description: Option<String>,
    /// Deployment the stage points at.
    pub deployment_id: Option<String>,
    /// Enable the cache cluster.
    pub cache_cluster_enabled: Option<bool>,
    /// Cache cluster size.
    pub cache_cluster_size: Option<String>,
    /// Enable X-Ray tracing.
    pub tracing_enabled: Option<bool>,
    /// Stage variables.
    pub variables: Option<BTreeMap<String, String>>,
    /// Remove stage variables not listed.
    #[serde(default)]
    pub purge_variables: bool,
    /// Per-method settings.
    pub method_settings: Option<Vec<MethodSettingSpec>>,
    /// Remove method settings not listed.
    #[serde(default)]
    pub purge_method_settings: bool,
}

/// Settings for one method of a stage, or for all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSettingSpec {
    /// Resource path, or `*` for every resource.
    #[serde(default = "all_methods")]
    pub resource_path: String,
    /// HTTP method, or `*` for every method.
    #[serde(default = "all_methods")]
    pub http_method: String,
    /// `CloudWatch` metrics.
    pub metrics_enabled: Option<bool>,
    /// Logging level (`OFF`, `ERROR`, `INFO`).
    pub logging_level: Option<String>,
    /// Full request/response logging.
    pub data_trace_enabled: Option<bool>,
    /// Throttling burst limit.
    pub throttling_burst_limit: Option<i32>,
    /// Throttling rate limit.
    pub throttling_rate_limit: Option<f64>,
    /// Response caching.
    pub caching_enabled: Option<bool>,
    /// Cache TTL.
    pub cache_ttl_in_seconds: Option<i32>,
    /// Encrypt cached data.
    pub cache_data_encrypted: Option<bool>,
    /// Require authorization for cache invalidation.
    pub require_authorization_for_cache_control: Option<bool>,
    /// Handling of unauthorized cache invalidation.
    pub unauthorized_cache_control_header_strategy: Option<String>,
}

fn all_methods() -> String {
    ALL_METHODS.to_string()
}

impl Default for MethodSettingSpec {
    fn default() -> Self {
        Self {
            resource_path: all_methods(),
            http_method: all_methods(),
            metrics_enabled: None,
            logging_level: None,
            data_trace_enabled: None,
            throttling_burst_limit: None,
            throttling_rate_limit: None,
            caching_enabled: None,
            cache_ttl_in_seconds: None,
            cache_data_encrypted: None,
            require_authorization_for_cache_control: None,
            unauthorized_cache_control_header_strategy: None,
        }
    }
}

impl MethodSettingSpec {
    /// Key of the setting within the stage: `~1pets/GET`, or `*/*`.
    #[must_use]
    pub fn key(&self) -> String {
        let method = self.http_method.to_uppercase();
        if self.resource_path == ALL_METHODS {
            return format!("{ALL_METHODS}/{method}");
        }
        format!("{}/{method}", escape_key(&super::normalize_path(&self.resource_path)))
    }
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("description", "/description", "/description"),
    FieldSpec::mutable("deployment_id", "/deployment_id", "/deploymentId"),
    FieldSpec::mutable("cache_cluster_enabled", "/cache_cluster_enabled", "/cacheClusterEnabled"),
    FieldSpec::mutable("cache_cluster_size", "/cache_cluster_size", "/cacheClusterSize"),
    FieldSpec::mutable("tracing_enabled", "/tracing_enabled", "/tracingEnabled"),
];

const SETTING_FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("metrics_enabled", "/metrics_enabled", "/metrics/enabled"),
    FieldSpec::mutable("logging_level", "/logging_level", "/logging/loglevel"),
    FieldSpec::mutable("data_trace_enabled", "/data_trace_enabled", "/logging/dataTrace"),
    FieldSpec::mutable("throttling_burst_limit", "/throttling_burst_limit", "/throttling/burstLimit"),
    FieldSpec::mutable("throttling_rate_limit", "/throttling_rate_limit", "/throttling/rateLimit"),
    FieldSpec::mutable("caching_enabled", "/caching_enabled", "/caching/enabled"),
    FieldSpec::mutable("cache_ttl_in_seconds", "/cache_ttl_in_seconds", "/caching/ttlInSeconds"),
    FieldSpec::mutable("cache_data_encrypted", "/cache_data_encrypted", "/caching/dataEncrypted"),
    FieldSpec::mutable(
        "require_authorization_for_cache_control",
        "/require_authorization_for_cache_control",
        "/caching/requireAuthorizationForCacheControl",
    ),
    FieldSpec::mutable(
        "unauthorized_cache_control_header_strategy",
        "/unauthorized_cache_control_header_strategy",
        "/caching/unauthorizedCacheControlHeaderStrategy",
    ),
];

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ApigwError::internal(format!("failed to serialize method setting: {e}")))
}

/// Stage reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageKind;

impl StageKind {
    /// Diffs method settings. Method settings are always written with
    /// `replace`, including settings the stage does not have yet.
    fn diff_method_settings(&self, spec: &StageSpec, observed: &Stage, engine: &mut DiffEngine) -> Result<()> {
        let Some(desired) = spec.method_settings.as_deref() else {
            return Ok(());
        };
        let root = Scope::root();
        let current: Vec<(&String, &MethodSetting)> = observed.method_settings.iter().collect();
        let matched = match_entries(desired, &current, MethodSettingSpec::key, |(key, _)| (*key).clone());

        let mut scratch = DiffEngine::new(Self::KIND, self.identity(spec));
        for added in &matched.added {
            scratch.fields_at(&root, &format!("/{}", added.key()), SETTING_FIELDS, &to_json(*added)?, &Value::Null)?;
        }
        for (wanted, (_, existing)) in &matched.matched {
            scratch.fields_at(
                &root,
                &format!("/{}", wanted.key()),
                SETTING_FIELDS,
                &to_json(*wanted)?,
                &to_json(*existing)?,
            )?;
        }
        for change in scratch.finish().changes() {
            engine
                .changes_mut()
                .replace(&root, change.path.clone(), change.value.clone().unwrap_or_default());
        }

        if spec.purge_method_settings {
            for (key, _) in &matched.removed {
                engine.changes_mut().remove(&root, format!("/{key}"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for StageKind {
    type Spec = StageSpec;
    type Observed = Stage;

    const KIND: &'static str = "stage";
    const CREATE: CreateMode = CreateMode::Never("stages are created by deployments; deploy with this stage_name first");

    fn state(&self, spec: &StageSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &StageSpec) -> String {
        format!("{}/{}", spec.rest_api_id, spec.stage_name)
    }

    fn observed_id(&self, observed: &Stage) -> String {
        observed.stage_name.clone()
    }

    fn validate(&self, spec: &StageSpec) -> Result<()> {
        require(Self::KIND, "rest_api_id", &spec.rest_api_id)?;
        require(Self::KIND, "stage_name", &spec.stage_name)
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &StageSpec) -> Result<Vec<Stage>> {
        Ok(gateway
            .get_stage(&spec.rest_api_id, &spec.stage_name)
            .await?
            .into_iter()
            .collect())
    }

    fn diff(&self, spec: &StageSpec, observed: &Stage) -> Result<ChangeSet> {
        let root = Scope::root();
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&root, FIELDS, spec, observed)?;
        engine.map(
            &root,
            "/variables",
            spec.variables.as_ref(),
            &observed.variables,
            spec.purge_variables,
        )?;
        self.diff_method_settings(spec, observed, &mut engine)?;
        Ok(engine.finish())
    }

    async fn create(&self, _gateway: &dyn ApiGateway, spec: &StageSpec) -> Result<Stage> {
        Err(ApigwError::internal(format!(
            "stage {} cannot be created directly",
            self.identity(spec)
        )))
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &StageSpec,
        _observed: &Stage,
        changes: &ChangeSet,
    ) -> Result<Stage> {
        gateway
            .update_stage(&spec.rest_api_id, &spec.stage_name, &changes.root_patches())
            .await
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &StageSpec, _observed: &Stage) -> Result<()> {
        gateway.delete_stage(&spec.rest_api_id, &spec.stage_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::gateway::{MockApiGateway, PatchOp};
    use crate::reconciler::{Action, Reconciler};

    fn spec() -> StageSpec {
        StageSpec {
            rest_api_id: "abcd1234".to_string(),
            stage_name: "live".to_string(),
            ..StageSpec::default()
        }
    }

    fn remote() -> Stage {
        Stage {
            stage_name: "live".to_string(),
            deployment_id: Some("d1".to_string()),
            variables: [("backend".to_string(), "blue".to_string())].into_iter().collect(),
            method_settings: [(
                "*/*".to_string(),
                MethodSetting {
                    metrics_enabled: true,
                    throttling_rate_limit: 100.0,
                    ..MethodSetting::default()
                },
            )]
            .into_iter()
            .collect(),
            ..Stage::default()
        }
    }

    #[tokio::test]
    async fn test_absent_missing_stage_is_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_stage().times(1).returning(|_, _| Ok(None));

        let mut desired = spec();
        desired.state = DesiredState::Absent;
        let outcome = Reconciler::new(&gw).reconcile(&StageKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
        assert!(outcome.resource.is_none());
    }

    #[tokio::test]
    async fn test_present_missing_stage_is_an_error() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_stage().times(1).returning(|_, _| Ok(None));

        let err = Reconciler::new(&gw)
            .reconcile(&StageKind, &spec())
            .await
            .expect_err("cannot create");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::CreateUnsupported { .. })));
        assert!(err.to_string().contains("deploy"));
    }

    #[tokio::test]
    async fn test_update_points_stage_at_deployment() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_stage().times(1).returning(|_, _| Ok(Some(remote())));
        gw.expect_update_stage()
            .times(1)
            .withf(|_, name, patches| {
                name == "live" && patches.len() == 1 && patches[0].path == "/deploymentId"
            })
            .returning(|_, _, _| Ok(remote()));

        let mut desired = spec();
        desired.deployment_id = Some("d2".to_string());
        let outcome = Reconciler::new(&gw).reconcile(&StageKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Update);
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_stage().times(1).returning(|_, _| Ok(Some(remote())));

        let mut desired = spec();
        desired.deployment_id = Some("d1".to_string());
        desired.variables = Some([("backend".to_string(), "blue".to_string())].into_iter().collect());
        desired.method_settings = Some(vec![MethodSettingSpec {
            metrics_enabled: Some(true),
            throttling_rate_limit: Some(100.0),
            ..MethodSettingSpec::default()
        }]);
        let outcome = Reconciler::new(&gw).reconcile(&StageKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.resource.map(|s| s.stage_name), Some("live".to_string()));
    }

    #[test]
    fn test_method_settings_use_replace() {
        let mut desired = spec();
        desired.method_settings = Some(vec![
            MethodSettingSpec {
                metrics_enabled: Some(true),
                throttling_rate_limit: Some(100.0),
                ..MethodSettingSpec::default()
            },
            MethodSettingSpec {
                resource_path: "/pets".to_string(),
                http_method: "get".to_string(),
                caching_enabled: Some(true),
                ..MethodSettingSpec::default()
            },
        ]);

        let changes = StageKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].op, PatchOp::Replace);
        assert_eq!(changes.changes()[0].path, "/~1pets/GET/caching/enabled");
        assert_eq!(changes.changes()[0].value.as_deref(), Some("true"));
    }

    #[test]
    fn test_variables_and_settings_purge() {
        let mut desired = spec();
        desired.variables = Some(BTreeMap::new());
        desired.method_settings = Some(Vec::new());
        assert!(StageKind.diff(&desired, &remote()).expect("diff").is_empty());

        desired.purge_variables = true;
        desired.purge_method_settings = true;
        let changes = StageKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(
            changes.describe(),
            vec!["remove /variables/backend".to_string(), "remove /*/*".to_string()]
        );
    }
}
