//! Usage plans.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ApigwError, ReconcileError, Result};
use crate::gateway::{
    ApiGateway, ApiStage, CreateUsagePlan, PatchOp, PatchOperation, QuotaSettings, ThrottleSettings, UsagePlan,
};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope, SetEncoding};
use crate::reconciler::{DesiredState, Progress, ResourceKind};

use super::{enabled, found_by_id, given, require_one};

/// Descriptor of a usage plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsagePlanSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Plan id; takes precedence over the name for lookup.
    pub id: Option<String>,
    /// Plan name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Associated API stages.
    pub api_stages: Option<Vec<ApiStageSpec>>,
    /// Remove API stages not listed.
    #[serde(default = "enabled")]
    pub purge_api_stages: bool,
    /// Throttle burst limit.
    pub throttle_burst_limit: Option<i32>,
    /// Throttle rate limit.
    pub throttle_rate_limit: Option<f64>,
    /// Remove the throttle settings when none are given.
    #[serde(default = "enabled")]
    pub purge_throttle: bool,
    /// Maximum requests per period.
    pub quota_limit: Option<i32>,
    /// Requests subtracted in the first period.
    pub quota_offset: Option<i32>,
    /// Quota period (`DAY`, `WEEK`, `MONTH`).
    pub quota_period: Option<String>,
    /// Remove the quota settings when none are given.
    #[serde(default = "enabled")]
    pub purge_quota: bool,
}

/// An API stage to associate with a usage plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiStageSpec {
    /// REST API id.
    #[serde(alias = "api_id")]
    pub rest_api_id: String,
    /// Stage name.
    pub stage: String,
}

impl ApiStageSpec {
    /// The `apiId:stage` key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.rest_api_id, self.stage)
    }
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("name", "/name", "/name"),
    FieldSpec::mutable("description", "/description", "/description"),
    FieldSpec::mutable("throttle_burst_limit", "/throttle/burst_limit", "/throttle/burstLimit"),
    FieldSpec::mutable("throttle_rate_limit", "/throttle/rate_limit", "/throttle/rateLimit"),
    FieldSpec::mutable("quota_limit", "/quota/limit", "/quota/limit"),
    FieldSpec::mutable("quota_offset", "/quota/offset", "/quota/offset"),
    FieldSpec::mutable("quota_period", "/quota/period", "/quota/period"),
];

impl UsagePlanSpec {
    fn throttle(&self) -> Option<ThrottleSettings> {
        (self.throttle_burst_limit.is_some() || self.throttle_rate_limit.is_some()).then(|| ThrottleSettings {
            burst_limit: self.throttle_burst_limit,
            rate_limit: self.throttle_rate_limit,
        })
    }

    fn quota(&self) -> Option<QuotaSettings> {
        let period = given(self.quota_period.as_ref()).map(str::to_string);
        (self.quota_limit.is_some() || self.quota_offset.is_some() || period.is_some()).then(|| QuotaSettings {
            limit: self.quota_limit,
            offset: self.quota_offset,
            period,
        })
    }
}

/// Usage plan reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsagePlanKind;

#[async_trait]
impl ResourceKind for UsagePlanKind {
    type Spec = UsagePlanSpec;
    type Observed = UsagePlan;

    const KIND: &'static str = "usage_plan";

    fn state(&self, spec: &UsagePlanSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &UsagePlanSpec) -> String {
        given(spec.id.as_ref())
            .or_else(|| given(spec.name.as_ref()))
            .unwrap_or_default()
            .to_string()
    }

    fn observed_id(&self, observed: &UsagePlan) -> String {
        observed.id.clone()
    }

    fn validate(&self, spec: &UsagePlanSpec) -> Result<()> {
        require_one(Self::KIND, &[("id", spec.id.as_ref()), ("name", spec.name.as_ref())])
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &UsagePlanSpec) -> Result<Vec<UsagePlan>> {
        if let Some(id) = given(spec.id.as_ref()) {
            return found_by_id(Self::KIND, id, spec.state, gateway.get_usage_plan(id).await?);
        }
        let name = given(spec.name.as_ref()).unwrap_or_default();
        Ok(gateway
            .get_usage_plans()
            .await?
            .into_iter()
            .filter(|plan| plan.name == name)
            .collect())
    }

    fn diff(&self, spec: &UsagePlanSpec, observed: &UsagePlan) -> Result<ChangeSet> {
        let root = Scope::root();
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));

        // Stage removals lead the batch; a stage may carry its own throttling.
        let desired: Option<Vec<String>> = spec
            .api_stages
            .as_ref()
            .map(|stages| stages.iter().map(ApiStageSpec::key).collect());
        let current: Vec<String> = observed.api_stages.iter().map(ApiStage::key).collect();
        engine.set(
            &root,
            "/apiStages",
            SetEncoding::Value,
            desired.as_deref(),
            &current,
            spec.purge_api_stages,
        );

        engine.fields(&root, FIELDS, spec, observed)?;

        if spec.purge_throttle && observed.throttle.is_some() && spec.throttle().is_none() {
            engine.changes_mut().remove(&root, "/throttle");
        }
        if spec.purge_quota && observed.quota.is_some() && spec.quota().is_none() {
            engine.changes_mut().remove(&root, "/quota");
        }
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &UsagePlanSpec) -> Result<UsagePlan> {
        let name = given(spec.name.as_ref()).ok_or_else(|| {
            ApigwError::from(ReconcileError::missing_identity(Self::KIND, "name is required to create a usage plan"))
        })?;
        let request = CreateUsagePlan {
            name: name.to_string(),
            description: spec.description.clone(),
            api_stages: spec
                .api_stages
                .iter()
                .flatten()
                .map(|s| ApiStage {
                    api_id: s.rest_api_id.clone(),
                    stage: s.stage.clone(),
                })
                .collect(),
            throttle: spec.throttle(),
            quota: spec.quota(),
        };
        gateway.create_usage_plan(&request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        _spec: &UsagePlanSpec,
        observed: &UsagePlan,
        changes: &ChangeSet,
    ) -> Result<UsagePlan> {
        gateway.update_usage_plan(&observed.id, &changes.root_patches()).await
    }

    /// Plans with associated stages cannot be deleted, so the stages go first.
    async fn delete(&self, gateway: &dyn ApiGateway, spec: &UsagePlanSpec, observed: &UsagePlan) -> Result<()> {
        let detach: Vec<PatchOperation> = observed
            .api_stages
            .iter()
            .map(|s| PatchOperation {
                op: PatchOp::Remove,
                path: "/apiStages".to_string(),
                value: Some(s.key()),
            })
            .collect();
        let total = usize::from(!detach.is_empty()) + 1;
        let mut progress = Progress::new(Self::KIND, self.identity(spec), total);
        if !detach.is_empty() {
            progress.step("remove api stages", gateway.update_usage_plan(&observed.id, &detach).await)?;
        }
        progress.step("delete usage plan", gateway.delete_usage_plan(&observed.id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockApiGateway;
    use crate::reconciler::{Action, Reconciler};

    fn remote() -> UsagePlan {
        UsagePlan {
            id: "p1".to_string(),
            name: "partner-plan".to_string(),
            api_stages: vec![ApiStage {
                api_id: "abcd1234".to_string(),
                stage: "live".to_string(),
            }],
            quota: Some(QuotaSettings {
                limit: Some(100),
                offset: Some(0),
                period: Some("DAY".to_string()),
            }),
            ..UsagePlan::default()
        }
    }

    fn spec() -> UsagePlanSpec {
        serde_yaml::from_str("name: partner-plan\n").expect("parse descriptor")
    }

    #[tokio::test]
    async fn test_quota_change_is_one_patch_call() {
        let mut desired = spec();
        desired.quota_limit = Some(333);
        desired.quota_period = Some("WEEK".to_string());
        desired.purge_quota = true;

        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().times(1).returning(|| Ok(vec![remote()]));
        gw.expect_update_usage_plan()
            .times(1)
            .withf(|id, patches| {
                id == "p1"
                    && patches
                        == [
                            PatchOperation::replace("/quota/limit", "333"),
                            PatchOperation::replace("/quota/period", "WEEK"),
                        ]
            })
            .returning(|_, _| Ok(remote()));

        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.changes.len(), 2);
    }

    #[test]
    fn test_group_removed_only_when_every_parameter_is_unset() {
        let mut observed = remote();
        observed.throttle = Some(ThrottleSettings {
            burst_limit: Some(10),
            rate_limit: Some(5.0),
        });

        let mut desired = spec();
        desired.api_stages = None;
        let changes = UsagePlanKind.diff(&desired, &observed).expect("diff");
        assert_eq!(
            changes.describe(),
            vec!["remove /throttle".to_string(), "remove /quota".to_string()]
        );

        desired.quota_period = Some("DAY".to_string());
        desired.purge_throttle = false;
        assert!(UsagePlanKind.diff(&desired, &observed).expect("diff").is_empty());
    }

    #[test]
    fn test_api_stage_purge() {
        let mut desired = spec();
        desired.purge_quota = false;
        desired.api_stages = Some(vec![ApiStageSpec {
            rest_api_id: "efgh5678".to_string(),
            stage: "live".to_string(),
        }]);

        let changes = UsagePlanKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.changes()[0].op, PatchOp::Remove);
        assert_eq!(changes.changes()[0].value.as_deref(), Some("abcd1234:live"));
        assert_eq!(changes.changes()[1].op, PatchOp::Add);

        desired.purge_api_stages = false;
        let changes = UsagePlanKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.changes()[0].value.as_deref(), Some("efgh5678:live"));
    }

    #[tokio::test]
    async fn test_delete_detaches_stages_first() {
        let mut desired = spec();
        desired.state = DesiredState::Absent;

        let mut gw = MockApiGateway::new();
        let mut calls = mockall::Sequence::new();
        gw.expect_get_usage_plans().times(1).returning(|| Ok(vec![remote()]));
        gw.expect_update_usage_plan()
            .times(1)
            .in_sequence(&mut calls)
            .withf(|_, patches| patches == [PatchOperation {
                op: PatchOp::Remove,
                path: "/apiStages".to_string(),
                value: Some("abcd1234:live".to_string()),
            }])
            .returning(|_, _| Ok(UsagePlan::default()));
        gw.expect_delete_usage_plan()
            .times(1)
            .in_sequence(&mut calls)
            .returning(|_| Ok(()));

        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous_when_absent() {
        let mut desired = spec();
        desired.state = DesiredState::Absent;

        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().returning(|| {
            let mut other = remote();
            other.id = "p2".to_string();
            Ok(vec![remote(), other])
        });

        let err = Reconciler::new(&gw)
            .reconcile(&UsagePlanKind, &desired)
            .await
            .expect_err("ambiguous");
        assert!(err.to_string().contains("p1, p2"));
    }

    #[test]
    fn test_stage_removals_come_first() {
        let mut desired = spec();
        desired.description = Some("partners".to_string());
        desired.quota_limit = Some(100);
        desired.quota_period = Some("DAY".to_string());
        desired.api_stages = Some(Vec::new());

        let changes = UsagePlanKind.diff(&desired, &remote()).expect("diff");
        assert_eq!(
            changes.describe(),
            vec![
                "remove /apiStages = abcd1234:live".to_string(),
                "add /description = partners".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut desired = spec();
        desired.quota_limit = Some(100);
        desired.quota_period = Some("DAY".to_string());
        desired.api_stages = Some(vec![ApiStageSpec {
            rest_api_id: "abcd1234".to_string(),
            stage: "live".to_string(),
        }]);

        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().times(1).returning(|| Ok(vec![remote()]));

        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.resource.map(|p| p.id), Some("p1".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_created() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plan()
            .times(1)
            .withf(|id| id == "p-missing")
            .returning(|_| Ok(None));

        let mut desired = spec();
        desired.id = Some("p-missing".to_string());
        let err = Reconciler::new(&gw)
            .reconcile(&UsagePlanKind, &desired)
            .await
            .expect_err("not found");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_absent_missing_plan_is_noop() {
        let mut desired = spec();
        desired.state = DesiredState::Absent;

        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().times(1).returning(|| Ok(Vec::new()));

        let outcome = Reconciler::new(&gw).reconcile(&UsagePlanKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
        assert!(outcome.resource.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_names_are_ambiguous_when_present() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_usage_plans().times(1).returning(|| {
            let mut other = remote();
            other.id = "p2".to_string();
            Ok(vec![remote(), other])
        });

        let err = Reconciler::new(&gw)
            .reconcile(&UsagePlanKind, &spec())
            .await
            .expect_err("ambiguous");
        assert!(matches!(err, ApigwError::Reconcile(ReconcileError::AmbiguousMatch { .. })));
    }
}
