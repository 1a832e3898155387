//! Task executor for running manifest tasks.
//!
//! Tasks run strictly in manifest order against one gateway. In check mode
//! every task is looked up and diffed but nothing is mutated.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Task;
use crate::error::Result;
use crate::gateway::ApiGateway;
use crate::reconciler::{Action, Reconciler, ResourceKind};
use crate::resources::{
    ApiKeyKind, ApiResourceKind, AuthorizerKind, BasePathMappingKind, DeploymentKind, DomainNameKind, MethodKind,
    RestApiKind, StageKind, UsagePlanKeyKind, UsagePlanKind, VpcLinkKind,
};

/// Executor for manifest tasks.
pub struct TaskExecutor<'a> {
    /// Remote API.
    gateway: &'a dyn ApiGateway,
    /// Whether to skip mutating calls.
    check_mode: bool,
    /// Whether to continue on errors.
    continue_on_error: bool,
}

/// Result of running a single task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Position of the task in the manifest.
    pub index: usize,
    /// Resource kind.
    pub kind: &'static str,
    /// Resource identity.
    pub identity: String,
    /// Action taken, or that would be taken in check mode.
    pub action: Option<Action>,
    /// Whether the remote state changed (or would change).
    pub changed: bool,
    /// Rendered patch operations.
    pub changes: Vec<String>,
    /// Resulting remote resource.
    pub resource: Option<Value>,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of running every task.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Individual task reports.
    pub reports: Vec<TaskReport>,
    /// Whether this was a check-mode run.
    pub check_mode: bool,
    /// Total tasks executed.
    pub total_executed: usize,
    /// Number of tasks that changed (or would change) something.
    pub changed: usize,
    /// Number of failed tasks.
    pub failed: usize,
    /// Number of tasks not run after a failure.
    pub skipped: usize,
    /// Whether every task succeeded.
    pub success: bool,
}

/// What one successful reconciliation produced.
struct TaskRun {
    action: Action,
    changed: bool,
    changes: Vec<String>,
    resource: Option<Value>,
}

impl<'a> TaskExecutor<'a> {
    /// Creates a new task executor.
    #[must_use]
    pub const fn new(gateway: &'a dyn ApiGateway) -> Self {
        Self {
            gateway,
            check_mode: false,
            continue_on_error: false,
        }
    }

    /// Sets whether to plan only.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Runs the tasks in order.
    ///
    /// Task failures are recorded in the reports rather than returned.
    pub async fn execute(&self, tasks: &[Task]) -> ExecutionResult {
        info!(
            "{} {} tasks",
            if self.check_mode { "Planning" } else { "Executing" },
            tasks.len()
        );

        let mut reports = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            let report = self.execute_task(index, task).await;
            let failed = report.error.is_some();
            reports.push(report);

            if failed && !self.continue_on_error {
                let remaining = tasks.len() - index - 1;
                if remaining > 0 {
                    warn!("Stopping after task {index} failed; {remaining} tasks skipped");
                }
                break;
            }
        }

        let failed = reports.iter().filter(|r| r.error.is_some()).count();
        let changed = reports.iter().filter(|r| r.changed).count();

        ExecutionResult {
            total_executed: reports.len(),
            check_mode: self.check_mode,
            changed,
            failed,
            skipped: tasks.len() - reports.len(),
            success: failed == 0,
            reports,
        }
    }

    /// Runs a single task and records the outcome.
    async fn execute_task(&self, index: usize, task: &Task) -> TaskReport {
        info!("Task {}: {}", index, task);

        let mut report = TaskReport {
            index,
            kind: task.kind(),
            identity: task.identity(),
            action: None,
            changed: false,
            changes: Vec::new(),
            resource: None,
            error: None,
        };

        match self.dispatch(task).await {
            Ok(run) => {
                report.action = Some(run.action);
                report.changed = run.changed;
                report.changes = run.changes;
                report.resource = run.resource;
            }
            Err(e) => {
                error!("Task {} ({}) failed: {}", index, task, e);
                report.error = Some(e.to_string());
            }
        }
        report
    }

    async fn dispatch(&self, task: &Task) -> Result<TaskRun> {
        match task {
            Task::RestApi(spec) => self.run(&RestApiKind, spec).await,
            Task::Resource(spec) => self.run(&ApiResourceKind, spec).await,
            Task::Method(spec) => self.run(&MethodKind, spec).await,
            Task::Deployment(spec) => self.run(&DeploymentKind, spec).await,
            Task::Stage(spec) => self.run(&StageKind, spec).await,
            Task::DomainName(spec) => self.run(&DomainNameKind, spec).await,
            Task::BasePathMapping(spec) => self.run(&BasePathMappingKind, spec).await,
            Task::UsagePlan(spec) => self.run(&UsagePlanKind, spec).await,
            Task::UsagePlanKey(spec) => self.run(&UsagePlanKeyKind, spec).await,
            Task::ApiKey(spec) => self.run(&ApiKeyKind, spec).await,
            Task::Authorizer(spec) => self.run(&AuthorizerKind, spec).await,
            Task::VpcLink(spec) => self.run(&VpcLinkKind, spec).await,
        }
    }

    async fn run<K: ResourceKind>(&self, kind: &K, spec: &K::Spec) -> Result<TaskRun> {
        let reconciler = Reconciler::new(self.gateway).with_check_mode(self.check_mode);
        let outcome = reconciler.reconcile(kind, spec).await?;
        Ok(TaskRun {
            action: outcome.action,
            changed: outcome.changed,
            changes: outcome.changes.describe(),
            resource: outcome.resource_json()?,
        })
    }
}

impl std::fmt::Debug for TaskExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("check_mode", &self.check_mode)
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

impl ExecutionResult {
    /// Returns true if every task ran and succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.success && self.failed == 0 && self.skipped == 0
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} tasks: {} changed, {} failed, {} skipped",
            if self.check_mode { "Planned" } else { "Executed" },
            self.total_executed,
            self.changed,
            self.failed,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestParser;
    use crate::gateway::{ApiKey, MockApiGateway, UsagePlan};

    fn tasks(yaml: &str) -> Vec<Task> {
        ManifestParser::new().parse_yaml(yaml, None).expect("parse").tasks
    }

    const MANIFEST: &str = r"
tasks:
  - kind: api_key
    name: partner
  - kind: usage_plan
    name: gold
  - kind: api_key
    name: internal
";

    fn partner() -> ApiKey {
        ApiKey {
            id: "k1".to_string(),
            name: Some("partner".to_string()),
            ..ApiKey::default()
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_api_keys()
            .times(1)
            .withf(|name| name == "partner")
            .returning(|_| Ok(vec![partner()]));
        gw.expect_get_usage_plans().times(1).returning(|| {
            let plan = UsagePlan {
                id: "p1".to_string(),
                name: "gold".to_string(),
                ..UsagePlan::default()
            };
            let mut twin = plan.clone();
            twin.id = "p2".to_string();
            Ok(vec![plan, twin])
        });

        let result = TaskExecutor::new(&gw).execute(&tasks(MANIFEST)).await;
        assert_eq!(result.total_executed, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 1);
        assert!(!result.all_successful());
        assert_eq!(result.reports[0].action, Some(Action::Noop));
        assert!(result.reports[1].error.as_deref().is_some_and(|e| e.contains("ambiguous")));
    }

    #[tokio::test]
    async fn test_continue_on_error() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_api_keys().times(2).returning(|name| {
            if name == "partner" { Ok(vec![partner()]) } else { Ok(Vec::new()) }
        });
        gw.expect_get_usage_plans()
            .times(1)
            .returning(|| Err(crate::error::GatewayError::network("GetUsagePlans", "connection reset").into()));

        let result = TaskExecutor::new(&gw)
            .with_check_mode(true)
            .with_continue_on_error(true)
            .execute(&tasks(MANIFEST))
            .await;

        assert_eq!(result.total_executed, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.reports[2].action, Some(Action::Create));
        assert!(result.reports[2].changed);
        assert_eq!(result.reports[2].identity, "internal");
        assert_eq!(result.to_string(), "Planned 3 tasks: 1 changed, 1 failed, 0 skipped");
    }

    #[tokio::test]
    async fn test_report_carries_resource() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_api_keys().times(1).returning(|_| Ok(vec![partner()]));

        let result = TaskExecutor::new(&gw)
            .execute(&tasks("tasks:\n  - kind: api_key\n    name: partner\n"))
            .await;
        assert!(result.all_successful());
        let resource = result.reports[0].resource.as_ref().expect("resource");
        assert_eq!(resource["id"], "k1");
    }
}
