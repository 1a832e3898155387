//! Custom domain names.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::gateway::{ApiGateway, CreateDomainName, DomainName, PatchOp};
use crate::planner::{ChangeSet, DiffEngine, FieldSpec, Scope, diff_tags};
use crate::reconciler::{DesiredState, Progress, ResourceKind};

use super::require;

const TAGS: &str = "tags";

/// Descriptor of a custom domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainNameSpec {
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Domain name, e.g. `api.example.com`.
    #[serde(alias = "domain_name")]
    pub name: String,
    /// ACM certificate ARN.
    #[serde(alias = "cert_arn")]
    pub certificate_arn: Option<String>,
    /// Certificate name.
    #[serde(alias = "cert_name")]
    pub certificate_name: Option<String>,
    /// TLS security policy (`TLS_1_0` or `TLS_1_2`).
    pub security_policy: Option<String>,
    /// Tags.
    pub tags: Option<BTreeMap<String, String>>,
    /// Remove tags not listed.
    #[serde(default)]
    pub purge_tags: bool,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec::mutable("certificate_arn", "/certificate_arn", "/certificateArn"),
    FieldSpec::mutable("certificate_name", "/certificate_name", "/certificateName"),
    FieldSpec::mutable("security_policy", "/security_policy", "/securityPolicy"),
];

/// ARN used to tag a custom domain name.
#[must_use]
pub fn domain_arn(region: &str, name: &str) -> String {
    format!("arn:aws:apigateway:{region}::/domainnames/{name}")
}

/// Custom domain name reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainNameKind;

#[async_trait]
impl ResourceKind for DomainNameKind {
    type Spec = DomainNameSpec;
    type Observed = DomainName;

    const KIND: &'static str = "domain_name";

    fn state(&self, spec: &DomainNameSpec) -> DesiredState {
        spec.state
    }

    fn identity(&self, spec: &DomainNameSpec) -> String {
        spec.name.clone()
    }

    fn observed_id(&self, observed: &DomainName) -> String {
        observed.domain_name.clone()
    }

    fn validate(&self, spec: &DomainNameSpec) -> Result<()> {
        require(Self::KIND, "name", &spec.name)
    }

    async fn lookup(&self, gateway: &dyn ApiGateway, spec: &DomainNameSpec) -> Result<Vec<DomainName>> {
        Ok(gateway.get_domain_name(&spec.name).await?.into_iter().collect())
    }

    fn diff(&self, spec: &DomainNameSpec, observed: &DomainName) -> Result<ChangeSet> {
        let mut engine = DiffEngine::new(Self::KIND, self.identity(spec));
        engine.fields(&Scope::root(), FIELDS, spec, observed)?;

        let scope = Scope::named(TAGS);
        let (to_set, to_remove) = diff_tags(spec.tags.as_ref(), &observed.tags, spec.purge_tags);
        for (key, value) in to_set {
            engine.changes_mut().add(&scope, format!("/{key}"), value);
        }
        for key in to_remove {
            engine.changes_mut().remove(&scope, format!("/{key}"));
        }
        Ok(engine.finish())
    }

    async fn create(&self, gateway: &dyn ApiGateway, spec: &DomainNameSpec) -> Result<DomainName> {
        let request = CreateDomainName {
            domain_name: spec.name.clone(),
            certificate_arn: spec.certificate_arn.clone(),
            certificate_name: spec.certificate_name.clone(),
            security_policy: spec.security_policy.clone(),
            tags: spec.tags.clone().unwrap_or_default(),
        };
        gateway.create_domain_name(&request).await
    }

    async fn update(
        &self,
        gateway: &dyn ApiGateway,
        spec: &DomainNameSpec,
        _observed: &DomainName,
        changes: &ChangeSet,
    ) -> Result<DomainName> {
        let patches = changes.root_patches();
        let mut to_set = BTreeMap::new();
        let mut to_remove = Vec::new();
        for change in changes.changes().iter().filter(|c| c.scope.name == TAGS) {
            let key = change.path.trim_start_matches('/').to_string();
            match change.op {
                PatchOp::Remove => to_remove.push(key),
                _ => {
                    to_set.insert(key, change.value.clone().unwrap_or_default());
                }
            }
        }

        let total = usize::from(!patches.is_empty()) + usize::from(!to_set.is_empty()) + usize::from(!to_remove.is_empty());
        let mut progress = Progress::new(Self::KIND, self.identity(spec), total);
        if !patches.is_empty() {
            progress.step("update domain name", gateway.update_domain_name(&spec.name, &patches).await)?;
        }
        let arn = domain_arn(&gateway.region(), &spec.name);
        if !to_set.is_empty() {
            progress.step("tag domain name", gateway.tag_resource(&arn, &to_set).await)?;
        }
        if !to_remove.is_empty() {
            progress.step("untag domain name", gateway.untag_resource(&arn, &to_remove).await)?;
        }

        gateway.get_domain_name(&spec.name).await?.ok_or_else(|| {
            GatewayError::invalid_response("GetDomainName", format!("{} missing after update", spec.name)).into()
        })
    }

    async fn delete(&self, gateway: &dyn ApiGateway, spec: &DomainNameSpec, _observed: &DomainName) -> Result<()> {
        gateway.delete_domain_name(&spec.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockApiGateway;
    use crate::reconciler::{Action, Reconciler};

    fn remote() -> DomainName {
        DomainName {
            domain_name: "api.example.com".to_string(),
            certificate_arn: Some("arn:aws:acm:us-east-1:123:certificate/abc".to_string()),
            tags: [
                ("env".to_string(), "dev".to_string()),
                ("team".to_string(), "edge".to_string()),
            ]
            .into_iter()
            .collect(),
            ..DomainName::default()
        }
    }

    fn spec() -> DomainNameSpec {
        DomainNameSpec {
            name: "api.example.com".to_string(),
            tags: Some([("env".to_string(), "prod".to_string())].into_iter().collect()),
            ..DomainNameSpec::default()
        }
    }

    #[tokio::test]
    async fn test_tags_are_set_on_domain_arn() {
        let mut gw = MockApiGateway::new();
        gw.expect_get_domain_name().times(2).returning(|_| Ok(Some(remote())));
        gw.expect_region().return_const("eu-west-1".to_string());
        gw.expect_tag_resource()
            .times(1)
            .withf(|arn, tags| {
                arn == "arn:aws:apigateway:eu-west-1::/domainnames/api.example.com"
                    && tags.get("env").map(String::as_str) == Some("prod")
            })
            .returning(|_, _| Ok(()));

        let outcome = Reconciler::new(&gw).reconcile(&DomainNameKind, &spec()).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.changes.describe(), vec!["tags add /env = prod".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_tags_untags_unlisted_keys() {
        let mut desired = spec();
        desired.purge_tags = true;
        desired.tags = Some(remote().tags.into_iter().filter(|(k, _)| k == "env").collect());

        let mut gw = MockApiGateway::new();
        gw.expect_get_domain_name().times(2).returning(|_| Ok(Some(remote())));
        gw.expect_region().return_const("eu-west-1".to_string());
        gw.expect_untag_resource()
            .times(1)
            .withf(|_, keys| keys == ["team".to_string()])
            .returning(|_, _| Ok(()));

        let outcome = Reconciler::new(&gw).reconcile(&DomainNameKind, &desired).await.expect("reconcile");
        assert!(outcome.changed);
    }

    #[tokio::test]
    async fn test_matching_descriptor_is_noop() {
        let mut desired = spec();
        desired.tags = None;
        desired.certificate_arn = remote().certificate_arn;

        let mut gw = MockApiGateway::new();
        gw.expect_get_domain_name().times(1).returning(|_| Ok(Some(remote())));
        let outcome = Reconciler::new(&gw).reconcile(&DomainNameKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
    }

    #[test]
    fn test_short_certificate_keys() {
        let yaml = "domain_name: api.example.com\ncert_arn: arn:aws:acm:us-east-1:123:certificate/abc\ncert_name: edge\n";
        let desired: DomainNameSpec = serde_yaml::from_str(yaml).expect("parse descriptor");
        assert_eq!(desired.name, "api.example.com");
        assert_eq!(desired.certificate_arn, remote().certificate_arn);
        assert_eq!(desired.certificate_name.as_deref(), Some("edge"));
    }

    #[tokio::test]
    async fn test_absent_deletes_then_noop() {
        let desired = DomainNameSpec {
            state: DesiredState::Absent,
            ..spec()
        };

        let mut gw = MockApiGateway::new();
        gw.expect_get_domain_name().times(1).returning(|_| Ok(Some(remote())));
        gw.expect_delete_domain_name()
            .times(1)
            .withf(|name| name == "api.example.com")
            .returning(|_| Ok(()));
        let outcome = Reconciler::new(&gw).reconcile(&DomainNameKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Delete);
        assert!(outcome.resource.is_none());

        let mut gw = MockApiGateway::new();
        gw.expect_get_domain_name().times(1).returning(|_| Ok(None));
        let outcome = Reconciler::new(&gw).reconcile(&DomainNameKind, &desired).await.expect("reconcile");
        assert_eq!(outcome.action, Action::Noop);
        assert!(!outcome.changed);
    }
}
