//! Manifest types.
//!
//! A manifest holds the AWS connection settings and an ordered list of
//! tasks. Each task is one resource descriptor tagged with its `kind`:
//!
//! ```yaml
//! aws:
//!   region: eu-west-1
//! tasks:
//!   - kind: usage_plan
//!     name: partner-plan
//!     quota_limit: 333
//!     quota_period: WEEK
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reconciler::{DesiredState, ResourceKind};
use crate::resources::{
    ApiKeyKind, ApiKeySpec, ApiResourceKind, ApiResourceSpec, AuthorizerKind, AuthorizerSpec,
    BasePathMappingKind, BasePathMappingSpec, DeploymentKind, DeploymentSpec, DomainNameKind,
    DomainNameSpec, MethodKind, MethodSpec, RestApiKind, RestApiSpec, StageKind, StageSpec,
    UsagePlanKeyKind, UsagePlanKeySpec, UsagePlanKind, UsagePlanSpec, VpcLinkKind, VpcLinkSpec,
};

/// AWS connection settings.
///
/// Every field is optional; unset values fall back to the SDK's default
/// provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsSettings {
    /// AWS region.
    pub region: Option<String>,
    /// Named profile from the shared config files.
    pub profile: Option<String>,
    /// Endpoint override, e.g. a local emulator.
    pub endpoint_url: Option<String>,
}

/// Root manifest structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// AWS connection settings.
    #[serde(default)]
    pub aws: AwsSettings,
    /// Tasks, run in order.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One resource descriptor of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// A REST API.
    RestApi(RestApiSpec),
    /// A resource (path) of a REST API.
    Resource(ApiResourceSpec),
    /// A method with its integration and responses.
    Method(MethodSpec),
    /// A deployment.
    Deployment(DeploymentSpec),
    /// A stage.
    Stage(StageSpec),
    /// A custom domain name.
    DomainName(DomainNameSpec),
    /// A base path mapping of a domain name.
    BasePathMapping(BasePathMappingSpec),
    /// A usage plan.
    UsagePlan(UsagePlanSpec),
    /// An API key attached to a usage plan.
    UsagePlanKey(UsagePlanKeySpec),
    /// An API key.
    ApiKey(ApiKeySpec),
    /// An authorizer.
    Authorizer(AuthorizerSpec),
    /// A VPC link.
    VpcLink(VpcLinkSpec),
}

impl Task {
    /// Returns the resource kind name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RestApi(_) => RestApiKind::KIND,
            Self::Resource(_) => ApiResourceKind::KIND,
            Self::Method(_) => MethodKind::KIND,
            Self::Deployment(_) => DeploymentKind::KIND,
            Self::Stage(_) => StageKind::KIND,
            Self::DomainName(_) => DomainNameKind::KIND,
            Self::BasePathMapping(_) => BasePathMappingKind::KIND,
            Self::UsagePlan(_) => UsagePlanKind::KIND,
            Self::UsagePlanKey(_) => UsagePlanKeyKind::KIND,
            Self::ApiKey(_) => ApiKeyKind::KIND,
            Self::Authorizer(_) => AuthorizerKind::KIND,
            Self::VpcLink(_) => VpcLinkKind::KIND,
        }
    }

    /// Returns the target state.
    #[must_use]
    pub fn state(&self) -> DesiredState {
        match self {
            Self::RestApi(spec) => RestApiKind.state(spec),
            Self::Resource(spec) => ApiResourceKind.state(spec),
            Self::Method(spec) => MethodKind.state(spec),
            Self::Deployment(spec) => DeploymentKind.state(spec),
            Self::Stage(spec) => StageKind.state(spec),
            Self::DomainName(spec) => DomainNameKind.state(spec),
            Self::BasePathMapping(spec) => BasePathMappingKind.state(spec),
            Self::UsagePlan(spec) => UsagePlanKind.state(spec),
            Self::UsagePlanKey(spec) => UsagePlanKeyKind.state(spec),
            Self::ApiKey(spec) => ApiKeyKind.state(spec),
            Self::Authorizer(spec) => AuthorizerKind.state(spec),
            Self::VpcLink(spec) => VpcLinkKind.state(spec),
        }
    }

    /// Returns the human-readable identity used in logs and reports.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::RestApi(spec) => RestApiKind.identity(spec),
            Self::Resource(spec) => ApiResourceKind.identity(spec),
            Self::Method(spec) => MethodKind.identity(spec),
            Self::Deployment(spec) => DeploymentKind.identity(spec),
            Self::Stage(spec) => StageKind.identity(spec),
            Self::DomainName(spec) => DomainNameKind.identity(spec),
            Self::BasePathMapping(spec) => BasePathMappingKind.identity(spec),
            Self::UsagePlan(spec) => UsagePlanKind.identity(spec),
            Self::UsagePlanKey(spec) => UsagePlanKeyKind.identity(spec),
            Self::ApiKey(spec) => ApiKeyKind.identity(spec),
            Self::Authorizer(spec) => AuthorizerKind.identity(spec),
            Self::VpcLink(spec) => VpcLinkKind.identity(spec),
        }
    }

    /// Runs the kind's local checks. No network access.
    ///
    /// # Errors
    ///
    /// Returns the first failed check.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::RestApi(spec) => RestApiKind.validate(spec),
            Self::Resource(spec) => ApiResourceKind.validate(spec),
            Self::Method(spec) => MethodKind.validate(spec),
            Self::Deployment(spec) => DeploymentKind.validate(spec),
            Self::Stage(spec) => StageKind.validate(spec),
            Self::DomainName(spec) => DomainNameKind.validate(spec),
            Self::BasePathMapping(spec) => BasePathMappingKind.validate(spec),
            Self::UsagePlan(spec) => UsagePlanKind.validate(spec),
            Self::UsagePlanKey(spec) => UsagePlanKeyKind.validate(spec),
            Self::ApiKey(spec) => ApiKeyKind.validate(spec),
            Self::Authorizer(spec) => AuthorizerKind.validate(spec),
            Self::VpcLink(spec) => VpcLinkKind.validate(spec),
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.identity())
    }
}
