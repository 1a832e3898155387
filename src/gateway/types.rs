//! API Gateway resource types.
//!
//! These are the crate's typed view of the API Gateway management API. They are
//! built from SDK responses on every call and never persisted. Field names
//! serialize in `snake_case`; the diff tables address them by JSON pointer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patch operation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add a value or collection entry.
    Add,
    /// Remove a value or collection entry.
    Remove,
    /// Replace an existing value.
    Replace,
}

impl std::fmt::Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// A single API Gateway patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation verb.
    pub op: PatchOp,
    /// Patch path, e.g. `/quota/limit`.
    pub path: String,
    /// New value, stringified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PatchOperation {
    /// Builds an `add` operation.
    #[must_use]
    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// Builds a `replace` operation.
    #[must_use]
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// Builds a `remove` operation.
    #[must_use]
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }
}

// ============================================================================
// REST APIs and resources
// ============================================================================

/// A REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestApi {
    /// API identifier.
    pub id: String,
    /// API name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_date: Option<DateTime<Utc>>,
    /// Version label.
    pub version: Option<String>,
    /// Binary media types.
    #[serde(default)]
    pub binary_media_types: Vec<String>,
    /// Minimum payload size before compression kicks in.
    pub minimum_compression_size: Option<i32>,
    /// Source of API keys (`HEADER` or `AUTHORIZER`).
    pub api_key_source: Option<String>,
    /// Endpoint types (`EDGE`, `REGIONAL`, `PRIVATE`).
    #[serde(default)]
    pub endpoint_types: Vec<String>,
    /// Resource policy document.
    pub policy: Option<String>,
}

/// Request to create a REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateRestApi {
    /// API name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Version label.
    pub version: Option<String>,
    /// Id of an API to clone.
    pub clone_from: Option<String>,
    /// Binary media types.
    pub binary_media_types: Vec<String>,
    /// Minimum compression size.
    pub minimum_compression_size: Option<i32>,
    /// API key source.
    pub api_key_source: Option<String>,
    /// Endpoint types.
    pub endpoint_types: Vec<String>,
    /// Resource policy document.
    pub policy: Option<String>,
}

/// A resource (path node) of a REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
    /// Resource identifier.
    pub id: String,
    /// Parent resource identifier (`None` for `/`).
    pub parent_id: Option<String>,
    /// Last path segment.
    pub path_part: Option<String>,
    /// Full path.
    pub path: String,
}

// ============================================================================
// Methods and integrations
// ============================================================================

/// A method on a resource, including its integration and responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    /// HTTP method.
    pub http_method: String,
    /// Authorization type (`NONE`, `AWS_IAM`, `CUSTOM`, `COGNITO_USER_POOLS`).
    pub authorization_type: Option<String>,
    /// Authorizer identifier.
    pub authorizer_id: Option<String>,
    /// Whether an API key is required.
    #[serde(default)]
    pub api_key_required: bool,
    /// Operation name.
    pub operation_name: Option<String>,
    /// Request validator identifier.
    pub request_validator_id: Option<String>,
    /// Request parameters and whether each is required.
    #[serde(default)]
    pub request_parameters: BTreeMap<String, bool>,
    /// Request models by content type.
    #[serde(default)]
    pub request_models: BTreeMap<String, String>,
    /// Method responses, ordered by status code.
    #[serde(default)]
    pub method_responses: Vec<MethodResponse>,
    /// Backend integration.
    pub integration: Option<Integration>,
}

/// A method response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodResponse {
    /// Status code.
    pub status_code: String,
    /// Response parameters and whether each is required.
    #[serde(default)]
    pub response_parameters: BTreeMap<String, bool>,
    /// Response models by content type.
    #[serde(default)]
    pub response_models: BTreeMap<String, String>,
}

/// A method integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// Integration type (`AWS`, `AWS_PROXY`, `HTTP`, `HTTP_PROXY`, `MOCK`).
    #[serde(rename = "type")]
    pub integration_type: Option<String>,
    /// HTTP method used against the backend.
    pub http_method: Option<String>,
    /// Backend URI.
    pub uri: Option<String>,
    /// Connection type (`INTERNET` or `VPC_LINK`).
    pub connection_type: Option<String>,
    /// VPC link id for `VPC_LINK` connections.
    pub connection_id: Option<String>,
    /// Execution role or credentials ARN.
    pub credentials: Option<String>,
    /// Request parameter mappings.
    #[serde(default)]
    pub request_parameters: BTreeMap<String, String>,
    /// Request templates by content type.
    #[serde(default)]
    pub request_templates: BTreeMap<String, String>,
    /// Passthrough behavior.
    pub passthrough_behavior: Option<String>,
    /// Content handling strategy.
    pub content_handling: Option<String>,
    /// Cache namespace.
    pub cache_namespace: Option<String>,
    /// Cache key parameters.
    #[serde(default)]
    pub cache_key_parameters: Vec<String>,
    /// Timeout in milliseconds.
    pub timeout_in_millis: Option<i32>,
    /// Integration responses, ordered by status code.
    #[serde(default)]
    pub integration_responses: Vec<IntegrationResponse>,
}

/// An integration response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationResponse {
    /// Status code of the method response it maps to.
    pub status_code: String,
    /// Backend response selection regex.
    pub selection_pattern: Option<String>,
    /// Response parameter mappings.
    #[serde(default)]
    pub response_parameters: BTreeMap<String, String>,
    /// Response templates by content type.
    #[serde(default)]
    pub response_templates: BTreeMap<String, String>,
    /// Content handling strategy.
    pub content_handling: Option<String>,
}

// ============================================================================
// Deployments and stages
// ============================================================================

/// A deployment snapshot of a REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment identifier.
    pub id: String,
    /// Description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_date: Option<DateTime<Utc>>,
}

/// Request to create a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateDeployment {
    /// Stage to create or update with this deployment.
    pub stage_name: Option<String>,
    /// Description of that stage.
    pub stage_description: Option<String>,
    /// Deployment description.
    pub description: Option<String>,
    /// Enable the stage cache cluster.
    pub cache_cluster_enabled: Option<bool>,
    /// Stage cache cluster size.
    pub cache_cluster_size: Option<String>,
    /// Stage variables.
    pub variables: BTreeMap<String, String>,
    /// Enable X-Ray tracing on the stage.
    pub tracing_enabled: Option<bool>,
}

/// A stage of a REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name.
    pub stage_name: String,
    /// Deployment the stage points at.
    pub deployment_id: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Whether the cache cluster is enabled.
    #[serde(default)]
    pub cache_cluster_enabled: bool,
    /// Cache cluster size.
    pub cache_cluster_size: Option<String>,
    /// Whether X-Ray tracing is enabled.
    #[serde(default)]
    pub tracing_enabled: bool,
    /// Stage variables.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Method settings keyed by `{resource path}/{http method}`.
    #[serde(default)]
    pub method_settings: BTreeMap<String, MethodSetting>,
    /// Creation timestamp.
    pub created_date: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub last_updated_date: Option<DateTime<Utc>>,
}

/// Per-method settings of a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodSetting {
    /// `CloudWatch` metrics enabled.
    #[serde(default)]
    pub metrics_enabled: bool,
    /// Logging level (`OFF`, `ERROR`, `INFO`).
    pub logging_level: Option<String>,
    /// Full request/response logging.
    #[serde(default)]
    pub data_trace_enabled: bool,
    /// Throttling burst limit.
    #[serde(default)]
    pub throttling_burst_limit: i32,
    /// Throttling rate limit.
    #[serde(default)]
    pub throttling_rate_limit: f64,
    /// Response caching enabled.
    #[serde(default)]
    pub caching_enabled: bool,
    /// Cache TTL.
    #[serde(default)]
    pub cache_ttl_in_seconds: i32,
    /// Cache data encrypted.
    #[serde(default)]
    pub cache_data_encrypted: bool,
    /// Require authorization for cache invalidation.
    #[serde(default)]
    pub require_authorization_for_cache_control: bool,
    /// Handling of unauthorized cache invalidation.
    pub unauthorized_cache_control_header_strategy: Option<String>,
}

// ============================================================================
// Custom domains
// ============================================================================

/// A custom domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainName {
    /// Domain name.
    pub domain_name: String,
    /// Certificate name.
    pub certificate_name: Option<String>,
    /// Certificate ARN.
    pub certificate_arn: Option<String>,
    /// TLS security policy.
    pub security_policy: Option<String>,
    /// `CloudFront` distribution domain (edge endpoints).
    pub distribution_domain_name: Option<String>,
    /// Regional domain name (regional endpoints).
    pub regional_domain_name: Option<String>,
    /// Domain status.
    pub domain_name_status: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Request to create a custom domain name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateDomainName {
    /// Domain name.
    pub domain_name: String,
    /// Certificate ARN.
    pub certificate_arn: Option<String>,
    /// Certificate name.
    pub certificate_name: Option<String>,
    /// TLS security policy.
    pub security_policy: Option<String>,
    /// Tags.
    pub tags: BTreeMap<String, String>,
}

/// A base path mapping from a custom domain to a REST API stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePathMapping {
    /// Base path; empty for the domain root.
    #[serde(default)]
    pub base_path: String,
    /// Target REST API.
    pub rest_api_id: Option<String>,
    /// Target stage.
    pub stage: Option<String>,
}

// ============================================================================
// Usage plans and keys
// ============================================================================

/// A usage plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsagePlan {
    /// Plan identifier.
    pub id: String,
    /// Plan name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Associated API stages.
    #[serde(default)]
    pub api_stages: Vec<ApiStage>,
    /// Throttle settings.
    pub throttle: Option<ThrottleSettings>,
    /// Quota settings.
    pub quota: Option<QuotaSettings>,
}

/// An API stage associated with a usage plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiStage {
    /// REST API identifier.
    pub api_id: String,
    /// Stage name.
    pub stage: String,
}

impl ApiStage {
    /// The `apiId:stage` form used by usage plan patch operations.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.api_id, self.stage)
    }
}

/// Throttle settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Burst limit.
    pub burst_limit: Option<i32>,
    /// Steady-state rate limit.
    pub rate_limit: Option<f64>,
}

/// Quota settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSettings {
    /// Maximum requests per period.
    pub limit: Option<i32>,
    /// Requests subtracted in the first period.
    pub offset: Option<i32>,
    /// Period (`DAY`, `WEEK`, `MONTH`).
    pub period: Option<String>,
}

/// Request to create a usage plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateUsagePlan {
    /// Plan name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// API stages to associate.
    pub api_stages: Vec<ApiStage>,
    /// Throttle settings.
    pub throttle: Option<ThrottleSettings>,
    /// Quota settings.
    pub quota: Option<QuotaSettings>,
}

/// An API key attached to a usage plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePlanKey {
    /// Key identifier.
    pub id: String,
    /// Key name.
    pub name: Option<String>,
    /// Key type (`API_KEY`).
    pub key_type: Option<String>,
    /// Usage plan the key is attached to.
    pub usage_plan_id: String,
}

/// An API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key identifier.
    pub id: String,
    /// Key name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Key value.
    pub value: Option<String>,
    /// Whether the key can be used.
    #[serde(default)]
    pub enabled: bool,
    /// AWS Marketplace customer id.
    pub customer_id: Option<String>,
    /// Creation timestamp.
    pub created_date: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub last_updated_date: Option<DateTime<Utc>>,
}

/// Request to create an API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateApiKey {
    /// Key name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Explicit key value; generated when unset.
    pub value: Option<String>,
    /// Whether the key can be used.
    pub enabled: bool,
    /// Whether the key id is distinct from its value.
    pub generate_distinct_id: bool,
    /// AWS Marketplace customer id.
    pub customer_id: Option<String>,
}

// ============================================================================
// Authorizers and VPC links
// ============================================================================

/// An authorizer of a REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizer {
    /// Authorizer identifier.
    pub id: String,
    /// Authorizer name.
    pub name: String,
    /// Authorizer type (`TOKEN`, `REQUEST`, `COGNITO_USER_POOLS`).
    #[serde(rename = "type")]
    pub authorizer_type: Option<String>,
    /// Cognito user pool ARNs.
    #[serde(default)]
    pub provider_arns: Vec<String>,
    /// Optional customer-defined auth type.
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

/// Request to create an authorizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateAuthorizer {
    /// Authorizer name.
    pub name: String,
    /// Authorizer type.
    pub authorizer_type: String,
    /// Cognito user pool ARNs.
    pub provider_arns: Vec<String>,
    /// Optional customer-defined auth type.
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

/// A VPC link to a network load balancer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcLink {
    /// Link identifier.
    pub id: String,
    /// Link name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Target load balancer ARNs.
    #[serde(default)]
    pub target_arns: Vec<String>,
    /// Status (`AVAILABLE`, `PENDING`, `DELETING`, `FAILED`).
    pub status: Option<String>,
    /// Status message.
    pub status_message: Option<String>,
}

/// Request to create a VPC link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateVpcLink {
    /// Link name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Target load balancer ARNs.
    pub target_arns: Vec<String>,
}
