//! Conversions from SDK shapes to the crate's resource types.
//!
//! The SDK emits a distinct output type per operation even when the fields are
//! identical (`GetUsagePlanOutput`, `UpdateUsagePlanOutput`, ...), so each
//! conversion is generated for every shape that carries the same accessors.

use std::collections::{BTreeMap, HashMap};

use aws_sdk_apigateway::operation::{
    create_api_key::CreateApiKeyOutput, create_authorizer::CreateAuthorizerOutput,
    create_base_path_mapping::CreateBasePathMappingOutput, create_deployment::CreateDeploymentOutput,
    create_domain_name::CreateDomainNameOutput, create_resource::CreateResourceOutput,
    create_rest_api::CreateRestApiOutput, create_usage_plan::CreateUsagePlanOutput,
    create_usage_plan_key::CreateUsagePlanKeyOutput, create_vpc_link::CreateVpcLinkOutput,
    get_api_key::GetApiKeyOutput, get_authorizer::GetAuthorizerOutput,
    get_base_path_mapping::GetBasePathMappingOutput, get_deployment::GetDeploymentOutput,
    get_domain_name::GetDomainNameOutput, get_method::GetMethodOutput, get_rest_api::GetRestApiOutput,
    get_stage::GetStageOutput, get_usage_plan::GetUsagePlanOutput,
    get_usage_plan_key::GetUsagePlanKeyOutput, get_vpc_link::GetVpcLinkOutput,
    update_api_key::UpdateApiKeyOutput, update_authorizer::UpdateAuthorizerOutput,
    update_base_path_mapping::UpdateBasePathMappingOutput, update_domain_name::UpdateDomainNameOutput,
    update_rest_api::UpdateRestApiOutput, update_stage::UpdateStageOutput,
    update_usage_plan::UpdateUsagePlanOutput, update_vpc_link::UpdateVpcLinkOutput,
};
use aws_sdk_apigateway::primitives::DateTime as SdkDateTime;
use aws_sdk_apigateway::types as sdk;
use chrono::{DateTime, Utc};

use super::types::{
    ApiKey, ApiResource, ApiStage, Authorizer, BasePathMapping, Deployment, DomainName, Integration,
    IntegrationResponse, Method, MethodResponse, MethodSetting, PatchOp, PatchOperation,
    QuotaSettings, RestApi, Stage, ThrottleSettings, UsagePlan, UsagePlanKey, VpcLink,
};

/// Base path API Gateway uses for the domain root.
pub const ROOT_BASE_PATH: &str = "(none)";

fn timestamp(value: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(ToString::to_string)
}

fn sorted<V: Clone>(map: Option<&HashMap<String, V>>) -> BTreeMap<String, V> {
    map.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

/// Translates an empty base path to the root marker used on the wire.
#[must_use]
pub fn base_path_param(base_path: &str) -> &str {
    if base_path.is_empty() {
        ROOT_BASE_PATH
    } else {
        base_path
    }
}

fn base_path_value(value: Option<&str>) -> String {
    match value {
        None | Some(ROOT_BASE_PATH) => String::new(),
        Some(path) => path.to_string(),
    }
}

/// Builds SDK patch operations.
pub fn patch_operations(patches: &[PatchOperation]) -> Vec<sdk::PatchOperation> {
    patches
        .iter()
        .map(|patch| {
            let op = match patch.op {
                PatchOp::Add => sdk::Op::Add,
                PatchOp::Remove => sdk::Op::Remove,
                PatchOp::Replace => sdk::Op::Replace,
            };
            sdk::PatchOperation::builder()
                .op(op)
                .path(patch.path.as_str())
                .set_value(patch.value.clone())
                .build()
        })
        .collect()
}

macro_rules! rest_api_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for RestApi {
            fn from(api: &$source) -> Self {
                Self {
                    id: api.id().unwrap_or_default().to_string(),
                    name: api.name().unwrap_or_default().to_string(),
                    description: owned(api.description()),
                    created_date: timestamp(api.created_date()),
                    version: owned(api.version()),
                    binary_media_types: api.binary_media_types().to_vec(),
                    minimum_compression_size: api.minimum_compression_size(),
                    api_key_source: api.api_key_source().map(|s| s.as_str().to_string()),
                    endpoint_types: api
                        .endpoint_configuration()
                        .map(|c| c.types().iter().map(|t| t.as_str().to_string()).collect())
                        .unwrap_or_default(),
                    policy: owned(api.policy()),
                }
            }
        }
    )+};
}

rest_api_from!(sdk::RestApi, GetRestApiOutput, CreateRestApiOutput, UpdateRestApiOutput);

macro_rules! resource_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for ApiResource {
            fn from(resource: &$source) -> Self {
                Self {
                    id: resource.id().unwrap_or_default().to_string(),
                    parent_id: owned(resource.parent_id()),
                    path_part: owned(resource.path_part()),
                    path: resource.path().unwrap_or_default().to_string(),
                }
            }
        }
    )+};
}

resource_from!(sdk::Resource, CreateResourceOutput);

impl From<&sdk::MethodResponse> for MethodResponse {
    fn from(response: &sdk::MethodResponse) -> Self {
        Self {
            status_code: response.status_code().unwrap_or_default().to_string(),
            response_parameters: sorted(response.response_parameters()),
            response_models: sorted(response.response_models()),
        }
    }
}

impl From<&sdk::IntegrationResponse> for IntegrationResponse {
    fn from(response: &sdk::IntegrationResponse) -> Self {
        Self {
            status_code: response.status_code().unwrap_or_default().to_string(),
            selection_pattern: owned(response.selection_pattern()),
            response_parameters: sorted(response.response_parameters()),
            response_templates: sorted(response.response_templates()),
            content_handling: response.content_handling().map(|c| c.as_str().to_string()),
        }
    }
}

impl From<&sdk::Integration> for Integration {
    fn from(integration: &sdk::Integration) -> Self {
        let mut integration_responses: Vec<IntegrationResponse> = integration
            .integration_responses()
            .map(|responses| responses.values().map(IntegrationResponse::from).collect())
            .unwrap_or_default();
        integration_responses.sort_by(|a, b| a.status_code.cmp(&b.status_code));

        Self {
            integration_type: integration.r#type().map(|t| t.as_str().to_string()),
            http_method: owned(integration.http_method()),
            uri: owned(integration.uri()),
            connection_type: integration.connection_type().map(|c| c.as_str().to_string()),
            connection_id: owned(integration.connection_id()),
            credentials: owned(integration.credentials()),
            request_parameters: sorted(integration.request_parameters()),
            request_templates: sorted(integration.request_templates()),
            passthrough_behavior: owned(integration.passthrough_behavior()),
            content_handling: integration.content_handling().map(|c| c.as_str().to_string()),
            cache_namespace: owned(integration.cache_namespace()),
            cache_key_parameters: integration.cache_key_parameters().to_vec(),
            timeout_in_millis: Some(integration.timeout_in_millis()),
            integration_responses,
        }
    }
}

impl From<&GetMethodOutput> for Method {
    fn from(method: &GetMethodOutput) -> Self {
        let mut method_responses: Vec<MethodResponse> = method
            .method_responses()
            .map(|responses| responses.values().map(MethodResponse::from).collect())
            .unwrap_or_default();
        method_responses.sort_by(|a, b| a.status_code.cmp(&b.status_code));

        Self {
            http_method: method.http_method().unwrap_or_default().to_string(),
            authorization_type: owned(method.authorization_type()),
            authorizer_id: owned(method.authorizer_id()),
            api_key_required: method.api_key_required().unwrap_or(false),
            operation_name: owned(method.operation_name()),
            request_validator_id: owned(method.request_validator_id()),
            request_parameters: sorted(method.request_parameters()),
            request_models: sorted(method.request_models()),
            method_responses,
            integration: method.method_integration().map(Integration::from),
        }
    }
}

macro_rules! deployment_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for Deployment {
            fn from(deployment: &$source) -> Self {
                Self {
                    id: deployment.id().unwrap_or_default().to_string(),
                    description: owned(deployment.description()),
                    created_date: timestamp(deployment.created_date()),
                }
            }
        }
    )+};
}

deployment_from!(CreateDeploymentOutput, GetDeploymentOutput);

impl From<&sdk::MethodSetting> for MethodSetting {
    fn from(setting: &sdk::MethodSetting) -> Self {
        Self {
            metrics_enabled: setting.metrics_enabled(),
            logging_level: owned(setting.logging_level()),
            data_trace_enabled: setting.data_trace_enabled(),
            throttling_burst_limit: setting.throttling_burst_limit(),
            throttling_rate_limit: setting.throttling_rate_limit(),
            caching_enabled: setting.caching_enabled(),
            cache_ttl_in_seconds: setting.cache_ttl_in_seconds(),
            cache_data_encrypted: setting.cache_data_encrypted(),
            require_authorization_for_cache_control: setting.require_authorization_for_cache_control(),
            unauthorized_cache_control_header_strategy: setting
                .unauthorized_cache_control_header_strategy()
                .map(|s| s.as_str().to_string()),
        }
    }
}

macro_rules! stage_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for Stage {
            fn from(stage: &$source) -> Self {
                Self {
                    stage_name: stage.stage_name().unwrap_or_default().to_string(),
                    deployment_id: owned(stage.deployment_id()),
                    description: owned(stage.description()),
                    cache_cluster_enabled: stage.cache_cluster_enabled(),
                    cache_cluster_size: stage.cache_cluster_size().map(|s| s.as_str().to_string()),
                    tracing_enabled: stage.tracing_enabled(),
                    variables: sorted(stage.variables()),
                    method_settings: stage
                        .method_settings()
                        .map(|settings| {
                            settings
                                .iter()
                                .map(|(key, setting)| (key.clone(), MethodSetting::from(setting)))
                                .collect()
                        })
                        .unwrap_or_default(),
                    created_date: timestamp(stage.created_date()),
                    last_updated_date: timestamp(stage.last_updated_date()),
                }
            }
        }
    )+};
}

stage_from!(GetStageOutput, UpdateStageOutput);

macro_rules! domain_name_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for DomainName {
            fn from(domain: &$source) -> Self {
                Self {
                    domain_name: domain.domain_name().unwrap_or_default().to_string(),
                    certificate_name: owned(domain.certificate_name()),
                    certificate_arn: owned(domain.certificate_arn()),
                    security_policy: domain.security_policy().map(|p| p.as_str().to_string()),
                    distribution_domain_name: owned(domain.distribution_domain_name()),
                    regional_domain_name: owned(domain.regional_domain_name()),
                    domain_name_status: domain.domain_name_status().map(|s| s.as_str().to_string()),
                    tags: sorted(domain.tags()),
                }
            }
        }
    )+};
}

domain_name_from!(GetDomainNameOutput, CreateDomainNameOutput, UpdateDomainNameOutput);

macro_rules! base_path_mapping_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for BasePathMapping {
            fn from(mapping: &$source) -> Self {
                Self {
                    base_path: base_path_value(mapping.base_path()),
                    rest_api_id: owned(mapping.rest_api_id()),
                    stage: owned(mapping.stage()),
                }
            }
        }
    )+};
}

base_path_mapping_from!(
    GetBasePathMappingOutput,
    CreateBasePathMappingOutput,
    UpdateBasePathMappingOutput,
);

fn throttle(settings: &sdk::ThrottleSettings) -> ThrottleSettings {
    ThrottleSettings {
        burst_limit: Some(settings.burst_limit()),
        rate_limit: Some(settings.rate_limit()),
    }
}

fn quota(settings: &sdk::QuotaSettings) -> QuotaSettings {
    QuotaSettings {
        limit: Some(settings.limit()),
        offset: Some(settings.offset()),
        period: settings.period().map(|p| p.as_str().to_string()),
    }
}

macro_rules! usage_plan_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for UsagePlan {
            fn from(plan: &$source) -> Self {
                Self {
                    id: plan.id().unwrap_or_default().to_string(),
                    name: plan.name().unwrap_or_default().to_string(),
                    description: owned(plan.description()),
                    api_stages: plan
                        .api_stages()
                        .iter()
                        .map(|s| ApiStage {
                            api_id: s.api_id().unwrap_or_default().to_string(),
                            stage: s.stage().unwrap_or_default().to_string(),
                        })
                        .collect(),
                    throttle: plan.throttle().map(throttle),
                    quota: plan.quota().map(quota),
                }
            }
        }
    )+};
}

usage_plan_from!(
    sdk::UsagePlan,
    GetUsagePlanOutput,
    CreateUsagePlanOutput,
    UpdateUsagePlanOutput,
);

macro_rules! usage_plan_key_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for UsagePlanKey {
            fn from(key: &$source) -> Self {
                Self {
                    id: key.id().unwrap_or_default().to_string(),
                    name: owned(key.name()),
                    key_type: owned(key.r#type()),
                    usage_plan_id: String::new(),
                }
            }
        }
    )+};
}

usage_plan_key_from!(GetUsagePlanKeyOutput, CreateUsagePlanKeyOutput);

macro_rules! api_key_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for ApiKey {
            fn from(key: &$source) -> Self {
                Self {
                    id: key.id().unwrap_or_default().to_string(),
                    name: owned(key.name()),
                    description: owned(key.description()),
                    value: owned(key.value()),
                    enabled: key.enabled(),
                    customer_id: owned(key.customer_id()),
                    created_date: timestamp(key.created_date()),
                    last_updated_date: timestamp(key.last_updated_date()),
                }
            }
        }
    )+};
}

api_key_from!(sdk::ApiKey, GetApiKeyOutput, CreateApiKeyOutput, UpdateApiKeyOutput);

macro_rules! authorizer_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for Authorizer {
            fn from(authorizer: &$source) -> Self {
                Self {
                    id: authorizer.id().unwrap_or_default().to_string(),
                    name: authorizer.name().unwrap_or_default().to_string(),
                    authorizer_type: authorizer.r#type().map(|t| t.as_str().to_string()),
                    provider_arns: authorizer.provider_arns().to_vec(),
                    auth_type: owned(authorizer.auth_type()),
                    authorizer_uri: owned(authorizer.authorizer_uri()),
                    authorizer_credentials: owned(authorizer.authorizer_credentials()),
                    identity_source: owned(authorizer.identity_source()),
                    identity_validation_expression: owned(authorizer.identity_validation_expression()),
                    authorizer_result_ttl_in_seconds: authorizer.authorizer_result_ttl_in_seconds(),
                }
            }
        }
    )+};
}

authorizer_from!(
    sdk::Authorizer,
    GetAuthorizerOutput,
    CreateAuthorizerOutput,
    UpdateAuthorizerOutput,
);

macro_rules! vpc_link_from {
    ($($source:ty),+ $(,)?) => {$(
        impl From<&$source> for VpcLink {
            fn from(link: &$source) -> Self {
                Self {
                    id: link.id().unwrap_or_default().to_string(),
                    name: link.name().unwrap_or_default().to_string(),
                    description: owned(link.description()),
                    target_arns: link.target_arns().to_vec(),
                    status: link.status().map(|s| s.as_str().to_string()),
                    status_message: owned(link.status_message()),
                }
            }
        }
    )+};
}

vpc_link_from!(sdk::VpcLink, GetVpcLinkOutput, CreateVpcLinkOutput, UpdateVpcLinkOutput);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_base_path_translation() {
        assert_eq!(base_path_param(""), "(none)");
        assert_eq!(base_path_param("v1"), "v1");
        assert_eq!(base_path_value(Some("(none)")), "");
        assert_eq!(base_path_value(None), "");
        assert_eq!(base_path_value(Some("v1")), "v1");
    }

    #[test]
    fn test_patch_operations_conversion() {
        let patches = vec![
            PatchOperation::replace("/quota/limit", "333"),
            PatchOperation::remove("/throttle"),
        ];
        let converted = patch_operations(&patches);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].op(), Some(&sdk::Op::Replace));
        assert_eq!(converted[0].path(), Some("/quota/limit"));
        assert_eq!(converted[0].value(), Some("333"));
        assert_eq!(converted[1].op(), Some(&sdk::Op::Remove));
        assert_eq!(converted[1].value(), None);
    }

    #[test]
    fn test_usage_plan_conversion() {
        let plan = sdk::UsagePlan::builder()
            .id("p1")
            .name("gold")
            .api_stages(sdk::ApiStage::builder().api_id("abcd1234").stage("live").build())
            .quota(
                sdk::QuotaSettings::builder()
                    .limit(100)
                    .period(sdk::QuotaPeriodType::Day)
                    .build(),
            )
            .build();

        let converted = UsagePlan::from(&plan);
        assert_eq!(converted.id, "p1");
        assert_eq!(converted.api_stages[0].key(), "abcd1234:live");
        let quota = converted.quota.expect("quota");
        assert_eq!(quota.limit, Some(100));
        assert_eq!(quota.period.as_deref(), Some("DAY"));
        assert!(converted.throttle.is_none());
    }
}
