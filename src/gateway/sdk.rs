//! [`ApiGateway`] backed by the AWS SDK.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_apigateway::Client;
use aws_sdk_apigateway::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_apigateway::types as sdk;
use tracing::debug;

use crate::config::AwsSettings;
use crate::error::{ApigwError, ConfigError, GatewayError, Result};

use super::client::ApiGateway;
use super::convert::{base_path_param, patch_operations};
use super::types::{
    ApiKey, ApiResource, Authorizer, BasePathMapping, CreateApiKey, CreateAuthorizer,
    CreateDeployment, CreateDomainName, CreateRestApi, CreateUsagePlan, CreateVpcLink, Deployment,
    DomainName, Integration, IntegrationResponse, Method, MethodResponse, PatchOperation, RestApi,
    Stage, UsagePlan, UsagePlanKey, VpcLink,
};

/// Page size for list operations.
const PAGE_SIZE: i32 = 500;

/// Error code API Gateway returns for missing resources.
const NOT_FOUND: &str = "NotFoundException";

/// Error code API Gateway returns when throttling.
const TOO_MANY_REQUESTS: &str = "TooManyRequestsException";

/// Maps an SDK error to a gateway error, keeping the provider's message.
fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ApigwError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let error = match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            GatewayError::network(operation, DisplayErrorContext(&err).to_string())
        }
        _ => {
            let message = err
                .message()
                .map_or_else(|| DisplayErrorContext(&err).to_string(), ToString::to_string);
            match err.code() {
                Some(TOO_MANY_REQUESTS) => GatewayError::Throttled { operation, message },
                code => GatewayError::api(operation, code.unwrap_or("Unknown"), message),
            }
        }
    };
    error.into()
}

/// Turns a `NotFoundException` into `None`.
fn optional<T, E, R>(operation: &'static str, result: std::result::Result<T, SdkError<E, R>>) -> Result<Option<T>>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match result {
        Ok(output) => Ok(Some(output)),
        Err(err) if err.code() == Some(NOT_FOUND) => Ok(None),
        Err(err) => Err(sdk_error(operation, err)),
    }
}

fn unordered<V>(map: &BTreeMap<String, V>) -> Option<HashMap<String, V>>
where
    V: Clone,
{
    if map.is_empty() {
        None
    } else {
        Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values.to_vec()) }
}

fn throttle_settings(throttle: &super::types::ThrottleSettings) -> sdk::ThrottleSettings {
    sdk::ThrottleSettings::builder()
        .set_burst_limit(throttle.burst_limit)
        .set_rate_limit(throttle.rate_limit)
        .build()
}

fn quota_settings(quota: &super::types::QuotaSettings) -> sdk::QuotaSettings {
    sdk::QuotaSettings::builder()
        .set_limit(quota.limit)
        .set_offset(quota.offset)
        .set_period(quota.period.as_deref().map(sdk::QuotaPeriodType::from))
        .build()
}

/// API Gateway client built on `aws-sdk-apigateway`.
#[derive(Debug, Clone)]
pub struct SdkGateway {
    /// SDK client.
    client: Client,
    /// Resolved region.
    region: String,
}

impl SdkGateway {
    /// Resolves credentials and region and builds a client.
    ///
    /// Settings left unset fall back to the standard AWS environment and
    /// profile resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if no region can be resolved.
    pub async fn connect(settings: &AwsSettings) -> Result<Self> {
        let mut loader = aws_config::from_env();
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(ToString::to_string)
            .ok_or(ConfigError::MissingRegion)?;
        debug!("API Gateway client bound to {}", region);

        Ok(Self {
            client: Client::new(&config),
            region,
        })
    }

    /// Creates a gateway from an existing client.
    #[must_use]
    pub fn with_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

#[async_trait]
impl ApiGateway for SdkGateway {
    fn region(&self) -> String {
        self.region.clone()
    }

    // ------------------------------------------------------------------------
    // REST APIs
    // ------------------------------------------------------------------------

    async fn get_rest_apis(&self) -> Result<Vec<RestApi>> {
        let items = self
            .client
            .get_rest_apis()
            .limit(PAGE_SIZE)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| sdk_error("GetRestApis", e))?;
        Ok(items.iter().map(RestApi::from).collect())
    }

    async fn get_rest_api(&self, rest_api_id: &str) -> Result<Option<RestApi>> {
        let result = self.client.get_rest_api().rest_api_id(rest_api_id).send().await;
        Ok(optional("GetRestApi", result)?.as_ref().map(RestApi::from))
    }

    async fn create_rest_api(&self, request: &CreateRestApi) -> Result<RestApi> {
        let endpoint_configuration = non_empty(&request.endpoint_types).map(|types| {
            sdk::EndpointConfiguration::builder()
                .set_types(Some(
                    types.iter().map(|t| sdk::EndpointType::from(t.as_str())).collect(),
                ))
                .build()
        });

        let output = self
            .client
            .create_rest_api()
            .name(&request.name)
            .set_description(request.description.clone())
            .set_version(request.version.clone())
            .set_clone_from(request.clone_from.clone())
            .set_binary_media_types(non_empty(&request.binary_media_types))
            .set_minimum_compression_size(request.minimum_compression_size)
            .set_api_key_source(request.api_key_source.as_deref().map(sdk::ApiKeySourceType::from))
            .set_endpoint_configuration(endpoint_configuration)
            .set_policy(request.policy.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateRestApi", e))?;
        Ok(RestApi::from(&output))
    }

    async fn update_rest_api(&self, rest_api_id: &str, patches: &[PatchOperation]) -> Result<RestApi> {
        let output = self
            .client
            .update_rest_api()
            .rest_api_id(rest_api_id)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateRestApi", e))?;
        Ok(RestApi::from(&output))
    }

    async fn delete_rest_api(&self, rest_api_id: &str) -> Result<()> {
        self.client
            .delete_rest_api()
            .rest_api_id(rest_api_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteRestApi", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------------

    async fn get_resources(&self, rest_api_id: &str) -> Result<Vec<ApiResource>> {
        let items = self
            .client
            .get_resources()
            .rest_api_id(rest_api_id)
            .limit(PAGE_SIZE)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| sdk_error("GetResources", e))?;
        Ok(items.iter().map(ApiResource::from).collect())
    }

    async fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<ApiResource> {
        let output = self
            .client
            .create_resource()
            .rest_api_id(rest_api_id)
            .parent_id(parent_id)
            .path_part(path_part)
            .send()
            .await
            .map_err(|e| sdk_error("CreateResource", e))?;
        Ok(ApiResource::from(&output))
    }

    async fn delete_resource(&self, rest_api_id: &str, resource_id: &str) -> Result<()> {
        self.client
            .delete_resource()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteResource", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Methods, integrations and their responses
    // ------------------------------------------------------------------------

    async fn get_method(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<Option<Method>> {
        let result = self
            .client
            .get_method()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .send()
            .await;
        Ok(optional("GetMethod", result)?.as_ref().map(Method::from))
    }

    async fn put_method(&self, rest_api_id: &str, resource_id: &str, method: &Method) -> Result<()> {
        self.client
            .put_method()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(&method.http_method)
            .authorization_type(method.authorization_type.as_deref().unwrap_or("NONE"))
            .set_authorizer_id(method.authorizer_id.clone())
            .api_key_required(method.api_key_required)
            .set_operation_name(method.operation_name.clone())
            .set_request_validator_id(method.request_validator_id.clone())
            .set_request_parameters(unordered(&method.request_parameters))
            .set_request_models(unordered(&method.request_models))
            .send()
            .await
            .map_err(|e| sdk_error("PutMethod", e))?;
        Ok(())
    }

    async fn update_method(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patches: &[PatchOperation],
    ) -> Result<()> {
        self.client
            .update_method()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateMethod", e))?;
        Ok(())
    }

    async fn delete_method(&self, rest_api_id: &str, resource_id: &str, http_method: &str) -> Result<()> {
        self.client
            .delete_method()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteMethod", e))?;
        Ok(())
    }

    async fn put_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        integration: &Integration,
    ) -> Result<()> {
        self.client
            .put_integration()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .set_type(integration.integration_type.as_deref().map(sdk::IntegrationType::from))
            .set_integration_http_method(integration.http_method.clone())
            .set_uri(integration.uri.clone())
            .set_connection_type(integration.connection_type.as_deref().map(sdk::ConnectionType::from))
            .set_connection_id(integration.connection_id.clone())
            .set_credentials(integration.credentials.clone())
            .set_request_parameters(unordered(&integration.request_parameters))
            .set_request_templates(unordered(&integration.request_templates))
            .set_passthrough_behavior(integration.passthrough_behavior.clone())
            .set_content_handling(
                integration
                    .content_handling
                    .as_deref()
                    .map(sdk::ContentHandlingStrategy::from),
            )
            .set_cache_namespace(integration.cache_namespace.clone())
            .set_cache_key_parameters(non_empty(&integration.cache_key_parameters))
            .set_timeout_in_millis(integration.timeout_in_millis)
            .send()
            .await
            .map_err(|e| sdk_error("PutIntegration", e))?;
        Ok(())
    }

    async fn update_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patches: &[PatchOperation],
    ) -> Result<()> {
        self.client
            .update_integration()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateIntegration", e))?;
        Ok(())
    }

    async fn put_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &MethodResponse,
    ) -> Result<()> {
        self.client
            .put_method_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(&response.status_code)
            .set_response_parameters(unordered(&response.response_parameters))
            .set_response_models(unordered(&response.response_models))
            .send()
            .await
            .map_err(|e| sdk_error("PutMethodResponse", e))?;
        Ok(())
    }

    async fn update_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
        patches: &[PatchOperation],
    ) -> Result<()> {
        self.client
            .update_method_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(status_code)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateMethodResponse", e))?;
        Ok(())
    }

    async fn delete_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
    ) -> Result<()> {
        self.client
            .delete_method_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(status_code)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteMethodResponse", e))?;
        Ok(())
    }

    async fn put_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &IntegrationResponse,
    ) -> Result<()> {
        self.client
            .put_integration_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(&response.status_code)
            .set_selection_pattern(response.selection_pattern.clone())
            .set_response_parameters(unordered(&response.response_parameters))
            .set_response_templates(unordered(&response.response_templates))
            .set_content_handling(
                response
                    .content_handling
                    .as_deref()
                    .map(sdk::ContentHandlingStrategy::from),
            )
            .send()
            .await
            .map_err(|e| sdk_error("PutIntegrationResponse", e))?;
        Ok(())
    }

    async fn update_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
        patches: &[PatchOperation],
    ) -> Result<()> {
        self.client
            .update_integration_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(status_code)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateIntegrationResponse", e))?;
        Ok(())
    }

    async fn delete_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
    ) -> Result<()> {
        self.client
            .delete_integration_response()
            .rest_api_id(rest_api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .status_code(status_code)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteIntegrationResponse", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Deployments and stages
    // ------------------------------------------------------------------------

    async fn create_deployment(&self, rest_api_id: &str, request: &CreateDeployment) -> Result<Deployment> {
        let output = self
            .client
            .create_deployment()
            .rest_api_id(rest_api_id)
            .set_stage_name(request.stage_name.clone())
            .set_stage_description(request.stage_description.clone())
            .set_description(request.description.clone())
            .set_cache_cluster_enabled(request.cache_cluster_enabled)
            .set_cache_cluster_size(request.cache_cluster_size.as_deref().map(sdk::CacheClusterSize::from))
            .set_variables(unordered(&request.variables))
            .set_tracing_enabled(request.tracing_enabled)
            .send()
            .await
            .map_err(|e| sdk_error("CreateDeployment", e))?;
        Ok(Deployment::from(&output))
    }

    async fn get_deployment(&self, rest_api_id: &str, deployment_id: &str) -> Result<Option<Deployment>> {
        let result = self
            .client
            .get_deployment()
            .rest_api_id(rest_api_id)
            .deployment_id(deployment_id)
            .send()
            .await;
        Ok(optional("GetDeployment", result)?.as_ref().map(Deployment::from))
    }

    async fn delete_deployment(&self, rest_api_id: &str, deployment_id: &str) -> Result<()> {
        self.client
            .delete_deployment()
            .rest_api_id(rest_api_id)
            .deployment_id(deployment_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteDeployment", e))?;
        Ok(())
    }

    async fn get_stage(&self, rest_api_id: &str, stage_name: &str) -> Result<Option<Stage>> {
        let result = self
            .client
            .get_stage()
            .rest_api_id(rest_api_id)
            .stage_name(stage_name)
            .send()
            .await;
        Ok(optional("GetStage", result)?.as_ref().map(Stage::from))
    }

    async fn update_stage(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        patches: &[PatchOperation],
    ) -> Result<Stage> {
        let output = self
            .client
            .update_stage()
            .rest_api_id(rest_api_id)
            .stage_name(stage_name)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateStage", e))?;
        Ok(Stage::from(&output))
    }

    async fn delete_stage(&self, rest_api_id: &str, stage_name: &str) -> Result<()> {
        self.client
            .delete_stage()
            .rest_api_id(rest_api_id)
            .stage_name(stage_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteStage", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Custom domains and base path mappings
    // ------------------------------------------------------------------------

    async fn get_domain_name(&self, domain_name: &str) -> Result<Option<DomainName>> {
        let result = self.client.get_domain_name().domain_name(domain_name).send().await;
        Ok(optional("GetDomainName", result)?.as_ref().map(DomainName::from))
    }

    async fn create_domain_name(&self, request: &CreateDomainName) -> Result<DomainName> {
        let output = self
            .client
            .create_domain_name()
            .domain_name(&request.domain_name)
            .set_certificate_arn(request.certificate_arn.clone())
            .set_certificate_name(request.certificate_name.clone())
            .set_security_policy(request.security_policy.as_deref().map(sdk::SecurityPolicy::from))
            .set_tags(unordered(&request.tags))
            .send()
            .await
            .map_err(|e| sdk_error("CreateDomainName", e))?;
        Ok(DomainName::from(&output))
    }

    async fn update_domain_name(&self, domain_name: &str, patches: &[PatchOperation]) -> Result<DomainName> {
        let output = self
            .client
            .update_domain_name()
            .domain_name(domain_name)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateDomainName", e))?;
        Ok(DomainName::from(&output))
    }

    async fn delete_domain_name(&self, domain_name: &str) -> Result<()> {
        self.client
            .delete_domain_name()
            .domain_name(domain_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteDomainName", e))?;
        Ok(())
    }

    async fn tag_resource(&self, resource_arn: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        self.client
            .tag_resource()
            .resource_arn(resource_arn)
            .set_tags(unordered(tags))
            .send()
            .await
            .map_err(|e| sdk_error("TagResource", e))?;
        Ok(())
    }

    async fn untag_resource(&self, resource_arn: &str, tag_keys: &[String]) -> Result<()> {
        self.client
            .untag_resource()
            .resource_arn(resource_arn)
            .set_tag_keys(Some(tag_keys.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error("UntagResource", e))?;
        Ok(())
    }

    async fn get_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
    ) -> Result<Option<BasePathMapping>> {
        let result = self
            .client
            .get_base_path_mapping()
            .domain_name(domain_name)
            .base_path(base_path_param(base_path))
            .send()
            .await;
        Ok(optional("GetBasePathMapping", result)?
            .as_ref()
            .map(BasePathMapping::from))
    }

    async fn create_base_path_mapping(
        &self,
        domain_name: &str,
        mapping: &BasePathMapping,
    ) -> Result<BasePathMapping> {
        let base_path = if mapping.base_path.is_empty() {
            None
        } else {
            Some(mapping.base_path.clone())
        };
        let output = self
            .client
            .create_base_path_mapping()
            .domain_name(domain_name)
            .set_base_path(base_path)
            .set_rest_api_id(mapping.rest_api_id.clone())
            .set_stage(mapping.stage.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateBasePathMapping", e))?;
        Ok(BasePathMapping::from(&output))
    }

    async fn update_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
        patches: &[PatchOperation],
    ) -> Result<BasePathMapping> {
        let output = self
            .client
            .update_base_path_mapping()
            .domain_name(domain_name)
            .base_path(base_path_param(base_path))
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateBasePathMapping", e))?;
        Ok(BasePathMapping::from(&output))
    }

    async fn delete_base_path_mapping(&self, domain_name: &str, base_path: &str) -> Result<()> {
        self.client
            .delete_base_path_mapping()
            .domain_name(domain_name)
            .base_path(base_path_param(base_path))
            .send()
            .await
            .map_err(|e| sdk_error("DeleteBasePathMapping", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Usage plans, usage plan keys and API keys
    // ------------------------------------------------------------------------

    async fn get_usage_plans(&self) -> Result<Vec<UsagePlan>> {
        let items = self
            .client
            .get_usage_plans()
            .limit(PAGE_SIZE)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| sdk_error("GetUsagePlans", e))?;
        Ok(items.iter().map(UsagePlan::from).collect())
    }

    async fn get_usage_plan(&self, usage_plan_id: &str) -> Result<Option<UsagePlan>> {
        let result = self.client.get_usage_plan().usage_plan_id(usage_plan_id).send().await;
        Ok(optional("GetUsagePlan", result)?.as_ref().map(UsagePlan::from))
    }

    async fn create_usage_plan(&self, request: &CreateUsagePlan) -> Result<UsagePlan> {
        let api_stages: Vec<sdk::ApiStage> = request
            .api_stages
            .iter()
            .map(|s| sdk::ApiStage::builder().api_id(&s.api_id).stage(&s.stage).build())
            .collect();

        let output = self
            .client
            .create_usage_plan()
            .name(&request.name)
            .set_description(request.description.clone())
            .set_api_stages(if api_stages.is_empty() { None } else { Some(api_stages) })
            .set_throttle(request.throttle.as_ref().map(throttle_settings))
            .set_quota(request.quota.as_ref().map(quota_settings))
            .send()
            .await
            .map_err(|e| sdk_error("CreateUsagePlan", e))?;
        Ok(UsagePlan::from(&output))
    }

    async fn update_usage_plan(&self, usage_plan_id: &str, patches: &[PatchOperation]) -> Result<UsagePlan> {
        let output = self
            .client
            .update_usage_plan()
            .usage_plan_id(usage_plan_id)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateUsagePlan", e))?;
        Ok(UsagePlan::from(&output))
    }

    async fn delete_usage_plan(&self, usage_plan_id: &str) -> Result<()> {
        self.client
            .delete_usage_plan()
            .usage_plan_id(usage_plan_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteUsagePlan", e))?;
        Ok(())
    }

    async fn get_usage_plan_key(&self, usage_plan_id: &str, key_id: &str) -> Result<Option<UsagePlanKey>> {
        let result = self
            .client
            .get_usage_plan_key()
            .usage_plan_id(usage_plan_id)
            .key_id(key_id)
            .send()
            .await;
        Ok(optional("GetUsagePlanKey", result)?.as_ref().map(|output| UsagePlanKey {
            usage_plan_id: usage_plan_id.to_string(),
            ..UsagePlanKey::from(output)
        }))
    }

    async fn create_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
        key_type: &str,
    ) -> Result<UsagePlanKey> {
        let output = self
            .client
            .create_usage_plan_key()
            .usage_plan_id(usage_plan_id)
            .key_id(key_id)
            .key_type(key_type)
            .send()
            .await
            .map_err(|e| sdk_error("CreateUsagePlanKey", e))?;
        Ok(UsagePlanKey {
            usage_plan_id: usage_plan_id.to_string(),
            ..UsagePlanKey::from(&output)
        })
    }

    async fn delete_usage_plan_key(&self, usage_plan_id: &str, key_id: &str) -> Result<()> {
        self.client
            .delete_usage_plan_key()
            .usage_plan_id(usage_plan_id)
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteUsagePlanKey", e))?;
        Ok(())
    }

    async fn get_api_keys(&self, name_query: &str) -> Result<Vec<ApiKey>> {
        let items = self
            .client
            .get_api_keys()
            .name_query(name_query)
            .include_values(true)
            .limit(PAGE_SIZE)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| sdk_error("GetApiKeys", e))?;
        Ok(items.iter().map(ApiKey::from).collect())
    }

    async fn get_api_key(&self, api_key_id: &str) -> Result<Option<ApiKey>> {
        let result = self
            .client
            .get_api_key()
            .api_key(api_key_id)
            .include_value(true)
            .send()
            .await;
        Ok(optional("GetApiKey", result)?.as_ref().map(ApiKey::from))
    }

    async fn create_api_key(&self, request: &CreateApiKey) -> Result<ApiKey> {
        let output = self
            .client
            .create_api_key()
            .set_name(request.name.clone())
            .set_description(request.description.clone())
            .set_value(request.value.clone())
            .enabled(request.enabled)
            .generate_distinct_id(request.generate_distinct_id)
            .set_customer_id(request.customer_id.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateApiKey", e))?;
        Ok(ApiKey::from(&output))
    }

    async fn update_api_key(&self, api_key_id: &str, patches: &[PatchOperation]) -> Result<ApiKey> {
        let output = self
            .client
            .update_api_key()
            .api_key(api_key_id)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateApiKey", e))?;
        Ok(ApiKey::from(&output))
    }

    async fn delete_api_key(&self, api_key_id: &str) -> Result<()> {
        self.client
            .delete_api_key()
            .api_key(api_key_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteApiKey", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Authorizers
    // ------------------------------------------------------------------------

    // GetAuthorizers has no generated paginator.
    async fn get_authorizers(&self, rest_api_id: &str) -> Result<Vec<Authorizer>> {
        let mut authorizers = Vec::new();
        let mut position = None;
        loop {
            let page = self
                .client
                .get_authorizers()
                .rest_api_id(rest_api_id)
                .limit(PAGE_SIZE)
                .set_position(position.take())
                .send()
                .await
                .map_err(|e| sdk_error("GetAuthorizers", e))?;
            authorizers.extend(page.items().iter().map(Authorizer::from));
            match page.position() {
                Some(next) => position = Some(next.to_string()),
                None => break,
            }
        }
        Ok(authorizers)
    }

    async fn get_authorizer(&self, rest_api_id: &str, authorizer_id: &str) -> Result<Option<Authorizer>> {
        let result = self
            .client
            .get_authorizer()
            .rest_api_id(rest_api_id)
            .authorizer_id(authorizer_id)
            .send()
            .await;
        Ok(optional("GetAuthorizer", result)?.as_ref().map(Authorizer::from))
    }

    async fn create_authorizer(&self, rest_api_id: &str, request: &CreateAuthorizer) -> Result<Authorizer> {
        let output = self
            .client
            .create_authorizer()
            .rest_api_id(rest_api_id)
            .name(&request.name)
            .r#type(sdk::AuthorizerType::from(request.authorizer_type.as_str()))
            .set_provider_arns(non_empty(&request.provider_arns))
            .set_auth_type(request.auth_type.clone())
            .set_authorizer_uri(request.authorizer_uri.clone())
            .set_authorizer_credentials(request.authorizer_credentials.clone())
            .set_identity_source(request.identity_source.clone())
            .set_identity_validation_expression(request.identity_validation_expression.clone())
            .set_authorizer_result_ttl_in_seconds(request.authorizer_result_ttl_in_seconds)
            .send()
            .await
            .map_err(|e| sdk_error("CreateAuthorizer", e))?;
        Ok(Authorizer::from(&output))
    }

    async fn update_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
        patches: &[PatchOperation],
    ) -> Result<Authorizer> {
        let output = self
            .client
            .update_authorizer()
            .rest_api_id(rest_api_id)
            .authorizer_id(authorizer_id)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateAuthorizer", e))?;
        Ok(Authorizer::from(&output))
    }

    async fn delete_authorizer(&self, rest_api_id: &str, authorizer_id: &str) -> Result<()> {
        self.client
            .delete_authorizer()
            .rest_api_id(rest_api_id)
            .authorizer_id(authorizer_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteAuthorizer", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // VPC links
    // ------------------------------------------------------------------------

    async fn get_vpc_links(&self) -> Result<Vec<VpcLink>> {
        let items = self
            .client
            .get_vpc_links()
            .limit(PAGE_SIZE)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| sdk_error("GetVpcLinks", e))?;
        Ok(items.iter().map(VpcLink::from).collect())
    }

    async fn get_vpc_link(&self, vpc_link_id: &str) -> Result<Option<VpcLink>> {
        let result = self.client.get_vpc_link().vpc_link_id(vpc_link_id).send().await;
        Ok(optional("GetVpcLink", result)?.as_ref().map(VpcLink::from))
    }

    async fn create_vpc_link(&self, request: &CreateVpcLink) -> Result<VpcLink> {
        let output = self
            .client
            .create_vpc_link()
            .name(&request.name)
            .set_description(request.description.clone())
            .set_target_arns(Some(request.target_arns.clone()))
            .send()
            .await
            .map_err(|e| sdk_error("CreateVpcLink", e))?;
        Ok(VpcLink::from(&output))
    }

    async fn update_vpc_link(&self, vpc_link_id: &str, patches: &[PatchOperation]) -> Result<VpcLink> {
        let output = self
            .client
            .update_vpc_link()
            .vpc_link_id(vpc_link_id)
            .set_patch_operations(Some(patch_operations(patches)))
            .send()
            .await
            .map_err(|e| sdk_error("UpdateVpcLink", e))?;
        Ok(VpcLink::from(&output))
    }

    async fn delete_vpc_link(&self, vpc_link_id: &str) -> Result<()> {
        self.client
            .delete_vpc_link()
            .vpc_link_id(vpc_link_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteVpcLink", e))?;
        Ok(())
    }
}
