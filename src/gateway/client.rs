//! The API Gateway management API as seen by the reconcilers.
//!
//! Every reconciler talks to the remote service through [`ApiGateway`]. The
//! trait is an opaque RPC surface: list, get, create, patch and delete per
//! resource type. Getters return `Ok(None)` when the resource does not exist.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

use super::types::{
    ApiKey, ApiResource, Authorizer, BasePathMapping, CreateApiKey, CreateAuthorizer,
    CreateDeployment, CreateDomainName, CreateRestApi, CreateUsagePlan, CreateVpcLink, Deployment,
    DomainName, Integration, IntegrationResponse, Method, MethodResponse, PatchOperation, RestApi,
    Stage, UsagePlan, UsagePlanKey, VpcLink,
};

/// Remote operations used by the reconcilers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Region the client is bound to.
    fn region(&self) -> String;

    // ------------------------------------------------------------------------
    // REST APIs
    // ------------------------------------------------------------------------

    /// Lists every REST API in the account and region.
    async fn get_rest_apis(&self) -> Result<Vec<RestApi>>;

    /// Fetches a REST API by id.
    async fn get_rest_api(&self, rest_api_id: &str) -> Result<Option<RestApi>>;

    /// Creates a REST API.
    async fn create_rest_api(&self, request: &CreateRestApi) -> Result<RestApi>;

    /// Patches a REST API.
    async fn update_rest_api(&self, rest_api_id: &str, patches: &[PatchOperation]) -> Result<RestApi>;

    /// Deletes a REST API.
    async fn delete_rest_api(&self, rest_api_id: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------------

    /// Lists every resource of a REST API.
    async fn get_resources(&self, rest_api_id: &str) -> Result<Vec<ApiResource>>;

    /// Creates a child resource.
    async fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<ApiResource>;

    /// Deletes a resource and everything below it.
    async fn delete_resource(&self, rest_api_id: &str, resource_id: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Methods, integrations and their responses
    // ------------------------------------------------------------------------

    /// Fetches a method with its integration and responses.
    async fn get_method(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<Option<Method>>;

    /// Creates a method. Responses and integration on `method` are ignored.
    async fn put_method(&self, rest_api_id: &str, resource_id: &str, method: &Method) -> Result<()>;

    /// Patches a method.
    async fn update_method(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patches: &[PatchOperation],
    ) -> Result<()>;

    /// Deletes a method.
    async fn delete_method(&self, rest_api_id: &str, resource_id: &str, http_method: &str) -> Result<()>;

    /// Creates or overwrites the integration of a method.
    async fn put_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        integration: &Integration,
    ) -> Result<()>;

    /// Patches the integration of a method.
    async fn update_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patches: &[PatchOperation],
    ) -> Result<()>;

    /// Creates a method response.
    async fn put_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &MethodResponse,
    ) -> Result<()>;

    /// Patches a method response.
    async fn update_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
        patches: &[PatchOperation],
    ) -> Result<()>;

    /// Deletes a method response.
    async fn delete_method_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
    ) -> Result<()>;

    /// Creates an integration response.
    async fn put_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &IntegrationResponse,
    ) -> Result<()>;

    /// Patches an integration response.
    async fn update_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
        patches: &[PatchOperation],
    ) -> Result<()>;

    /// Deletes an integration response.
    async fn delete_integration_response(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        status_code: &str,
    ) -> Result<()>;

    // ------------------------------------------------------------------------
    // Deployments and stages
    // ------------------------------------------------------------------------

    /// Creates a deployment.
    async fn create_deployment(&self, rest_api_id: &str, request: &CreateDeployment) -> Result<Deployment>;

    /// Fetches a deployment.
    async fn get_deployment(&self, rest_api_id: &str, deployment_id: &str) -> Result<Option<Deployment>>;

    /// Deletes a deployment.
    async fn delete_deployment(&self, rest_api_id: &str, deployment_id: &str) -> Result<()>;

    /// Fetches a stage.
    async fn get_stage(&self, rest_api_id: &str, stage_name: &str) -> Result<Option<Stage>>;

    /// Patches a stage.
    async fn update_stage(
        &self,
        rest_api_id: &str,
        stage_name: &str,
        patches: &[PatchOperation],
    ) -> Result<Stage>;

    /// Deletes a stage.
    async fn delete_stage(&self, rest_api_id: &str, stage_name: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Custom domains and base path mappings
    // ------------------------------------------------------------------------

    /// Fetches a custom domain name.
    async fn get_domain_name(&self, domain_name: &str) -> Result<Option<DomainName>>;

    /// Creates a custom domain name.
    async fn create_domain_name(&self, request: &CreateDomainName) -> Result<DomainName>;

    /// Patches a custom domain name.
    async fn update_domain_name(&self, domain_name: &str, patches: &[PatchOperation]) -> Result<DomainName>;

    /// Deletes a custom domain name.
    async fn delete_domain_name(&self, domain_name: &str) -> Result<()>;

    /// Adds or overwrites tags on a resource ARN.
    async fn tag_resource(&self, resource_arn: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    /// Removes tags from a resource ARN.
    async fn untag_resource(&self, resource_arn: &str, tag_keys: &[String]) -> Result<()>;

    /// Fetches a base path mapping. An empty base path addresses the domain root.
    async fn get_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
    ) -> Result<Option<BasePathMapping>>;

    /// Creates a base path mapping.
    async fn create_base_path_mapping(
        &self,
        domain_name: &str,
        mapping: &BasePathMapping,
    ) -> Result<BasePathMapping>;

    /// Patches a base path mapping.
    async fn update_base_path_mapping(
        &self,
        domain_name: &str,
        base_path: &str,
        patches: &[PatchOperation],
    ) -> Result<BasePathMapping>;

    /// Deletes a base path mapping.
    async fn delete_base_path_mapping(&self, domain_name: &str, base_path: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Usage plans, usage plan keys and API keys
    // ------------------------------------------------------------------------

    /// Lists every usage plan.
    async fn get_usage_plans(&self) -> Result<Vec<UsagePlan>>;

    /// Fetches a usage plan by id.
    async fn get_usage_plan(&self, usage_plan_id: &str) -> Result<Option<UsagePlan>>;

    /// Creates a usage plan.
    async fn create_usage_plan(&self, request: &CreateUsagePlan) -> Result<UsagePlan>;

    /// Patches a usage plan.
    async fn update_usage_plan(&self, usage_plan_id: &str, patches: &[PatchOperation]) -> Result<UsagePlan>;

    /// Deletes a usage plan.
    async fn delete_usage_plan(&self, usage_plan_id: &str) -> Result<()>;

    /// Fetches the association of an API key with a usage plan.
    async fn get_usage_plan_key(&self, usage_plan_id: &str, key_id: &str) -> Result<Option<UsagePlanKey>>;

    /// Associates an API key with a usage plan.
    async fn create_usage_plan_key(
        &self,
        usage_plan_id: &str,
        key_id: &str,
        key_type: &str,
    ) -> Result<UsagePlanKey>;

    /// Removes an API key from a usage plan.
    async fn delete_usage_plan_key(&self, usage_plan_id: &str, key_id: &str) -> Result<()>;

    /// Lists API keys whose name starts with `name_query`, values included.
    async fn get_api_keys(&self, name_query: &str) -> Result<Vec<ApiKey>>;

    /// Fetches an API key by id, value included.
    async fn get_api_key(&self, api_key_id: &str) -> Result<Option<ApiKey>>;

    /// Creates an API key.
    async fn create_api_key(&self, request: &CreateApiKey) -> Result<ApiKey>;

    /// Patches an API key.
    async fn update_api_key(&self, api_key_id: &str, patches: &[PatchOperation]) -> Result<ApiKey>;

    /// Deletes an API key.
    async fn delete_api_key(&self, api_key_id: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Authorizers
    // ------------------------------------------------------------------------

    /// Lists the authorizers of a REST API.
    async fn get_authorizers(&self, rest_api_id: &str) -> Result<Vec<Authorizer>>;

    /// Fetches an authorizer by id.
    async fn get_authorizer(&self, rest_api_id: &str, authorizer_id: &str) -> Result<Option<Authorizer>>;

    /// Creates an authorizer.
    async fn create_authorizer(&self, rest_api_id: &str, request: &CreateAuthorizer) -> Result<Authorizer>;

    /// Patches an authorizer.
    async fn update_authorizer(
        &self,
        rest_api_id: &str,
        authorizer_id: &str,
        patches: &[PatchOperation],
    ) -> Result<Authorizer>;

    /// Deletes an authorizer.
    async fn delete_authorizer(&self, rest_api_id: &str, authorizer_id: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // VPC links
    // ------------------------------------------------------------------------

    /// Lists every VPC link.
    async fn get_vpc_links(&self) -> Result<Vec<VpcLink>>;

    /// Fetches a VPC link by id.
    async fn get_vpc_link(&self, vpc_link_id: &str) -> Result<Option<VpcLink>>;

    /// Creates a VPC link.
    async fn create_vpc_link(&self, request: &CreateVpcLink) -> Result<VpcLink>;

    /// Patches a VPC link.
    async fn update_vpc_link(&self, vpc_link_id: &str, patches: &[PatchOperation]) -> Result<VpcLink>;

    /// Deletes a VPC link.
    async fn delete_vpc_link(&self, vpc_link_id: &str) -> Result<()>;
}
