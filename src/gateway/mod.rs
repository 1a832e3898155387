//! API Gateway management API integration.
//!
//! This module provides the [`ApiGateway`] seam the reconcilers call, its
//! AWS SDK implementation, and the typed resource shapes both sides share.

mod client;
mod convert;
mod sdk;
mod types;

pub use client::ApiGateway;
#[cfg(test)]
pub use client::MockApiGateway;
pub use convert::ROOT_BASE_PATH;
pub use sdk::SdkGateway;
pub use types::{
    ApiKey, ApiResource, ApiStage, Authorizer, BasePathMapping, CreateApiKey, CreateAuthorizer,
    CreateDeployment, CreateDomainName, CreateRestApi, CreateUsagePlan, CreateVpcLink, Deployment,
    DomainName, Integration, IntegrationResponse, Method, MethodResponse, MethodSetting, PatchOp,
    PatchOperation, QuotaSettings, RestApi, Stage, ThrottleSettings, UsagePlan, UsagePlanKey,
    VpcLink,
};
