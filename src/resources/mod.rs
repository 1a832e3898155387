//! API Gateway resource types.
//!
//! Each submodule defines a descriptor (`*Spec`), deserialized from a
//! manifest task, and a [`ResourceKind`](crate::reconciler::ResourceKind)
//! implementation: a field table plus the gateway calls for create, update
//! and delete.

pub mod api_key;
pub mod authorizer;
pub mod base_path_mapping;
pub mod deployment;
pub mod domain_name;
pub mod method;
pub mod resource;
pub mod rest_api;
pub mod stage;
pub mod usage_plan;
pub mod usage_plan_key;
pub mod vpc_link;

pub use api_key::{ApiKeyKind, ApiKeySpec};
pub use authorizer::{AuthorizerKind, AuthorizerSpec};
pub use base_path_mapping::{BasePathMappingKind, BasePathMappingSpec};
pub use deployment::{DeploymentKind, DeploymentSpec};
pub use domain_name::{DomainNameKind, DomainNameSpec};
pub use method::{IntegrationResponseSpec, IntegrationSpec, MethodKind, MethodResponseSpec, MethodSpec};
pub use resource::{ApiResourceKind, ApiResourceSpec};
pub use rest_api::{RestApiKind, RestApiSpec};
pub use stage::{MethodSettingSpec, StageKind, StageSpec};
pub use usage_plan::{ApiStageSpec, UsagePlanKind, UsagePlanSpec};
pub use usage_plan_key::{UsagePlanKeyKind, UsagePlanKeySpec};
pub use vpc_link::{VpcLinkKind, VpcLinkSpec, list_vpc_links};

use crate::error::{ReconcileError, Result};
use crate::gateway::{ApiGateway, ApiResource};
use crate::reconciler::{DesiredState, ResourceKind, single_match};

/// Serde default for purge flags that are on unless disabled.
pub(crate) const fn enabled() -> bool {
    true
}

/// Returns the value when it is set and non-empty.
pub(crate) fn given(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Fails unless at least one identity field is set.
pub(crate) fn require_one(kind: &'static str, fields: &[(&str, Option<&String>)]) -> Result<()> {
    if fields.iter().any(|(_, value)| given(*value).is_some()) {
        return Ok(());
    }
    let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    Err(ReconcileError::missing_identity(kind, format!("one of {} is required", names.join(" or "))).into())
}

/// Fails when a required field is unset or empty.
pub(crate) fn require(kind: &'static str, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ReconcileError::missing_identity(kind, format!("{field} is required")).into());
    }
    Ok(())
}

/// Normalises a resource path to a leading `/` and no trailing `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}

/// Turns a get-by-id result into lookup candidates.
///
/// An id that does not exist is an error for `present`: creating would mint a
/// new id and the descriptor would never converge.
pub(crate) fn found_by_id<T>(kind: &'static str, id: &str, state: DesiredState, found: Option<T>) -> Result<Vec<T>> {
    match found {
        Some(item) => Ok(vec![item]),
        None if state == DesiredState::Present => Err(ReconcileError::NotFound {
            kind,
            identity: id.to_string(),
        }
        .into()),
        None => Ok(Vec::new()),
    }
}

/// Resolves a REST API name to its id.
pub(crate) async fn find_rest_api_id(gateway: &dyn ApiGateway, name: &str) -> Result<Option<String>> {
    let matches: Vec<_> = gateway
        .get_rest_apis()
        .await?
        .into_iter()
        .filter(|api| api.name == name)
        .collect();
    Ok(single_match(rest_api::RestApiKind::KIND, name, matches, |api| api.id.clone())?.map(|api| api.id))
}

/// Finds the resource at `path` in a REST API.
pub(crate) async fn find_resource(
    gateway: &dyn ApiGateway,
    rest_api_id: &str,
    path: &str,
) -> Result<Option<ApiResource>> {
    let path = normalize_path(path);
    let matches: Vec<_> = gateway
        .get_resources(rest_api_id)
        .await?
        .into_iter()
        .filter(|r| r.path == path)
        .collect();
    single_match(resource::ApiResourceKind::KIND, &path, matches, |r| r.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("pets/"), "/pets");
        assert_eq!(normalize_path("/pets/{id}"), "/pets/{id}");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_found_by_id() {
        assert_eq!(found_by_id("api_key", "k1", DesiredState::Present, Some(1)).expect("found"), vec![1]);
        assert!(found_by_id::<u8>("api_key", "k1", DesiredState::Absent, None).expect("absent").is_empty());

        let err = found_by_id::<u8>("api_key", "k1", DesiredState::Present, None).expect_err("missing");
        assert!(matches!(
            err,
            crate::error::ApigwError::Reconcile(ReconcileError::NotFound { kind: "api_key", .. })
        ));
    }

    #[test]
    fn test_require_one() {
        let name = "orders".to_string();
        assert!(require_one("rest_api", &[("id", None), ("name", Some(&name))]).is_ok());

        let empty = String::new();
        let err = require_one("rest_api", &[("id", Some(&empty)), ("name", None)]).expect_err("missing");
        assert_eq!(err.to_string(), "Reconciliation error: rest_api: one of id or name is required");
    }
}
