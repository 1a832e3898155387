//! Manifest validation.
//!
//! Validation is local: it checks identities, enumerated values and flag
//! combinations before any network call is made.

use tracing::debug;

use crate::error::{ApigwError, ConfigError, ReconcileError, Result};
use crate::reconciler::DesiredState;

use super::manifest::{Manifest, Task};

/// HTTP methods accepted by API Gateway.
const HTTP_METHODS: &[&str] = &["ANY", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

/// Endpoint configuration types.
const ENDPOINT_TYPES: &[&str] = &["EDGE", "REGIONAL", "PRIVATE"];

/// Sources of API keys for metering.
const API_KEY_SOURCES: &[&str] = &["HEADER", "AUTHORIZER"];

/// Authorizer types.
const AUTHORIZER_TYPES: &[&str] = &["TOKEN", "REQUEST", "COGNITO_USER_POOLS"];

/// Usage plan quota periods.
const QUOTA_PERIODS: &[&str] = &["DAY", "WEEK", "MONTH"];

/// Stage method logging levels.
const LOGGING_LEVELS: &[&str] = &["OFF", "ERROR", "INFO"];

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation, e.g. `tasks[2].name`.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any task is invalid.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let result = self.check(manifest);

        if result.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ApigwError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, manifest: &Manifest) -> ValidationResult {
        let mut result = ValidationResult::default();

        if manifest.tasks.is_empty() {
            result.warnings.push(String::from("Manifest has no tasks"));
        }

        for (index, task) in manifest.tasks.iter().enumerate() {
            let prefix = format!("tasks[{index}]");
            Self::validate_identity(&prefix, task, &mut result);
            Self::validate_values(&prefix, task, &mut result);
            Self::collect_warnings(&prefix, task, &mut result);

            if manifest.tasks[..index].contains(task) {
                result
                    .warnings
                    .push(format!("{prefix}: duplicate of an earlier task ({task})"));
            }
        }

        result
    }

    /// Runs the resource kind's own checks.
    fn validate_identity(prefix: &str, task: &Task, result: &mut ValidationResult) {
        let Err(err) = task.validate() else {
            return;
        };
        let (field, message) = match err {
            ApigwError::Config(ConfigError::ValidationError { message, field }) => (
                field.map_or_else(|| prefix.to_string(), |f| format!("{prefix}.{f}")),
                message,
            ),
            ApigwError::Reconcile(ReconcileError::MissingIdentity { kind, message }) => {
                (prefix.to_string(), format!("{kind}: {message}"))
            }
            other => (prefix.to_string(), other.to_string()),
        };
        result.errors.push(ValidationError { field, message });
    }

    /// Checks enumerated values.
    fn validate_values(prefix: &str, task: &Task, result: &mut ValidationResult) {
        match task {
            Task::RestApi(spec) => {
                if let Some(types) = &spec.endpoint_types {
                    if types.len() > 1 {
                        result.errors.push(ValidationError {
                            field: format!("{prefix}.endpoint_types"),
                            message: String::from("At most one endpoint type can be configured"),
                        });
                    }
                    for value in types {
                        check_one_of(prefix, "endpoint_types", value, ENDPOINT_TYPES, result);
                    }
                }
                if let Some(source) = &spec.api_key_source {
                    check_one_of(prefix, "api_key_source", source, API_KEY_SOURCES, result);
                }
                if spec.minimum_compression_size.is_some_and(|size| !(0..=10_485_760).contains(&size)) {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.minimum_compression_size"),
                        message: String::from("minimum_compression_size must be between 0 and 10485760"),
                    });
                }
            }
            Task::Method(spec) => {
                check_one_of(prefix, "http_method", &spec.http_method.to_uppercase(), HTTP_METHODS, result);
            }
            Task::Stage(spec) => {
                for (i, setting) in spec.method_settings.iter().flatten().enumerate() {
                    let field = format!("method_settings[{i}]");
                    if setting.http_method != "*" {
                        check_one_of(
                            prefix,
                            &format!("{field}.http_method"),
                            &setting.http_method.to_uppercase(),
                            HTTP_METHODS,
                            result,
                        );
                    }
                    if let Some(level) = &setting.logging_level {
                        check_one_of(prefix, &format!("{field}.logging_level"), level, LOGGING_LEVELS, result);
                    }
                }
            }
            Task::UsagePlan(spec) => {
                if let Some(period) = &spec.quota_period {
                    check_one_of(prefix, "quota_period", period, QUOTA_PERIODS, result);
                }
                if spec.quota_limit.is_some_and(|limit| limit < 0) {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.quota_limit"),
                        message: String::from("quota_limit cannot be negative"),
                    });
                }
            }
            Task::Authorizer(spec) => {
                if let Some(kind) = &spec.authorizer_type {
                    check_one_of(prefix, "type", kind, AUTHORIZER_TYPES, result);
                }
            }
            _ => {}
        }
    }

    /// Collects warnings about tasks that are valid but likely surprising.
    fn collect_warnings(prefix: &str, task: &Task, result: &mut ValidationResult) {
        match task {
            Task::Deployment(_) if task.state() == DesiredState::Present => {
                result.warnings.push(format!(
                    "{prefix}: deployments are not idempotent; every run creates a new one"
                ));
            }
            Task::RestApi(spec) if spec.purge_binary_media_types && spec.binary_media_types.is_none() => {
                result.warnings.push(unused_purge(prefix, "purge_binary_media_types", "binary_media_types"));
            }
            Task::Stage(spec) => {
                if spec.purge_variables && spec.variables.is_none() {
                    result.warnings.push(unused_purge(prefix, "purge_variables", "variables"));
                }
                if spec.purge_method_settings && spec.method_settings.is_none() {
                    result
                        .warnings
                        .push(unused_purge(prefix, "purge_method_settings", "method_settings"));
                }
            }
            Task::DomainName(spec) if spec.purge_tags && spec.tags.is_none() => {
                result.warnings.push(unused_purge(prefix, "purge_tags", "tags"));
            }
            _ => {}
        }
    }
}

fn unused_purge(prefix: &str, flag: &str, collection: &str) -> String {
    format!("{prefix}.{flag} has no effect because {collection} is not set")
}

fn check_one_of(prefix: &str, field: &str, value: &str, allowed: &[&str], result: &mut ValidationResult) {
    if !allowed.contains(&value) {
        result.errors.push(ValidationError {
            field: format!("{prefix}.{field}"),
            message: format!("Invalid {field} '{value}'. Valid values: {}", allowed.join(", ")),
        });
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestParser;

    fn manifest(yaml: &str) -> Manifest {
        ManifestParser::new().parse_yaml(yaml, None).expect("parse")
    }

    #[test]
    fn test_valid_manifest() {
        let m = manifest(
            r"
tasks:
  - kind: rest_api
    name: orders
  - kind: api_key
    name: partner
    enabled: true
",
        );
        let result = ManifestValidator::new().validate(&m).expect("valid");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_missing_identity_names_the_task() {
        let m = manifest(
            r"
tasks:
  - kind: rest_api
    name: orders
  - kind: usage_plan
    description: no name
",
        );
        let result = ManifestValidator::new().check(&m);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "tasks[1]");
        assert!(result.errors[0].message.contains("one of id or name is required"));

        let err = ManifestValidator::new().validate(&m).expect_err("invalid");
        assert!(matches!(err, ApigwError::Config(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_root_resource_cannot_be_deleted() {
        let m = manifest(
            r"
tasks:
  - kind: resource
    rest_api_id: abcd1234
    path: /
    state: absent
",
        );
        let result = ManifestValidator::new().check(&m);
        assert_eq!(result.errors[0].field, "tasks[0].path");
    }

    #[test]
    fn test_enumerated_values() {
        let m = manifest(
            r"
tasks:
  - kind: usage_plan
    name: gold
    quota_period: YEAR
  - kind: method
    rest_api_id: abcd1234
    resource_path: /pets
    http_method: fetch
  - kind: rest_api
    name: orders
    endpoint_types: [REGIONAL, EDGE]
",
        );
        let result = ManifestValidator::new().check(&m);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["tasks[0].quota_period", "tasks[1].http_method", "tasks[2].endpoint_types"]
        );
    }

    #[test]
    fn test_warnings() {
        let m = manifest(
            r"
tasks:
  - kind: deployment
    rest_api_id: abcd1234
    stage_name: live
  - kind: domain_name
    name: dev.example.com
    purge_tags: true
  - kind: domain_name
    name: dev.example.com
    purge_tags: true
",
        );
        let result = ManifestValidator::new().validate(&m).expect("valid");
        assert_eq!(result.warning_count(), 4);
        assert!(result.warnings[0].contains("not idempotent"));
        assert!(result.warnings[1].contains("purge_tags has no effect"));
        assert!(result.warnings.iter().any(|w| w.contains("duplicate")));
    }

    #[test]
    fn test_empty_manifest_warns() {
        let result = ManifestValidator::new().validate(&Manifest::default()).expect("valid");
        assert_eq!(result.warning_count(), 1);
    }
}
