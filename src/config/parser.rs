//! Manifest parser for loading manifests from disk.
//!
//! This module handles loading the manifest from YAML files and environment
//! variables, with proper precedence and error handling.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ApigwError, ConfigError, Result};

use super::manifest::Manifest;

/// Environment variable overriding `aws.region`.
pub const ENV_REGION: &str = "APIGW_REGION";
/// Environment variable overriding `aws.profile`.
pub const ENV_PROFILE: &str = "APIGW_PROFILE";
/// Environment variable overriding `aws.endpoint_url`.
pub const ENV_ENDPOINT_URL: &str = "APIGW_ENDPOINT_URL";

/// Manifest parser.
#[derive(Debug, Default)]
pub struct ManifestParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ManifestParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory the `.env` file is loaded from.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ApigwError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ApigwError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or names an unknown field.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ApigwError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed manifest with {} tasks", manifest.tasks.len());
        Ok(manifest)
    }

    /// Loads a manifest and applies the process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_env_overrides(&mut manifest, |name| std::env::var(name).ok());
        Ok(manifest)
    }

    /// Applies `APIGW_*` overrides to the AWS settings.
    ///
    /// `lookup` resolves a variable name; empty values are ignored.
    pub fn apply_env_overrides(manifest: &mut Manifest, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(region) = get(ENV_REGION) {
            debug!("Overriding aws.region from environment");
            manifest.aws.region = Some(region);
        }

        if let Some(profile) = get(ENV_PROFILE) {
            debug!("Overriding aws.profile from environment");
            manifest.aws.profile = Some(profile);
        }

        if let Some(endpoint_url) = get(ENV_ENDPOINT_URL) {
            debug!("Overriding aws.endpoint_url from environment");
            manifest.aws.endpoint_url = Some(endpoint_url);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ApigwError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default manifest file names to search for.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &["apigw.yaml", "apigw.yml", "apigw.manifest.yaml"];

/// Finds the manifest in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest is found.
pub fn find_manifest_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_MANIFEST_FILES {
            let manifest_path = current.join(filename);
            if manifest_path.exists() {
                info!("Found manifest: {}", manifest_path.display());
                return Ok(manifest_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ApigwError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_MANIFEST_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Task;
    use crate::reconciler::DesiredState;

    #[test]
    fn test_parse_minimal_manifest() {
        let parser = ManifestParser::new();
        let manifest = parser.parse_yaml("tasks: []\n", None).expect("parse");
        assert!(manifest.tasks.is_empty());
        assert_eq!(manifest.aws.region, None);
    }

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
aws:
  region: eu-west-1
  profile: staging

tasks:
  - kind: rest_api
    name: orders
    endpoint_types: [REGIONAL]
  - kind: resource
    rest_api_id: abcd1234
    path: /orders/{id}
  - kind: method
    rest_api_id: abcd1234
    resource_path: /orders/{id}
    http_method: get
    integration:
      type: HTTP_PROXY
      http_method: GET
      uri: https://backend.example.com/orders/{id}
  - kind: usage_plan
    name: partner-plan
    quota_limit: 333
    quota_period: WEEK
    purge_quota: true
  - kind: base_path_mapping
    domain_name: dev.example.com
    rest_api_id: abcd1234
    stage: live
  - kind: stage
    rest_api_id: abcd1234
    stage_name: old
    state: absent
"#;
        let manifest = ManifestParser::new().parse_yaml(yaml, None).expect("parse");
        assert_eq!(manifest.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(manifest.tasks.len(), 6);

        let kinds: Vec<&str> = manifest.tasks.iter().map(Task::kind).collect();
        assert_eq!(
            kinds,
            vec!["rest_api", "resource", "method", "usage_plan", "base_path_mapping", "stage"]
        );

        let Task::BasePathMapping(mapping) = &manifest.tasks[4] else {
            panic!("expected a base path mapping");
        };
        assert_eq!(mapping.name, "dev.example.com");
        assert_eq!(mapping.base_path, "");
        assert_eq!(manifest.tasks[5].state(), DesiredState::Absent);
    }

    #[test]
    fn test_starter_template_is_valid() {
        let manifest = ManifestParser::new()
            .parse_yaml(include_str!("../../templates/apigw.yaml"), None)
            .expect("parse");
        assert_eq!(manifest.tasks.len(), 6);
        crate::config::ManifestValidator::new()
            .validate(&manifest)
            .expect("valid");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = r"
tasks:
  - kind: api_key
    name: partner
    colour: blue
";
        let err = ManifestParser::new().parse_yaml(yaml, None).expect_err("unknown field");
        assert!(err.to_string().contains("colour"));

        let err = ManifestParser::new()
            .parse_yaml("tasks:\n  - kind: lambda\n    name: x\n", None)
            .expect_err("unknown kind");
        assert!(matches!(err, ApigwError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut manifest = ManifestParser::new()
            .parse_yaml("aws:\n  region: eu-west-1\n  profile: staging\n", None)
            .expect("parse");

        ManifestParser::apply_env_overrides(&mut manifest, |name| match name {
            ENV_REGION => Some("us-east-1".to_string()),
            ENV_PROFILE => Some(String::new()),
            ENV_ENDPOINT_URL => Some("http://localhost:4566".to_string()),
            _ => None,
        });

        assert_eq!(manifest.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(manifest.aws.profile.as_deref(), Some("staging"));
        assert_eq!(manifest.aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("services").join("orders");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("apigw.yml"), "tasks: []\n").expect("write");

        let found = find_manifest_file(&nested).expect("found");
        assert_eq!(found, dir.path().join("apigw.yml"));

        let manifest = ManifestParser::new().load_file(&found).expect("load");
        assert!(manifest.tasks.is_empty());
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ManifestParser::new()
            .load_file(dir.path().join("apigw.yaml"))
            .expect_err("missing");
        assert!(matches!(err, ApigwError::Config(ConfigError::FileNotFound { .. })));
    }
}
