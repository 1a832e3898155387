//! Manifest handling.
//!
//! This module handles everything between the manifest file and the tasks
//! the executor runs:
//! - Parsing and deserializing `apigw.yaml`
//! - Environment overrides for the AWS settings
//! - Local validation of every task

mod manifest;
mod parser;
mod validator;

pub use manifest::{AwsSettings, Manifest, Task};
pub use parser::{
    DEFAULT_MANIFEST_FILES, ENV_ENDPOINT_URL, ENV_PROFILE, ENV_REGION, ManifestParser, find_manifest_file,
};
pub use validator::{ManifestValidator, ValidationError, ValidationResult};
