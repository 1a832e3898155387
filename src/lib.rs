// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # apigw reconcile
//!
//! Declarative, idempotent management of AWS API Gateway (REST, v1) resources.
//!
//! ## Overview
//!
//! Each resource is described by a descriptor in a YAML manifest. Reconciling
//! a descriptor converges the remote resource to it:
//!
//! - Look the resource up by id or by exact name
//! - Diff the descriptor against what AWS reports
//! - Create, patch or delete, or do nothing when already converged
//!
//! Running the same manifest twice makes no changes the second time, with
//! the exception of deployments, which are created on every run.
//!
//! ## Architecture
//!
//! 1. **Desired State**: Descriptors declared in `apigw.yaml`
//! 2. **Observed State**: Queried from the API Gateway management API
//! 3. **Reconciler**: Lookup, diff and patch, shared by every resource kind
//!
//! ## Modules
//!
//! - [`config`]: Manifest parsing and validation
//! - [`gateway`]: The API Gateway client seam and its SDK implementation
//! - [`resources`]: Descriptors and field tables for each resource kind
//! - [`planner`]: Change sets, diffing and task execution
//! - [`reconciler`]: The generic reconciliation routine
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! aws:
//!   region: eu-west-1
//!
//! tasks:
//!   - kind: usage_plan
//!     name: partner-plan
//!     quota_limit: 333
//!     quota_period: WEEK
//!   - kind: base_path_mapping
//!     domain_name: dev.example.com
//!     rest_api_id: abcd1234
//!     stage: live
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod planner;
pub mod reconciler;
pub mod resources;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AwsSettings, Manifest, ManifestParser, ManifestValidator, Task};
pub use error::{ApigwError, Result};
pub use gateway::{ApiGateway, SdkGateway};
pub use planner::{ChangeSet, DiffEngine, ExecutionResult, TaskExecutor};
pub use reconciler::{Action, DesiredState, Outcome, Reconciler, ResourceKind};
