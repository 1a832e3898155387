//! Planning module for reconciliation.
//!
//! This module handles the comparison between desired and observed state,
//! the change sets that comparison produces, and the executor that runs
//! manifest tasks in order.

mod changeset;
mod diff;
mod executor;

pub use changeset::{Batch, Change, ChangeSet, ROOT_SCOPE, Scope};
pub use diff::{DiffEngine, FieldSpec, Matched, Mutability, SetEncoding, diff_tags, escape_key, match_entries, patch_value};
pub use executor::{ExecutionResult, TaskExecutor, TaskReport};
