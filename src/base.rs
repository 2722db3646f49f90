//! ## Base Transformer Collaborator
//!
//! Shared precondition plumbing injected into every stateful transformer:
//! column-list validation at construction, column-existence checks against a
//! DataFrame at fit/transform time, and the fitted-state guard that turns an
//! absent learned state into [`LevelwiseError::FitNotCalled`].
//!
//! The transformers hold a [`BaseTransformer`] by composition rather than
//! inheriting from a concrete base type, so the precondition gate stays an
//! injected collaborator.
//!
//! There is no copy-policy knob here: Arrow arrays are immutable and every
//! transform materializes fresh arrays, so caller data cannot be mutated in
//! place.

use crate::exceptions::{LevelwiseError, LevelwiseResult};
use datafusion::prelude::DataFrame;
use std::collections::HashSet;

/// Column-list ownership and precondition checks shared by all transformers.
#[derive(Debug, Clone)]
pub struct BaseTransformer {
    columns: Vec<String>,
    verbose: bool,
}

impl BaseTransformer {
    /// Validates and stores the target column list. The list must be non-empty,
    /// contain no blank names, and contain no duplicates.
    pub fn new(columns: Vec<String>, verbose: bool) -> LevelwiseResult<Self> {
        if columns.is_empty() {
            return Err(LevelwiseError::InvalidParameter(
                "columns must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &columns {
            if name.trim().is_empty() {
                return Err(LevelwiseError::InvalidParameter(
                    "column names must not be blank".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(LevelwiseError::InvalidParameter(format!(
                    "duplicate column '{}' in columns",
                    name
                )));
            }
        }
        Ok(Self { columns, verbose })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Verifies that every configured column exists in the DataFrame schema.
    pub fn columns_check(&self, df: &DataFrame) -> LevelwiseResult<()> {
        let schema = df.schema();
        for name in &self.columns {
            if schema.field_with_name(None, name).is_err() {
                return Err(LevelwiseError::MissingColumn(format!(
                    "Column '{}' not found in DataFrame",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Returns the learned state, or [`LevelwiseError::FitNotCalled`] when the
    /// transformer has not been fitted yet.
    pub fn check_is_fitted<'a, T>(&self, state: Option<&'a T>) -> LevelwiseResult<&'a T> {
        state.ok_or(LevelwiseError::FitNotCalled)
    }
}
