//! ## Custom Errors for Levelwise
//!
//! This module defines custom error types for the Levelwise library.
//! It uses the `thiserror` crate to derive the `Error` trait for custom error types.
//! The `LevelwiseError` enum includes variants representing the error scenarios
//! encountered throughout the library, making error handling straightforward and clear.
//!
//! The `LevelwiseResult` type alias simplifies error handling by providing a convenient
//! alias for results returned by the library.
//!
//! ### Example
//!
//! ```rust
//! use levelwise::exceptions::{LevelwiseError, LevelwiseResult};
//!
//! fn check_cut_off(value: f64) -> LevelwiseResult<()> {
//!     if value > 0.0 && value < 1.0 {
//!         Ok(())
//!     } else {
//!         Err(LevelwiseError::InvalidParameter(
//!             "cut_off_fraction must be > 0 and < 1".into(),
//!         ))
//!     }
//! }
//! ```

use thiserror::Error;

/// Errors specific to the Levelwise library.
#[derive(Debug, Error)]
pub enum LevelwiseError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Indicates that an invalid construction parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that a required column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates that a column has a data type the transformers cannot operate on.
    #[error("Unsupported column type: {0}")]
    UnsupportedColumnType(String),

    /// Indicates that a configured level value is incompatible with a column's type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Indicates that the data violates a precondition (nulls where forbidden,
    /// cardinality above the guard, degenerate weights).
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

/// A convenient result type for Levelwise operations.
pub type LevelwiseResult<T> = std::result::Result<T, LevelwiseError>;
