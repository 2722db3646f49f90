//! # Levelwise
//!
//! Stateful categorical level transformers for DataFusion DataFrames.
//!
//! The library provides two fit/transform components for preparing tabular
//! data ahead of model training:
//!
//! - [`transformers::rare_levels::RareLevelConsolidator`]: learns which levels
//!   of a categorical column are frequent enough to keep (optionally weighting
//!   rows by another column) and collapses everything else into a single
//!   sentinel level.
//! - [`transformers::one_hot::OneHotExpander`]: learns the distinct levels of
//!   a categorical column and expands it into one 0/1 indicator column per
//!   learned level.
//!
//! Both learn their state in a `fit` pass over training data and apply it to
//! new data in a `transform` pass, including data containing levels never seen
//! during fit. Transformers can be chained with [`pipeline::Pipeline`] or the
//! [`make_pipeline!`] macro.
//!
//! ### Example
//!
//! ```rust,no_run
//! use datafusion::prelude::*;
//! use levelwise::exceptions::LevelwiseResult;
//! use levelwise::transformers::rare_levels::RareLevelConsolidator;
//!
//! async fn consolidate(train: DataFrame, fresh: DataFrame) -> LevelwiseResult<DataFrame> {
//!     let mut consolidator = RareLevelConsolidator::new(vec!["city".to_string()], 0.05)?;
//!     consolidator.fit(&train).await?;
//!     consolidator.transform(fresh).await
//! }
//! ```

pub mod base;
pub mod exceptions;
pub(crate) mod frame;
pub mod levels;
pub mod logging;
pub mod pipeline;
pub mod transformers;
