//! ## One-Hot Expansion
//!
//! [`OneHotExpander`] learns, per target column, the ordered set of distinct
//! levels observed in training data, and emits one `Float64` indicator column
//! per learned level at transform time (1.0 when the row's value equals the
//! level, else 0.0).
//!
//! The expander requires complete categorical data: any null in a target
//! column is rejected at fit and at transform. Levels unseen at transform time
//! are non-fatal, encoding to an all-zero indicator family with a warning.

use crate::base::BaseTransformer;
use crate::exceptions::{LevelwiseError, LevelwiseResult};
use crate::frame::{collect_to_batch, column_levels, frame_from_batch};
use crate::impl_transformer;
use crate::levels::{Level, LevelSet};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::logical_expr::col;
use datafusion::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Guard against unbounded column explosion when expanding a column.
const MAX_LEVELS: usize = 100;

/// Level sets learned by [`OneHotExpander::fit`], in deterministic sorted order.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCategories {
    categories: HashMap<String, LevelSet>,
}

impl FittedCategories {
    /// The learned levels per target column; their order determines the
    /// indicator-column order.
    pub fn categories(&self) -> &HashMap<String, LevelSet> {
        &self.categories
    }
}

/// Expands categorical columns into one indicator column per learned level.
pub struct OneHotExpander {
    base: BaseTransformer,
    separator: String,
    drop_original: bool,
    fitted: Option<FittedCategories>,
}

impl OneHotExpander {
    /// Create a new expander for the specified columns. `drop_original`
    /// controls whether the source columns are removed from the output.
    pub fn new(columns: Vec<String>, drop_original: bool) -> LevelwiseResult<Self> {
        let base = BaseTransformer::new(columns, false)?;
        Ok(Self {
            base,
            separator: "_".to_string(),
            drop_original,
            fitted: None,
        })
    }

    /// The string joining the source column name and the level value in
    /// indicator-column names (default `"_"`).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.base.set_verbose(verbose);
        self
    }

    /// The learned level sets, once fitted.
    pub fn categories(&self) -> Option<&HashMap<String, LevelSet>> {
        self.fitted.as_ref().map(FittedCategories::categories)
    }

    fn reject_nulls(name: &str, rows: &[Level]) -> LevelwiseResult<()> {
        if rows.iter().any(Level::is_missing) {
            return Err(LevelwiseError::DataQuality(format!(
                "column {} has nulls - replace before proceeding",
                name
            )));
        }
        Ok(())
    }

    /// Learn the distinct level set of every target column. Returns the
    /// expander itself so calls can be chained. The input is not modified.
    pub async fn fit(&mut self, df: &DataFrame) -> LevelwiseResult<&mut Self> {
        self.base.columns_check(df)?;

        let projection: Vec<Expr> = self.base.columns().iter().map(|c| col(c)).collect();
        let batch = collect_to_batch(df.clone().select(projection)?).await?;

        let mut categories = HashMap::new();
        for name in self.base.columns() {
            let rows = column_levels(&batch, name)?;
            Self::reject_nulls(name, &rows)?;

            let levels: LevelSet = rows.into_iter().collect();
            if levels.len() > MAX_LEVELS {
                return Err(LevelwiseError::DataQuality(format!(
                    "column {} has over {} unique values - consider another type of encoding",
                    name, MAX_LEVELS
                )));
            }
            categories.insert(name.clone(), levels.sorted());
        }

        self.fitted = Some(FittedCategories { categories });
        Ok(self)
    }

    /// Emit indicator columns for every learned level, appended column-major
    /// after the original columns. Rows holding a level unseen during fit get
    /// 0.0 across the whole indicator family of that column.
    pub async fn transform(&self, df: DataFrame) -> LevelwiseResult<DataFrame> {
        let fitted = self.base.check_is_fitted(self.fitted.as_ref())?;
        self.base.columns_check(&df)?;

        let batch = collect_to_batch(df).await?;
        let schema = batch.schema();

        let mut fields: Vec<Field> = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();

        for (index, field) in schema.fields().iter().enumerate() {
            if self.drop_original && self.base.columns().contains(field.name()) {
                continue;
            }
            fields.push(field.as_ref().clone());
            arrays.push(batch.column(index).clone());
        }

        for name in self.base.columns() {
            let rows = column_levels(&batch, name)?;
            Self::reject_nulls(name, &rows)?;

            let levels = fitted
                .categories
                .get(name)
                .ok_or(LevelwiseError::FitNotCalled)?;

            let unseen: LevelSet = rows
                .iter()
                .filter(|level| !levels.contains(level))
                .cloned()
                .collect();
            if !unseen.is_empty() && self.base.verbose() {
                let listed: Vec<String> = unseen.iter().map(ToString::to_string).collect();
                tracing::warn!(
                    "column {} contains levels unseen during fit, encoded as all zeroes: {}",
                    name,
                    listed.join(", ")
                );
            }

            for level in levels.iter() {
                let indicators: Vec<f64> = rows
                    .iter()
                    .map(|row| if row == level { 1.0 } else { 0.0 })
                    .collect();
                fields.push(Field::new(
                    format!("{}{}{}", name, self.separator, level),
                    DataType::Float64,
                    false,
                ));
                arrays.push(Arc::new(Float64Array::from(indicators)));
            }
        }

        let output = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        frame_from_batch(output)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(OneHotExpander);
