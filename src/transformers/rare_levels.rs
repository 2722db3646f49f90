//! ## Rare Level Consolidation
//!
//! [`RareLevelConsolidator`] learns, per target column, the set of levels whose
//! (optionally weighted) relative frequency in training data reaches a cut-off
//! fraction, and rewrites every other value to a configured sentinel label at
//! transform time.
//!
//! The learned mapping is an explicit [`FittedRareLevels`] value produced by
//! `fit` and consumed read-only by `transform`: transform never mutates it, so
//! a fitted consolidator can serve concurrent transform calls.
//!
//! Unseen-level policy: by default a value never seen in training is rewritten
//! to the sentinel like any rare level. With `unseen_levels_to_rare` disabled,
//! fit additionally records the full training level universe and transform
//! passes genuinely unseen values through verbatim, while values seen in
//! training but below the cut-off still collapse to the sentinel.

use crate::base::BaseTransformer;
use crate::exceptions::{LevelwiseError, LevelwiseResult};
use crate::frame::{
    array_from_levels, collect_to_batch, column_family, column_levels, column_weights,
    dictionary_from_levels, dictionary_levels, frame_from_batch,
};
use crate::impl_transformer;
use crate::levels::{Level, LevelCounts, LevelSet};
use arrow::array::{ArrayRef, BooleanArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::logical_expr::col;
use datafusion::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Suffix of the Boolean indicator columns emitted when `record_rare_rows` is enabled.
const RARE_ROW_SUFFIX: &str = "_rare";

/// Level statistics learned by [`RareLevelConsolidator::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedRareLevels {
    non_rare_levels: HashMap<String, LevelSet>,
    training_data_levels: Option<HashMap<String, LevelSet>>,
}

impl FittedRareLevels {
    /// The retained (non-rare) levels per target column, sorted with the
    /// missing level last.
    pub fn non_rare_levels(&self) -> &HashMap<String, LevelSet> {
        &self.non_rare_levels
    }

    /// Every distinct level observed in training data per target column.
    /// Present only when `unseen_levels_to_rare` is disabled.
    pub fn training_data_levels(&self) -> Option<&HashMap<String, LevelSet>> {
        self.training_data_levels.as_ref()
    }
}

/// Consolidates infrequent categorical levels into a single sentinel level.
pub struct RareLevelConsolidator {
    base: BaseTransformer,
    cut_off_fraction: f64,
    weight_column: Option<String>,
    record_rare_rows: bool,
    unseen_levels_to_rare: bool,
    rare_label: Level,
    fitted: Option<FittedRareLevels>,
}

impl RareLevelConsolidator {
    /// Create a new consolidator for the specified columns and cut-off fraction.
    ///
    /// The cut-off is the minimum relative (weighted) frequency a level must
    /// reach to stay out of the rare group; the comparison is inclusive.
    pub fn new(columns: Vec<String>, cut_off_fraction: f64) -> LevelwiseResult<Self> {
        let base = BaseTransformer::new(columns, false)?;
        if !cut_off_fraction.is_finite() {
            return Err(LevelwiseError::InvalidParameter(
                "cut_off_fraction must be a float".to_string(),
            ));
        }
        if cut_off_fraction <= 0.0 || cut_off_fraction >= 1.0 {
            return Err(LevelwiseError::InvalidParameter(
                "cut_off_fraction must be > 0 and < 1".to_string(),
            ));
        }
        Ok(Self {
            base,
            cut_off_fraction,
            weight_column: None,
            record_rare_rows: false,
            unseen_levels_to_rare: true,
            rare_label: Level::from("rare"),
            fitted: None,
        })
    }

    /// Weight rows by the named numeric column instead of counting each row as 1.
    /// Existence of the column is checked against the fit dataset, not here.
    pub fn with_weight_column(mut self, name: impl Into<String>) -> LevelwiseResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LevelwiseError::InvalidParameter(
                "weight_column should be a single column".to_string(),
            ));
        }
        self.weight_column = Some(name);
        Ok(self)
    }

    /// Additionally emit a Boolean `<column>_rare` indicator column per target
    /// column, marking the rows whose value was rewritten.
    pub fn with_record_rare_rows(mut self, record: bool) -> Self {
        self.record_rare_rows = record;
        self
    }

    /// Governs the unseen-level policy at transform time (default true).
    pub fn with_unseen_levels_to_rare(mut self, to_rare: bool) -> Self {
        self.unseen_levels_to_rare = to_rare;
        self
    }

    /// The sentinel substituted for rare and unseen levels (default `"rare"`).
    /// Type compatibility with the target columns is checked at fit time.
    pub fn with_rare_label(mut self, label: Level) -> LevelwiseResult<Self> {
        if label.is_missing() {
            return Err(LevelwiseError::InvalidParameter(
                "rare_level_label must not be the missing value".to_string(),
            ));
        }
        self.rare_label = label;
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.base.set_verbose(verbose);
        self
    }

    /// The retained levels per column, once fitted.
    pub fn non_rare_levels(&self) -> Option<&HashMap<String, LevelSet>> {
        self.fitted.as_ref().map(FittedRareLevels::non_rare_levels)
    }

    /// The full training level universe per column, when the unseen-level
    /// policy requires it.
    pub fn training_data_levels(&self) -> Option<&HashMap<String, LevelSet>> {
        self.fitted
            .as_ref()
            .and_then(FittedRareLevels::training_data_levels)
    }

    pub fn rare_label(&self) -> &Level {
        &self.rare_label
    }

    /// Learn the retained-level set for every target column. Returns the
    /// consolidator itself so calls can be chained. The input is not modified.
    pub async fn fit(&mut self, df: &DataFrame) -> LevelwiseResult<&mut Self> {
        self.base.columns_check(df)?;

        let mut projection: Vec<Expr> = self.base.columns().iter().map(|c| col(c)).collect();
        if let Some(weight) = &self.weight_column {
            if df.schema().field_with_name(None, weight).is_err() {
                return Err(LevelwiseError::MissingColumn(format!(
                    "weight '{}' not in dataset",
                    weight
                )));
            }
            if !self.base.columns().contains(weight) {
                projection.push(col(weight));
            }
        }
        let batch = collect_to_batch(df.clone().select(projection)?).await?;

        let weights = match &self.weight_column {
            Some(weight) => column_weights(&batch, weight)?,
            None => vec![1.0; batch.num_rows()],
        };

        let schema = batch.schema();
        let sentinel_family = self.rare_label.family();
        let mut non_rare_levels = HashMap::new();
        let mut training_data_levels = if self.unseen_levels_to_rare {
            None
        } else {
            Some(HashMap::new())
        };

        for name in self.base.columns() {
            let field = schema.field_with_name(name)?;
            let family = column_family(field)?;
            if sentinel_family != Some(family) {
                return Err(LevelwiseError::TypeMismatch(format!(
                    "rare_level_label must be of the same type of the columns: column '{}' holds {} levels",
                    name, family
                )));
            }

            let rows = column_levels(&batch, name)?;
            let mut counts = LevelCounts::new();
            for (level, weight) in rows.into_iter().zip(&weights) {
                counts.add(level, *weight);
            }
            if counts.total() <= 0.0 {
                return Err(LevelwiseError::DataQuality(format!(
                    "total weight for column '{}' is zero",
                    name
                )));
            }

            if let Some(training) = training_data_levels.as_mut() {
                training.insert(name.clone(), counts.levels());
            }
            let retained = counts.retained(self.cut_off_fraction);
            if self.base.verbose() {
                tracing::debug!(
                    "column {}: retained {} of {} distinct levels",
                    name,
                    retained.len(),
                    counts.levels().len()
                );
            }
            non_rare_levels.insert(name.clone(), retained);
        }

        self.fitted = Some(FittedRareLevels {
            non_rare_levels,
            training_data_levels,
        });
        Ok(self)
    }

    /// Rewrite every value outside the learned retained set to the sentinel
    /// label, subject to the unseen-level policy. Column types are preserved,
    /// and dictionary-encoded columns forget every level rewritten away while
    /// gaining the sentinel in their declared universe.
    pub async fn transform(&self, df: DataFrame) -> LevelwiseResult<DataFrame> {
        let fitted = self.base.check_is_fitted(self.fitted.as_ref())?;
        self.base.columns_check(&df)?;

        let batch = collect_to_batch(df).await?;
        let schema = batch.schema();

        let mut fields: Vec<Field> = Vec::with_capacity(schema.fields().len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for (index, field) in schema.fields().iter().enumerate() {
            let name = field.name();
            if !self.base.columns().contains(name) {
                fields.push(field.as_ref().clone());
                arrays.push(batch.column(index).clone());
                continue;
            }

            let retained = fitted
                .non_rare_levels
                .get(name)
                .ok_or(LevelwiseError::FitNotCalled)?;
            let training = fitted
                .training_data_levels
                .as_ref()
                .and_then(|levels| levels.get(name));

            let rows = column_levels(&batch, name)?;
            let mut rewritten = Vec::with_capacity(rows.len());
            let mut rare_rows = Vec::with_capacity(rows.len());
            for level in rows {
                let keep = retained.contains(&level)
                    || (!self.unseen_levels_to_rare
                        && training.map_or(false, |universe| !universe.contains(&level)));
                if keep {
                    rare_rows.push(false);
                    rewritten.push(level);
                } else {
                    rare_rows.push(level != self.rare_label);
                    rewritten.push(self.rare_label.clone());
                }
            }

            let array = match field.data_type() {
                DataType::Dictionary(_, _) => {
                    let universe = dictionary_levels(batch.column(index), name)?;
                    let mut output_universe: LevelSet = universe
                        .into_iter()
                        .filter(|level| {
                            retained.contains(level)
                                || (!self.unseen_levels_to_rare
                                    && training.map_or(false, |set| !set.contains(level)))
                        })
                        .collect();
                    output_universe.insert(self.rare_label.clone());
                    dictionary_from_levels(output_universe.as_slice(), &rewritten, name)?
                }
                data_type => array_from_levels(data_type, &rewritten, name)?,
            };

            let has_missing = rewritten.iter().any(Level::is_missing);
            fields.push(Field::new(
                name.clone(),
                field.data_type().clone(),
                field.is_nullable() || has_missing,
            ));
            arrays.push(array);

            if self.record_rare_rows {
                fields.push(Field::new(
                    format!("{}{}", name, RARE_ROW_SUFFIX),
                    DataType::Boolean,
                    false,
                ));
                arrays.push(Arc::new(BooleanArray::from(rare_rows)));
            }
        }

        let output = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        frame_from_batch(output)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(RareLevelConsolidator);
