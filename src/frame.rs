//! ## DataFrame / Arrow Bridging
//!
//! Internal helpers shared by the transformers: materializing a DataFusion
//! `DataFrame` into a single record batch, rebuilding a `DataFrame` from a
//! rewritten batch through a `MemTable`, and converting between Arrow arrays
//! and [`Level`] values for the supported column types (`Utf8`,
//! `Dictionary(Int32, Utf8)`, `Int64`, and `Float64`).

use crate::exceptions::{LevelwiseError, LevelwiseResult};
use crate::levels::{Level, LevelFamily};
use arrow::array::{
    Array, ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Executes the DataFrame and concatenates the result into one record batch.
pub(crate) async fn collect_to_batch(df: DataFrame) -> LevelwiseResult<RecordBatch> {
    let logical_fields = df.schema().fields().clone();
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or_else(|| Arc::new(Schema::new(logical_fields)));
    Ok(concat_batches(&schema, &batches)?)
}

/// Wraps a rewritten batch back into a DataFrame via an in-memory table.
pub(crate) fn frame_from_batch(batch: RecordBatch) -> LevelwiseResult<DataFrame> {
    let schema = batch.schema();
    let table = MemTable::try_new(schema, vec![vec![batch]])?;
    let ctx = SessionContext::new();
    Ok(ctx.read_table(Arc::new(table))?)
}

/// Classifies a column type into the level family its values belong to.
pub(crate) fn column_family(field: &Field) -> LevelwiseResult<LevelFamily> {
    match field.data_type() {
        DataType::Utf8 => Ok(LevelFamily::Text),
        DataType::Dictionary(key_type, value_type)
            if key_type.as_ref() == &DataType::Int32 && value_type.as_ref() == &DataType::Utf8 =>
        {
            Ok(LevelFamily::Text)
        }
        DataType::Int64 => Ok(LevelFamily::Integer),
        DataType::Float64 => Ok(LevelFamily::Real),
        other => Err(LevelwiseError::UnsupportedColumnType(format!(
            "column '{}' has type {} which is not supported as a categorical column",
            field.name(),
            other
        ))),
    }
}

fn downcast_error(name: &str, expected: &str) -> LevelwiseError {
    LevelwiseError::UnsupportedColumnType(format!(
        "column '{}' could not be read as {}",
        name, expected
    ))
}

/// Reads every row of the named column as a [`Level`]. Nulls (and non-null
/// float NaNs) become [`Level::Missing`].
pub(crate) fn column_levels(batch: &RecordBatch, name: &str) -> LevelwiseResult<Vec<Level>> {
    let schema = batch.schema();
    let index = schema.index_of(name)?;
    let array = batch.column(index);
    levels_from_array(array, name)
}

pub(crate) fn levels_from_array(array: &ArrayRef, name: &str) -> LevelwiseResult<Vec<Level>> {
    let mut levels = Vec::with_capacity(array.len());
    match array.data_type() {
        DataType::Utf8 => {
            let strings = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| downcast_error(name, "Utf8"))?;
            for i in 0..strings.len() {
                if strings.is_null(i) {
                    levels.push(Level::Missing);
                } else {
                    levels.push(Level::Str(strings.value(i).to_string()));
                }
            }
        }
        DataType::Int64 => {
            let ints = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| downcast_error(name, "Int64"))?;
            for i in 0..ints.len() {
                if ints.is_null(i) {
                    levels.push(Level::Missing);
                } else {
                    levels.push(Level::Int(ints.value(i)));
                }
            }
        }
        DataType::Float64 => {
            let floats = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| downcast_error(name, "Float64"))?;
            for i in 0..floats.len() {
                if floats.is_null(i) {
                    levels.push(Level::Missing);
                } else {
                    // NaN is folded into the missing level.
                    levels.push(Level::from(floats.value(i)));
                }
            }
        }
        DataType::Dictionary(key_type, value_type)
            if key_type.as_ref() == &DataType::Int32 && value_type.as_ref() == &DataType::Utf8 =>
        {
            let dict = array
                .as_any()
                .downcast_ref::<DictionaryArray<Int32Type>>()
                .ok_or_else(|| downcast_error(name, "Dictionary(Int32, Utf8)"))?;
            let values = dict
                .values()
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| downcast_error(name, "Dictionary(Int32, Utf8)"))?;
            let keys = dict.keys();
            for i in 0..dict.len() {
                if dict.is_null(i) {
                    levels.push(Level::Missing);
                } else {
                    let key = keys.value(i) as usize;
                    levels.push(Level::Str(values.value(key).to_string()));
                }
            }
        }
        other => {
            return Err(LevelwiseError::UnsupportedColumnType(format!(
                "column '{}' has type {} which is not supported as a categorical column",
                name, other
            )))
        }
    }
    Ok(levels)
}

/// The declared level universe of a dictionary-encoded column, in dictionary order.
pub(crate) fn dictionary_levels(array: &ArrayRef, name: &str) -> LevelwiseResult<Vec<Level>> {
    let dict = array
        .as_any()
        .downcast_ref::<DictionaryArray<Int32Type>>()
        .ok_or_else(|| downcast_error(name, "Dictionary(Int32, Utf8)"))?;
    let values = dict
        .values()
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| downcast_error(name, "Dictionary(Int32, Utf8)"))?;
    let mut levels = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if values.is_null(i) {
            levels.push(Level::Missing);
        } else {
            levels.push(Level::Str(values.value(i).to_string()));
        }
    }
    Ok(levels)
}

/// Reads the named column as per-row weights. Null and non-finite entries
/// weigh zero.
pub(crate) fn column_weights(batch: &RecordBatch, name: &str) -> LevelwiseResult<Vec<f64>> {
    let schema = batch.schema();
    let index = schema.index_of(name)?;
    let array = batch.column(index);
    let mut weights = Vec::with_capacity(array.len());
    match array.data_type() {
        DataType::Int64 => {
            let ints = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| downcast_error(name, "Int64"))?;
            for i in 0..ints.len() {
                weights.push(if ints.is_null(i) {
                    0.0
                } else {
                    ints.value(i) as f64
                });
            }
        }
        DataType::Float64 => {
            let floats = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| downcast_error(name, "Float64"))?;
            for i in 0..floats.len() {
                let value = if floats.is_null(i) { 0.0 } else { floats.value(i) };
                weights.push(if value.is_finite() { value } else { 0.0 });
            }
        }
        other => {
            return Err(LevelwiseError::UnsupportedColumnType(format!(
                "weight column '{}' must be numeric (Int64 or Float64), got {}",
                name, other
            )))
        }
    }
    Ok(weights)
}

fn write_error(level: &Level, name: &str, data_type: &DataType) -> LevelwiseError {
    LevelwiseError::TypeMismatch(format!(
        "cannot write level '{}' into column '{}' of type {}",
        level, name, data_type
    ))
}

/// Rebuilds a plain (non-dictionary) column from rewritten levels, preserving
/// the original data type.
pub(crate) fn array_from_levels(
    data_type: &DataType,
    rows: &[Level],
    name: &str,
) -> LevelwiseResult<ArrayRef> {
    match data_type {
        DataType::Utf8 => {
            let mut values: Vec<Option<String>> = Vec::with_capacity(rows.len());
            for level in rows {
                match level {
                    Level::Str(s) => values.push(Some(s.clone())),
                    Level::Missing => values.push(None),
                    other => return Err(write_error(other, name, data_type)),
                }
            }
            Ok(Arc::new(StringArray::from(values)))
        }
        DataType::Int64 => {
            let mut values: Vec<Option<i64>> = Vec::with_capacity(rows.len());
            for level in rows {
                match level {
                    Level::Int(i) => values.push(Some(*i)),
                    Level::Missing => values.push(None),
                    other => return Err(write_error(other, name, data_type)),
                }
            }
            Ok(Arc::new(Int64Array::from(values)))
        }
        DataType::Float64 => {
            let mut values: Vec<Option<f64>> = Vec::with_capacity(rows.len());
            for level in rows {
                match level {
                    Level::Float(f) => values.push(Some(*f)),
                    Level::Missing => values.push(None),
                    other => return Err(write_error(other, name, data_type)),
                }
            }
            Ok(Arc::new(Float64Array::from(values)))
        }
        other => Err(LevelwiseError::UnsupportedColumnType(format!(
            "column '{}' has type {} which is not supported as a categorical column",
            name, other
        ))),
    }
}

/// Rebuilds a dictionary-encoded column from rewritten levels against an
/// explicit declared universe. Every non-missing row level must be a member of
/// the universe.
pub(crate) fn dictionary_from_levels(
    universe: &[Level],
    rows: &[Level],
    name: &str,
) -> LevelwiseResult<ArrayRef> {
    let mut values: Vec<Option<String>> = Vec::with_capacity(universe.len());
    let mut index: HashMap<&Level, i32> = HashMap::with_capacity(universe.len());
    for (i, level) in universe.iter().enumerate() {
        match level {
            Level::Str(s) => values.push(Some(s.clone())),
            other => {
                return Err(write_error(
                    other,
                    name,
                    &DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                ))
            }
        }
        index.insert(level, i as i32);
    }

    let mut keys: Vec<Option<i32>> = Vec::with_capacity(rows.len());
    for level in rows {
        match level {
            Level::Missing => keys.push(None),
            other => match index.get(other) {
                Some(key) => keys.push(Some(*key)),
                None => {
                    return Err(LevelwiseError::TypeMismatch(format!(
                        "level '{}' is not part of the declared universe of column '{}'",
                        other, name
                    )))
                }
            },
        }
    }

    let dictionary = DictionaryArray::<Int32Type>::try_new(
        Int32Array::from(keys),
        Arc::new(StringArray::from(values)),
    )?;
    Ok(Arc::new(dictionary))
}
