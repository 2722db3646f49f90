use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, DictionaryArray, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use tokio;

use levelwise::exceptions::{LevelwiseError, LevelwiseResult};
use levelwise::levels::Level;
use levelwise::transformers::rare_levels::RareLevelConsolidator;

/// Registers a record batch as an in-memory table and returns it as a DataFrame.
async fn register(batch: RecordBatch) -> DataFrame {
    let schema = batch.schema();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

fn dict_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
        true,
    )
}

fn dict_array(universe: &[&str], rows: &[Option<&str>]) -> ArrayRef {
    let values = StringArray::from(universe.to_vec());
    let keys: Vec<Option<i32>> = rows
        .iter()
        .map(|row| row.map(|v| universe.iter().position(|u| u == &v).unwrap() as i32))
        .collect();
    Arc::new(
        DictionaryArray::<Int32Type>::try_new(Int32Array::from(keys), Arc::new(values)).unwrap(),
    )
}

/// Unweighted fixture: "a" is a numeric bystander column, "b" a plain string
/// column and "c" a dictionary-encoded column with declared universe
/// [a, c, e, f, g, h].
async fn create_plain_df() -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Float64, true),
        Field::new("b", DataType::Utf8, true),
        dict_field("c"),
    ]));
    let a: ArrayRef = Arc::new(Float64Array::from(vec![
        Some(1.0),
        Some(2.0),
        Some(3.0),
        Some(4.0),
        Some(5.0),
        Some(6.0),
        Some(7.0),
        Some(8.0),
        Some(9.0),
        None,
    ]));
    let b: ArrayRef = Arc::new(StringArray::from(vec![
        Some("a"),
        Some("a"),
        Some("a"),
        Some("d"),
        Some("e"),
        Some("f"),
        Some("g"),
        None,
        None,
        None,
    ]));
    let c = dict_array(
        &["a", "c", "e", "f", "g", "h"],
        &[
            Some("a"),
            Some("a"),
            Some("c"),
            Some("c"),
            Some("e"),
            Some("e"),
            Some("f"),
            Some("g"),
            Some("h"),
            None,
        ],
    );
    let batch = RecordBatch::try_new(schema, vec![a, b, c]).unwrap();
    register(batch).await
}

/// Weighted fixture: "a" carries row weights (with one null weight), "b" the
/// target column and "c" a dictionary column with universe [a, b, c, d, f, g].
async fn create_weighted_df() -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Float64, true),
        Field::new("b", DataType::Utf8, true),
        dict_field("c"),
    ]));
    let a: ArrayRef = Arc::new(Float64Array::from(vec![
        Some(2.0),
        Some(2.0),
        Some(2.0),
        Some(2.0),
        None,
        Some(2.0),
        Some(2.0),
        Some(2.0),
        Some(3.0),
        Some(3.0),
    ]));
    let b: ArrayRef = Arc::new(StringArray::from(vec![
        Some("a"),
        Some("a"),
        Some("a"),
        Some("d"),
        Some("e"),
        Some("f"),
        Some("g"),
        None,
        None,
        None,
    ]));
    let c = dict_array(
        &["a", "b", "c", "d", "f", "g"],
        &[
            Some("a"),
            Some("b"),
            Some("c"),
            Some("d"),
            Some("f"),
            Some("f"),
            Some("f"),
            Some("g"),
            Some("g"),
            None,
        ],
    );
    let batch = RecordBatch::try_new(schema, vec![a, b, c]).unwrap();
    register(batch).await
}

/// Short fixture used for the unseen-level policy and category forgetting:
/// "b" is a plain string column and "c" a dictionary column with universe
/// [a, b, c].
async fn create_short_df(b_values: &[Option<&str>]) -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new("b", DataType::Utf8, true),
        dict_field("c"),
    ]));
    let b: ArrayRef = Arc::new(StringArray::from(b_values.to_vec()));
    let c = dict_array(
        &["a", "b", "c"],
        &[Some("a"), Some("a"), Some("c"), Some("b"), Some("a")],
    );
    let batch = RecordBatch::try_new(schema, vec![b, c]).unwrap();
    register(batch).await
}

fn string_values(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    let index = batch.schema().index_of(name).unwrap();
    let strings = batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected StringArray");
    (0..strings.len())
        .map(|i| {
            if strings.is_null(i) {
                None
            } else {
                Some(strings.value(i).to_string())
            }
        })
        .collect()
}

/// Returns (declared universe, row values) of a dictionary column.
fn dict_values(batch: &RecordBatch, name: &str) -> (Vec<String>, Vec<Option<String>>) {
    let index = batch.schema().index_of(name).unwrap();
    let dict = batch
        .column(index)
        .as_any()
        .downcast_ref::<DictionaryArray<Int32Type>>()
        .expect("Expected DictionaryArray");
    let values = dict
        .values()
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("Expected Utf8 dictionary values");
    let universe: Vec<String> = (0..values.len()).map(|i| values.value(i).to_string()).collect();
    let rows: Vec<Option<String>> = (0..dict.len())
        .map(|i| {
            if dict.is_null(i) {
                None
            } else {
                Some(values.value(dict.keys().value(i) as usize).to_string())
            }
        })
        .collect();
    (universe, rows)
}

fn some_strings(values: &[Option<&str>]) -> Vec<Option<String>> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

#[tokio::test]
async fn test_learnt_values_no_weight() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?;
    x.fit(&df).await?;

    let learnt = x.non_rare_levels().expect("fit should store learnt levels");
    assert_eq!(
        learnt.get("b").unwrap().as_slice(),
        &[Level::from("a"), Level::Missing],
        "non-rare levels for column b"
    );
    assert_eq!(
        learnt.get("c").unwrap().as_slice(),
        &[Level::from("a"), Level::from("c"), Level::from("e")],
        "non-rare levels for column c"
    );
    // Default policy does not record the training universe.
    assert!(x.training_data_levels().is_none());
    Ok(())
}

#[tokio::test]
async fn test_expected_output_no_weight() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?;
    x.fit(&df).await?;
    let transformed = x.transform(df).await?;
    let batches = transformed.collect().await?;
    let batch = batches.first().expect("Expected at least one batch");

    assert_eq!(
        string_values(batch, "b"),
        some_strings(&[
            Some("a"),
            Some("a"),
            Some("a"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
            None,
            None,
            None,
        ]),
        "column b after consolidation"
    );

    let (universe, rows) = dict_values(batch, "c");
    assert_eq!(
        rows,
        some_strings(&[
            Some("a"),
            Some("a"),
            Some("c"),
            Some("c"),
            Some("e"),
            Some("e"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
        ]),
        "column c after consolidation"
    );
    assert_eq!(
        universe,
        vec!["a", "c", "e", "rare"],
        "rare-encoded levels should be forgotten from the declared universe"
    );

    // The bystander column passes through untouched.
    let index = batch.schema().index_of("a").unwrap();
    let a = batch
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(a.value(0), 1.0);
    assert!(a.is_null(9));
    Ok(())
}

#[tokio::test]
async fn test_learnt_values_weight() -> LevelwiseResult<()> {
    let df = create_weighted_df().await;
    // Total weight 20; level "a" weighs 6 (0.3, retained exactly at the
    // boundary) and the missing level weighs 8 (0.4).
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.3)?
        .with_weight_column("a")?;
    x.fit(&df).await?;

    let learnt = x.non_rare_levels().unwrap();
    assert_eq!(
        learnt.get("b").unwrap().as_slice(),
        &[Level::from("a"), Level::Missing],
        "weighted non-rare levels for column b"
    );
    Ok(())
}

#[tokio::test]
async fn test_learnt_values_weight_dictionary() -> LevelwiseResult<()> {
    let df = create_weighted_df().await;
    // Weighted frequencies for c: f 0.2, g 0.25, everything else 0.1 or less.
    let mut x = RareLevelConsolidator::new(vec!["c".to_string()], 0.2)?
        .with_weight_column("a")?;
    x.fit(&df).await?;

    let learnt = x.non_rare_levels().unwrap();
    assert_eq!(
        learnt.get("c").unwrap().as_slice(),
        &[Level::from("f"), Level::from("g")],
        "weighted non-rare levels for column c"
    );
    Ok(())
}

#[tokio::test]
async fn test_expected_output_weight() -> LevelwiseResult<()> {
    let df = create_weighted_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.3)?
        .with_weight_column("a")?;
    x.fit(&df).await?;
    let transformed = x.transform(df).await?;
    let batches = transformed.collect().await?;
    let batch = batches.first().expect("Expected at least one batch");

    assert_eq!(
        string_values(batch, "b"),
        some_strings(&[
            Some("a"),
            Some("a"),
            Some("a"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
            Some("rare"),
            None,
            None,
            None,
        ]),
        "weighted consolidation output for column b"
    );

    // Untargeted dictionary column keeps its values and universe.
    let (universe, rows) = dict_values(batch, "c");
    assert_eq!(universe, vec!["a", "b", "c", "d", "f", "g"]);
    assert_eq!(rows[0].as_deref(), Some("a"));
    assert_eq!(rows[9], None);
    Ok(())
}

#[tokio::test]
async fn test_cut_off_fraction_must_be_finite() {
    let result = RareLevelConsolidator::new(vec!["b".to_string()], f64::NAN);
    match result {
        Err(LevelwiseError::InvalidParameter(msg)) => {
            assert!(msg.contains("cut_off_fraction must be a float"))
        }
        _ => panic!("Expected InvalidParameter for NaN cut_off_fraction"),
    }
}

#[tokio::test]
async fn test_cut_off_fraction_out_of_range() {
    for bad in [-1.0, 0.0, 1.0, 2.0] {
        let result = RareLevelConsolidator::new(vec!["b".to_string()], bad);
        match result {
            Err(LevelwiseError::InvalidParameter(msg)) => {
                assert!(
                    msg.contains("cut_off_fraction must be > 0 and < 1"),
                    "unexpected message for {}: {}",
                    bad,
                    msg
                )
            }
            _ => panic!("Expected InvalidParameter for cut_off_fraction {}", bad),
        }
    }
}

#[tokio::test]
async fn test_empty_columns_rejected() {
    let result = RareLevelConsolidator::new(vec![], 0.2);
    assert!(matches!(result, Err(LevelwiseError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_blank_weight_column_rejected() {
    let result = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)
        .and_then(|x| x.with_weight_column(" "));
    match result {
        Err(LevelwiseError::InvalidParameter(msg)) => {
            assert!(msg.contains("weight_column should be a single column"))
        }
        _ => panic!("Expected InvalidParameter for blank weight column"),
    }
}

#[tokio::test]
async fn test_missing_rare_label_rejected() {
    let result = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)
        .and_then(|x| x.with_rare_label(Level::Missing));
    assert!(matches!(result, Err(LevelwiseError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_weight_column_not_in_dataset() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?
        .with_weight_column("aaaa")?;
    match x.fit(&df).await {
        Err(LevelwiseError::MissingColumn(msg)) => {
            assert!(msg.contains("weight 'aaaa' not in dataset"))
        }
        _ => panic!("Expected MissingColumn for absent weight column"),
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_target_column() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["nonexistent".to_string()], 0.2)?;
    assert!(matches!(
        x.fit(&df).await,
        Err(LevelwiseError::MissingColumn(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_fit_returns_self_for_chaining() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let df2 = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)?;
    let transformed = x.fit(&df).await?.transform(df2).await?;
    let batches = transformed.collect().await?;
    assert_eq!(batches.first().unwrap().num_rows(), 10);
    Ok(())
}

#[tokio::test]
async fn test_fit_does_not_modify_input() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let before = df.clone().collect().await?;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?;
    x.fit(&df).await?;
    let after = df.clone().collect().await?;
    assert_eq!(before, after, "fit must not change its input");
    Ok(())
}

#[tokio::test]
async fn test_learnt_values_not_modified_by_transform() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?;
    x.fit(&df).await?;
    let learnt_before = x.non_rare_levels().unwrap().clone();
    x.transform(df).await?;
    assert_eq!(
        &learnt_before,
        x.non_rare_levels().unwrap(),
        "transform must not modify learnt state"
    );
    Ok(())
}

#[tokio::test]
async fn test_transform_before_fit_errors() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let x = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)?;
    assert!(matches!(
        x.transform(df).await,
        Err(LevelwiseError::FitNotCalled)
    ));
    Ok(())
}

#[tokio::test]
async fn test_transform_is_idempotent() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.2)?;
    x.fit(&df).await?;

    let once = x.transform(df).await?;
    let once_batches = once.clone().collect().await?;
    let twice = x.transform(once).await?;
    let twice_batches = twice.collect().await?;
    assert_eq!(
        once_batches, twice_batches,
        "re-applying transform must be a fixed point"
    );
    Ok(())
}

#[tokio::test]
async fn test_training_data_levels_stored() -> LevelwiseResult<()> {
    let df = create_short_df(&[Some("w"), Some("w"), Some("z"), Some("y"), Some("x")]).await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.3)?
        .with_unseen_levels_to_rare(false);
    x.fit(&df).await?;

    let training = x
        .training_data_levels()
        .expect("training universe should be recorded when unseen_levels_to_rare is false");
    assert_eq!(
        training.get("b").unwrap().as_slice(),
        &[
            Level::from("w"),
            Level::from("x"),
            Level::from("y"),
            Level::from("z"),
        ]
    );
    assert_eq!(
        training.get("c").unwrap().as_slice(),
        &[Level::from("a"), Level::from("b"), Level::from("c")]
    );
    Ok(())
}

#[tokio::test]
async fn test_unseen_levels_left_unchanged_when_policy_disabled() -> LevelwiseResult<()> {
    let train = create_short_df(&[Some("w"), Some("w"), Some("z"), Some("y"), Some("x")]).await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.3)?
        .with_unseen_levels_to_rare(false);
    x.fit(&train).await?;

    // "unseen_level" never occurred in training; "z" and "y" did but fell
    // below the cut-off.
    let score =
        create_short_df(&[Some("w"), Some("w"), Some("z"), Some("y"), Some("unseen_level")]).await;
    let transformed = x.transform(score).await?;
    let batches = transformed.collect().await?;
    let batch = batches.first().unwrap();

    assert_eq!(
        string_values(batch, "b"),
        some_strings(&[
            Some("w"),
            Some("w"),
            Some("rare"),
            Some("rare"),
            Some("unseen_level"),
        ]),
        "unseen levels must pass through unchanged while seen-but-rare levels collapse"
    );
    Ok(())
}

#[tokio::test]
async fn test_rare_categories_forgotten() -> LevelwiseResult<()> {
    let df = create_short_df(&[Some("w"), Some("w"), Some("z"), Some("y"), Some("x")]).await;
    let mut x = RareLevelConsolidator::new(vec!["c".to_string()], 0.25)?;
    x.fit(&df).await?;
    let transformed = x.transform(df).await?;
    let batches = transformed.collect().await?;
    let batch = batches.first().unwrap();

    let (universe, rows) = dict_values(batch, "c");
    assert_eq!(
        rows,
        some_strings(&[Some("a"), Some("a"), Some("rare"), Some("rare"), Some("a")])
    );
    for forgotten in ["b", "c"] {
        assert!(
            !universe.contains(&forgotten.to_string()),
            "rare-encoded level {} should be forgotten from the universe",
            forgotten
        );
    }
    assert!(universe.contains(&"rare".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_record_rare_rows_indicator() -> LevelwiseResult<()> {
    let df = create_plain_df().await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)?
        .with_record_rare_rows(true);
    x.fit(&df).await?;
    let transformed = x.transform(df).await?;
    let batches = transformed.collect().await?;
    let batch = batches.first().unwrap();

    let index = batch.schema().index_of("b_rare").expect("b_rare column");
    let flags = batch
        .column(index)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .expect("Expected BooleanArray for b_rare");
    let expected = [
        false, false, false, true, true, true, true, false, false, false,
    ];
    for (i, want) in expected.into_iter().enumerate() {
        assert_eq!(flags.value(i), want, "b_rare flag at row {}", i);
    }
    Ok(())
}

#[tokio::test]
async fn test_rare_label_type_preserved_per_column_type() -> LevelwiseResult<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Float64, true),
        Field::new("b", DataType::Utf8, true),
        Field::new("c", DataType::Int64, true),
    ]));
    let a: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 1.0, 1.0, 2.0, 3.0]));
    let b: ArrayRef = Arc::new(StringArray::from(vec!["u", "u", "u", "v", "w"]));
    let c: ArrayRef = Arc::new(Int64Array::from(vec![5, 5, 5, 6, 7]));
    let batch = RecordBatch::try_new(schema, vec![a, b, c]).unwrap();
    let df = register(batch).await;

    // Float sentinel for the float column.
    let mut x = RareLevelConsolidator::new(vec!["a".to_string()], 0.3)?
        .with_rare_label(Level::Float(2.0))?;
    x.fit(&df).await?;
    let batches = x.transform(df.clone()).await?.collect().await?;
    let batch = batches.first().unwrap();
    let index = batch.schema().index_of("a").unwrap();
    let values = batch
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("column a must stay Float64");
    assert_eq!(
        (0..5).map(|i| values.value(i)).collect::<Vec<_>>(),
        vec![1.0, 1.0, 1.0, 2.0, 2.0]
    );

    // Integer sentinel for the integer column.
    let mut x = RareLevelConsolidator::new(vec!["c".to_string()], 0.3)?
        .with_rare_label(Level::Int(100))?;
    x.fit(&df).await?;
    let batches = x.transform(df.clone()).await?.collect().await?;
    let batch = batches.first().unwrap();
    let index = batch.schema().index_of("c").unwrap();
    let values = batch
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("column c must stay Int64");
    assert_eq!(
        (0..5).map(|i| values.value(i)).collect::<Vec<_>>(),
        vec![5, 5, 5, 100, 100]
    );

    // String sentinel for the string column.
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.3)?
        .with_rare_label(Level::from("zzzz"))?;
    x.fit(&df).await?;
    let batches = x.transform(df).await?.collect().await?;
    let batch = batches.first().unwrap();
    assert_eq!(
        string_values(batch, "b"),
        some_strings(&[Some("u"), Some("u"), Some("u"), Some("zzzz"), Some("zzzz")])
    );
    Ok(())
}

#[tokio::test]
async fn test_rare_label_type_mismatch_detected_at_fit() -> LevelwiseResult<()> {
    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Float64, true)]));
    let a: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 1.0, 2.0]));
    let batch = RecordBatch::try_new(schema, vec![a]).unwrap();
    let df = register(batch).await;

    // The default string label cannot be written into a float column.
    let mut x = RareLevelConsolidator::new(vec!["a".to_string()], 0.4)?;
    match x.fit(&df).await {
        Err(LevelwiseError::TypeMismatch(msg)) => {
            assert!(msg.contains("rare_level_label must be of the same type"));
            assert!(msg.contains("'a'"));
        }
        _ => panic!("Expected TypeMismatch for string label on a float column"),
    }

    // An integer label cannot be written into a string column.
    let schema = Arc::new(Schema::new(vec![Field::new("b", DataType::Utf8, true)]));
    let b: ArrayRef = Arc::new(StringArray::from(vec!["u", "u", "v"]));
    let batch = RecordBatch::try_new(schema, vec![b]).unwrap();
    let df = register(batch).await;
    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.4)?
        .with_rare_label(Level::Int(2))?;
    assert!(matches!(
        x.fit(&df).await,
        Err(LevelwiseError::TypeMismatch(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_single_row_missing_values_survive_transform() -> LevelwiseResult<()> {
    // Train on data where the missing level is frequent enough to be retained.
    let schema = Arc::new(Schema::new(vec![
        Field::new("b", DataType::Utf8, true),
        dict_field("c"),
    ]));
    let b: ArrayRef = Arc::new(StringArray::from(vec![
        Some("a"),
        Some("a"),
        None,
        None,
    ]));
    let c = dict_array(&["a"], &[Some("a"), Some("a"), None, None]);
    let batch = RecordBatch::try_new(schema.clone(), vec![b, c]).unwrap();
    let train = register(batch).await;

    let mut x = RareLevelConsolidator::new(vec!["b".to_string(), "c".to_string()], 0.3)?;
    x.fit(&train).await?;

    // A single all-missing row must come back unchanged, with the sentinel
    // added to the dictionary universe.
    let b: ArrayRef = Arc::new(StringArray::from(vec![None::<&str>]));
    let c = dict_array(&[], &[None]);
    let batch = RecordBatch::try_new(schema, vec![b, c]).unwrap();
    let single = register(batch).await;

    let batches = x.transform(single).await?.collect().await?;
    let batch = batches.first().unwrap();
    assert_eq!(string_values(batch, "b"), vec![None]);
    let (universe, rows) = dict_values(batch, "c");
    assert_eq!(rows, vec![None]);
    assert_eq!(universe, vec!["rare"]);
    Ok(())
}

#[tokio::test]
async fn test_zero_total_weight_errors() -> LevelwiseResult<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("w", DataType::Float64, true),
        Field::new("b", DataType::Utf8, true),
    ]));
    let w: ArrayRef = Arc::new(Float64Array::from(vec![Some(0.0), None]));
    let b: ArrayRef = Arc::new(StringArray::from(vec![Some("a"), Some("b")]));
    let batch = RecordBatch::try_new(schema, vec![w, b]).unwrap();
    let df = register(batch).await;

    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)?
        .with_weight_column("w")?;
    match x.fit(&df).await {
        Err(LevelwiseError::DataQuality(msg)) => assert!(msg.contains("total weight")),
        _ => panic!("Expected DataQuality error for all-zero weights"),
    }
    Ok(())
}

#[tokio::test]
async fn test_fit_on_empty_dataset_errors() -> LevelwiseResult<()> {
    let schema = Arc::new(Schema::new(vec![Field::new("b", DataType::Utf8, true)]));
    let b: ArrayRef = Arc::new(StringArray::from(Vec::<Option<String>>::new()));
    let batch = RecordBatch::try_new(schema, vec![b]).unwrap();
    let df = register(batch).await;

    let mut x = RareLevelConsolidator::new(vec!["b".to_string()], 0.2)?;
    assert!(matches!(
        x.fit(&df).await,
        Err(LevelwiseError::DataQuality(_))
    ));
    Ok(())
}
