// Run `cargo run --example basic_usage` to execute this example

use std::error::Error;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;

use levelwise::make_pipeline;
use levelwise::transformers::one_hot::OneHotExpander;
use levelwise::transformers::rare_levels::RareLevelConsolidator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A small in-memory dataset: purchase amounts and the city they came from.
    let schema = Arc::new(Schema::new(vec![
        Field::new("amount", DataType::Float64, false),
        Field::new("city", DataType::Utf8, true),
    ]));
    let amount: ArrayRef = Arc::new(Float64Array::from(vec![
        12.0, 7.5, 3.2, 41.0, 9.9, 15.0, 8.1, 22.4, 5.0, 13.7,
    ]));
    let city: ArrayRef = Arc::new(StringArray::from(vec![
        "berlin", "berlin", "berlin", "paris", "paris", "paris", "lyon", "porto", "turin", "ghent",
    ]));
    let batch = RecordBatch::try_new(schema.clone(), vec![amount, city])?;
    let mem_table = MemTable::try_new(schema, vec![vec![batch]])?;
    let ctx = SessionContext::new();
    ctx.register_table("purchases", Arc::new(mem_table))?;
    let df = ctx.table("purchases").await?;

    println!("Input:");
    df.clone().show().await?;

    // Group the one-off cities into a single "rare" level, then expand the
    // consolidated column into indicator columns.
    let mut pipeline = make_pipeline!(
        true,
        (
            "group_rare_cities",
            RareLevelConsolidator::new(vec!["city".to_string()], 0.2)?
        ),
        (
            "one_hot_cities",
            OneHotExpander::new(vec!["city".to_string()], true)?
        ),
    );

    let transformed = pipeline.fit_transform(&df).await?;

    println!("Output:");
    transformed.show().await?;

    Ok(())
}
