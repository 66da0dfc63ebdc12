use super::normalize::NormalizedRecord;
use super::rebase::RebasedRecord;
use polars::prelude::*;

/// Column layout of silver parquet files.
pub struct SilverSchema;

impl SilverSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("base_currency".into(), DataType::String),
            Field::new("target_currency".into(), DataType::String),
            Field::new("rate".into(), DataType::Float64),
            Field::new("last_update_utc".into(), DataType::String),
        ])
    }

    pub fn to_frame(records: &[NormalizedRecord]) -> Result<DataFrame, SchemaError> {
        let bases: Vec<&str> = records.iter().map(|r| r.base_currency.as_str()).collect();
        let targets: Vec<&str> = records.iter().map(|r| r.target_currency.as_str()).collect();
        let rates: Vec<f64> = records.iter().map(|r| r.rate).collect();
        let stamps: Vec<&str> = records.iter().map(|r| r.last_update_utc.as_str()).collect();

        DataFrame::new(vec![
            Column::new("base_currency".into(), bases),
            Column::new("target_currency".into(), targets),
            Column::new("rate".into(), rates),
            Column::new("last_update_utc".into(), stamps),
        ])
        .map_err(polars_err)
    }

    pub fn from_frame(df: &DataFrame) -> Result<Vec<NormalizedRecord>, SchemaError> {
        validate(df, &Self::schema())?;

        let bases = df.column("base_currency").map_err(polars_err)?.str().map_err(polars_err)?;
        let targets = df.column("target_currency").map_err(polars_err)?.str().map_err(polars_err)?;
        let rates = df.column("rate").map_err(polars_err)?.f64().map_err(polars_err)?;
        let stamps = df.column("last_update_utc").map_err(polars_err)?.str().map_err(polars_err)?;

        (0..df.height())
            .map(|i| {
                Ok(NormalizedRecord {
                    base_currency: required(bases.get(i), "base_currency", i)?.to_string(),
                    target_currency: required(targets.get(i), "target_currency", i)?.to_string(),
                    rate: required(rates.get(i), "rate", i)?,
                    last_update_utc: required(stamps.get(i), "last_update_utc", i)?.to_string(),
                })
            })
            .collect()
    }
}

/// Column layout of gold parquet files.
///
/// Columns are `currency`, `rate_{pivot}_base` (lower-case pivot code, e.g.
/// `rate_brl_base`) and `last_update_utc`.
pub struct GoldSchema {
    value_column: String,
}

impl GoldSchema {
    pub fn for_pivot(pivot: &str) -> Self {
        Self {
            value_column: format!("rate_{}_base", pivot.trim().to_lowercase()),
        }
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn schema(&self) -> Schema {
        Schema::from_iter(vec![
            Field::new("currency".into(), DataType::String),
            Field::new(self.value_column.as_str().into(), DataType::Float64),
            Field::new("last_update_utc".into(), DataType::String),
        ])
    }

    pub fn to_frame(&self, records: &[RebasedRecord]) -> Result<DataFrame, SchemaError> {
        let currencies: Vec<&str> = records.iter().map(|r| r.currency.as_str()).collect();
        let values: Vec<f64> = records.iter().map(|r| r.value_in_pivot).collect();
        let stamps: Vec<&str> = records.iter().map(|r| r.last_update_utc.as_str()).collect();

        DataFrame::new(vec![
            Column::new("currency".into(), currencies),
            Column::new(self.value_column.as_str().into(), values),
            Column::new("last_update_utc".into(), stamps),
        ])
        .map_err(polars_err)
    }

    pub fn from_frame(&self, df: &DataFrame) -> Result<Vec<RebasedRecord>, SchemaError> {
        validate(df, &self.schema())?;

        let currencies = df.column("currency").map_err(polars_err)?.str().map_err(polars_err)?;
        let values = df
            .column(&self.value_column)
            .map_err(polars_err)?
            .f64()
            .map_err(polars_err)?;
        let stamps = df.column("last_update_utc").map_err(polars_err)?.str().map_err(polars_err)?;

        (0..df.height())
            .map(|i| {
                Ok(RebasedRecord {
                    currency: required(currencies.get(i), "currency", i)?.to_string(),
                    value_in_pivot: required(values.get(i), &self.value_column, i)?,
                    last_update_utc: required(stamps.get(i), "last_update_utc", i)?.to_string(),
                })
            })
            .collect()
    }
}

/// Validate that a DataFrame carries every expected column with the right type.
/// Extra columns are ignored.
pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
    let actual = df.schema();

    for field in expected.iter_fields() {
        let actual_dtype = actual
            .get(field.name())
            .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
        if actual_dtype != field.dtype() {
            return Err(SchemaError::TypeMismatch {
                column: field.name().to_string(),
                expected: field.dtype().clone(),
                actual: actual_dtype.clone(),
            });
        }
    }

    Ok(())
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T, SchemaError> {
    value.ok_or_else(|| SchemaError::NullValue {
        column: column.to_string(),
        row,
    })
}

fn polars_err(e: PolarsError) -> SchemaError {
    SchemaError::Polars(e.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Null value in column {column} at row {row}")]
    NullValue { column: String, row: usize },

    #[error("polars: {0}")]
    Polars(String),
}
