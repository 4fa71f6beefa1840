use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio_postgres::types::{ToSql, Type};

/// Column type of a trip record field, as it lands in the destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    DoublePrecision,
    Timestamp,
    Text,
}

impl ColumnType {
    /// SQL type name used in the generated DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::DoublePrecision => "DOUBLE PRECISION",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }

    /// Wire type for the binary COPY protocol.
    pub fn pg_type(self) -> Type {
        match self {
            ColumnType::BigInt => Type::INT8,
            ColumnType::DoublePrecision => Type::FLOAT8,
            ColumnType::Timestamp => Type::TIMESTAMP,
            ColumnType::Text => Type::TEXT,
        }
    }
}

/// The yellow-taxi source carries a fixed field layout; column types are
/// declared up front rather than inferred from the data. Headers not in the
/// map (including `store_and_fwd_flag`) are loaded as text.
pub fn column_type_for(name: &str) -> ColumnType {
    match name {
        "VendorID" | "passenger_count" | "RatecodeID" | "PULocationID" | "DOLocationID"
        | "payment_type" => ColumnType::BigInt,
        "trip_distance" | "fare_amount" | "extra" | "mta_tax" | "tip_amount" | "tolls_amount"
        | "improvement_surcharge" | "total_amount" | "congestion_surcharge" => {
            ColumnType::DoublePrecision
        }
        "tpep_pickup_datetime" | "tpep_dropoff_datetime" => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
}

/// Column layout of the destination table, derived exactly once from the
/// source header (the zero-row projection of the first batch) and reused for
/// every write of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Builds the schema from the header, preserving header order.
    pub fn from_header<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let columns = names
            .into_iter()
            .map(|name| Column {
                name: name.to_string(),
                data_type: column_type_for(name),
            })
            .collect();
        Self { columns }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn pg_types(&self) -> Vec<Type> {
        self.columns.iter().map(|c| c.data_type.pg_type()).collect()
    }

    /// Parses one CSV row into typed values. Field count must match the
    /// header; any cell that fails type coercion fails the whole row.
    pub fn parse_row<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> std::result::Result<Record, String> {
        let mut fields = fields.into_iter();
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let raw = fields.next().ok_or_else(|| {
                format!(
                    "expected {} fields, found {}",
                    self.columns.len(),
                    values.len()
                )
            })?;
            let value = Value::parse(raw, column.data_type)
                .map_err(|reason| format!("column {}: {}", column.name, reason))?;
            values.push(value);
        }
        if fields.next().is_some() {
            return Err(format!(
                "row has more fields than the {} header columns",
                self.columns.len()
            ));
        }
        Ok(Record { values })
    }
}

/// A single nullable cell. Empty CSV cells become NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Timestamp(Option<NaiveDateTime>),
    Text(Option<String>),
}

impl Value {
    pub fn null_of(data_type: ColumnType) -> Self {
        match data_type {
            ColumnType::BigInt => Value::BigInt(None),
            ColumnType::DoublePrecision => Value::Double(None),
            ColumnType::Timestamp => Value::Timestamp(None),
            ColumnType::Text => Value::Text(None),
        }
    }

    pub fn parse(raw: &str, data_type: ColumnType) -> std::result::Result<Self, String> {
        if raw.is_empty() {
            return Ok(Value::null_of(data_type));
        }
        match data_type {
            ColumnType::BigInt => raw
                .parse::<i64>()
                .map(|v| Value::BigInt(Some(v)))
                .map_err(|e| format!("invalid integer {raw:?}: {e}")),
            ColumnType::DoublePrecision => raw
                .parse::<f64>()
                .map(|v| Value::Double(Some(v)))
                .map_err(|e| format!("invalid float {raw:?}: {e}")),
            ColumnType::Timestamp => {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                    .map(|v| Value::Timestamp(Some(v)))
                    .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
            }
            ColumnType::Text => Ok(Value::Text(Some(raw.to_string()))),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::BigInt(v) => v.is_none(),
            Value::Double(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Text(v) => v.is_none(),
        }
    }

    /// Borrow as a query parameter for the binary COPY writer.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Value::BigInt(v) => v,
            Value::Double(v) => v,
            Value::Timestamp(v) => v,
            Value::Text(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

/// A bounded run of records pulled from the source in one batch, tagged with
/// the schema they were parsed under.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub schema: Arc<TableSchema>,
    pub records: Vec<Record>,
    /// Unparsed CSV bytes that produced this batch.
    pub bytes: u64,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
