// Copyright 2022 Zinc Labs Inc. and Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An in-memory [`LogClient`] that evaluates `search | sql` queries with
//! DataFusion.

use std::sync::Arc;

use async_trait::async_trait;
use datafusion::{
    arrow::{
        array::{Array, ArrayRef, Float64Array, Int64Array, StringArray},
        datatypes::{DataType, Field, Schema, SchemaRef},
        record_batch::RecordBatch,
        util::display::array_value_to_string,
    },
    datasource::MemTable,
    prelude::SessionContext,
};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::{
    client::{GetLogsRequest, GetLogsResponse, LogClient},
    error::{Error, Result},
    source::LogSource,
    value::{Record, FIELD_TIME},
};

/// Name of the table a query's SQL part runs against.
pub const TABLE_NAME: &str = "log";

/// Page size used when a request asks for 0 lines.
const DEFAULT_LINES: usize = 100;

static FROM_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfrom\b").expect("BUG: invalid from pattern"));
static TAIL_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(where|group\s+by|having|order\s+by|limit)\b")
        .expect("BUG: invalid clause pattern")
});

/// key — (project, logstore); value — logs in insertion order
type Stores = FxHashMap<(String, String), Vec<Record>>;

#[derive(Debug, Default)]
pub struct MemoryLogStore {
    stores: RwLock<Stores>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `logs` to the logstore, creating it if needed.
    pub async fn insert(&self, project: &str, logstore: &str, logs: Vec<Record>) {
        let mut stores = self.stores.write().await;
        stores
            .entry((project.to_string(), logstore.to_string()))
            .or_default()
            .extend(logs);
    }

    /// Rows of the logstore inside the request window that match `search`.
    /// With `with_schema`, also the table schema, typed from every row of the
    /// logstore so that an empty window still exposes all columns.
    async fn select(
        &self,
        source: &LogSource,
        req: &GetLogsRequest,
        search: &str,
        with_schema: bool,
    ) -> Result<(Vec<Record>, Option<SchemaRef>)> {
        let stores = self.stores.read().await;
        let logs = stores
            .get(&(source.project.clone(), source.logstore.clone()))
            .ok_or_else(|| {
                Error::Query(format!(
                    "logstore {}/{} does not exist",
                    source.project, source.logstore
                ))
            })?;
        let terms = terms(search);
        let rows = logs
            .iter()
            .filter(|row| {
                log_time(row).map_or(false, |t| req.from <= t && t < req.to)
                    && terms.iter().all(|term| term.matches(row))
            })
            .cloned()
            .collect();
        let schema = with_schema.then(|| create_schema(logs));
        Ok((rows, schema))
    }
}

#[async_trait]
impl LogClient for MemoryLogStore {
    async fn get_logs(&self, source: &LogSource, req: &GetLogsRequest) -> Result<GetLogsResponse> {
        let (search, sql) = match req.query.split_once('|') {
            Some((search, sql)) => (search, Some(sql.trim())),
            None => (req.query.as_str(), None),
        };
        let (mut rows, schema) = self.select(source, req, search, sql.is_some()).await?;

        let (logs, keys) = match (sql, schema) {
            (Some(sql), Some(schema)) => run_sql(schema, &rows, sql).await?,
            _ => {
                rows.sort_by_key(|row| log_time(row).unwrap_or_default());
                if req.reverse {
                    rows.reverse();
                }
                let line = match usize::try_from(req.line) {
                    Ok(0) | Err(_) => DEFAULT_LINES,
                    Ok(n) => n,
                };
                let offset = usize::try_from(req.offset).unwrap_or_default();
                let logs = rows.into_iter().skip(offset).take(line).collect::<Vec<_>>();
                let keys = columns(&logs);
                (logs, keys)
            }
        };
        tracing::debug!(query = %req.query, rows = logs.len(), "memory store query");
        Ok(GetLogsResponse {
            count: logs.len() as i64,
            contents: serde_json::json!({ "keys": keys }).to_string(),
            logs,
        })
    }
}

fn log_time(row: &Record) -> Option<i64> {
    row.get(FIELD_TIME)?.parse().ok()
}

enum Term<'a> {
    /// `key:value`
    Field(&'a str, &'a str),
    /// Any value containing the text.
    Text(&'a str),
}

impl Term<'_> {
    fn matches(&self, row: &Record) -> bool {
        match self {
            Term::Field(key, value) => row.get(*key).map_or(false, |v| v == value),
            Term::Text(text) => row.values().any(|v| v.contains(text)),
        }
    }
}

fn terms(search: &str) -> Vec<Term<'_>> {
    search
        .split_whitespace()
        .filter(|t| *t != "*" && !t.eq_ignore_ascii_case("and"))
        .map(|t| match t.split_once(':') {
            Some((key, value)) if !key.is_empty() => Term::Field(key, value),
            _ => Term::Text(t),
        })
        .collect()
}

/// Union of the row keys in first-seen order.
fn columns(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys())
        .collect::<IndexSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Adds `from log` to SQL that reads no table, ahead of its first trailing clause.
fn with_table(sql: &str) -> String {
    if FROM_CLAUSE.is_match(sql) {
        return sql.to_string();
    }
    match TAIL_CLAUSE.find(sql) {
        Some(m) => format!(
            "{} from {TABLE_NAME} {}",
            sql[..m.start()].trim_end(),
            &sql[m.start()..]
        ),
        None => format!("{sql} from {TABLE_NAME}"),
    }
}

fn infer_type(name: &str, rows: &[Record]) -> DataType {
    if name == FIELD_TIME {
        return DataType::Int64;
    }
    let mut values = rows.iter().filter_map(|row| row.get(name)).peekable();
    if values.peek().is_none() {
        return DataType::Utf8;
    }
    let values = values.collect::<Vec<_>>();
    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        DataType::Int64
    } else if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn create_schema(logs: &[Record]) -> SchemaRef {
    let mut names = columns(logs);
    if !names.iter().any(|n| n == FIELD_TIME) {
        names.push(FIELD_TIME.to_string());
    }
    let fields = names
        .iter()
        .map(|name| Field::new(name, infer_type(name, logs), true))
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
}

/// Values that do not parse as the column type become nulls.
fn create_record_batch(schema: SchemaRef, rows: &[Record]) -> Result<RecordBatch> {
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let values = rows.iter().map(|row| row.get(field.name()));
        let array: ArrayRef = match field.data_type() {
            DataType::Int64 => Arc::new(
                values
                    .map(|v| v.and_then(|v| v.parse::<i64>().ok()))
                    .collect::<Int64Array>(),
            ),
            DataType::Float64 => Arc::new(
                values
                    .map(|v| v.and_then(|v| v.parse::<f64>().ok()))
                    .collect::<Float64Array>(),
            ),
            _ => Arc::new(values.collect::<StringArray>()),
        };
        arrays.push(array);
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

async fn run_sql(
    schema: SchemaRef,
    rows: &[Record],
    sql: &str,
) -> Result<(Vec<Record>, Vec<String>)> {
    let batch = create_record_batch(schema.clone(), rows)?;
    let provider = MemTable::try_new(schema, vec![vec![batch]])?;
    let ctx = SessionContext::new();
    ctx.register_table(TABLE_NAME, Arc::new(provider))?;

    let df = ctx.sql(&with_table(sql)).await?;
    let keys = df
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect::<Vec<_>>();
    let batches = df.collect().await?;

    let mut logs = Vec::new();
    for batch in &batches {
        for row in 0..batch.num_rows() {
            let mut record = Record::with_capacity(keys.len());
            for (key, column) in keys.iter().zip(batch.columns()) {
                if column.is_null(row) {
                    continue;
                }
                record.insert(key.clone(), array_value_to_string(column, row)?);
            }
            logs.push(record);
        }
    }
    Ok((logs, keys))
}
