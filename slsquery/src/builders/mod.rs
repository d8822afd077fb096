//! Shape builders: pure transformations from a [`RecordSet`] into frames.
//!
//! Every builder appends to the caller's frame collection so several calls
//! can accumulate into one response. Values that fail numeric coercion are
//! logged and read as `0.0`; a key missing from a row contributes nothing to
//! that key's column, and the builder's length rule then decides whether the
//! column is emitted at all.

use itertools::Itertools;

use crate::{
    error::Result,
    frame::{Field, Frame},
    value::{Record, RecordSet, FIELD_SOURCE, FIELD_TIME},
};

mod bar;
mod flow;
mod logs;
mod map;
mod pie;
mod table;
mod timing;
mod trace;

pub use bar::build_bar_graph;
pub use flow::build_flow_graph;
pub use logs::build_logs;
pub use map::build_map_graph;
pub use pie::build_pie_graph;
pub use table::build_table;
pub use timing::build_timing_graph;
pub use trace::build_trace;

/// Value of `key` in `row`, or the empty string.
pub(crate) fn get<'a>(row: &'a Record, key: &str) -> &'a str {
    row.get(key).map_or("", String::as_str)
}

/// Parses `value` as a base-10 float; failures are logged and read as 0.
pub(crate) fn coerce_float(builder: &str, value: &str) -> f64 {
    value.parse::<f64>().unwrap_or_else(|error| {
        tracing::warn!(builder, value, %error, "not a number, using 0");
        0.0
    })
}

pub(crate) fn string_values(records: &RecordSet, key: &str) -> Vec<String> {
    records.values(key).map(String::from).collect()
}

pub(crate) fn float_values(builder: &str, records: &RecordSet, key: &str) -> Vec<f64> {
    records
        .values(key)
        .map(|v| coerce_float(builder, v))
        .collect()
}

pub(crate) fn is_reserved(key: &str) -> bool {
    key == FIELD_TIME || key == FIELD_SOURCE
}

/// Removes repeated names, keeping the first occurrence.
pub(crate) fn unique(columns: &[String]) -> Vec<String> {
    columns.iter().unique().cloned().collect()
}

/// Pushes the fields whose length equals the longest one and drops the rest.
pub(crate) fn push_consensus(builder: &str, frame: &mut Frame, fields: Vec<Field>) -> Result<()> {
    let len = fields.iter().map(Field::len).max().unwrap_or(0);
    for field in fields {
        if field.len() == len {
            frame.push(field)?;
        } else {
            tracing::warn!(
                builder,
                field = %field.name,
                len = field.len(),
                expected = len,
                "dropping ragged field"
            );
        }
    }
    Ok(())
}
