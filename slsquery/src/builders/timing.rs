use crate::{
    error::Result,
    frame::{Field, Frame, FIELD_TIME},
    timestamp,
    value::RecordSet,
};

use super::{coerce_float, is_reserved, unique};

const BUILDER: &str = "timing_graph";

/// Builds a time series frame: a time field from `xcol` followed by one
/// float field per y column, with rows ordered by the x instant.
///
/// Rows are ordered stably, so rows sharing an x value keep their input
/// order. Fields whose length differs from the longest y field are dropped.
pub fn build_timing_graph(
    records: &RecordSet,
    xcol: &str,
    ycols: &[String],
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let mut rows = records
        .rows()
        .iter()
        .map(|row| {
            let value = row.get(xcol).map_or("", String::as_str);
            let key = timestamp::sort_key(value).unwrap_or_else(|| {
                tracing::warn!(builder = BUILDER, value, "unsortable x value, using 0");
                0.0
            });
            (key, row)
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Reserved keys are skipped only when the columns are inferred.
    let ycols = if ycols.is_empty() {
        let inferred = if records.schema().is_empty() {
            records.columns()
        } else {
            records.schema()
        };
        unique(inferred)
            .into_iter()
            .filter(|y| y != xcol && !is_reserved(y))
            .collect::<Vec<_>>()
    } else {
        unique(ycols).into_iter().filter(|y| y != xcol).collect()
    };

    let times = rows
        .iter()
        .filter_map(|(_, row)| row.get(xcol))
        .map(|v| timestamp::normalize(v))
        .collect::<Vec<_>>();
    let series = ycols
        .iter()
        .map(|y| {
            let values = rows
                .iter()
                .filter_map(|(_, row)| row.get(y))
                .map(|v| coerce_float(BUILDER, v))
                .collect();
            Field::float(y, values)
        })
        .collect::<Vec<_>>();

    let len = series.iter().map(Field::len).max().unwrap_or(0);
    let mut frame = Frame::new("");
    if times.len() == len {
        frame.push(Field::time(FIELD_TIME, times))?;
    } else {
        tracing::warn!(builder = BUILDER, times = times.len(), expected = len, "dropping time field");
    }
    for field in series {
        if field.len() == len {
            frame.push(field)?;
        } else {
            tracing::warn!(builder = BUILDER, field = %field.name, "dropping ragged field");
        }
    }
    frames.push(frame);
    Ok(())
}
