use crate::{
    error::Result,
    frame::{Field, Frame, FIELD_TIME, FRAME_RESPONSE},
    timestamp,
    value::RecordSet,
};

use super::{is_reserved, string_values, unique};

/// Builds a generic table with one string field per column.
///
/// With no `ycols` the columns come from the declared key schema, or else
/// from the first record minus the reserved keys. A column absent from some
/// row is dropped. When `xcol` is set it is parsed into a trailing time
/// field, kept only if every row produced an instant. The executor routes
/// tables without an x column, so only direct callers set it.
pub fn build_table(
    records: &RecordSet,
    xcol: Option<&str>,
    ycols: &[String],
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let ycols = if ycols.is_empty() {
        inferred_columns(records)
    } else {
        unique(ycols)
    };

    let mut frame = Frame::new(FRAME_RESPONSE);
    for key in &ycols {
        if !records.is_dense(key) {
            tracing::warn!(builder = "table", column = %key, "column missing from some rows, dropped");
            continue;
        }
        frame.push(Field::string(key, string_values(records, key)))?;
    }

    if let Some(xcol) = xcol {
        let times = records
            .values(xcol)
            .filter_map(|v| {
                let t = timestamp::parse(v);
                if t.is_none() {
                    tracing::warn!(builder = "table", value = v, "unparsable time, skipped");
                }
                t
            })
            .collect::<Vec<_>>();
        if times.len() == records.len() {
            frame.push(Field::time(FIELD_TIME, times))?;
        } else {
            tracing::warn!(
                builder = "table",
                rows = records.len(),
                times = times.len(),
                "dropping time field"
            );
        }
    }
    frames.push(frame);
    Ok(())
}

fn inferred_columns(records: &RecordSet) -> Vec<String> {
    if !records.schema().is_empty() {
        return unique(records.schema());
    }
    records
        .rows()
        .first()
        .map(|row| row.keys().filter(|k| !is_reserved(k)).cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::tests::{names, records, strings};

    #[test]
    fn test_build_table() {
        let records = records(&[&[("a", "1"), ("b", "x")], &[("a", "2"), ("b", "y")]]);
        let mut frames = Vec::new();
        build_table(&records, None, &["a".into(), "b".into()], &mut frames).unwrap();
        let frame = &frames[0];
        assert_eq!(names(frame), ["a", "b"]);
        assert_eq!(strings(frame, "a"), ["1", "2"]);
        assert_eq!(strings(frame, "b"), ["x", "y"]);
    }

    #[test]
    fn test_build_table_infers_columns() {
        let rows = records(&[
            &[("__time__", "1"), ("__source__", "h"), ("b", "x"), ("a", "1")],
            &[("__time__", "2"), ("a", "2"), ("b", "y")],
        ]);
        let mut frames = Vec::new();
        build_table(&rows, None, &[], &mut frames).unwrap();
        assert_eq!(names(&frames[0]), ["b", "a"]);

        // declared schema wins
        let rows = rows.with_schema(vec!["a".into(), "__time__".into()]);
        build_table(&rows, None, &[], &mut frames).unwrap();
        assert_eq!(names(&frames[1]), ["a", "__time__"]);
    }

    #[test]
    fn test_build_table_drops_sparse_column() {
        let records = records(&[&[("a", "1"), ("b", "x")], &[("a", "2")]]);
        let mut frames = Vec::new();
        build_table(&records, None, &["a".into(), "b".into()], &mut frames).unwrap();
        assert_eq!(names(&frames[0]), ["a"]);
    }

    #[test]
    fn test_build_table_time_column() {
        let rows = records(&[&[("t", "1700000000"), ("a", "1")], &[("t", "1700000060"), ("a", "2")]]);
        let mut frames = Vec::new();
        build_table(&rows, Some("t"), &["a".into()], &mut frames).unwrap();
        assert_eq!(names(&frames[0]), ["a", "time"]);

        let rows = records(&[&[("t", "1700000000"), ("a", "1")], &[("t", "bad"), ("a", "2")]]);
        build_table(&rows, Some("t"), &["a".into()], &mut frames).unwrap();
        assert_eq!(names(&frames[1]), ["a"]);
    }

    #[test]
    fn test_idempotent() {
        let records = records(&[
            &[("t", "1700000000"), ("a", "1"), ("b", "x")],
            &[("t", "1700000060"), ("a", "2")],
        ]);
        let (mut first, mut second) = (Vec::new(), Vec::new());
        build_table(&records, Some("t"), &[], &mut first).unwrap();
        build_table(&records, Some("t"), &[], &mut second).unwrap();
        assert_eq!(first, second);
    }
}
