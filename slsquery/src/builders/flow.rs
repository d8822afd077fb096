use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    error::Result,
    frame::{Field, Frame, FIELD_TIME},
    selector::ColumnSelector,
    timestamp,
    value::RecordSet,
};

use super::{coerce_float, get};

/// Builds a grouped time series: one float field per distinct label, over
/// a shared time axis made of the distinct `xcol` values.
///
/// Every (label, time) cell starts at 0.0 and takes the value of the first
/// record carrying that pair; later duplicates are ignored. Needs a
/// selector with at least two parts (label key, value key).
pub fn build_flow_graph(
    records: &RecordSet,
    xcol: &str,
    selector: &ColumnSelector,
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let Some((label_key, value_key)) = selector.pair() else {
        tracing::info!(selector = ?selector, "flow graph needs a label and a value column");
        return Ok(());
    };

    let labels = records
        .rows()
        .iter()
        .map(|row| get(row, label_key))
        .unique()
        .collect::<Vec<_>>();
    let mut axis = records
        .rows()
        .iter()
        .map(|row| get(row, xcol))
        .unique()
        .map(|t| (t, timestamp::normalize(t)))
        .collect::<Vec<_>>();
    axis.sort_by_key(|(_, instant)| *instant);
    let position = axis
        .iter()
        .enumerate()
        .map(|(i, (t, _))| (*t, i))
        .collect::<FxHashMap<_, _>>();

    let mut grid = labels
        .iter()
        .map(|label| (*label, vec![0.0; axis.len()]))
        .collect::<FxHashMap<_, _>>();
    let mut seen = FxHashSet::default();
    for row in records.rows() {
        let (label, t) = (get(row, label_key), get(row, xcol));
        if !seen.insert((label, t)) {
            continue;
        }
        let value = coerce_float("flow_graph", get(row, value_key));
        if let (Some(series), Some(&i)) = (grid.get_mut(label), position.get(t)) {
            series[i] = value;
        }
    }

    let mut frame = Frame::new("");
    for label in &labels {
        let series = grid.remove(label).unwrap_or_default();
        if series.len() == axis.len() {
            frame.push(Field::float(*label, series))?;
        }
    }
    let times = axis.into_iter().map(|(_, t)| t).collect::<Vec<_>>();
    if times.len() == frame.len() {
        frame.push_front(Field::time(FIELD_TIME, times))?;
    }
    frames.push(frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::tests::{floats, names, records};

    fn flow(records: &RecordSet, ycol: &str) -> Vec<Frame> {
        let mut frames = Vec::new();
        build_flow_graph(records, "t", &ColumnSelector::parse(ycol), &mut frames).unwrap();
        frames
    }

    #[test]
    fn test_sparse_cells_are_zero_filled() {
        let records = records(&[
            &[("t", "100"), ("host", "a"), ("pv", "1")],
            &[("t", "300"), ("host", "b"), ("pv", "2")],
            // present only to put a third bucket on the axis
            &[("t", "200"), ("host", "a"), ("pv", "0")],
        ]);
        let frames = flow(&records, "host#:#pv");
        let frame = &frames[0];
        assert_eq!(names(frame), ["time", "a", "b"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(floats(frame, "a"), [1.0, 0.0, 0.0]);
        assert_eq!(floats(frame, "b"), [0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_two_labels_three_buckets_two_records() {
        let records = records(&[
            &[("t", "1700000000"), ("host", "a"), ("pv", "5")],
            &[("t", "1700000120"), ("host", "b"), ("pv", "7")],
            &[("t", "1700000060")],
        ]);
        let frame = &flow(&records, "host#:#pv")[0];
        // the third record adds the label "" with an all-zero series
        assert_eq!(names(frame), ["time", "a", "b", ""]);
        for label in ["a", "b", ""] {
            assert_eq!(floats(frame, label).len(), 3);
        }
        assert_eq!(floats(frame, "a"), [5.0, 0.0, 0.0]);
        assert_eq!(floats(frame, "b"), [0.0, 0.0, 7.0]);
        assert_eq!(floats(frame, ""), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let records = records(&[
            &[("t", "1"), ("host", "a"), ("pv", "1")],
            &[("t", "1"), ("host", "a"), ("pv", "10")],
        ]);
        assert_eq!(floats(&flow(&records, "host#:#pv")[0], "a"), [1.0]);
    }

    #[test]
    fn test_needs_two_parts() {
        let records = records(&[&[("t", "1"), ("host", "a")]]);
        assert!(flow(&records, "host#:#").is_empty());
    }

    #[test]
    fn test_empty_records() {
        let frames = flow(&RecordSet::default(), "host#:#pv");
        assert_eq!(names(&frames[0]), ["time"]);
        assert_eq!(frames[0].len(), 0);
    }

    #[test]
    fn test_idempotent() {
        let records = records(&[
            &[("t", "1700000060"), ("host", "b"), ("pv", "2")],
            &[("t", "1700000000"), ("host", "a"), ("pv", "1")],
            &[("t", "1700000000"), ("host", "b"), ("pv", "3")],
        ]);
        assert_eq!(flow(&records, "host#:#pv"), flow(&records, "host#:#pv"));
    }
}
