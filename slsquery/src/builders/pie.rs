use crate::{
    error::Result,
    frame::{Field, Frame, FRAME_RESPONSE},
    selector::ColumnSelector,
    value::RecordSet,
};

use super::{coerce_float, get};

/// Builds a pie chart: one single-value float field per record, named after
/// the record's label.
///
/// Each label is resolved by scanning the whole record set for the first
/// record carrying it, so this is quadratic in the number of records; a
/// label no record carries (a row without the label key) reads as 0.0.
pub fn build_pie_graph(
    records: &RecordSet,
    selector: &ColumnSelector,
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let Some((label_key, value_key)) = selector.pair() else {
        return Ok(());
    };

    let mut frame = Frame::new(FRAME_RESPONSE);
    for row in records.rows() {
        let label = get(row, label_key);
        let value = records
            .rows()
            .iter()
            .find(|r| r.get(label_key).map(String::as_str) == Some(label))
            .map_or(0.0, |r| coerce_float("pie_graph", get(r, value_key)));
        frame.push(Field::float(label, vec![value]))?;
    }
    frames.push(frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::tests::{names, records};
    use crate::frame::FieldValues;

    fn pie(records: &RecordSet) -> Frame {
        let mut frames = Vec::new();
        build_pie_graph(records, &ColumnSelector::parse("status,c"), &mut frames).unwrap();
        frames.remove(0)
    }

    #[test]
    fn test_build_pie_graph() {
        let frame = pie(&records(&[
            &[("status", "200"), ("c", "90")],
            &[("status", "404"), ("c", "bad")],
            &[("status", "200"), ("c", "5")],
        ]));
        assert_eq!(names(&frame), ["200", "404", "200"]);
        let values = frame
            .fields()
            .iter()
            .map(|f| f.values.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            [
                FieldValues::Float(vec![90.0]),
                FieldValues::Float(vec![0.0]),
                FieldValues::Float(vec![90.0]),
            ]
        );
    }

    #[test]
    fn test_unmatched_label_is_zero() {
        let frame = pie(&records(&[&[("c", "3")], &[("status", "500"), ("c", "1")]]));
        assert_eq!(names(&frame), ["", "500"]);
        assert_eq!(frame.fields()[0].values, FieldValues::Float(vec![0.0]));
        assert_eq!(frame.fields()[1].values, FieldValues::Float(vec![1.0]));
    }

    #[test]
    fn test_needs_two_parts() {
        let mut frames = Vec::new();
        build_pie_graph(
            &records(&[&[("status", "200")]]),
            &ColumnSelector::parse("status"),
            &mut frames,
        )
        .unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let records = records(&[
            &[("status", "500"), ("c", "1")],
            &[("status", "200"), ("c", "9")],
        ]);
        assert_eq!(pie(&records), pie(&records));
    }
}
