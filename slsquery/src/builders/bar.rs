use crate::{
    error::Result,
    frame::{Field, Frame, FRAME_RESPONSE},
    selector::ColumnSelector,
    value::RecordSet,
};

use super::{float_values, push_consensus, string_values};

/// Builds a bar chart: the first column is the category, the remaining
/// columns are numeric series.
pub fn build_bar_graph(
    records: &RecordSet,
    selector: &ColumnSelector,
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let Some((category, numeric)) = selector.columns().split_first() else {
        return Ok(());
    };
    let mut fields = vec![Field::string(category, string_values(records, category))];
    fields.extend(
        numeric
            .iter()
            .map(|key| Field::float(key, float_values("bar_graph", records, key))),
    );

    let mut frame = Frame::new(FRAME_RESPONSE);
    push_consensus("bar_graph", &mut frame, fields)?;
    frames.push(frame);
    Ok(())
}
