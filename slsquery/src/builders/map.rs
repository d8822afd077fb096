use crate::{
    error::Result,
    frame::{Field, Frame, FRAME_RESPONSE},
    selector::ColumnSelector,
    value::RecordSet,
};

use super::{float_values, push_consensus, string_values};

/// Builds a categorical map: every selected column but the last is a
/// string field (region, city, ...), the last one is the numeric value.
pub fn build_map_graph(
    records: &RecordSet,
    selector: &ColumnSelector,
    frames: &mut Vec<Frame>,
) -> Result<()> {
    let Some((numeric, keys)) = selector.columns().split_last() else {
        return Ok(());
    };
    let mut fields = keys
        .iter()
        .map(|key| Field::string(key, string_values(records, key)))
        .collect::<Vec<_>>();
    fields.push(Field::float(numeric, float_values("map_graph", records, numeric)));

    let mut frame = Frame::new(FRAME_RESPONSE);
    push_consensus("map_graph", &mut frame, fields)?;
    frames.push(frame);
    Ok(())
}
