use crate::{
    error::Result,
    frame::{Field, Frame, Visualization, FRAME_RESPONSE},
    value::RecordSet,
};

use super::{coerce_float, get};

// * | select traceID,spanID,parentSpanID,service,host,resource,attribute,statusCode,statusMessage,logs,name,start,duration limit 100
pub fn build_trace(records: &RecordSet, frames: &mut Vec<Frame>) -> Result<()> {
    let text = |key: &str| -> Vec<String> {
        records
            .rows()
            .iter()
            .map(|row| get(row, key).to_string())
            .collect()
    };
    // microseconds to milliseconds
    let millis = |key: &str| -> Vec<f64> {
        records
            .rows()
            .iter()
            .map(|row| coerce_float("trace", get(row, key)) / 1000.0)
            .collect()
    };

    let mut frame = Frame::new(FRAME_RESPONSE).with_visualization(Visualization::Trace);
    for field in [
        Field::string("operationName", text("name")),
        Field::string("traceID", text("traceID")),
        Field::string("spanID", text("spanID")),
        Field::string("parentSpanID", text("parentSpanID")),
        Field::string("serviceName", text("service")),
        Field::float("startTime", millis("start")),
        Field::float("duration", millis("duration")),
        Field::string("resource", text("resource")),
        Field::string("host", text("host")),
        Field::string("attribute", text("attribute")),
        Field::string("statusCode", text("statusCode")),
        Field::string("statusMessage", text("statusMessage")),
        Field::string("logs", text("logs")),
    ] {
        frame.push(field)?;
    }
    frames.push(frame);
    Ok(())
}
