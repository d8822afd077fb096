use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::{
    error::Result,
    frame::{Field, Frame, Visualization, FIELD_TIME, FRAME_RESPONSE},
    timestamp,
    value::{self, RecordSet},
};

/// Renders every record as one `key="value"` log line.
///
/// Keys are written in lexicographic order; when `allow` is non-empty only
/// the listed keys are written. Double quotes inside values become single
/// quotes. The `__time__` column of each row feeds a parallel time field.
pub fn build_logs(records: &RecordSet, allow: &[String], frames: &mut Vec<Frame>) -> Result<()> {
    let allow = allow.iter().map(String::as_str).collect::<FxHashSet<_>>();

    let mut times = Vec::with_capacity(records.len());
    let mut messages = Vec::with_capacity(records.len());
    for row in records.rows() {
        if let Some(t) = row.get(value::FIELD_TIME) {
            times.push(timestamp::normalize(t));
        }
        let message = row
            .iter()
            .filter(|(k, _)| allow.is_empty() || allow.contains(k.as_str()))
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "'")))
            .join(" ");
        messages.push(message);
    }

    let mut frame = Frame::new(FRAME_RESPONSE).with_visualization(Visualization::Logs);
    if times.len() == messages.len() {
        frame.push(Field::time(FIELD_TIME, times))?;
    } else {
        tracing::warn!(
            rows = messages.len(),
            times = times.len(),
            "some logs have no {}, dropping time field",
            value::FIELD_TIME
        );
    }
    frame.push(Field::string("message", messages))?;
    frames.push(frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::tests::{names, records, strings};
    use expect_test::expect;

    #[test]
    fn test_build_logs() {
        let records = records(&[
            &[("__time__", "1700000000"), ("msg", r#"say "hi""#), ("host", "a")],
            &[("__time__", "1700000060"), ("host", "b")],
        ]);
        let mut frames = Vec::new();
        build_logs(&records, &[], &mut frames).unwrap();
        let frame = &frames[0];
        assert_eq!(names(frame), ["time", "message"]);
        expect![[r#"
            [
                "__time__=\"1700000000\" host=\"a\" msg=\"say 'hi'\"",
                "__time__=\"1700000060\" host=\"b\"",
            ]
        "#]]
        .assert_debug_eq(&strings(frame, "message"));
        assert_eq!(
            frame.meta.as_ref().unwrap().preferred_visualisation_type,
            Visualization::Logs
        );
    }

    #[test]
    fn test_build_logs_allow_list() {
        let records = records(&[&[("__time__", "1"), ("a", "1"), ("b", "2")]]);
        let mut frames = Vec::new();
        build_logs(&records, &["b".to_string()], &mut frames).unwrap();
        assert_eq!(strings(&frames[0], "message"), [r#"b="2""#]);
        assert_eq!(frames[0].len(), 1);
    }

    #[test]
    fn test_build_logs_missing_time_drops_time_field() {
        let records = records(&[&[("__time__", "1"), ("a", "1")], &[("a", "2")]]);
        let mut frames = Vec::new();
        build_logs(&records, &[], &mut frames).unwrap();
        assert_eq!(names(&frames[0]), ["message"]);
        assert_eq!(frames[0].len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let records = records(&[
            &[("__time__", "1700000060"), ("b", "2"), ("a", "1")],
            &[("__time__", "1700000000"), ("a", "3")],
        ]);
        let (mut first, mut second) = (Vec::new(), Vec::new());
        build_logs(&records, &[], &mut first).unwrap();
        build_logs(&records, &[], &mut second).unwrap();
        assert_eq!(first, second);
    }
}
