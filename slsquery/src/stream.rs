//! Live stream channels. Only the `stream` path can be subscribed to, and
//! clients can never publish.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{interval_at, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    frame::{Field, Frame, FIELD_TIME, FRAME_RESPONSE},
};

pub const STREAM_PATH: &str = "stream";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StreamStatus {
    Ok,
    PermissionDenied,
}

pub fn subscribe(path: &str) -> StreamStatus {
    tracing::info!(path, "subscribe stream");
    if path == STREAM_PATH {
        StreamStatus::Ok
    } else {
        StreamStatus::PermissionDenied
    }
}

pub fn publish(path: &str) -> StreamStatus {
    tracing::info!(path, "publish stream");
    StreamStatus::PermissionDenied
}

/// Sends a `time`/`values` frame every `interval` until `token` is
/// cancelled or the receiver goes away. Values alternate between 10 and 20.
pub async fn run(
    path: &str,
    interval: Duration,
    sender: mpsc::Sender<Frame>,
    token: CancellationToken,
) -> Result<()> {
    tracing::info!(path, ?interval, "run stream");
    let mut ticks = interval_at(Instant::now() + interval, interval);
    let mut counter = 0u64;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!(path, "stream cancelled");
                return Ok(());
            }
            _ = ticks.tick() => {}
        }
        let value = (10 * (counter % 2 + 1)) as f64;
        counter += 1;

        let mut frame = Frame::new(FRAME_RESPONSE);
        frame.push(Field::time(FIELD_TIME, vec![OffsetDateTime::now_utc()]))?;
        frame.push(Field::float("values", vec![value]))?;
        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::error!(path, "stream receiver is lagging, dropping frame");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::info!(path, "stream receiver closed");
                return Ok(());
            }
        }
    }
}
