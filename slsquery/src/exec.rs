use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use serde::{
    ser::{SerializeMap, Serializer},
    Deserialize, Serialize,
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    builders,
    client::{GetLogsRequest, LogClient},
    error::{Error, Result},
    frame::Frame,
    macros,
    selector::ColumnSelector,
    source::LogSource,
    value::RecordSet,
};

pub const DEFAULT_LOGS_PER_PAGE: i64 = 100;
pub const DEFAULT_CURRENT_PAGE: i64 = 1;

/// One query of a batch, as sent by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub ref_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub xcol: String,
    #[serde(default)]
    pub ycol: String,
    #[serde(default = "default_logs_per_page")]
    pub logs_per_page: i64,
    #[serde(default = "default_current_page")]
    pub current_page: i64,
    #[serde(default)]
    pub time_range: TimeRange,
    /// Output-shape hint; only logged.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Output-shape hint; only logged.
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub hide: bool,
}

fn default_logs_per_page() -> i64 {
    DEFAULT_LOGS_PER_PAGE
}

fn default_current_page() -> i64 {
    DEFAULT_CURRENT_PAGE
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            query: query.into(),
            xcol: String::new(),
            ycol: String::new(),
            logs_per_page: DEFAULT_LOGS_PER_PAGE,
            current_page: DEFAULT_CURRENT_PAGE,
            time_range: TimeRange::default(),
            kind: String::new(),
            mode: String::new(),
            hide: false,
        }
    }

    /// Row offset of the requested page; pages below 1 read as the first.
    pub fn offset(&self) -> i64 {
        (self.current_page.max(1) - 1).saturating_mul(self.logs_per_page)
    }
}

/// Absolute query window, unix seconds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeRange {
    #[serde(with = "time::serde::timestamp")]
    pub from: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub to: OffsetDateTime,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            from: OffsetDateTime::UNIX_EPOCH,
            to: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

/// The builder a query is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
    Trace,
    Logs,
    FlowGraph,
    BarGraph,
    MapGraph,
    PieGraph,
    TimingGraph,
    Table,
}

impl Shape {
    /// Routes a query; the first matching rule wins.
    pub fn select(query: &DataQuery) -> Self {
        match query.xcol.as_str() {
            "trace" => Shape::Trace,
            _ if !query.query.contains('|') => Shape::Logs,
            _ if ColumnSelector::parse(&query.ycol).is_grouped() => Shape::FlowGraph,
            "bar" => Shape::BarGraph,
            "map" => Shape::MapGraph,
            "pie" => Shape::PieGraph,
            "" | "table" => Shape::Table,
            _ => Shape::TimingGraph,
        }
    }

    fn build(self, query: &DataQuery, records: &RecordSet) -> Result<Vec<Frame>> {
        let selector = ColumnSelector::parse(&query.ycol);
        let xcol = query.xcol.as_str();
        let mut frames = Vec::new();
        match self {
            Shape::Trace => builders::build_trace(records, &mut frames)?,
            Shape::Logs => builders::build_logs(records, selector.columns(), &mut frames)?,
            Shape::FlowGraph => builders::build_flow_graph(records, xcol, &selector, &mut frames)?,
            Shape::BarGraph => builders::build_bar_graph(records, &selector, &mut frames)?,
            Shape::MapGraph => builders::build_map_graph(records, &selector, &mut frames)?,
            Shape::PieGraph => builders::build_pie_graph(records, &selector, &mut frames)?,
            Shape::TimingGraph => {
                builders::build_timing_graph(records, xcol, selector.columns(), &mut frames)?
            }
            // Only routed here when `xcol` is empty or "table", so no time column.
            Shape::Table => {
                builders::build_table(records, None, selector.columns(), &mut frames)?
            }
        }
        Ok(frames)
    }
}

/// Outcome of one query: its frames, or the error that stopped it.
#[derive(Debug)]
pub struct QueryResult {
    pub ref_id: String,
    pub frames: Vec<Frame>,
    pub error: Option<Error>,
}

impl QueryResult {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            frames: Vec::new(),
            error: None,
        }
    }

    pub fn with_error(ref_id: impl Into<String>, error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::new(ref_id)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Serialize for QueryResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("frames", &self.frames)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", &error.to_string())?;
        }
        map.end()
    }
}

/// Runs single queries against one log source.
#[derive(Clone)]
pub struct Executor {
    client: Arc<dyn LogClient>,
    source: Arc<LogSource>,
}

impl Executor {
    pub fn new(client: Arc<dyn LogClient>, source: Arc<LogSource>) -> Self {
        Self { client, source }
    }

    /// Runs `query` to completion. Failures, panics included, end up in the
    /// returned result rather than propagating.
    #[tracing::instrument(skip_all, fields(ref_id = %query.ref_id))]
    pub async fn exec(&self, query: &DataQuery, token: &CancellationToken) -> QueryResult {
        if query.hide {
            return QueryResult::new(&query.ref_id);
        }
        match AssertUnwindSafe(self.run(query, token))
            .catch_unwind()
            .await
        {
            Ok(Ok(frames)) => QueryResult {
                frames,
                ..QueryResult::new(&query.ref_id)
            },
            Ok(Err(error)) => {
                tracing::error!(%error, query = %query.query, "query failed");
                QueryResult::with_error(&query.ref_id, error)
            }
            Err(payload) => {
                let error = Error::from_panic(payload);
                tracing::error!(%error, query = %query.query, "recovered from panic");
                QueryResult::with_error(&query.ref_id, error)
            }
        }
    }

    async fn run(&self, query: &DataQuery, token: &CancellationToken) -> Result<Vec<Frame>> {
        let TimeRange { from, to } = query.time_range;
        let req = GetLogsRequest {
            query: macros::expand(&query.query, from, to),
            from: from.unix_timestamp(),
            to: to.unix_timestamp(),
            line: query.logs_per_page,
            offset: query.offset(),
            reverse: true,
        };
        tracing::info!(
            query = %req.query,
            from = req.from,
            to = req.to,
            offset = req.offset,
            kind = %query.kind,
            mode = %query.mode,
            "running query"
        );
        let resp = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            resp = self.client.get_logs(&self.source, &req) => resp?,
        };

        let keys = resp.contents()?.keys;
        let records = RecordSet::new(resp.logs).with_schema(keys);
        let shape = Shape::select(query);
        tracing::info!(%shape, rows = records.len(), "building frames");
        shape.build(query, &records)
    }
}
