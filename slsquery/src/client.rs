use async_trait::async_trait;
use serde::Deserialize;

use crate::{error::Result, source::LogSource, value::Record};

/// One GetLogs call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetLogsRequest {
    /// `search | sql` query text, macros already expanded.
    pub query: String,
    /// Unix seconds.
    pub from: i64,
    /// Unix seconds.
    pub to: i64,
    /// Page size; 0 lets the backend choose.
    pub line: i64,
    pub offset: i64,
    /// Newest first.
    pub reverse: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetLogsResponse {
    pub logs: Vec<Record>,
    /// JSON metadata; `{"keys": [...]}` lists the result columns of a SQL query.
    pub contents: String,
    pub count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Contents {
    #[serde(default)]
    pub keys: Vec<String>,
}

impl GetLogsResponse {
    /// Parses [`contents`](Self::contents); an empty string means no keys.
    pub fn contents(&self) -> Result<Contents> {
        if self.contents.trim().is_empty() {
            return Ok(Contents::default());
        }
        Ok(serde_json::from_str(&self.contents)?)
    }
}

/// The log-query backend.
#[async_trait]
pub trait LogClient: Send + Sync {
    async fn get_logs(&self, source: &LogSource, req: &GetLogsRequest) -> Result<GetLogsResponse>;
}
