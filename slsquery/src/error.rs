use arrow::error::ArrowError;
use datafusion::error::DataFusionError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed datasource settings; fatal for the whole batch.
    #[error("error reading settings: {0}")]
    Settings(String),
    /// The log backend rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    /// A field whose length disagrees with the rest of its frame.
    #[error("frame {frame:?}: field {field:?} has {len} values, expected {expected}")]
    Frame {
        frame: String,
        field: String,
        len: usize,
        expected: usize,
    },
    #[error("query panicked: {0}")]
    Panic(String),
    #[error("query cancelled")]
    Cancelled,
    #[error("duplicate refId {0:?} in batch")]
    DuplicateRefId(String),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl Error {
    /// Converts the payload of a caught panic into an error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Error::Panic(message)
    }
}
