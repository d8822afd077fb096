pub mod builders;
pub mod client;
pub mod datafusion;
mod engine;
pub mod error;
pub mod exec;
pub mod frame;
pub mod macros;
pub mod selector;
pub mod source;
pub mod stream;
pub mod timestamp;
pub mod value;

pub use {
    client::{GetLogsRequest, GetLogsResponse, LogClient},
    datafusion::MemoryLogStore,
    engine::{HealthCheckResult, HealthStatus, QueryDataResponse, QueryEngine, HEALTH_QUERY},
    error::{Error, Result},
    exec::{DataQuery, Executor, QueryResult, Shape, TimeRange},
    frame::{Field, FieldValues, Frame, Visualization},
    source::{DataSourceSettings, LogSource},
};
