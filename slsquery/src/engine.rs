use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    client::{GetLogsRequest, LogClient},
    error::{Error, Result},
    exec::{DataQuery, Executor, QueryResult},
    source::{DataSourceSettings, LogSource},
};

// See https://docs.rs/indexmap/latest/indexmap/#alternate-hashers
type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Query sent by the health probe.
pub const HEALTH_QUERY: &str = "* | select count(*)";
/// How far back the health probe looks.
const HEALTH_WINDOW: Duration = Duration::seconds(60);

/// Results of a batch keyed by refId, in submission order.
#[derive(Debug, Default, Serialize)]
pub struct QueryDataResponse {
    pub results: FxIndexMap<String, QueryResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

/// Fans a batch of queries out to one task each and collects the results.
#[derive(Clone)]
pub struct QueryEngine {
    client: Arc<dyn LogClient>,
}

impl QueryEngine {
    pub fn new(client: Arc<dyn LogClient>) -> Self {
        Self { client }
    }

    /// Runs every query of the batch concurrently.
    ///
    /// Every query gets an entry in the response, whether it succeeded,
    /// failed or panicked. Only bad settings, duplicate refIds and
    /// cancellation of `token` fail the batch as a whole.
    pub async fn query_data(
        &self,
        settings: &DataSourceSettings,
        queries: Vec<DataQuery>,
        token: CancellationToken,
    ) -> Result<QueryDataResponse> {
        let source = Arc::new(LogSource::load(settings)?);
        let mut seen = FxHashSet::default();
        for query in &queries {
            if !seen.insert(query.ref_id.as_str()) {
                return Err(Error::DuplicateRefId(query.ref_id.clone()));
            }
        }

        let total = queries.len();
        let mut slots = queries
            .iter()
            .map(|q| (q.ref_id.clone(), None))
            .collect::<FxIndexMap<_, Option<QueryResult>>>();
        if total == 0 {
            return Ok(QueryDataResponse::default());
        }
        tracing::info!(queries = total, project = %source.project, "dispatching batch");

        let (tx, mut rx) = mpsc::channel(total);
        let workers = token.child_token();
        for query in queries {
            let tx = tx.clone();
            let exec = Executor::new(Arc::clone(&self.client), Arc::clone(&source));
            let token = workers.clone();
            tokio::spawn(async move {
                let result = exec.exec(&query, &token).await;
                if tx.send(result).await.is_err() {
                    tracing::warn!(ref_id = %query.ref_id, "batch abandoned, dropping result");
                }
            });
        }
        drop(tx);

        for _ in 0..total {
            let result = tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                result = rx.recv() => result.ok_or_else(|| {
                    Error::Dispatch("a query task exited without a result".to_string())
                })?,
            };
            if let Some(slot) = slots.get_mut(&result.ref_id) {
                *slot = Some(result);
            }
        }

        let results = slots
            .into_iter()
            .filter_map(|(ref_id, result)| Some((ref_id, result?)))
            .collect::<FxIndexMap<_, _>>();
        let failed = results.values().filter(|r| !r.is_ok()).count();
        tracing::info!(queries = total, failed, "batch done");
        Ok(QueryDataResponse { results })
    }

    /// Probes the log source with a count over the last minute.
    pub async fn check_health(&self, settings: &DataSourceSettings) -> Result<HealthCheckResult> {
        let source = LogSource::load(settings)?;
        let now = OffsetDateTime::now_utc();
        let req = GetLogsRequest {
            query: HEALTH_QUERY.to_string(),
            from: (now - HEALTH_WINDOW).unix_timestamp(),
            to: now.unix_timestamp(),
            line: 0,
            offset: 0,
            reverse: true,
        };
        Ok(match self.client.get_logs(&source, &req).await {
            Ok(_) => HealthCheckResult {
                status: HealthStatus::Ok,
                message: "Data source is working".to_string(),
            },
            Err(error) => {
                tracing::warn!(%error, "health check failed");
                HealthCheckResult {
                    status: HealthStatus::Error,
                    message: error.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datafusion::MemoryLogStore,
        exec::tests::{mock, MockClient},
        frame::FieldValues,
        value::record,
    };
    use expect_test::expect;

    fn settings() -> DataSourceSettings {
        serde_json::from_value(serde_json::json!({
            "url": "localhost",
            "jsonData": {"project": "demo", "logstore": "access"}
        }))
        .unwrap()
    }

    fn engine(client: MockClient) -> QueryEngine {
        QueryEngine::new(Arc::new(client))
    }

    fn batch(texts: &[(&str, &str)]) -> Vec<DataQuery> {
        texts
            .iter()
            .map(|(ref_id, text)| DataQuery::new(*ref_id, *text))
            .collect()
    }

    #[tokio::test]
    async fn test_every_query_gets_a_result() {
        let engine = engine(mock(&[&[("__time__", "1700000000"), ("a", "1")]], &[]));
        let resp = engine
            .query_data(
                &settings(),
                batch(&[("A", "*"), ("B", "fail"), ("C", "panic"), ("D", "a:1")]),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(resp.results.keys().collect::<Vec<_>>(), ["A", "B", "C", "D"]);
        let errors = resp
            .results
            .values()
            .map(|r| r.error.as_ref().map(|e| e.to_string()))
            .collect::<Vec<_>>();
        expect![[r#"
            [
                None,
                Some(
                    "query failed: backend unavailable",
                ),
                Some(
                    "query panicked: client exploded",
                ),
                None,
            ]
        "#]]
        .assert_debug_eq(&errors);
        assert_eq!(resp.results["A"].frames.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_errors() {
        let engine = engine(mock(&[], &[]));
        let err = engine
            .query_data(&settings(), batch(&[("A", "*"), ("A", "*")]), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRefId(ref id) if id == "A"));

        let err = engine
            .query_data(
                &DataSourceSettings::default(),
                batch(&[("A", "*")]),
                CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Settings(_)));

        let resp = engine
            .query_data(&settings(), Vec::new(), CancellationToken::new())
            .await
            .unwrap();
        assert!(resp.results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_batch() {
        let engine = engine(mock(&[], &[]));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = engine
            .query_data(&settings(), batch(&[("A", "*"), ("B", "hang")]), token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_health() {
        let engine = engine(mock(&[], &[]));
        let ok = engine.check_health(&settings()).await.unwrap();
        assert_eq!(ok.status, HealthStatus::Ok);

        let store = QueryEngine::new(Arc::new(MemoryLogStore::new()));
        let down = store.check_health(&settings()).await.unwrap();
        expect![[r#"{"status":"ERROR","message":"query failed: logstore demo/access does not exist"}"#]]
            .assert_eq(&serde_json::to_string(&down).unwrap());

        assert!(engine.check_health(&DataSourceSettings::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_flow_graph_from_store() {
        let store = MemoryLogStore::new();
        store
            .insert(
                "demo",
                "access",
                vec![
                    record([("__time__", "1700000000"), ("host", "a")]),
                    record([("__time__", "1700000000"), ("host", "a")]),
                    record([("__time__", "1700000060"), ("host", "b")]),
                ],
            )
            .await;
        let engine = QueryEngine::new(Arc::new(store));
        let mut query = DataQuery::new(
            "A",
            "* | select __time__ - __time__ % $1m as t, host, count(*) as pv group by t, host order by t, host",
        );
        query.xcol = "t".to_string();
        query.ycol = "host#:#pv".to_string();
        query.time_range.to = OffsetDateTime::from_unix_timestamp(1_700_000_120).unwrap();

        let resp = engine
            .query_data(&settings(), vec![query], CancellationToken::new())
            .await
            .unwrap();
        let result = &resp.results["A"];
        assert!(result.is_ok(), "{:?}", result.error);
        let frame = &result.frames[0];
        let fields = frame
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), &f.values))
            .collect::<Vec<_>>();
        assert_eq!(fields[1], ("a", &FieldValues::Float(vec![2.0, 0.0])));
        assert_eq!(fields[2], ("b", &FieldValues::Float(vec![0.0, 1.0])));
        assert_eq!(fields[0].0, "time");
    }
}
