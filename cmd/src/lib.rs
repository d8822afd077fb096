use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::{fs, path::Path};

use slsquery::{value::Record, DataSourceSettings, MemoryLogStore};

pub mod api;
pub mod http;

/// A sample file: the logs of one logstore.
#[derive(Debug, Deserialize)]
struct SampleFile {
    project: String,
    logstore: String,
    logs: Vec<Record>,
}

/// Logs loaded from the samples directory.
pub struct Samples {
    pub store: MemoryLogStore,
    /// Earliest `__time__`, unix seconds.
    pub start: i64,
    /// One past the latest `__time__`, unix seconds.
    pub end: i64,
}

/// Loads every `*.json` file of `samples_dir` into a fresh store.
pub async fn load_samples(samples_dir: impl AsRef<Path>) -> Result<Samples> {
    let samples_dir = samples_dir.as_ref();
    let paths = fs::read_dir(samples_dir).wrap_err_with(|| format!("{}", samples_dir.display()))?;
    let store = MemoryLogStore::new();
    let (mut start, mut end) = (i64::MAX, i64::MIN);
    for dentry in paths {
        let path = dentry?.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let data = fs::read(&path).wrap_err_with(|| format!("{}", path.display()))?;
        let file: SampleFile = serde_json::from_slice(&data)
            .map_err(|e| eyre!("Failed to parse JSON file {}: {e}", path.display()))?;
        for t in file
            .logs
            .iter()
            .filter_map(|log| log.get(slsquery::value::FIELD_TIME)?.parse::<i64>().ok())
        {
            start = start.min(t);
            end = end.max(t + 1);
        }
        tracing::info!(
            path = %path.display(),
            project = %file.project,
            logstore = %file.logstore,
            logs = file.logs.len(),
            "loaded samples"
        );
        store.insert(&file.project, &file.logstore, file.logs).await;
    }
    if start > end {
        return Err(eyre!("no timestamped logs in {}", samples_dir.display()));
    }
    Ok(Samples { store, start, end })
}

/// Reads datasource settings from a JSON file.
pub fn load_settings(path: impl AsRef<Path>) -> Result<DataSourceSettings> {
    let path = path.as_ref();
    let data = fs::read(path).wrap_err_with(|| format!("{}", path.display()))?;
    serde_json::from_slice(&data)
        .wrap_err_with(|| format!("failed to parse settings file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slsquery::{client::GetLogsRequest, LogClient, LogSource};

    const SAMPLES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../samples");

    #[tokio::test]
    async fn test_load_samples() {
        let samples = load_samples(SAMPLES_DIR).await.unwrap();
        assert_eq!((samples.start, samples.end), (1_700_000_000, 1_700_003_591));

        let source = LogSource::load(&serde_json::from_value(serde_json::json!({
            "jsonData": {"project": "demo", "logstore": "access"}
        })).unwrap())
        .unwrap();
        let req = GetLogsRequest {
            query: "* | select count(*) as c".to_string(),
            from: samples.start,
            to: samples.end,
            line: 0,
            offset: 0,
            reverse: true,
        };
        let resp = samples.store.get_logs(&source, &req).await.unwrap();
        assert_eq!(resp.logs[0]["c"], "360");
    }

    #[test]
    fn test_load_missing_settings() {
        let err = load_settings("/nonexistent/settings.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/settings.json"));
    }
}
