use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Datasource instance settings, in the shape the Grafana host stores them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub json_data: serde_json::Value,
    #[serde(default)]
    pub secure_json_data: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct JsonData {
    #[serde(default)]
    project: String,
    #[serde(default)]
    logstore: String,
}

/// Where and as whom queries are sent.
#[derive(Clone, PartialEq, Eq)]
pub struct LogSource {
    pub endpoint: String,
    pub project: String,
    pub logstore: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl LogSource {
    pub fn load(settings: &DataSourceSettings) -> Result<Self> {
        let json = if settings.json_data.is_null() {
            JsonData {
                project: String::new(),
                logstore: String::new(),
            }
        } else {
            serde_json::from_value::<JsonData>(settings.json_data.clone())
                .map_err(|e| Error::Settings(e.to_string()))?
        };
        if json.project.is_empty() {
            return Err(Error::Settings("project is required".to_string()));
        }
        if json.logstore.is_empty() {
            return Err(Error::Settings("logstore is required".to_string()));
        }
        let secret = |key: &str| {
            settings
                .secure_json_data
                .get(key)
                .cloned()
                .unwrap_or_default()
        };
        Ok(Self {
            endpoint: settings.url.clone(),
            project: json.project,
            logstore: json.logstore,
            access_key_id: secret("accessKeyId"),
            access_key_secret: secret("accessKeySecret"),
        })
    }
}

impl fmt::Debug for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSource")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("logstore", &self.logstore)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn settings(json: serde_json::Value) -> DataSourceSettings {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_load() {
        let source = LogSource::load(&settings(serde_json::json!({
            "url": "cn-hangzhou.log.aliyuncs.com",
            "jsonData": {"project": "demo", "logstore": "access"},
            "secureJsonData": {"accessKeyId": "id", "accessKeySecret": "s3cret"}
        })))
        .unwrap();
        assert_eq!(source.access_key_secret, "s3cret");
        expect![[r#"
            LogSource {
                endpoint: "cn-hangzhou.log.aliyuncs.com",
                project: "demo",
                logstore: "access",
                access_key_id: "id",
                access_key_secret: "<redacted>",
            }
        "#]]
        .assert_debug_eq(&source);
    }

    #[test]
    fn test_load_errors() {
        let err = |json| LogSource::load(&settings(json)).unwrap_err().to_string();
        assert_eq!(
            err(serde_json::json!({})),
            "error reading settings: project is required"
        );
        assert_eq!(
            err(serde_json::json!({"jsonData": {"project": "demo"}})),
            "error reading settings: logstore is required"
        );
        assert!(err(serde_json::json!({"jsonData": {"project": 1}}))
            .starts_with("error reading settings: invalid type"));
    }
}
