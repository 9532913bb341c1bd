//! BigQuery streaming insert sink.
//!
//! Appends rows through `tabledata.insertAll`:
//!
//! ```text
//! POST {endpoint}/bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}/insertAll
//! {"rows": [{"json": {...}}, ...]}
//! ```
//!
//! A 2xx response may still carry per-row `insertErrors`; any such error
//! rejects the batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use super::traits::RowSink;
use crate::config::DestinationConfig;
use crate::error::{LoadError, TransportSnafu};
use crate::record::PageviewRow;

/// Longest response body excerpt kept in an error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a PageviewRow,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Deserialize)]
struct RowErrors {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    message: String,
}

impl RowErrors {
    fn describe(&self) -> String {
        let details: Vec<String> = self
            .errors
            .iter()
            .map(|e| match e.location.as_str() {
                "" => format!("{}: {}", e.reason, e.message),
                location => format!("{} at {}: {}", e.reason, location, e.message),
            })
            .collect();
        format!("row {}: {}", self.index, details.join(", "))
    }
}

/// Sink writing to one BigQuery table.
pub struct BigQuerySink {
    client: reqwest::Client,
    url: String,
    table: String,
    access_token: String,
}

impl BigQuerySink {
    /// Build a sink for the configured table.
    pub fn new(config: &DestinationConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.load_timeout())
            .build()?;
        Ok(Self::with_client(config, client))
    }

    /// Build a sink around an existing client.
    pub fn with_client(config: &DestinationConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            url: insert_all_url(config),
            table: config.table_ref(),
            access_token: config.access_token.clone(),
        }
    }
}

fn insert_all_url(config: &DestinationConfig) -> String {
    format!(
        "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
        config.endpoint.trim_end_matches('/'),
        config.project_id,
        config.dataset,
        config.table
    )
}

#[async_trait]
impl RowSink for BigQuerySink {
    async fn insert(&self, rows: &[PageviewRow]) -> Result<u64, LoadError> {
        let body = InsertAllRequest {
            rows: rows.iter().map(|json| InsertRow { json }).collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context(TransportSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(LoadError::Rejected {
                rows: rows.len(),
                details: vec![format!("HTTP {status}: {}", excerpt.trim())],
            });
        }

        let parsed: InsertAllResponse = response.json().await.context(TransportSnafu)?;
        if !parsed.insert_errors.is_empty() {
            return Err(LoadError::Rejected {
                rows: rows.len(),
                details: parsed.insert_errors.iter().map(RowErrors::describe).collect(),
            });
        }

        Ok(rows.len() as u64)
    }

    fn name(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DestinationConfig {
        DestinationConfig {
            project_id: "analytics".into(),
            dataset: "wiki".into(),
            endpoint: "http://127.0.0.1:9050/".into(),
            access_token: "token".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_all_url() {
        assert_eq!(
            insert_all_url(&config()),
            "http://127.0.0.1:9050/bigquery/v2/projects/analytics/datasets/wiki/tables/raw_pageviews/insertAll"
        );
    }

    #[test]
    fn test_sink_name_is_table_ref() {
        let sink = BigQuerySink::new(&config()).unwrap();
        assert_eq!(sink.name(), "analytics.wiki.raw_pageviews");
    }

    #[test]
    fn test_parse_insert_errors() {
        let body = r#"{
            "kind": "bigquery#tableDataInsertAllResponse",
            "insertErrors": [
                {"index": 3, "errors": [{"reason": "invalid", "location": "views", "message": "bad value"}]},
                {"index": 4, "errors": [{"reason": "stopped", "message": ""}]}
            ]
        }"#;
        let parsed: InsertAllResponse = serde_json::from_str(body).unwrap();
        let details: Vec<String> = parsed.insert_errors.iter().map(RowErrors::describe).collect();

        assert_eq!(
            details,
            vec!["row 3: invalid at views: bad value", "row 4: stopped: "]
        );
    }

    #[test]
    fn test_success_response_has_no_errors() {
        let parsed: InsertAllResponse =
            serde_json::from_str(r#"{"kind": "bigquery#tableDataInsertAllResponse"}"#).unwrap();
        assert!(parsed.insert_errors.is_empty());
    }
}
