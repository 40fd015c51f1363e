//! Newman run summary wire model -- the subset of fields the exporter consumes.

use serde::{Deserialize, Deserializer, Serialize};

/// Marker written over sensitive/bulky fields before a summary is retained.
pub const REDACTED: &str = "*REMOVED*";

/// Structured summary of one completed collection run, as delivered by the
/// execution engine. Unknown fields in the engine's JSON are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default, deserialize_with = "null_to_default")]
    pub collection: CollectionInfo,
    pub run: RunDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDetails {
    #[serde(default, deserialize_with = "null_to_default")]
    pub stats: RunStats,
    #[serde(default, deserialize_with = "null_to_default")]
    pub timings: RunTimings,
    #[serde(default, deserialize_with = "null_to_default")]
    pub transfers: RunTransfers,
    #[serde(default, deserialize_with = "null_to_default")]
    pub executions: Vec<Execution>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    #[serde(default, deserialize_with = "null_to_default")]
    pub iterations: Counted,
    #[serde(default, deserialize_with = "null_to_default")]
    pub requests: Counted,
    #[serde(default, deserialize_with = "null_to_default")]
    pub tests: Counted,
    #[serde(default, deserialize_with = "null_to_default")]
    pub test_scripts: Counted,
    #[serde(default, deserialize_with = "null_to_default")]
    pub assertions: Counted,
}

/// Total/failed pair used for every run statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Counted {
    #[serde(default, deserialize_with = "null_to_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTimings {
    #[serde(default, deserialize_with = "null_to_default")]
    pub response_average: f64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub response_min: f64,
    #[serde(default, deserialize_with = "null_to_default")]
    pub response_max: f64,
    /// Run start, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<i64>,
    /// Run completion, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTransfers {
    #[serde(default, deserialize_with = "null_to_default")]
    pub response_total: u64,
}

/// One request execution (one collection item, one iteration) within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default, deserialize_with = "null_to_default")]
    pub item: Item,
    #[serde(default, deserialize_with = "null_to_default")]
    pub cursor: Cursor,
    /// Present when the request itself failed and no response exists. The
    /// engine serializes this as an arbitrary error object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_error: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ExecutionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<Vec<Assertion>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default, deserialize_with = "null_to_default")]
    pub iteration: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u64>,
    /// Status text, e.g. "OK".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,
    /// Raw body buffer as serialized by the engine. Never retained: replaced
    /// with [`REDACTED`] before the summary is stored or written out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    #[serde(default, deserialize_with = "null_to_default")]
    pub assertion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AssertionError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionError {
    #[serde(default, deserialize_with = "null_to_default")]
    pub test: String,
    #[serde(default, deserialize_with = "null_to_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// The engine's reporter writes JSON `null` where a value is missing (a run
/// with zero requests nulls its timing aggregates); null and absent both
/// deserialize to the field's default.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RunSummary {
    /// Scrub payloads that are large or sensitive and not part of the metric
    /// surface: response body streams and assertion failure messages/stacks.
    /// Must run before the summary is stored on a worker or serialized.
    pub fn redact(&mut self) {
        for execution in &mut self.run.executions {
            if let Some(response) = &mut execution.response {
                response.stream = Some(serde_json::Value::String(REDACTED.to_string()));
            }
            for assertion in execution.assertions.iter_mut().flatten() {
                if let Some(error) = &mut assertion.error {
                    error.message = REDACTED.to_string();
                    error.stack = Some(REDACTED.to_string());
                }
            }
        }
    }
}
