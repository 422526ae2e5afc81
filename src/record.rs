use serde::Serialize;

use crate::probe::{SiteCheck, SiteCheckResult};

/// Placeholder schema carried by every batch. The platform does not validate it
/// for the `json` format.
pub const SCHEMA: &str = "stringstringstring";
pub const SCHEMA_ID: u32 = 1;
pub const FORMAT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProduceRecord {
    pub key: String,
    pub partition: u32,
    pub value: String,
}

/// Body of one produce call.
#[derive(Debug, Clone, Serialize)]
pub struct ProduceBatch {
    pub format: &'static str,
    pub key_schema: &'static str,
    pub key_schema_id: u32,
    pub records: Vec<ProduceRecord>,
    pub value_schema: &'static str,
    pub value_schema_id: u32,
}

impl ProduceBatch {
    pub fn new(records: Vec<ProduceRecord>) -> Self {
        Self {
            format: FORMAT,
            key_schema: SCHEMA,
            key_schema_id: SCHEMA_ID,
            records,
            value_schema: SCHEMA,
            value_schema_id: SCHEMA_ID,
        }
    }

    /// Encodes one check as a record per field, all pinned to `partition`.
    ///
    /// Returns `None` for a failed probe, which has no fields to publish.
    pub fn encode(result: &SiteCheckResult, partition: u32) -> Option<Self> {
        match result {
            SiteCheckResult::Completed(check) => Some(Self::new(records(check, partition))),
            SiteCheckResult::Failed { .. } => None,
        }
    }
}

fn records(check: &SiteCheck, partition: u32) -> Vec<ProduceRecord> {
    [
        ("Elapsed", format!("{:.6}", check.elapsed.as_secs_f64())),
        ("Status Code", check.status_code.to_string()),
        ("Match Regex", check.match_pattern.clone()),
        ("Match", check.matched.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| ProduceRecord {
        key: key.to_string(),
        partition,
        value,
    })
    .collect()
}
