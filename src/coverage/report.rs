use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition of all client operations into those observed at least once in
/// sample code and those never observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCoverageReport {
    pub file_count: usize,
    pub covered: Vec<CoveredOperation>,
    pub uncovered: Vec<UncoveredOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveredOperation {
    #[serde(rename = "client")]
    pub client_type: String,
    #[serde(rename = "method")]
    pub operation: String,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncoveredOperation {
    #[serde(rename = "client")]
    pub client_type: String,
    #[serde(rename = "method")]
    pub operation: String,
    #[serde(rename = "sig")]
    pub signature: String,
}

impl UsageCoverageReport {
    /// Covered operation names grouped by client type, for digest rendering.
    pub fn covered_by_type(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for op in &self.covered {
            grouped
                .entry(op.client_type.as_str())
                .or_default()
                .push(op.operation.as_str());
        }
        grouped
    }

    /// Uncovered operations grouped by client type.
    pub fn uncovered_by_type(&self) -> BTreeMap<&str, Vec<&UncoveredOperation>> {
        let mut grouped: BTreeMap<&str, Vec<&UncoveredOperation>> = BTreeMap::new();
        for op in &self.uncovered {
            grouped.entry(op.client_type.as_str()).or_default().push(op);
        }
        grouped
    }
}
