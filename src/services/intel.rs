//! Reputation lookup shapes shared by the intel services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict returned by the domain, IP, URL and file lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupData {
    /// Threat categories reported by the provider.
    #[serde(default)]
    pub category: Vec<String>,

    /// Provider score, 0 (benign) to 100 (malicious).
    #[serde(default)]
    pub score: i32,

    /// Verdict such as `malicious`, `suspicious`, `benign` or `unknown`.
    #[serde(default)]
    pub verdict: String,
}

impl LookupData {
    /// Returns `true` if the verdict is `malicious`.
    pub fn is_malicious(&self) -> bool {
        self.verdict.eq_ignore_ascii_case("malicious")
    }
}

/// Result of a reputation lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupOutput {
    /// Normalized verdict.
    pub data: LookupData,

    /// Echo of the request parameters, present with `verbose`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    /// Unprocessed provider response, present with `raw`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
}
