use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespaces: Vec<String>,
    pub cluster_name: Option<String>,
    pub ai_api_url: String,
    pub ai_api_key: String,
    pub ai_model: String,
    pub slack_webhook_url: Option<String>,
    pub history_path: PathBuf,
    pub report_path: PathBuf,
    pub log_tail_lines: i64,
    pub call_timeout_seconds: u64,
}

impl Config {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }
}

/// Per-container status as seen by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub name: String,
    pub waiting_reason: Option<String>,
    pub last_terminated_reason: Option<String>,
    pub restart_count: i32,
}

/// The fields of a fetched pod that triage looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub containers: Vec<ContainerSnapshot>,
}

impl PodSnapshot {
    pub fn key(&self) -> PodKey {
        PodKey::new(&self.name, &self.namespace)
    }
}

/// Ordered so that sorting ascending puts the most urgent pods first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// The more urgent of the two.
    pub fn worst(self, other: Severity) -> Severity {
        self.min(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a pod across runs.
///
/// Older tooling joined `name:namespace` into one string, which collides when
/// either part contains a colon. Kubernetes names cannot contain colons, so in
/// practice the two forms agree; the struct form just never has to care.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodKey {
    pub name: String,
    pub namespace: String,
}

impl PodKey {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl TriageResult {
    pub fn key(&self) -> PodKey {
        PodKey::new(&self.name, &self.namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub problematic_pods: Vec<TriageResult>,
}

/// Append-only, insertion-ordered run log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendPartition {
    pub recurring: Vec<TriageResult>,
    pub new_issues: Vec<TriageResult>,
    pub resolved: Vec<TriageResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub reason: String,
    pub message: String,
    pub count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSummary {
    pub summary: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default = "default_confidence", deserialize_with = "deserialize_confidence")]
    pub confidence: u8,
}

pub const NO_AI_RESPONSE: &str = "No response from AI service";

impl AiSummary {
    pub fn unavailable() -> Self {
        Self {
            summary: NO_AI_RESPONSE.to_string(),
            suggestion: String::new(),
            confidence: 0,
        }
    }
}

fn default_confidence() -> u8 {
    crate::summarizer::UNSTRUCTURED_CONFIDENCE
}

// Models answer with 80, 80.0 or "80"; anything numeric is clamped into 0..=100.
// A null confidence gets the default.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let number = match &value {
        serde_json::Value::Null => return Ok(default_confidence()),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    number
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid confidence: {}", value)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub triage: TriageResult,
    pub events: Vec<PodEvent>,
    pub logs: String,
    pub summary: String,
    pub suggestion: String,
    pub confidence: u8,
}

impl Borrow<TriageResult> for EnrichedResult {
    fn borrow(&self) -> &TriageResult {
        &self.triage
    }
}

#[derive(Serialize)]
pub struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub blocks: Vec<serde_json::Value>,
}
