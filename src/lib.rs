// Public modules
pub mod types;
pub mod config;
pub mod classifier;
pub mod history;
pub mod persist;
pub mod trend;
pub mod grouping;
pub mod kubernetes;
pub mod summarizer;
pub mod slack;
pub mod report;
pub mod pipeline;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use classifier::{categorize_severity, classify_pods, is_problematic, sort_by_severity, triage_pod};
pub use history::HistoryStore;
pub use trend::analyze;
pub use grouping::{group_by_issue_type, issue_type, IssueGroup, IssueGroups};
pub use kubernetes::{DiagnosticsSource, FetchError, KubeCluster, PodSource};
pub use summarizer::{parse_ai_reply, OpenAiSummarizer, Summarizer};
pub use slack::{build_slack_payload, Notifier, SlackNotifier};
pub use report::{build_digest, ReportSummary, TriageReport};
pub use pipeline::{RunOutcome, TriagePipeline};
