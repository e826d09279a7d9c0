use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

use crate::grouping::{group_by_issue_type, IssueGroups};
use crate::persist::write_json_atomic;
use crate::types::{EnrichedResult, PodKey, Severity, TrendPartition, TriageResult};

/// Structured report written once per run that found problems.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub summary: ReportSummary,
    pub resolved: Vec<PodKey>,
    /// Sorted most urgent first.
    pub pods: Vec<EnrichedResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub recurring: usize,
    pub new_issues: usize,
    pub resolved: usize,
}

impl ReportSummary {
    pub fn new(pods: &[TriageResult], trend: &TrendPartition) -> Self {
        let count = |sev: Severity| pods.iter().filter(|p| p.severity == sev).count();
        Self {
            total: pods.len(),
            critical: count(Severity::Critical),
            warning: count(Severity::Warning),
            info: count(Severity::Info),
            recurring: trend.recurring.len(),
            new_issues: trend.new_issues.len(),
            resolved: trend.resolved.len(),
        }
    }

    pub fn has_issues(&self) -> bool {
        self.total > 0
    }
}

impl TriageReport {
    pub fn new(
        generated_at: DateTime<Utc>,
        cluster_name: Option<String>,
        trend: &TrendPartition,
        pods: Vec<EnrichedResult>,
    ) -> Self {
        let triaged: Vec<TriageResult> = pods.iter().map(|p| p.triage.clone()).collect();
        Self {
            generated_at,
            cluster_name,
            summary: ReportSummary::new(&triaged, trend),
            resolved: trend.resolved.iter().map(TriageResult::key).collect(),
            pods,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}

pub fn digest_subject(cluster_name: Option<&str>, summary: &ReportSummary) -> String {
    let prefix = match cluster_name {
        Some(c) => format!("Pod triage - {}", c),
        None => "Pod triage".to_string(),
    };
    if summary.has_issues() {
        let noun = if summary.total == 1 { "pod" } else { "pods" };
        format!(
            "{}: {} problematic {} ({} critical, {} new)",
            prefix, summary.total, noun, summary.critical, summary.new_issues
        )
    } else {
        format!("{}: all pods healthy", prefix)
    }
}

pub fn healthy_digest(cluster_name: Option<&str>, generated_at: DateTime<Utc>, trend: &TrendPartition) -> (String, String) {
    let summary = ReportSummary::new(&[], trend);
    let mut body = format!(
        "All pods are healthy as of {}.",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if !trend.resolved.is_empty() {
        body.push_str(&format!("\nResolved since last run: {}", trend.resolved.len()));
    }
    (digest_subject(cluster_name, &summary), body)
}

/// Subject and plain-text body of the digest.
pub fn build_digest(report: &TriageReport, trend: &TrendPartition) -> (String, String) {
    let s = &report.summary;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "Generated: {}",
        report.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    lines.push(format!(
        "Problematic pods: {} (Critical {}, Warning {}, Info {})",
        s.total, s.critical, s.warning, s.info
    ));
    lines.push(format!(
        "Since last run: {} new, {} recurring, {} resolved",
        s.new_issues, s.recurring, s.resolved
    ));

    trend_section(&mut lines, "New issues", &group_by_issue_type(&trend.new_issues));
    trend_section(&mut lines, "Recurring issues", &group_by_issue_type(&trend.recurring));
    trend_section(&mut lines, "Resolved since last run", &group_by_issue_type(&trend.resolved));

    lines.push(String::new());
    lines.push("*Details*".to_string());
    for group in group_by_issue_type(&report.pods).iter() {
        lines.push(format!("_{}_ ({})", group.issue_type, group.pods.len()));
        for pod in &group.pods {
            detail_lines(&mut lines, pod);
        }
    }

    (digest_subject(report.cluster_name.as_deref(), s), lines.join("\n"))
}

fn trend_section(lines: &mut Vec<String>, title: &str, groups: &IssueGroups<TriageResult>) {
    if groups.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("*{}*", title));
    for group in groups.iter() {
        let pods: Vec<String> = group
            .pods
            .iter()
            .map(|p| format!("`{}/{}`", p.namespace, p.name))
            .collect();
        lines.push(format!("• {}: {}", group.issue_type, pods.join(", ")));
    }
}

fn detail_lines(lines: &mut Vec<String>, pod: &EnrichedResult) {
    let t = &pod.triage;
    let reasons = if t.reasons.is_empty() {
        "-".to_string()
    } else {
        t.reasons.join(", ")
    };
    lines.push(format!(
        "• `{}/{}` [{}] phase {} | reasons: {}",
        t.namespace, t.name, t.severity, t.phase, reasons
    ));
    lines.push(format!("  Summary: {}", pod.summary));
    if !pod.suggestion.is_empty() {
        lines.push(format!("  Suggestion: {}", pod.suggestion));
    }
    lines.push(format!("  Confidence: {}%", pod.confidence));
}
