use anyhow::{anyhow, Result};
use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::classifier::{classify_pods, sort_by_severity};
use crate::history::HistoryStore;
use crate::kubernetes::{DiagnosticsSource, FetchError, PodSource};
use crate::report::{build_digest, healthy_digest, TriageReport};
use crate::slack::Notifier;
use crate::summarizer::Summarizer;
use crate::trend::analyze;
use crate::types::*;

/// What a successful run produced.
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing problematic; no enrichment was attempted.
    AllHealthy { trend: TrendPartition },
    Reported {
        report: TriageReport,
        trend: TrendPartition,
    },
}

/// One triage run: classify, diff against history, enrich, report.
pub struct TriagePipeline<'a> {
    pods: &'a dyn PodSource,
    diagnostics: &'a dyn DiagnosticsSource,
    summarizer: &'a dyn Summarizer,
    notifier: &'a dyn Notifier,
    history: &'a HistoryStore,
    config: &'a Config,
}

impl<'a> TriagePipeline<'a> {
    pub fn new(
        pods: &'a dyn PodSource,
        diagnostics: &'a dyn DiagnosticsSource,
        summarizer: &'a dyn Summarizer,
        notifier: &'a dyn Notifier,
        history: &'a HistoryStore,
        config: &'a Config,
    ) -> Self {
        Self {
            pods,
            diagnostics,
            summarizer,
            notifier,
            history,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let now = Utc::now();
        let snapshots = self.fetch_pods().await?;
        let current = classify_pods(&snapshots);
        info!("Fetched {} pods, {} problematic", snapshots.len(), current.len());

        let mut log = self.history.load();
        let trend = analyze(&log, &current);
        info!(
            "Trend vs previous run: {} new, {} recurring, {} resolved",
            trend.new_issues.len(),
            trend.recurring.len(),
            trend.resolved.len()
        );
        // Recorded before enrichment so an all-healthy run still moves the baseline.
        self.history.record_run(&mut log, now, &current)?;

        let cluster_name = self.config.cluster_name.clone();
        if current.is_empty() {
            info!("All pods healthy, skipping enrichment");
            let (subject, body) = healthy_digest(cluster_name.as_deref(), now, &trend);
            self.notify(&subject, &body).await;
            return Ok(RunOutcome::AllHealthy { trend });
        }

        let mut sorted = current;
        sort_by_severity(&mut sorted);

        let total = sorted.len();
        let mut enriched = Vec::with_capacity(total);
        for (i, pod) in sorted.into_iter().enumerate() {
            info!("Enriching {}/{}: {}/{} ({})", i + 1, total, pod.namespace, pod.name, pod.severity);
            enriched.push(self.enrich(pod).await);
        }

        let report = TriageReport::new(now, cluster_name, &trend, enriched);
        report.write(&self.config.report_path)?;
        info!("Report written to {}", self.config.report_path.display());

        let (subject, body) = build_digest(&report, &trend);
        self.notify(&subject, &body).await;

        Ok(RunOutcome::Reported { report, trend })
    }

    async fn fetch_pods(&self) -> Result<Vec<PodSnapshot>> {
        let limit = self.config.call_timeout();
        match tokio::time::timeout(limit, self.pods.list_all_pods()).await {
            Ok(Ok(pods)) => Ok(pods),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FetchError::Timeout(limit).into()),
        }
    }

    /// Events, then logs, then the AI summary. Every step degrades instead
    /// of failing.
    async fn enrich(&self, pod: TriageResult) -> EnrichedResult {
        let limit = self.config.call_timeout();

        let events = match with_timeout(limit, self.diagnostics.get_events(&pod.namespace, &pod.name)).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Failed to fetch events for {}/{}: {:#}", pod.namespace, pod.name, e);
                Vec::new()
            }
        };

        let logs = match with_timeout(limit, self.diagnostics.get_logs(&pod.namespace, &pod.name)).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!("Failed to fetch logs for {}/{}: {:#}", pod.namespace, pod.name, e);
                String::new()
            }
        };

        let ai = match tokio::time::timeout(limit, self.summarizer.summarize(&pod, &events, &logs)).await {
            Ok(ai) => ai,
            Err(_) => {
                warn!("AI summary for {}/{} timed out after {:?}", pod.namespace, pod.name, limit);
                AiSummary::unavailable()
            }
        };

        EnrichedResult {
            triage: pod,
            events,
            logs,
            summary: ai.summary,
            suggestion: ai.suggestion,
            confidence: ai.confidence,
        }
    }

    async fn notify(&self, subject: &str, body: &str) {
        let limit = self.config.call_timeout();
        if let Err(e) = with_timeout(limit, self.notifier.send(subject, body)).await {
            error!("Failed to deliver notification: {:#}", e);
        }
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("timed out after {:?}", limit)),
    }
}
