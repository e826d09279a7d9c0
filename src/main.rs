use anyhow::{Context, Result};
use kube::Client;
use tracing::info;

use kube_pod_triage::{
    load_config, HistoryStore, KubeCluster, OpenAiSummarizer, RunOutcome, SlackNotifier, TriagePipeline,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    if cfg.namespaces.is_empty() {
        info!("namespaces = all");
    } else {
        info!("namespaces = {:?}", cfg.namespaces);
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let cluster = KubeCluster::new(client, cfg.namespaces.clone(), cfg.log_tail_lines);
    let summarizer = OpenAiSummarizer::new(&cfg)?;
    let notifier = SlackNotifier::new(cfg.slack_webhook_url.clone(), cfg.call_timeout())?;
    let history = HistoryStore::new(cfg.history_path.clone());

    let pipeline = TriagePipeline::new(&cluster, &cluster, &summarizer, &notifier, &history, &cfg);
    match pipeline.run().await? {
        RunOutcome::AllHealthy { .. } => info!("Triage complete: all pods healthy"),
        RunOutcome::Reported { report, .. } => info!(
            "Triage complete: {} problematic pods ({} critical, {} warning, {} info)",
            report.summary.total, report.summary.critical, report.summary.warning, report.summary.info
        ),
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
