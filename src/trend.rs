use std::collections::HashSet;

use crate::types::{HistoryLog, PodKey, TrendPartition, TriageResult};

/// Compare the current problematic set with the most recent stored run.
///
/// Older entries stay in the log but are not consulted. With no previous run
/// every current pod is new and nothing is resolved.
pub fn analyze(history: &HistoryLog, current: &[TriageResult]) -> TrendPartition {
    let previous: &[TriageResult] = history
        .latest()
        .map(|entry| entry.problematic_pods.as_slice())
        .unwrap_or(&[]);
    partition(previous, current)
}

pub fn partition(previous: &[TriageResult], current: &[TriageResult]) -> TrendPartition {
    let previous_keys: HashSet<PodKey> = previous.iter().map(TriageResult::key).collect();
    let current_keys: HashSet<PodKey> = current.iter().map(TriageResult::key).collect();

    let (recurring, new_issues): (Vec<_>, Vec<_>) = current
        .iter()
        .cloned()
        .partition(|r| previous_keys.contains(&r.key()));

    let resolved = previous
        .iter()
        .filter(|r| !current_keys.contains(&r.key()))
        .cloned()
        .collect();

    TrendPartition {
        recurring,
        new_issues,
        resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HistoryEntry, Severity};
    use chrono::Utc;

    fn result(name: &str, namespace: &str) -> TriageResult {
        TriageResult {
            name: name.to_string(),
            namespace: namespace.to_string(),
            phase: "Pending".to_string(),
            reason: None,
            message: None,
            severity: Severity::Info,
            reasons: vec!["Pending".to_string()],
        }
    }

    fn history(runs: Vec<Vec<TriageResult>>) -> HistoryLog {
        let mut log = HistoryLog::new();
        for pods in runs {
            log.append(HistoryEntry {
                timestamp: Utc::now(),
                problematic_pods: pods,
            });
        }
        log
    }

    fn names(pods: &[TriageResult]) -> Vec<&str> {
        pods.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_empty_history_makes_everything_new() {
        let current = vec![result("a", "default"), result("b", "default")];
        let trend = analyze(&HistoryLog::new(), &current);
        assert!(trend.recurring.is_empty());
        assert_eq!(names(&trend.new_issues), vec!["a", "b"]);
        assert!(trend.resolved.is_empty());
    }

    #[test]
    fn test_both_empty() {
        let trend = analyze(&history(vec![vec![]]), &[]);
        assert_eq!(trend, TrendPartition::default());
    }

    #[test]
    fn test_mixed_partition() {
        let log = history(vec![vec![result("a", "default"), result("gone", "default")]]);
        let current = vec![result("b", "default"), result("a", "default")];
        let trend = analyze(&log, &current);
        assert_eq!(names(&trend.recurring), vec!["a"]);
        assert_eq!(names(&trend.new_issues), vec!["b"]);
        assert_eq!(names(&trend.resolved), vec!["gone"]);
    }

    #[test]
    fn test_full_overlap() {
        let pods = vec![result("a", "x"), result("b", "y")];
        let trend = analyze(&history(vec![pods.clone()]), &pods);
        assert_eq!(names(&trend.recurring), vec!["a", "b"]);
        assert!(trend.new_issues.is_empty());
        assert!(trend.resolved.is_empty());
    }

    #[test]
    fn test_only_latest_run_is_consulted() {
        let log = history(vec![vec![result("old", "default")], vec![result("a", "default")]]);
        let trend = analyze(&log, &[result("old", "default")]);
        assert_eq!(names(&trend.new_issues), vec!["old"]);
        assert_eq!(names(&trend.resolved), vec!["a"]);
    }

    #[test]
    fn test_namespace_is_part_of_identity() {
        let log = history(vec![vec![result("api", "staging")]]);
        let trend = analyze(&log, &[result("api", "prod")]);
        assert!(trend.recurring.is_empty());
        assert_eq!(trend.new_issues.len(), 1);
        assert_eq!(trend.resolved[0].namespace, "staging");
    }

    #[test]
    fn test_colon_names_do_not_collide() {
        // "a:b" + "c" and "a" + "b:c" join to the same string but are different pods.
        let log = history(vec![vec![result("a:b", "c")]]);
        let trend = analyze(&log, &[result("a", "b:c")]);
        assert!(trend.recurring.is_empty());
        assert_eq!(trend.resolved.len(), 1);
    }

    #[test]
    fn test_repeated_analysis_is_stable() {
        let log = history(vec![vec![result("a", "default"), result("c", "default")]]);
        let current = vec![result("a", "default"), result("b", "default")];
        assert_eq!(analyze(&log, &current), analyze(&log, &current));
    }
}
