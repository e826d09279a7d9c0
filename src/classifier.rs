use crate::types::{ContainerSnapshot, PodSnapshot, Severity, TriageResult};

/// Container reasons that make a pod problematic on their own.
pub const ERROR_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
    "CreateContainerConfigError",
    "RunContainerError",
    "Error",
    "ContainerCannotRun",
    "OOMKilled",
    "Evicted",
    "DeadlineExceeded",
];

pub const CRITICAL_REASONS: &[&str] = &[
    "CrashLoopBackOff",
    "OOMKilled",
    "ImagePullBackOff",
    "ContainerCannotRun",
];

pub const WARNING_REASONS: &[&str] = &[
    "Completed",
    "Evicted",
    "DeadlineExceeded",
    "ErrImagePull",
    "Error",
];

pub const PROBLEMATIC_RESTARTS: i32 = 3;
pub const CRITICAL_RESTARTS: i32 = 5;

const RUNNING: &str = "Running";

fn matches_any(reason: Option<&str>, set: &[&str]) -> bool {
    reason.map(|r| set.contains(&r)).unwrap_or(false)
}

fn container_reasons(cs: &ContainerSnapshot) -> (Option<&str>, Option<&str>) {
    (cs.waiting_reason.as_deref(), cs.last_terminated_reason.as_deref())
}

/// A pod needs attention when it is not Running, any container sits in a
/// known error state, or any container restarted more than three times.
pub fn is_problematic(pod: &PodSnapshot) -> bool {
    if pod.phase != RUNNING {
        return true;
    }
    pod.containers.iter().any(|cs| {
        let (waiting, terminated) = container_reasons(cs);
        matches_any(waiting, ERROR_REASONS)
            || matches_any(terminated, ERROR_REASONS)
            || cs.restart_count > PROBLEMATIC_RESTARTS
    })
}

/// Severity signalled by a single container, if any.
fn container_severity(cs: &ContainerSnapshot) -> Option<Severity> {
    let (waiting, terminated) = container_reasons(cs);
    if matches_any(waiting, CRITICAL_REASONS)
        || matches_any(terminated, CRITICAL_REASONS)
        || cs.restart_count > CRITICAL_RESTARTS
    {
        Some(Severity::Critical)
    } else if matches_any(waiting, WARNING_REASONS)
        || matches_any(terminated, WARNING_REASONS)
        || cs.restart_count > PROBLEMATIC_RESTARTS
    {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Worst per-container severity plus every reason string carried by a
/// matching container.
///
/// The phase only contributes when no container matched at all: a pod in
/// `Pending` whose containers only raise Warning stays Warning, and a pod in
/// `Failed` with quiet containers is Info with the phase as its reason.
pub fn categorize_severity(pod: &PodSnapshot) -> (Severity, Vec<String>) {
    let (severity, mut reasons) = pod.containers.iter().fold(
        (None::<Severity>, Vec::new()),
        |(worst, mut reasons), cs| match container_severity(cs) {
            Some(found) => {
                reasons.push(cs.waiting_reason.clone().unwrap_or_default());
                reasons.push(cs.last_terminated_reason.clone().unwrap_or_default());
                (Some(worst.map_or(found, |w| w.worst(found))), reasons)
            }
            None => (worst, reasons),
        },
    );

    if severity.is_none() && pod.phase != RUNNING {
        reasons.push(pod.phase.clone());
    }
    reasons.retain(|r| !r.is_empty());

    (severity.unwrap_or(Severity::Info), reasons)
}

pub fn triage_pod(pod: &PodSnapshot) -> Option<TriageResult> {
    if !is_problematic(pod) {
        return None;
    }
    let (severity, reasons) = categorize_severity(pod);
    Some(TriageResult {
        name: pod.name.clone(),
        namespace: pod.namespace.clone(),
        phase: pod.phase.clone(),
        reason: pod.reason.clone(),
        message: pod.message.clone(),
        severity,
        reasons,
    })
}

/// Problematic pods in input order.
pub fn classify_pods(pods: &[PodSnapshot]) -> Vec<TriageResult> {
    pods.iter().filter_map(triage_pod).collect()
}

/// Stable sort, most urgent first.
pub fn sort_by_severity(results: &mut [TriageResult]) {
    results.sort_by_key(|r| r.severity);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(waiting: Option<&str>, terminated: Option<&str>, restarts: i32) -> ContainerSnapshot {
        ContainerSnapshot {
            name: "app".to_string(),
            waiting_reason: waiting.map(str::to_string),
            last_terminated_reason: terminated.map(str::to_string),
            restart_count: restarts,
        }
    }

    fn pod(name: &str, phase: &str, containers: Vec<ContainerSnapshot>) -> PodSnapshot {
        PodSnapshot {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: phase.to_string(),
            containers,
            ..Default::default()
        }
    }

    #[test]
    fn test_running_pod_without_containers_is_healthy() {
        assert!(!is_problematic(&pod("idle", "Running", vec![])));
        assert!(triage_pod(&pod("idle", "Running", vec![])).is_none());
    }

    #[test]
    fn test_non_running_phase_is_problematic() {
        for phase in ["Pending", "Failed", "Succeeded", "Unknown"] {
            assert!(is_problematic(&pod("p", phase, vec![])), "phase {}", phase);
        }
    }

    #[test]
    fn test_restarts_above_three_are_problematic_in_any_phase() {
        for phase in ["Running", "Pending"] {
            assert!(is_problematic(&pod("p", phase, vec![container(None, None, 4)])));
        }
        assert!(!is_problematic(&pod("p", "Running", vec![container(None, None, 3)])));
    }

    #[test]
    fn test_error_reason_in_either_state_is_problematic() {
        assert!(is_problematic(&pod("p", "Running", vec![container(Some("CreateContainerConfigError"), None, 0)])));
        assert!(is_problematic(&pod("p", "Running", vec![container(None, Some("OOMKilled"), 0)])));
        assert!(!is_problematic(&pod("p", "Running", vec![container(Some("ContainerCreating"), Some("Completed"), 0)])));
    }

    #[test]
    fn test_crashloop_with_restarts_is_critical() {
        let web = pod("web-1", "Running", vec![container(Some("CrashLoopBackOff"), None, 6)]);
        let result = triage_pod(&web).unwrap();
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.reasons.contains(&"CrashLoopBackOff".to_string()));
        assert_eq!(result.reasons, vec!["CrashLoopBackOff"]);
    }

    #[test]
    fn test_restart_thresholds() {
        let (sev, reasons) = categorize_severity(&pod("p", "Running", vec![container(None, None, 6)]));
        assert_eq!(sev, Severity::Critical);
        assert!(reasons.is_empty());

        let (sev, _) = categorize_severity(&pod("p", "Running", vec![container(None, None, 5)]));
        assert_eq!(sev, Severity::Warning);

        let (sev, _) = categorize_severity(&pod("p", "Running", vec![container(None, None, 3)]));
        assert_eq!(sev, Severity::Info);
    }

    #[test]
    fn test_critical_is_not_downgraded_by_later_containers() {
        let p = pod("p", "Running", vec![
            container(None, Some("OOMKilled"), 1),
            container(Some("ErrImagePull"), None, 0),
            container(None, None, 0),
        ]);
        let (sev, reasons) = categorize_severity(&p);
        assert_eq!(sev, Severity::Critical);
        assert_eq!(reasons, vec!["OOMKilled", "ErrImagePull"]);
    }

    #[test]
    fn test_warning_escalates_to_critical_later() {
        let p = pod("p", "Running", vec![
            container(None, Some("Error"), 0),
            container(Some("ImagePullBackOff"), None, 0),
        ]);
        let (sev, reasons) = categorize_severity(&p);
        assert_eq!(sev, Severity::Critical);
        assert_eq!(reasons, vec!["Error", "ImagePullBackOff"]);
    }

    #[test]
    fn test_matching_container_contributes_both_reasons() {
        let p = pod("p", "Running", vec![container(Some("CrashLoopBackOff"), Some("Error"), 2)]);
        let (_, reasons) = categorize_severity(&p);
        assert_eq!(reasons, vec!["CrashLoopBackOff", "Error"]);
    }

    #[test]
    fn test_phase_only_counts_without_container_match() {
        let (sev, reasons) = categorize_severity(&pod("p", "Pending", vec![container(Some("ContainerCreating"), None, 0)]));
        assert_eq!(sev, Severity::Info);
        assert_eq!(reasons, vec!["Pending"]);

        // Warning-level container on a non-Running pod keeps Warning and no phase reason.
        let (sev, reasons) = categorize_severity(&pod("p", "Failed", vec![container(None, Some("Error"), 0)]));
        assert_eq!(sev, Severity::Warning);
        assert_eq!(reasons, vec!["Error"]);
    }

    #[test]
    fn test_error_reason_outside_severity_sets_is_info() {
        let result = triage_pod(&pod("p", "Running", vec![container(Some("RunContainerError"), None, 0)])).unwrap();
        assert_eq!(result.severity, Severity::Info);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_classify_keeps_input_order_and_sort_is_stable() {
        let pods = vec![
            pod("a", "Pending", vec![]),
            pod("b", "Running", vec![]),
            pod("c", "Running", vec![container(Some("CrashLoopBackOff"), None, 0)]),
            pod("d", "Failed", vec![]),
            pod("e", "Running", vec![container(None, Some("OOMKilled"), 0)]),
        ];
        let mut results = classify_pods(&pods);
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);

        sort_by_severity(&mut results);
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "e", "a", "d"]);
    }
}
