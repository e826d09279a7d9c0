use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;

use crate::types::TriageResult;

pub const UNKNOWN_ISSUE: &str = "Unknown";

/// Primary issue label: first contributing reason, else the pod's own
/// reason, else "Unknown".
pub fn issue_type(result: &TriageResult) -> &str {
    result
        .reasons
        .first()
        .map(String::as_str)
        .or(result.reason.as_deref())
        .unwrap_or(UNKNOWN_ISSUE)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueGroup<T> {
    pub issue_type: String,
    pub pods: Vec<T>,
}

/// Groups in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IssueGroups<T> {
    groups: Vec<IssueGroup<T>>,
}

impl<T> IssueGroups<T> {
    pub fn iter(&self) -> impl Iterator<Item = &IssueGroup<T>> {
        self.groups.iter()
    }

    pub fn get(&self, issue_type: &str) -> Option<&[T]> {
        self.groups
            .iter()
            .find(|g| g.issue_type == issue_type)
            .map(|g| g.pods.as_slice())
    }

    pub fn issue_types(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.issue_type.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn group_by_issue_type<T>(pods: &[T]) -> IssueGroups<T>
where
    T: Borrow<TriageResult> + Clone,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<IssueGroup<T>> = Vec::new();

    for pod in pods {
        let label = issue_type(Borrow::<TriageResult>::borrow(pod));
        let slot = match index.get(label) {
            Some(&i) => i,
            None => {
                index.insert(label.to_string(), groups.len());
                groups.push(IssueGroup {
                    issue_type: label.to_string(),
                    pods: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[slot].pods.push(pod.clone());
    }

    IssueGroups { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn result(name: &str, reasons: &[&str], reason: Option<&str>) -> TriageResult {
        TriageResult {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: "Running".to_string(),
            reason: reason.map(str::to_string),
            message: None,
            severity: Severity::Warning,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_issue_type_fallbacks() {
        assert_eq!(issue_type(&result("a", &["OOMKilled", "Error"], Some("Evicted"))), "OOMKilled");
        assert_eq!(issue_type(&result("a", &[], Some("Evicted"))), "Evicted");
        assert_eq!(issue_type(&result("a", &[], None)), "Unknown");
    }

    #[test]
    fn test_groups_follow_first_seen_order() {
        let pods = vec![
            result("a", &["Error"], None),
            result("b", &["CrashLoopBackOff"], None),
            result("c", &["Error"], None),
            result("d", &[], None),
            result("e", &["CrashLoopBackOff"], None),
        ];
        let groups = group_by_issue_type(&pods);
        assert_eq!(groups.issue_types(), vec!["Error", "CrashLoopBackOff", "Unknown"]);

        let errors: Vec<_> = groups.get("Error").unwrap().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(errors, vec!["a", "c"]);
        let crashes: Vec<_> = groups.get("CrashLoopBackOff").unwrap().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(crashes, vec!["b", "e"]);
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let pods = vec![
            result("a", &["Pending"], None),
            result("b", &[], Some("Evicted")),
            result("c", &["Pending"], None),
            result("d", &[], None),
        ];
        let groups = group_by_issue_type(&pods);
        let mut flattened: Vec<String> = groups
            .iter()
            .flat_map(|g| g.pods.iter().map(|p| p.name.clone()))
            .collect();
        assert_eq!(flattened.len(), pods.len());
        flattened.sort();
        assert_eq!(flattened, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_input() {
        let groups = group_by_issue_type::<TriageResult>(&[]);
        assert!(groups.is_empty());
        assert_eq!(groups.len(), 0);
    }
}
