//! Free-text search over mirrored collections.

use serde::Serialize;

use super::resources::*;

/// String form of one searchable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
    /// Absent optional value; never matches.
    Missing,
}

impl FieldValue<'_> {
    /// Case-insensitive substring match against an already-lowercased query.
    pub fn matches(&self, query_lower: &str) -> bool {
        match self {
            FieldValue::Text(text) => text.to_lowercase().contains(query_lower),
            FieldValue::List(items) => items
                .iter()
                .any(|item| item.to_lowercase().contains(query_lower)),
            FieldValue::Missing => false,
        }
    }
}

impl<'a> From<&'a String> for FieldValue<'a> {
    fn from(value: &'a String) -> Self {
        FieldValue::Text(value)
    }
}

impl<'a> From<&'a Option<String>> for FieldValue<'a> {
    fn from(value: &'a Option<String>) -> Self {
        match value {
            Some(text) => FieldValue::Text(text),
            None => FieldValue::Missing,
        }
    }
}

impl<'a> From<&'a Vec<String>> for FieldValue<'a> {
    fn from(value: &'a Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Types whose fields can be looked up by name for search.
pub trait Searchable {
    /// Returns `None` if the type has no searchable field with that name.
    fn search_field(&self, field: &str) -> Option<FieldValue<'_>>;
}

/// Whether a query is blank (search inactive).
pub fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// Filter `items` down to those where any of `fields` contains `query`.
///
/// A blank query returns every item unchanged. Otherwise the result is a
/// subsequence of `items` in the original order.
pub fn filter_by_search<T>(items: &[T], query: &str, fields: &[&str]) -> Vec<T>
where
    T: Searchable + Clone,
{
    if is_blank(query) {
        return items.to_vec();
    }
    let query_lower = query.to_lowercase();
    items
        .iter()
        .filter(|item| {
            fields.iter().any(|field| {
                item.search_field(field)
                    .is_some_and(|value| value.matches(&query_lower))
            })
        })
        .cloned()
        .collect()
}

/// Filter with the kind's default allow-list.
pub fn filter_resources<T: Resource>(items: &[T], query: &str) -> Vec<T> {
    filter_by_search(items, query, T::SEARCH_FIELDS)
}

/// Per-kind matches for a global search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub pods: Vec<PodInfo>,
    pub deployments: Vec<DeploymentInfo>,
    pub statefulsets: Vec<StatefulSetInfo>,
    pub daemonsets: Vec<DaemonSetInfo>,
    pub replicasets: Vec<ReplicaSetInfo>,
    pub jobs: Vec<JobInfo>,
    pub cronjobs: Vec<CronJobInfo>,
    pub services: Vec<ServiceInfo>,
    pub ingresses: Vec<IngressInfo>,
    pub network_policies: Vec<NetworkPolicyInfo>,
    pub configmaps: Vec<ConfigMapInfo>,
    pub secrets: Vec<SecretInfo>,
    pub hpas: Vec<HpaInfo>,
    pub pvs: Vec<PersistentVolumeInfo>,
    pub pvcs: Vec<PersistentVolumeClaimInfo>,
    pub namespaces: Vec<NamespaceInfo>,
    pub nodes: Vec<NodeInfo>,
    pub service_accounts: Vec<ServiceAccountInfo>,
}

impl SearchResults {
    /// Number of matches for one kind.
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Pods => self.pods.len(),
            ResourceKind::Deployments => self.deployments.len(),
            ResourceKind::StatefulSets => self.statefulsets.len(),
            ResourceKind::DaemonSets => self.daemonsets.len(),
            ResourceKind::ReplicaSets => self.replicasets.len(),
            ResourceKind::Jobs => self.jobs.len(),
            ResourceKind::CronJobs => self.cronjobs.len(),
            ResourceKind::Services => self.services.len(),
            ResourceKind::Ingresses => self.ingresses.len(),
            ResourceKind::NetworkPolicies => self.network_policies.len(),
            ResourceKind::ConfigMaps => self.configmaps.len(),
            ResourceKind::Secrets => self.secrets.len(),
            ResourceKind::Hpas => self.hpas.len(),
            ResourceKind::PersistentVolumes => self.pvs.len(),
            ResourceKind::PersistentVolumeClaims => self.pvcs.len(),
            ResourceKind::Namespaces => self.namespaces.len(),
            ResourceKind::Nodes => self.nodes.len(),
            ResourceKind::ServiceAccounts => self.service_accounts.len(),
        }
    }

    /// Matched objects of one kind as `namespace/name` (or `name`).
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        fn qualified<T: Resource>(items: &[T]) -> Vec<String> {
            items
                .iter()
                .map(|item| match item.namespace() {
                    Some(namespace) => format!("{}/{}", namespace, item.name()),
                    None => item.name().to_string(),
                })
                .collect()
        }

        match kind {
            ResourceKind::Pods => qualified(&self.pods),
            ResourceKind::Deployments => qualified(&self.deployments),
            ResourceKind::StatefulSets => qualified(&self.statefulsets),
            ResourceKind::DaemonSets => qualified(&self.daemonsets),
            ResourceKind::ReplicaSets => qualified(&self.replicasets),
            ResourceKind::Jobs => qualified(&self.jobs),
            ResourceKind::CronJobs => qualified(&self.cronjobs),
            ResourceKind::Services => qualified(&self.services),
            ResourceKind::Ingresses => qualified(&self.ingresses),
            ResourceKind::NetworkPolicies => qualified(&self.network_policies),
            ResourceKind::ConfigMaps => qualified(&self.configmaps),
            ResourceKind::Secrets => qualified(&self.secrets),
            ResourceKind::Hpas => qualified(&self.hpas),
            ResourceKind::PersistentVolumes => qualified(&self.pvs),
            ResourceKind::PersistentVolumeClaims => qualified(&self.pvcs),
            ResourceKind::Namespaces => qualified(&self.namespaces),
            ResourceKind::Nodes => qualified(&self.nodes),
            ResourceKind::ServiceAccounts => qualified(&self.service_accounts),
        }
    }

    /// Total matches across all kinds.
    pub fn total(&self) -> usize {
        ResourceKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    /// Kinds with at least one match, in display order.
    pub fn groups(&self) -> Vec<(ResourceKind, usize)> {
        ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, self.count(*kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(name: &str, namespace: &str, status: &str, node: Option<&str>) -> PodInfo {
        PodInfo {
            name: name.to_string(),
            namespace: namespace.to_string(),
            status: status.to_string(),
            ready: "1/1".to_string(),
            restarts: 0,
            age: "1h".to_string(),
            node: node.map(str::to_string),
            ip: None,
            containers: vec![],
        }
    }

    fn node(name: &str, roles: &[&str]) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            status: "Ready".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            age: "30d".to_string(),
            version: "v1.30.2".to_string(),
            internal_ip: Some("10.0.0.4".to_string()),
            os_image: "Ubuntu".to_string(),
            kernel: "6.8".to_string(),
            container_runtime: "containerd".to_string(),
        }
    }

    #[test]
    fn test_blank_query_returns_input_unchanged() {
        let pods = vec![
            pod("b", "default", "Running", None),
            pod("a", "default", "Pending", None),
        ];

        assert_eq!(filter_resources(&pods, ""), pods);
        assert_eq!(filter_resources(&pods, "   \t"), pods);
    }

    #[test]
    fn test_match_is_case_insensitive_and_order_preserving() {
        let pods = vec![
            pod("api-server", "prod", "Running", Some("worker-1")),
            pod("cache", "prod", "Running", None),
            pod("API-gateway", "edge", "Pending", None),
        ];

        let found = filter_resources(&pods, "Api");
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["api-server", "API-gateway"]);
    }

    #[test]
    fn test_only_listed_fields_are_searched() {
        let pods = vec![pod("web", "default", "Running", Some("worker-9"))];

        // `ready` is not in the pod allow-list
        assert!(filter_by_search(&pods, "1/1", &["name", "namespace"]).is_empty());
        assert_eq!(filter_by_search(&pods, "worker-9", &["node"]).len(), 1);
        // unknown fields never match
        assert!(filter_by_search(&pods, "web", &["bogus"]).is_empty());
    }

    #[test]
    fn test_missing_optional_field_never_matches() {
        let pods = vec![pod("web", "default", "Running", None)];
        assert!(filter_by_search(&pods, "none", &["node"]).is_empty());
    }

    #[test]
    fn test_array_fields_match_element_wise() {
        let nodes = vec![
            node("cp-1", &["control-plane"]),
            node("worker-1", &["worker"]),
        ];

        let found = filter_resources(&nodes, "CONTROL");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "cp-1");
    }

    #[test]
    fn test_results_counting() {
        let mut results = SearchResults::default();
        results.pods.push(pod("a", "default", "Running", None));
        results.nodes.push(node("n", &[]));
        results.nodes.push(node("m", &[]));

        assert_eq!(results.total(), 3);
        assert_eq!(
            results.groups(),
            vec![(ResourceKind::Pods, 1), (ResourceKind::Nodes, 2)]
        );
    }

    #[test]
    fn test_names_are_namespace_qualified() {
        let mut results = SearchResults::default();
        results.pods.push(pod("web-0", "default", "Running", None));
        results.nodes.push(node("cp-1", &[]));

        assert_eq!(results.names(ResourceKind::Pods), vec!["default/web-0"]);
        assert_eq!(results.names(ResourceKind::Nodes), vec!["cp-1"]);
        assert!(results.names(ResourceKind::Jobs).is_empty());
    }
}
