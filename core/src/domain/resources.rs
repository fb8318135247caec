//! Snapshot models for mirrored Kubernetes objects.
//!
//! Each struct mirrors the summary fields the backend reports for one
//! object. Snapshots are immutable; a fetch replaces the whole collection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::search::{FieldValue, Searchable};

// ============================================================================
// ResourceKind
// ============================================================================

/// Every resource kind the mirror store tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    ReplicaSets,
    Jobs,
    CronJobs,
    Services,
    Ingresses,
    NetworkPolicies,
    ConfigMaps,
    Secrets,
    Hpas,
    PersistentVolumes,
    PersistentVolumeClaims,
    Namespaces,
    Nodes,
    ServiceAccounts,
}

impl ResourceKind {
    /// All kinds, in display order.
    pub const ALL: [ResourceKind; 18] = [
        ResourceKind::Pods,
        ResourceKind::Deployments,
        ResourceKind::StatefulSets,
        ResourceKind::DaemonSets,
        ResourceKind::ReplicaSets,
        ResourceKind::Jobs,
        ResourceKind::CronJobs,
        ResourceKind::Services,
        ResourceKind::Ingresses,
        ResourceKind::NetworkPolicies,
        ResourceKind::ConfigMaps,
        ResourceKind::Secrets,
        ResourceKind::Hpas,
        ResourceKind::PersistentVolumes,
        ResourceKind::PersistentVolumeClaims,
        ResourceKind::Namespaces,
        ResourceKind::Nodes,
        ResourceKind::ServiceAccounts,
    ];

    /// Backend command that fetches this kind.
    pub fn fetch_command(&self) -> &'static str {
        match self {
            Self::Pods => "get_pods",
            Self::Deployments => "get_deployments",
            Self::StatefulSets => "get_statefulsets",
            Self::DaemonSets => "get_daemonsets",
            Self::ReplicaSets => "get_replicasets",
            Self::Jobs => "get_jobs",
            Self::CronJobs => "get_cronjobs",
            Self::Services => "get_services",
            Self::Ingresses => "get_ingresses",
            Self::NetworkPolicies => "get_network_policies",
            Self::ConfigMaps => "get_configmaps",
            Self::Secrets => "get_secrets",
            Self::Hpas => "get_hpas",
            Self::PersistentVolumes => "get_pvs",
            Self::PersistentVolumeClaims => "get_pvcs",
            Self::Namespaces => "get_namespaces_info",
            Self::Nodes => "get_nodes",
            Self::ServiceAccounts => "get_service_accounts",
        }
    }

    /// Whether fetches for this kind accept a namespace scope.
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            Self::PersistentVolumes | Self::Namespaces | Self::Nodes
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::StatefulSets => "StatefulSets",
            Self::DaemonSets => "DaemonSets",
            Self::ReplicaSets => "ReplicaSets",
            Self::Jobs => "Jobs",
            Self::CronJobs => "CronJobs",
            Self::Services => "Services",
            Self::Ingresses => "Ingresses",
            Self::NetworkPolicies => "Network Policies",
            Self::ConfigMaps => "ConfigMaps",
            Self::Secrets => "Secrets",
            Self::Hpas => "HPAs",
            Self::PersistentVolumes => "Persistent Volumes",
            Self::PersistentVolumeClaims => "Persistent Volume Claims",
            Self::Namespaces => "Namespaces",
            Self::Nodes => "Nodes",
            Self::ServiceAccounts => "Service Accounts",
        }
    }

    /// Singular resource name used by detail views (e.g. "pod", "pvc").
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Pods => "pod",
            Self::Deployments => "deployment",
            Self::StatefulSets => "statefulset",
            Self::DaemonSets => "daemonset",
            Self::ReplicaSets => "replicaset",
            Self::Jobs => "job",
            Self::CronJobs => "cronjob",
            Self::Services => "service",
            Self::Ingresses => "ingress",
            Self::NetworkPolicies => "networkpolicy",
            Self::ConfigMaps => "configmap",
            Self::Secrets => "secret",
            Self::Hpas => "hpa",
            Self::PersistentVolumes => "pv",
            Self::PersistentVolumeClaims => "pvc",
            Self::Namespaces => "namespace",
            Self::Nodes => "node",
            Self::ServiceAccounts => "serviceaccount",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    /// Accepts kubectl-style names and short names ("po", "deploy", "svc", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Self::Pods,
            "deploy" | "deployment" | "deployments" => Self::Deployments,
            "sts" | "statefulset" | "statefulsets" => Self::StatefulSets,
            "ds" | "daemonset" | "daemonsets" => Self::DaemonSets,
            "rs" | "replicaset" | "replicasets" => Self::ReplicaSets,
            "job" | "jobs" => Self::Jobs,
            "cj" | "cronjob" | "cronjobs" => Self::CronJobs,
            "svc" | "service" | "services" => Self::Services,
            "ing" | "ingress" | "ingresses" => Self::Ingresses,
            "netpol" | "networkpolicy" | "networkpolicies" => Self::NetworkPolicies,
            "cm" | "configmap" | "configmaps" => Self::ConfigMaps,
            "secret" | "secrets" => Self::Secrets,
            "hpa" | "hpas" => Self::Hpas,
            "pv" | "pvs" | "persistentvolume" | "persistentvolumes" => Self::PersistentVolumes,
            "pvc" | "pvcs" | "persistentvolumeclaim" | "persistentvolumeclaims" => {
                Self::PersistentVolumeClaims
            }
            "ns" | "namespace" | "namespaces" => Self::Namespaces,
            "no" | "node" | "nodes" => Self::Nodes,
            "sa" | "serviceaccount" | "serviceaccounts" => Self::ServiceAccounts,
            other => return Err(format!("unknown resource kind '{}'", other)),
        };
        Ok(kind)
    }
}

// ============================================================================
// Resource trait
// ============================================================================

/// A mirrored object snapshot.
pub trait Resource:
    Searchable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Kind this snapshot belongs to.
    const KIND: ResourceKind;

    /// Fields the global search looks at for this kind.
    const SEARCH_FIELDS: &'static [&'static str];

    fn name(&self) -> &str;

    /// Namespace of the object; `None` for cluster-scoped kinds.
    fn namespace(&self) -> Option<&str>;
}

macro_rules! searchable {
    ($ty:ty, [$($field:ident),* $(,)?]) => {
        impl Searchable for $ty {
            fn search_field(&self, field: &str) -> Option<FieldValue<'_>> {
                match field {
                    $(stringify!($field) => Some(FieldValue::from(&self.$field)),)*
                    _ => None,
                }
            }
        }
    };
}

macro_rules! namespaced_resource {
    ($ty:ty, $kind:expr, [$($field:ident),* $(,)?]) => {
        searchable!($ty, [$($field),*]);

        impl Resource for $ty {
            const KIND: ResourceKind = $kind;
            const SEARCH_FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn name(&self) -> &str {
                &self.name
            }

            fn namespace(&self) -> Option<&str> {
                Some(self.namespace.as_str())
            }
        }
    };
}

macro_rules! cluster_resource {
    ($ty:ty, $kind:expr, [$($field:ident),* $(,)?]) => {
        searchable!($ty, [$($field),*]);

        impl Resource for $ty {
            const KIND: ResourceKind = $kind;
            const SEARCH_FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn name(&self) -> &str {
                &self.name
            }

            fn namespace(&self) -> Option<&str> {
                None
            }
        }
    };
}

// ============================================================================
// Contexts & cluster summary
// ============================================================================

/// A kubeconfig context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeContext {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: Option<String>,
    pub is_current: bool,
}

/// Cluster-wide counters shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    pub total_pods: u32,
    pub running_pods: u32,
    pub pending_pods: u32,
    pub failed_pods: u32,
    pub total_deployments: u32,
    pub total_services: u32,
    pub total_namespaces: u32,
}

/// Healthy and failing objects of one workload kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCount {
    pub ok: u32,
    pub fail: u32,
}

impl ResourceCount {
    pub fn total(&self) -> u32 {
        self.ok + self.fail
    }
}

/// Namespace-scoped health summary for the dashboard.
///
/// Workload kinds carry ok/fail counts; the rest are plain counts. CPU is
/// in millicores and memory in bytes, summed over every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseMetrics {
    pub context: String,
    pub cluster: String,
    pub user: String,
    pub k8s_version: String,

    pub pods: ResourceCount,
    pub deployments: ResourceCount,
    pub statefulsets: ResourceCount,
    pub daemonsets: ResourceCount,
    pub replicasets: ResourceCount,
    pub jobs: ResourceCount,

    pub cronjobs: u32,
    pub services: u32,
    pub configmaps: u32,
    pub secrets: u32,
    pub pvs: u32,
    pub pvcs: u32,
    pub hpas: u32,
    pub ingresses: u32,
    pub network_policies: u32,
    pub service_accounts: u32,
    pub namespaces: u32,
    pub nodes: u32,

    pub cpu_capacity: u64,
    pub cpu_allocatable: u64,
    pub memory_capacity: u64,
    pub memory_allocatable: u64,
}

impl PulseMetrics {
    /// Failing objects across every workload kind.
    pub fn total_failures(&self) -> u32 {
        [
            self.pods,
            self.deployments,
            self.statefulsets,
            self.daemonsets,
            self.replicasets,
            self.jobs,
        ]
        .iter()
        .map(|count| count.fail)
        .sum()
    }
}

// ============================================================================
// Workloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restart_count: u32,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    /// Phase, e.g. "Running", "Pending".
    pub status: String,
    /// Ready containers, e.g. "1/2".
    pub ready: String,
    pub restarts: u32,
    pub age: String,
    pub node: Option<String>,
    pub ip: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub name: String,
    pub namespace: String,
    pub ready: String,
    pub up_to_date: u32,
    pub available: u32,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulSetInfo {
    pub name: String,
    pub namespace: String,
    pub ready: String,
    pub replicas: u32,
    pub age: String,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSetInfo {
    pub name: String,
    pub namespace: String,
    pub desired: u32,
    pub current: u32,
    pub ready: u32,
    pub up_to_date: u32,
    pub available: u32,
    pub node_selector: Option<String>,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSetInfo {
    pub name: String,
    pub namespace: String,
    pub desired: u32,
    pub current: u32,
    pub ready: u32,
    pub age: String,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub namespace: String,
    pub completions: String,
    pub duration: Option<String>,
    pub age: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJobInfo {
    pub name: String,
    pub namespace: String,
    pub schedule: String,
    pub suspend: bool,
    pub active: u32,
    pub last_schedule: Option<String>,
    pub age: String,
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub external_ip: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressInfo {
    pub name: String,
    pub namespace: String,
    pub class: Option<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    pub address: Option<String>,
    pub ports: String,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicyInfo {
    pub name: String,
    pub namespace: String,
    pub pod_selector: String,
    #[serde(default)]
    pub policy_types: Vec<String>,
    pub age: String,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMapInfo {
    pub name: String,
    pub namespace: String,
    pub data_count: u32,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretInfo {
    pub name: String,
    pub namespace: String,
    pub secret_type: String,
    pub data_count: u32,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpaInfo {
    pub name: String,
    pub namespace: String,
    /// Scale target, e.g. "Deployment/web".
    pub reference: String,
    pub targets: String,
    pub min_pods: u32,
    pub max_pods: u32,
    pub replicas: u32,
    pub age: String,
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolumeInfo {
    pub name: String,
    pub capacity: String,
    #[serde(default)]
    pub access_modes: Vec<String>,
    pub reclaim_policy: String,
    pub status: String,
    pub claim: Option<String>,
    pub storage_class: Option<String>,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolumeClaimInfo {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub volume: Option<String>,
    pub capacity: Option<String>,
    #[serde(default)]
    pub access_modes: Vec<String>,
    pub storage_class: Option<String>,
    pub age: String,
}

// ============================================================================
// Cluster
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub status: String,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub age: String,
    pub version: String,
    pub internal_ip: Option<String>,
    pub os_image: String,
    pub kernel: String,
    pub container_runtime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountInfo {
    pub name: String,
    pub namespace: String,
    pub secrets: u32,
    pub age: String,
}

namespaced_resource!(PodInfo, ResourceKind::Pods, [name, namespace, status, node]);
namespaced_resource!(DeploymentInfo, ResourceKind::Deployments, [name, namespace]);
namespaced_resource!(StatefulSetInfo, ResourceKind::StatefulSets, [name, namespace]);
namespaced_resource!(DaemonSetInfo, ResourceKind::DaemonSets, [name, namespace]);
namespaced_resource!(ReplicaSetInfo, ResourceKind::ReplicaSets, [name, namespace, owner]);
namespaced_resource!(JobInfo, ResourceKind::Jobs, [name, namespace]);
namespaced_resource!(CronJobInfo, ResourceKind::CronJobs, [name, namespace, schedule]);
namespaced_resource!(
    ServiceInfo,
    ResourceKind::Services,
    [name, namespace, service_type, cluster_ip]
);
namespaced_resource!(IngressInfo, ResourceKind::Ingresses, [name, namespace, hosts]);
namespaced_resource!(NetworkPolicyInfo, ResourceKind::NetworkPolicies, [name, namespace]);
namespaced_resource!(ConfigMapInfo, ResourceKind::ConfigMaps, [name, namespace]);
namespaced_resource!(SecretInfo, ResourceKind::Secrets, [name, namespace, secret_type]);
namespaced_resource!(HpaInfo, ResourceKind::Hpas, [name, namespace, reference]);
cluster_resource!(
    PersistentVolumeInfo,
    ResourceKind::PersistentVolumes,
    [name, status, storage_class]
);
namespaced_resource!(
    PersistentVolumeClaimInfo,
    ResourceKind::PersistentVolumeClaims,
    [name, namespace, status, volume]
);
cluster_resource!(NamespaceInfo, ResourceKind::Namespaces, [name, status]);
cluster_resource!(NodeInfo, ResourceKind::Nodes, [name, status, roles]);
namespaced_resource!(ServiceAccountInfo, ResourceKind::ServiceAccounts, [name, namespace]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("po".parse::<ResourceKind>(), Ok(ResourceKind::Pods));
        assert_eq!("deploy".parse::<ResourceKind>(), Ok(ResourceKind::Deployments));
        assert_eq!("PVC".parse::<ResourceKind>(), Ok(ResourceKind::PersistentVolumeClaims));
        assert!("widgets".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_cluster_scoped_kinds() {
        let cluster: Vec<_> = ResourceKind::ALL
            .iter()
            .filter(|k| !k.is_namespaced())
            .collect();
        assert_eq!(
            cluster,
            vec![
                &ResourceKind::PersistentVolumes,
                &ResourceKind::Namespaces,
                &ResourceKind::Nodes
            ]
        );
    }

    #[test]
    fn test_search_fields_are_resolvable() {
        let pod = PodInfo {
            name: "web-0".to_string(),
            namespace: "default".to_string(),
            status: "Running".to_string(),
            ready: "1/1".to_string(),
            restarts: 0,
            age: "2d".to_string(),
            node: None,
            ip: None,
            containers: vec![],
        };

        for field in PodInfo::SEARCH_FIELDS {
            assert!(pod.search_field(field).is_some(), "field {field}");
        }
        assert!(pod.search_field("ip").is_none());
        assert_eq!(pod.namespace(), Some("default"));
    }

    #[test]
    fn test_pod_payload_without_containers() {
        let pod: PodInfo = serde_json::from_value(serde_json::json!({
            "name": "api-1",
            "namespace": "prod",
            "status": "Pending",
            "ready": "0/1",
            "restarts": 2,
            "age": "5m",
            "node": null,
            "ip": null
        }))
        .unwrap();
        assert!(pod.containers.is_empty());
        assert_eq!(pod.restarts, 2);
    }

    #[test]
    fn test_pulse_failures_sum_workload_kinds() {
        let pulse = PulseMetrics {
            pods: ResourceCount { ok: 4, fail: 1 },
            deployments: ResourceCount { ok: 1, fail: 1 },
            jobs: ResourceCount { ok: 0, fail: 2 },
            services: 7,
            ..PulseMetrics::default()
        };

        assert_eq!(pulse.total_failures(), 4);
        assert_eq!(pulse.pods.total(), 5);
        let value = serde_json::to_value(&pulse).unwrap();
        assert_eq!(value["k8s_version"], "");
        assert_eq!(value["deployments"]["fail"], 1);
    }
}
