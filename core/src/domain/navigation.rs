//! Navigation state: which view is visible and whether the sidebar is collapsed.

use serde::{Deserialize, Serialize};

use super::resources::ResourceKind;

/// A top-level view of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Pods,
    Deployments,
    Statefulsets,
    Daemonsets,
    Replicasets,
    Jobs,
    Cronjobs,
    Services,
    Configmaps,
    Secrets,
    Pvs,
    Pvcs,
    Hpas,
    Ingresses,
    NetworkPolicies,
    ServiceAccounts,
    Nodes,
    Namespaces,
}

impl View {
    /// The resource kind this view mirrors, if any.
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        let kind = match self {
            View::Dashboard => return None,
            View::Pods => ResourceKind::Pods,
            View::Deployments => ResourceKind::Deployments,
            View::Statefulsets => ResourceKind::StatefulSets,
            View::Daemonsets => ResourceKind::DaemonSets,
            View::Replicasets => ResourceKind::ReplicaSets,
            View::Jobs => ResourceKind::Jobs,
            View::Cronjobs => ResourceKind::CronJobs,
            View::Services => ResourceKind::Services,
            View::Configmaps => ResourceKind::ConfigMaps,
            View::Secrets => ResourceKind::Secrets,
            View::Pvs => ResourceKind::PersistentVolumes,
            View::Pvcs => ResourceKind::PersistentVolumeClaims,
            View::Hpas => ResourceKind::Hpas,
            View::Ingresses => ResourceKind::Ingresses,
            View::NetworkPolicies => ResourceKind::NetworkPolicies,
            View::ServiceAccounts => ResourceKind::ServiceAccounts,
            View::Nodes => ResourceKind::Nodes,
            View::Namespaces => ResourceKind::Namespaces,
        };
        Some(kind)
    }

    /// The view showing `kind`.
    pub fn for_kind(kind: ResourceKind) -> View {
        match kind {
            ResourceKind::Pods => View::Pods,
            ResourceKind::Deployments => View::Deployments,
            ResourceKind::StatefulSets => View::Statefulsets,
            ResourceKind::DaemonSets => View::Daemonsets,
            ResourceKind::ReplicaSets => View::Replicasets,
            ResourceKind::Jobs => View::Jobs,
            ResourceKind::CronJobs => View::Cronjobs,
            ResourceKind::Services => View::Services,
            ResourceKind::Ingresses => View::Ingresses,
            ResourceKind::NetworkPolicies => View::NetworkPolicies,
            ResourceKind::ConfigMaps => View::Configmaps,
            ResourceKind::Secrets => View::Secrets,
            ResourceKind::Hpas => View::Hpas,
            ResourceKind::PersistentVolumes => View::Pvs,
            ResourceKind::PersistentVolumeClaims => View::Pvcs,
            ResourceKind::Namespaces => View::Namespaces,
            ResourceKind::Nodes => View::Nodes,
            ResourceKind::ServiceAccounts => View::ServiceAccounts,
        }
    }
}

/// Current view and sidebar state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_view: View,
    pub sidebar_collapsed: bool,
}

impl NavigationState {
    pub fn navigate(&mut self, view: View) {
        self.current_view = view;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_view() {
        for kind in ResourceKind::ALL {
            assert_eq!(View::for_kind(kind).resource_kind(), Some(kind));
        }
        assert_eq!(View::Dashboard.resource_kind(), None);
    }

    #[test]
    fn test_view_wire_names() {
        let view: View = serde_json::from_str("\"network_policies\"").unwrap();
        assert_eq!(view, View::NetworkPolicies);
    }
}
