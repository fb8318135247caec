//! Resource mirror store.
//!
//! One mirror per resource kind, each holding the last fetched snapshot
//! collection. A fetch replaces the whole collection; a failed fetch leaves
//! the previous one in place.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::*;
use crate::error::Error;
use crate::ports::CommandBridge;

use super::selector::ContextSelector;

// ============================================================================
// Mirror
// ============================================================================

/// The mirrored collection of one resource kind.
#[derive(Debug, Clone)]
pub struct Mirror<T> {
    items: Vec<T>,
    /// Loads of this kind currently awaiting the backend.
    in_flight: usize,
    error: Option<String>,
    /// Bumped every time `items` is replaced.
    revision: u64,
    /// Sequence number handed to the most recently dispatched load.
    dispatched: u64,
    /// Sequence number of the load whose payload is in `items`.
    applied: u64,
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            in_flight: 0,
            error: None,
            revision: 0,
            dispatched: 0,
            applied: 0,
        }
    }
}

impl<T> Mirror<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn status(&self) -> MirrorStatus {
        MirrorStatus {
            count: self.items.len(),
            loading: self.is_loading(),
            error: self.error.clone(),
            revision: self.revision,
        }
    }

    fn begin_load(&mut self) -> u64 {
        self.in_flight += 1;
        self.dispatched += 1;
        self.dispatched
    }

    /// Apply a successful completion. Returns false if it was discarded.
    fn complete(&mut self, seq: u64, items: Vec<T>, discard_stale: bool) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if discard_stale && seq < self.applied {
            return false;
        }
        self.items = items;
        self.applied = seq;
        self.revision += 1;
        self.error = None;
        true
    }

    fn fail(&mut self, message: String) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.error = Some(message);
    }
}

/// Summary of one mirror, independent of its item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorStatus {
    pub count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub revision: u64,
}

/// Pods split by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PodsByStatus {
    pub all: Vec<PodInfo>,
    pub running: Vec<PodInfo>,
    pub pending: Vec<PodInfo>,
    pub failed: Vec<PodInfo>,
    pub succeeded: Vec<PodInfo>,
}

impl PodsByStatus {
    pub fn from_pods(pods: &[PodInfo]) -> Self {
        let phase = |name: &str| -> Vec<PodInfo> {
            pods.iter().filter(|p| p.status == name).cloned().collect()
        };
        Self {
            all: pods.to_vec(),
            running: phase("Running"),
            pending: phase("Pending"),
            failed: phase("Failed"),
            succeeded: phase("Succeeded"),
        }
    }
}

/// A resource type with a slot in the [`MirrorSet`].
pub trait Mirrored: Resource {
    fn slot(set: &MirrorSet) -> &Mirror<Self>;
    fn slot_mut(set: &mut MirrorSet) -> &mut Mirror<Self>;
}

macro_rules! mirror_set {
    ($($field:ident: $ty:ty => $kind:ident),* $(,)?) => {
        /// Every mirrored collection.
        #[derive(Debug, Default)]
        pub struct MirrorSet {
            $(pub $field: Mirror<$ty>,)*
        }

        impl MirrorSet {
            pub fn status(&self, kind: ResourceKind) -> MirrorStatus {
                match kind {
                    $(ResourceKind::$kind => self.$field.status(),)*
                }
            }

            /// Items of `kind` as JSON, for callers that do not know the type.
            pub fn to_json(&self, kind: ResourceKind) -> Value {
                match kind {
                    $(ResourceKind::$kind => serde_json::to_value(self.$field.items()).unwrap_or_default(),)*
                }
            }

            /// Per-kind matches, or `None` when the query is blank.
            pub fn search(&self, query: &str) -> Option<SearchResults> {
                if is_blank(query) {
                    return None;
                }
                Some(SearchResults {
                    $($field: filter_resources(self.$field.items(), query),)*
                })
            }
        }

        $(
            impl Mirrored for $ty {
                fn slot(set: &MirrorSet) -> &Mirror<Self> {
                    &set.$field
                }

                fn slot_mut(set: &mut MirrorSet) -> &mut Mirror<Self> {
                    &mut set.$field
                }
            }
        )*

        impl<B: CommandBridge + 'static> ResourceMirror<B> {
            /// Load the kind named by `kind`.
            pub async fn load_kind(&self, kind: ResourceKind, namespace: Option<&str>) {
                match kind {
                    $(ResourceKind::$kind => self.load::<$ty>(namespace).await,)*
                }
            }
        }
    };
}

mirror_set! {
    pods: PodInfo => Pods,
    deployments: DeploymentInfo => Deployments,
    statefulsets: StatefulSetInfo => StatefulSets,
    daemonsets: DaemonSetInfo => DaemonSets,
    replicasets: ReplicaSetInfo => ReplicaSets,
    jobs: JobInfo => Jobs,
    cronjobs: CronJobInfo => CronJobs,
    services: ServiceInfo => Services,
    ingresses: IngressInfo => Ingresses,
    network_policies: NetworkPolicyInfo => NetworkPolicies,
    configmaps: ConfigMapInfo => ConfigMaps,
    secrets: SecretInfo => Secrets,
    hpas: HpaInfo => Hpas,
    pvs: PersistentVolumeInfo => PersistentVolumes,
    pvcs: PersistentVolumeClaimInfo => PersistentVolumeClaims,
    namespaces: NamespaceInfo => Namespaces,
    nodes: NodeInfo => Nodes,
    service_accounts: ServiceAccountInfo => ServiceAccounts,
}

// ============================================================================
// ResourceMirror
// ============================================================================

/// Store of every mirrored resource kind.
///
/// Loads are independent: concurrent loads of the same kind are not
/// coalesced. By default the completion that arrives last wins. With
/// `discard_stale` set, each load carries a per-kind sequence number and a
/// completion older than the applied one is dropped.
pub struct ResourceMirror<B: CommandBridge> {
    bridge: Arc<B>,
    selector: Arc<ContextSelector<B>>,
    set: RwLock<MirrorSet>,
    discard_stale: bool,
}

impl<B: CommandBridge + 'static> ResourceMirror<B> {
    pub fn new(bridge: Arc<B>, selector: Arc<ContextSelector<B>>) -> Self {
        Self {
            bridge,
            selector,
            set: RwLock::new(MirrorSet::default()),
            discard_stale: false,
        }
    }

    /// Drop completions older than the one already applied.
    pub fn with_discard_stale(mut self, discard_stale: bool) -> Self {
        self.discard_stale = discard_stale;
        self
    }

    // =========================================================================
    // Snapshot accessors
    // =========================================================================

    pub fn items<T: Mirrored>(&self) -> Vec<T> {
        T::slot(&self.set.read()).items().to_vec()
    }

    pub fn status(&self, kind: ResourceKind) -> MirrorStatus {
        self.set.read().status(kind)
    }

    pub fn is_loading(&self, kind: ResourceKind) -> bool {
        self.status(kind).loading
    }

    /// Items of `kind` serialized as a JSON array.
    pub fn items_json(&self, kind: ResourceKind) -> Value {
        self.set.read().to_json(kind)
    }

    /// Global search over every mirrored kind.
    pub fn search(&self, query: &str) -> Option<SearchResults> {
        self.set.read().search(query)
    }

    /// Pods in the selected namespace, or all pods if none is selected.
    pub fn filtered_pods(&self) -> Vec<PodInfo> {
        let selected = self.selector.selected_namespace();
        let set = self.set.read();
        match selected {
            Some(namespace) => set
                .pods
                .items()
                .iter()
                .filter(|p| p.namespace == namespace)
                .cloned()
                .collect(),
            None => set.pods.items().to_vec(),
        }
    }

    pub fn pods_by_status(&self) -> PodsByStatus {
        PodsByStatus::from_pods(self.set.read().pods.items())
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the whole collection of `T`.
    ///
    /// Does nothing (and does not touch the bridge) until a context is
    /// selected. `namespace` is ignored for cluster-scoped kinds.
    pub async fn load<T: Mirrored>(&self, namespace: Option<&str>) {
        if !self.selector.is_ready() {
            return;
        }

        let kind = T::KIND;
        let seq = T::slot_mut(&mut self.set.write()).begin_load();
        let args = if kind.is_namespaced() {
            json!({ "namespace": namespace })
        } else {
            Value::Null
        };
        debug!(kind = %kind, seq = seq, namespace = ?namespace, "Loading resources");

        let result = self.bridge.call::<Vec<T>>(kind.fetch_command(), args).await;

        match result {
            Ok(items) => {
                let count = items.len();
                let applied = T::slot_mut(&mut self.set.write()).complete(
                    seq,
                    items,
                    self.discard_stale,
                );
                if applied {
                    debug!(kind = %kind, seq = seq, count = count, "Resources replaced");
                } else {
                    debug!(kind = %kind, seq = seq, "Discarded stale completion");
                }
            }
            Err(e) => {
                warn!(kind = %kind, seq = seq, error = %e, "Failed to load resources");
                T::slot_mut(&mut self.set.write()).fail(e.message());
                self.selector.set_error(e.message());
            }
        }
    }

    /// Load every kind for `namespace`.
    pub async fn load_all(&self, namespace: Option<&str>) {
        for kind in ResourceKind::ALL {
            self.load_kind(kind, namespace).await;
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Delete a pod, then reload pods for its namespace.
    pub async fn delete_pod(&self, namespace: &str, pod: &str) -> bool {
        self.mutate::<PodInfo>(
            "delete_pod",
            json!({ "namespace": namespace, "podName": pod }),
            namespace,
        )
        .await
    }

    /// Scale a statefulset, then reload statefulsets for its namespace.
    pub async fn scale_statefulset(&self, namespace: &str, name: &str, replicas: u32) -> bool {
        self.mutate::<StatefulSetInfo>(
            "scale_statefulset",
            json!({ "namespace": namespace, "name": name, "replicas": replicas }),
            namespace,
        )
        .await
    }

    /// Rolling-restart a statefulset, then reload statefulsets.
    pub async fn restart_statefulset(&self, namespace: &str, name: &str) -> bool {
        self.mutate::<StatefulSetInfo>(
            "restart_statefulset",
            json!({ "namespace": namespace, "name": name }),
            namespace,
        )
        .await
    }

    async fn mutate<T: Mirrored>(&self, command: &str, args: Value, namespace: &str) -> bool {
        if !self.selector.is_ready() {
            return false;
        }
        match self.bridge.invoke(command, args).await {
            Ok(_) => {
                debug!(command = command, namespace = namespace, "Mutation applied");
                self.load::<T>(Some(namespace)).await;
                true
            }
            Err(e) => {
                self.record_failure::<T>(command, &e);
                false
            }
        }
    }

    fn record_failure<T: Mirrored>(&self, command: &str, error: &Error) {
        warn!(command = command, error = %error, "Command failed");
        T::slot_mut(&mut self.set.write()).error = Some(error.message());
        self.selector.set_error(error.message());
    }

    /// Fetch logs of a pod. Returns an empty string on failure.
    pub async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        tail_lines: Option<u32>,
        previous: bool,
    ) -> String {
        if !self.selector.is_ready() {
            return String::new();
        }
        let args = json!({
            "namespace": namespace,
            "podName": pod,
            "container": container,
            "tailLines": tail_lines,
            "previous": previous,
        });
        match self.bridge.call::<String>("get_pod_logs", args).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(pod = pod, error = %e, "Failed to fetch pod logs");
                self.selector.set_error(e.message());
                String::new()
            }
        }
    }

    /// Ask the host to open a terminal window attached to a pod.
    ///
    /// The window is bound to the current context. Failures go to the
    /// global error slot.
    pub async fn open_terminal_window(&self, namespace: &str, pod: &str, container: Option<&str>) {
        if !self.selector.is_ready() {
            return;
        }
        let args = json!({
            "podName": pod,
            "namespace": namespace,
            "context": self.selector.current_context(),
            "container": container,
        });
        if let Err(e) = self.bridge.invoke("open_terminal_window", args).await {
            warn!(pod = pod, error = %e, "Failed to open terminal window");
            self.selector.set_error(e.message());
        }
    }
}
