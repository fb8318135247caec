//! In-process simulated backend.
//!
//! Serves the full command surface from an in-memory cluster. Used by tests
//! and by the CLI's `--simulate` mode. Supports scripted responses with
//! artificial latency, injected failures, call recording, out-of-band
//! context changes and an "unavailable" switch.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::domain::*;
use crate::error::{Error, Result};
use crate::ports::CommandBridge;

/// Capacity every simulated node reports.
const NODE_CPU_MILLIS: u64 = 4_000;
const NODE_CPU_RESERVED_MILLIS: u64 = 100;
const NODE_MEMORY_BYTES: u64 = 8 * 1024 * 1024 * 1024;
const NODE_MEMORY_RESERVED_BYTES: u64 = 512 * 1024 * 1024;

/// One command received by the simulated backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: String,
    pub args: Value,
}

struct ScriptedResponse {
    delay: Duration,
    response: std::result::Result<Value, String>,
}

struct SimulatedForward {
    session: PortForwardSession,
    /// Set once the session has appeared in a listing.
    listed: bool,
}

#[derive(Default)]
struct Cluster {
    kubeconfig_path: String,
    contexts: Vec<KubeContext>,
    current_context: String,
    /// Serialized objects per kind.
    objects: HashMap<ResourceKind, Vec<Value>>,
    forwards: Vec<SimulatedForward>,
}

impl Cluster {
    fn objects(&self, kind: ResourceKind) -> &[Value] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<&Value> {
        self.objects(kind)
            .iter()
            .find(|o| o["name"] == name && o["namespace"] == namespace)
    }

    fn find_mut(&mut self, kind: ResourceKind, namespace: &str, name: &str) -> Option<&mut Value> {
        self.objects
            .get_mut(&kind)?
            .iter_mut()
            .find(|o| o["name"] == name && o["namespace"] == namespace)
    }

    /// Objects of `kind` in `namespace`, or everywhere when `None`.
    /// Cluster-scoped kinds ignore the namespace.
    fn scoped(&self, kind: ResourceKind, namespace: Option<&str>) -> Vec<&Value> {
        self.objects(kind)
            .iter()
            .filter(|o| {
                !kind.is_namespaced() || namespace.map_or(true, |ns| o["namespace"] == ns)
            })
            .collect()
    }

    fn count_pods(&self, phase: &str) -> u32 {
        self.objects(ResourceKind::Pods)
            .iter()
            .filter(|p| p["status"] == phase)
            .count() as u32
    }
}

/// A backend simulated in memory.
pub struct InMemoryBackend {
    cluster: RwLock<Cluster>,
    scripted: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    failures: Mutex<HashMap<String, VecDeque<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    available: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// An empty cluster with no contexts.
    pub fn new() -> Self {
        Self {
            cluster: RwLock::new(Cluster {
                kubeconfig_path: "~/.kube/config".to_string(),
                ..Cluster::default()
            }),
            scripted: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// A small two-context cluster with a handful of workloads.
    pub fn with_sample_cluster() -> Self {
        let backend = Self::new();
        backend.add_context("kind-dev", "kind-dev", "kind-dev", None);
        backend.add_context("prod", "prod-eu-1", "admin", Some("default"));
        backend.set_current_context_externally("kind-dev");

        for (namespace, age) in [("default", "30d"), ("kube-system", "30d"), ("monitoring", "12d")] {
            backend.insert(NamespaceInfo {
                name: namespace.to_string(),
                status: "Active".to_string(),
                age: age.to_string(),
            });
        }

        backend.insert(sample_pod("web-0", "default", "Running", Some("10.244.0.5"), "web", "nginx:1.27"));
        backend.insert(sample_pod("api-6f7d9c-x2k4p", "default", "Pending", None, "api", "ghcr.io/acme/api:2.4.1"));
        backend.insert(sample_pod(
            "coredns-5d78c9869d-abcde",
            "kube-system",
            "Running",
            Some("10.244.0.2"),
            "coredns",
            "registry.k8s.io/coredns/coredns:v1.11.1",
        ));

        backend.insert(DeploymentInfo {
            name: "api".to_string(),
            namespace: "default".to_string(),
            ready: "0/1".to_string(),
            up_to_date: 1,
            available: 0,
            age: "2h".to_string(),
        });
        backend.insert(DeploymentInfo {
            name: "coredns".to_string(),
            namespace: "kube-system".to_string(),
            ready: "1/1".to_string(),
            up_to_date: 1,
            available: 1,
            age: "30d".to_string(),
        });

        for (name, service_name) in [("web", Some("web")), ("db", None)] {
            backend.insert(StatefulSetInfo {
                name: name.to_string(),
                namespace: "default".to_string(),
                ready: "1/1".to_string(),
                replicas: 1,
                age: "5d".to_string(),
                service_name: service_name.map(str::to_string),
            });
        }

        backend.insert(sample_service("web", "default", "10.96.12.40", &["80/TCP", "8443/TCP"]));
        backend.insert(sample_service("kubernetes", "default", "10.96.0.1", &["443/TCP"]));
        backend.insert(sample_service(
            "kube-dns",
            "kube-system",
            "10.96.0.10",
            &["53/UDP", "53/TCP", "9153/TCP"],
        ));

        backend.insert(ConfigMapInfo {
            name: "kube-root-ca.crt".to_string(),
            namespace: "default".to_string(),
            data_count: 1,
            age: "30d".to_string(),
        });
        backend.insert(SecretInfo {
            name: "api-credentials".to_string(),
            namespace: "default".to_string(),
            secret_type: "Opaque".to_string(),
            data_count: 2,
            age: "2h".to_string(),
        });
        backend.insert(PersistentVolumeInfo {
            name: "pvc-3f1c2a".to_string(),
            capacity: "1Gi".to_string(),
            access_modes: vec!["RWO".to_string()],
            reclaim_policy: "Delete".to_string(),
            status: "Bound".to_string(),
            claim: Some("default/data-db-0".to_string()),
            storage_class: Some("standard".to_string()),
            age: "5d".to_string(),
        });
        backend.insert(PersistentVolumeClaimInfo {
            name: "data-db-0".to_string(),
            namespace: "default".to_string(),
            status: "Bound".to_string(),
            volume: Some("pvc-3f1c2a".to_string()),
            capacity: Some("1Gi".to_string()),
            access_modes: vec!["RWO".to_string()],
            storage_class: Some("standard".to_string()),
            age: "5d".to_string(),
        });
        backend.insert(NodeInfo {
            name: "kind-control-plane".to_string(),
            status: "Ready".to_string(),
            roles: vec!["control-plane".to_string()],
            age: "30d".to_string(),
            version: "v1.30.0".to_string(),
            internal_ip: Some("172.18.0.2".to_string()),
            os_image: "Debian GNU/Linux 12 (bookworm)".to_string(),
            kernel: "6.8.0".to_string(),
            container_runtime: "containerd://1.7.15".to_string(),
        });
        backend.insert(ServiceAccountInfo {
            name: "default".to_string(),
            namespace: "default".to_string(),
            secrets: 0,
            age: "30d".to_string(),
        });

        backend
    }

    // =========================================================================
    // Cluster setup
    // =========================================================================

    pub fn add_context(&self, name: &str, cluster: &str, user: &str, namespace: Option<&str>) {
        self.cluster.write().contexts.push(KubeContext {
            name: name.to_string(),
            cluster: cluster.to_string(),
            user: user.to_string(),
            namespace: namespace.map(str::to_string),
            is_current: false,
        });
    }

    /// Add an object to the mirrored kind it belongs to.
    pub fn insert<T: Resource>(&self, object: T) {
        // Snapshot structs always serialize to a JSON object.
        let value = serde_json::to_value(&object).unwrap_or(Value::Null);
        self.cluster
            .write()
            .objects
            .entry(T::KIND)
            .or_default()
            .push(value);
    }

    /// Change the current context as if another tool had edited kubeconfig.
    pub fn set_current_context_externally(&self, name: &str) {
        self.cluster.write().current_context = name.to_string();
    }

    pub fn current_context(&self) -> String {
        self.cluster.read().current_context.clone()
    }

    /// Overwrite a session's status as the backend would on a tunnel change.
    pub fn set_port_forward_status(&self, id: &str, status: PortForwardStatus) {
        if let Some(forward) = self
            .cluster
            .write()
            .forwards
            .iter_mut()
            .find(|f| f.session.id == id)
        {
            forward.session.status = status;
        }
    }

    /// Simulate the host runtime going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Queue a canned response for the next call to `command`.
    ///
    /// Scripted responses are consumed in order and take precedence over
    /// the simulated cluster.
    pub fn script(
        &self,
        command: &str,
        delay: Duration,
        response: std::result::Result<Value, String>,
    ) {
        self.scripted
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(ScriptedResponse { delay, response });
    }

    /// Make the next call to `command` fail with `message`.
    pub fn fail_next(&self, command: &str, message: &str) {
        self.failures
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Names of the commands received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.command.clone()).collect()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.command == command)
            .count()
    }

    // =========================================================================
    // Command handling
    // =========================================================================

    fn handle(&self, command: &str, args: &Value) -> Result<Value> {
        if let Some(kind) = ResourceKind::ALL
            .into_iter()
            .find(|k| k.fetch_command() == command)
        {
            return Ok(self.list_objects(kind, args));
        }

        match command {
            "check_kubeconfig" => Ok(json!(self.cluster.read().kubeconfig_path)),
            "validate_kubeconfig" | "test_cluster_connection" => {
                if self.cluster.read().current_context.is_empty() {
                    return Err(Error::Backend("current-context is not set".to_string()));
                }
                Ok(Value::Null)
            }
            "get_context_names" => {
                let cluster = self.cluster.read();
                let names: Vec<&str> = cluster.contexts.iter().map(|c| c.name.as_str()).collect();
                Ok(json!(names))
            }
            "get_contexts" => {
                let cluster = self.cluster.read();
                let contexts: Vec<KubeContext> = cluster
                    .contexts
                    .iter()
                    .map(|c| KubeContext {
                        is_current: c.name == cluster.current_context,
                        ..c.clone()
                    })
                    .collect();
                Ok(serde_json::to_value(contexts)?)
            }
            "get_current_context" => Ok(json!(self.cluster.read().current_context)),
            "switch_context" => {
                let name = arg_str(args, "contextName")?;
                let mut cluster = self.cluster.write();
                if !cluster.contexts.iter().any(|c| c.name == name) {
                    return Err(Error::Backend(format!(
                        "context \"{}\" does not exist",
                        name
                    )));
                }
                cluster.current_context = name.to_string();
                Ok(Value::Null)
            }
            "get_namespaces" => {
                let cluster = self.cluster.read();
                let names: Vec<&Value> = cluster
                    .objects(ResourceKind::Namespaces)
                    .iter()
                    .map(|n| &n["name"])
                    .collect();
                Ok(json!(names))
            }
            "get_cluster_metrics" => {
                let cluster = self.cluster.read();
                let metrics = ClusterMetrics {
                    total_pods: cluster.objects(ResourceKind::Pods).len() as u32,
                    running_pods: cluster.count_pods("Running"),
                    pending_pods: cluster.count_pods("Pending"),
                    failed_pods: cluster.count_pods("Failed"),
                    total_deployments: cluster.objects(ResourceKind::Deployments).len() as u32,
                    total_services: cluster.objects(ResourceKind::Services).len() as u32,
                    total_namespaces: cluster.objects(ResourceKind::Namespaces).len() as u32,
                };
                Ok(serde_json::to_value(metrics)?)
            }
            "get_pulse_metrics" => self.pulse_metrics(args),
            "delete_pod" => {
                let namespace = arg_str(args, "namespace")?;
                let pod = arg_str(args, "podName")?;
                let mut cluster = self.cluster.write();
                let pods = cluster.objects.entry(ResourceKind::Pods).or_default();
                let before = pods.len();
                pods.retain(|p| !(p["name"] == pod && p["namespace"] == namespace));
                if pods.len() == before {
                    return Err(not_found("pods", pod));
                }
                Ok(Value::Null)
            }
            "scale_statefulset" => {
                let namespace = arg_str(args, "namespace")?;
                let name = arg_str(args, "name")?;
                let replicas = args
                    .get("replicas")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| missing("replicas"))?;
                let mut cluster = self.cluster.write();
                let sts = cluster
                    .find_mut(ResourceKind::StatefulSets, namespace, name)
                    .ok_or_else(|| not_found("statefulsets.apps", name))?;
                sts["replicas"] = json!(replicas);
                sts["ready"] = json!(format!("{}/{}", replicas, replicas));
                Ok(Value::Null)
            }
            "restart_statefulset" => {
                let namespace = arg_str(args, "namespace")?;
                let name = arg_str(args, "name")?;
                self.cluster
                    .read()
                    .find(ResourceKind::StatefulSets, namespace, name)
                    .ok_or_else(|| not_found("statefulsets.apps", name))?;
                Ok(Value::Null)
            }
            "get_pod_logs" => self.pod_logs(args),
            "open_terminal_window" => {
                let namespace = arg_str(args, "namespace")?;
                let pod = arg_str(args, "podName")?;
                arg_str(args, "context")?;
                self.cluster
                    .read()
                    .find(ResourceKind::Pods, namespace, pod)
                    .ok_or_else(|| not_found("pods", pod))?;
                debug!(pod = pod, "Simulated terminal window opened");
                Ok(Value::Null)
            }
            "list_port_forwards" => {
                let mut cluster = self.cluster.write();
                for forward in cluster.forwards.iter_mut() {
                    if forward.listed && forward.session.status == PortForwardStatus::Starting {
                        forward.session.status = PortForwardStatus::Active;
                    }
                    forward.listed = true;
                }
                let sessions: Vec<&PortForwardSession> =
                    cluster.forwards.iter().map(|f| &f.session).collect();
                Ok(serde_json::to_value(sessions)?)
            }
            "start_port_forward" => self.start_port_forward(args),
            "stop_port_forward" => {
                let id = arg_str(args, "id")?;
                let mut cluster = self.cluster.write();
                let before = cluster.forwards.len();
                cluster.forwards.retain(|f| f.session.id != id);
                if cluster.forwards.len() == before {
                    return Err(Error::Backend(format!("Port forward {} not found", id)));
                }
                Ok(Value::Null)
            }
            "stop_all_port_forwards" => {
                self.cluster.write().forwards.clear();
                Ok(Value::Null)
            }
            "get_resource_ports" => self.resource_ports(args),
            other => Err(Error::Backend(format!("Unknown command: {}", other))),
        }
    }

    fn list_objects(&self, kind: ResourceKind, args: &Value) -> Value {
        let namespace = args.get("namespace").and_then(Value::as_str);
        let cluster = self.cluster.read();
        let items: Vec<&Value> = cluster
            .objects(kind)
            .iter()
            .filter(|o| namespace.map_or(true, |ns| o["namespace"] == ns))
            .collect();
        json!(items)
    }

    fn pulse_metrics(&self, args: &Value) -> Result<Value> {
        let namespace = args.get("namespace").and_then(Value::as_str);
        let cluster = self.cluster.read();
        let context = cluster
            .contexts
            .iter()
            .find(|c| c.name == cluster.current_context);
        let count = |kind| cluster.scoped(kind, namespace).len() as u32;
        let health = |kind, ok: fn(&Value) -> bool| {
            let objects = cluster.scoped(kind, namespace);
            let healthy = objects.iter().filter(|o| ok(o)).count() as u32;
            ResourceCount {
                ok: healthy,
                fail: objects.len() as u32 - healthy,
            }
        };
        let nodes = count(ResourceKind::Nodes);

        let metrics = PulseMetrics {
            context: cluster.current_context.clone(),
            cluster: context.map(|c| c.cluster.clone()).unwrap_or_default(),
            user: context.map(|c| c.user.clone()).unwrap_or_default(),
            k8s_version: cluster
                .objects(ResourceKind::Nodes)
                .first()
                .and_then(|n| n["version"].as_str())
                .unwrap_or("Unknown")
                .to_string(),
            pods: health(ResourceKind::Pods, |p: &Value| {
                p["status"] == "Running" || p["status"] == "Succeeded"
            }),
            deployments: health(ResourceKind::Deployments, ready_ratio_complete),
            statefulsets: health(ResourceKind::StatefulSets, ready_ratio_complete),
            daemonsets: health(ResourceKind::DaemonSets, |d: &Value| d["ready"] == d["desired"]),
            replicasets: health(ResourceKind::ReplicaSets, |r: &Value| r["ready"] == r["desired"]),
            jobs: health(ResourceKind::Jobs, |j: &Value| j["status"] != "Failed"),
            cronjobs: count(ResourceKind::CronJobs),
            services: count(ResourceKind::Services),
            configmaps: count(ResourceKind::ConfigMaps),
            secrets: count(ResourceKind::Secrets),
            pvs: count(ResourceKind::PersistentVolumes),
            pvcs: count(ResourceKind::PersistentVolumeClaims),
            hpas: count(ResourceKind::Hpas),
            ingresses: count(ResourceKind::Ingresses),
            network_policies: count(ResourceKind::NetworkPolicies),
            service_accounts: count(ResourceKind::ServiceAccounts),
            namespaces: count(ResourceKind::Namespaces),
            nodes,
            cpu_capacity: u64::from(nodes) * NODE_CPU_MILLIS,
            cpu_allocatable: u64::from(nodes) * (NODE_CPU_MILLIS - NODE_CPU_RESERVED_MILLIS),
            memory_capacity: u64::from(nodes) * NODE_MEMORY_BYTES,
            memory_allocatable: u64::from(nodes) * (NODE_MEMORY_BYTES - NODE_MEMORY_RESERVED_BYTES),
        };
        Ok(serde_json::to_value(metrics)?)
    }

    fn pod_logs(&self, args: &Value) -> Result<Value> {
        let namespace = arg_str(args, "namespace")?;
        let pod_name = arg_str(args, "podName")?;
        let cluster = self.cluster.read();
        let pod = cluster
            .find(ResourceKind::Pods, namespace, pod_name)
            .ok_or_else(|| not_found("pods", pod_name))?;

        let container = match args.get("container").and_then(Value::as_str) {
            Some(container) => container.to_string(),
            None => pod["containers"][0]["name"]
                .as_str()
                .unwrap_or(pod_name)
                .to_string(),
        };
        let tail = args
            .get("tailLines")
            .and_then(Value::as_u64)
            .unwrap_or(100) as usize;
        let previous = args.get("previous").and_then(Value::as_bool).unwrap_or(false);
        let run = if previous { "previous" } else { "current" };

        let lines: Vec<String> = (1..=5)
            .map(|i| format!("[{}] {} run, log line {}", container, run, i))
            .collect();
        let start = lines.len().saturating_sub(tail);
        Ok(json!(lines[start..].join("\n")))
    }

    fn start_port_forward(&self, args: &Value) -> Result<Value> {
        let request: PortForwardRequest = serde_json::from_value(args.clone())
            .map_err(|e| Error::Backend(format!("invalid port forward request: {}", e)))?;

        let mut cluster = self.cluster.write();
        if cluster
            .forwards
            .iter()
            .any(|f| f.session.local_port == request.local_port && f.session.status.is_live())
        {
            return Err(Error::Backend(format!(
                "Port {} is already being forwarded by this app",
                request.local_port
            )));
        }

        let pod_name = match request.resource_type {
            ResourceType::Pod => cluster
                .find(ResourceKind::Pods, &request.namespace, &request.resource_name)
                .map(|_| request.resource_name.clone())
                .ok_or_else(|| not_found("pods", &request.resource_name))?,
            ResourceType::Service => {
                cluster
                    .find(ResourceKind::Services, &request.namespace, &request.resource_name)
                    .ok_or_else(|| not_found("services", &request.resource_name))?;
                let prefix = format!("{}-", request.resource_name);
                cluster
                    .objects(ResourceKind::Pods)
                    .iter()
                    .filter(|p| p["namespace"] == request.namespace.as_str())
                    .filter_map(|p| p["name"].as_str())
                    .find(|name| name.starts_with(&prefix))
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::Backend(format!(
                            "No running pods found for service {}",
                            request.resource_name
                        ))
                    })?
            }
        };

        let session = PortForwardSession {
            id: Uuid::new_v4().to_string(),
            context: request.context,
            namespace: request.namespace,
            resource_type: request.resource_type,
            resource_name: request.resource_name,
            pod_name,
            local_port: request.local_port,
            remote_port: request.remote_port,
            status: PortForwardStatus::Starting,
            active_connections: 0,
            total_connections: 0,
            bytes_sent: 0,
            bytes_received: 0,
        };
        debug!(session_id = %session.id, local_port = session.local_port, "Simulated port forward created");

        let value = serde_json::to_value(&session)?;
        cluster.forwards.push(SimulatedForward {
            session,
            listed: false,
        });
        Ok(value)
    }

    fn resource_ports(&self, args: &Value) -> Result<Value> {
        let namespace = arg_str(args, "namespace")?;
        let name = arg_str(args, "resourceName")?;
        let resource_type: ResourceType = arg_str(args, "resourceType")?
            .parse()
            .map_err(Error::Backend)?;

        let cluster = self.cluster.read();
        let service = match resource_type {
            ResourceType::Service => cluster
                .find(ResourceKind::Services, namespace, name)
                .ok_or_else(|| not_found("services", name))?,
            ResourceType::Pod => {
                cluster
                    .find(ResourceKind::Pods, namespace, name)
                    .ok_or_else(|| not_found("pods", name))?;
                // A pod exposes the ports of the service selecting it.
                match cluster.objects(ResourceKind::Services).iter().find(|s| {
                    s["namespace"] == namespace
                        && s["name"]
                            .as_str()
                            .is_some_and(|svc| name.starts_with(&format!("{}-", svc)))
                }) {
                    Some(service) => service,
                    None => return Ok(json!([])),
                }
            }
        };

        let ports: Vec<AvailablePort> = service["ports"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_str)
            .filter_map(parse_service_port)
            .collect();
        Ok(serde_json::to_value(ports)?)
    }
}

impl CommandBridge for InMemoryBackend {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value> {
        if !self.is_available() {
            return Err(Error::BridgeUnavailable(
                "simulated backend is offline".to_string(),
            ));
        }

        self.calls.lock().push(RecordedCall {
            command: command.to_string(),
            args: args.clone(),
        });

        let scripted = self
            .scripted
            .lock()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        if let Some(scripted) = scripted {
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            return scripted.response.map_err(Error::Backend);
        }

        let failure = self
            .failures
            .lock()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        if let Some(message) = failure {
            return Err(Error::Backend(message));
        }

        self.handle(command, &args)
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// `"2/2"`-style ready columns count as healthy when both sides match.
fn ready_ratio_complete(object: &Value) -> bool {
    object["ready"]
        .as_str()
        .and_then(|ready| ready.split_once('/'))
        .is_some_and(|(ready, desired)| ready == desired)
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> Error {
    Error::Backend(format!("missing argument '{}'", key))
}

fn not_found(resource: &str, name: &str) -> Error {
    Error::Backend(format!("{} \"{}\" not found", resource, name))
}

/// Parse a service port string such as "80/TCP" or "80:30080/TCP".
fn parse_service_port(entry: &str) -> Option<AvailablePort> {
    let (ports, protocol) = entry.split_once('/').unwrap_or((entry, "TCP"));
    let port = ports.split(':').next()?.parse().ok()?;
    Some(AvailablePort {
        port,
        name: None,
        protocol: protocol.to_string(),
    })
}

fn sample_pod(
    name: &str,
    namespace: &str,
    status: &str,
    ip: Option<&str>,
    container: &str,
    image: &str,
) -> PodInfo {
    let running = status == "Running";
    PodInfo {
        name: name.to_string(),
        namespace: namespace.to_string(),
        status: status.to_string(),
        ready: if running { "1/1" } else { "0/1" }.to_string(),
        restarts: 0,
        age: "3h".to_string(),
        node: ip.map(|_| "kind-control-plane".to_string()),
        ip: ip.map(str::to_string),
        containers: vec![ContainerInfo {
            name: container.to_string(),
            image: image.to_string(),
            ready: running,
            restart_count: 0,
            state: if running { "running" } else { "waiting" }.to_string(),
        }],
    }
}

fn sample_service(name: &str, namespace: &str, cluster_ip: &str, ports: &[&str]) -> ServiceInfo {
    ServiceInfo {
        name: name.to_string(),
        namespace: namespace.to_string(),
        service_type: "ClusterIP".to_string(),
        cluster_ip: Some(cluster_ip.to_string()),
        external_ip: None,
        ports: ports.iter().map(|p| p.to_string()).collect(),
        age: "30d".to_string(),
    }
}
