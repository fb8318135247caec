//! End-to-end session flow against the simulated backend.

use std::sync::Arc;

use kubedesk_core::domain::{CheckStatus, ServiceInfo, StatefulSetInfo};
use kubedesk_core::{
    Config, Engine, InMemoryBackend, PodInfo, PortForwardNotification, PortForwardRequest,
    PortForwardStatus, ResourceKind, ResourceType, View,
};

fn session() -> (Arc<InMemoryBackend>, Arc<Engine<InMemoryBackend>>) {
    let backend = Arc::new(InMemoryBackend::with_sample_cluster());
    let engine = Arc::new(Engine::new(Arc::clone(&backend), Config::without_delays()));
    (backend, engine)
}

#[tokio::test]
async fn test_startup_then_browse_and_switch() {
    let (backend, engine) = session();

    assert!(engine.initialize().await);
    assert!(engine
        .startup()
        .checks()
        .iter()
        .all(|check| check.status == CheckStatus::Success));
    assert_eq!(engine.startup().progress(), 100);
    assert_eq!(engine.selector().current_context(), "kind-dev");

    engine.navigate(View::Pods);
    engine.refresh_current_view().await;
    assert_eq!(engine.mirror().items::<PodInfo>().len(), 3);

    engine.selector().select_namespace(Some("kube-system".into()));
    engine.refresh_current_view().await;
    let pods = engine.mirror().items::<PodInfo>();
    assert_eq!(pods.len(), 1);
    assert_eq!(pods[0].namespace, "kube-system");

    assert!(engine.switch_context("prod").await);
    assert_eq!(backend.current_context(), "prod");
    assert_eq!(engine.selector().current_context(), "prod");
    assert_eq!(engine.selector().selected_namespace(), None);
    assert!(engine.selector().error().is_none());
}

#[tokio::test]
async fn test_search_and_statefulset_mutations() {
    let (_backend, engine) = session();
    engine.initialize().await;
    engine.mirror().load_all(None).await;

    engine.set_search_query("WEB");
    let results = engine.search().unwrap();
    assert_eq!(results.count(ResourceKind::Pods), 1);
    assert_eq!(results.count(ResourceKind::Services), 1);
    assert_eq!(results.count(ResourceKind::StatefulSets), 1);

    assert!(
        engine
            .mirror()
            .scale_statefulset("default", "db", 3)
            .await
    );
    let db = engine
        .mirror()
        .items::<StatefulSetInfo>()
        .into_iter()
        .find(|s| s.name == "db")
        .unwrap();
    assert_eq!(db.replicas, 3);

    assert!(!engine.mirror().delete_pod("default", "missing").await);
    assert!(engine.mirror().status(ResourceKind::Pods).error.is_some());
    assert!(engine.selector().error().is_some());
}

#[tokio::test]
async fn test_port_forward_session_lifecycle() {
    let (_backend, engine) = session();
    engine.initialize().await;
    engine.mirror().load::<ServiceInfo>(None).await;
    let forwards = engine.port_forwards();

    let ports = forwards
        .resolve_ports("kind-dev", "default", ResourceType::Service, "web")
        .await;
    assert_eq!(ports.len(), 2);

    let session = forwards
        .start(PortForwardRequest {
            context: "kind-dev".into(),
            namespace: "default".into(),
            resource_type: ResourceType::Service,
            resource_name: "web".into(),
            local_port: 8080,
            remote_port: ports[0].port,
        })
        .await
        .unwrap();
    assert_eq!(session.status, PortForwardStatus::Starting);

    forwards.list().await;
    assert_eq!(forwards.active_count(), 1);
    assert_eq!(
        forwards.find(&session.id).unwrap().status,
        PortForwardStatus::Active
    );

    forwards.stop(&session.id).await.unwrap();
    assert!(forwards.sessions().is_empty());

    let notifications = forwards.take_notifications();
    assert!(matches!(
        notifications.as_slice(),
        [
            PortForwardNotification::Connected { .. },
            PortForwardNotification::Closed { local_port: 8080, .. }
        ]
    ));
    assert!(!forwards.has_pending_notifications());
}
