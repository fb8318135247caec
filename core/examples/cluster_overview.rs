//! Example: Run startup checks against the simulated cluster and list pods.

use std::sync::Arc;

use kubedesk_core::{Config, Engine, InMemoryBackend, PodInfo, View};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("Connecting to simulated cluster...\n");

    let backend = Arc::new(InMemoryBackend::with_sample_cluster());
    let engine = Engine::new(backend, Config::without_delays());

    if !engine.initialize().await {
        eprintln!(
            "Startup failed: {}",
            engine.startup().init_error().unwrap_or_default()
        );
        return;
    }

    for check in engine.startup().checks() {
        println!(
            "[{:<7}] {:<28} {}",
            check.status.as_str(),
            check.label,
            check.message.unwrap_or_default()
        );
    }
    println!();

    engine.navigate(View::Pods);
    engine.refresh_current_view().await;
    let pods = engine.mirror().items::<PodInfo>();

    if pods.is_empty() {
        println!("No pods found.");
        return;
    }

    println!(
        "{:<15} {:<30} {:<10} {:<6} {:<9} {}",
        "NAMESPACE", "NAME", "STATUS", "READY", "RESTARTS", "AGE"
    );
    println!("{}", "-".repeat(80));

    for pod in &pods {
        println!(
            "{:<15} {:<30} {:<10} {:<6} {:<9} {}",
            pod.namespace, pod.name, pod.status, pod.ready, pod.restarts, pod.age
        );
    }

    println!("\nTotal: {} pods", pods.len());
}
