//! Startup, context and namespace commands.

use anyhow::{bail, Result};
use kubedesk_core::domain::{CheckStatus, ResourceCount};
use kubedesk_core::{CommandBridge, Engine};

use super::{connect, print_json, truncate};

pub async fn startup<B: CommandBridge + 'static>(engine: &Engine<B>, json: bool) -> Result<()> {
    let passed = engine.initialize().await;
    let checks = engine.startup().checks();

    if json {
        print_json(&checks)?;
    } else {
        for check in &checks {
            let marker = match check.status {
                CheckStatus::Success => "ok",
                CheckStatus::Error => "FAIL",
                CheckStatus::Running => "..",
                CheckStatus::Pending => "",
            };
            println!(
                "[{:<4}] {:<28} {}",
                marker,
                check.label,
                check.message.as_deref().unwrap_or("")
            );
        }
        println!("\nProgress: {}%", engine.startup().progress());
    }

    if !passed {
        bail!(
            "Startup failed: {}",
            engine.startup().init_error().unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn contexts<B: CommandBridge + 'static>(engine: &Engine<B>, json: bool) -> Result<()> {
    connect(engine).await?;
    let contexts = engine.selector().contexts();

    if json {
        return print_json(&contexts);
    }

    if contexts.is_empty() {
        println!("No contexts found.");
        return Ok(());
    }

    println!(
        "{:<8} {:<30} {:<25} {:<20} NAMESPACE",
        "CURRENT", "NAME", "CLUSTER", "USER"
    );
    println!("{}", "-".repeat(100));

    for context in &contexts {
        println!(
            "{:<8} {:<30} {:<25} {:<20} {}",
            if context.is_current { "*" } else { "" },
            truncate(&context.name, 30),
            truncate(&context.cluster, 25),
            truncate(&context.user, 20),
            context.namespace.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn use_context<B: CommandBridge + 'static>(engine: &Engine<B>, name: &str) -> Result<()> {
    connect(engine).await?;
    if !engine.switch_context(name).await {
        bail!(
            "Failed to switch context: {}",
            engine.selector().error().unwrap_or_default()
        );
    }
    println!("Switched to context \"{}\".", name);
    Ok(())
}

pub async fn namespaces<B: CommandBridge + 'static>(engine: &Engine<B>, json: bool) -> Result<()> {
    connect(engine).await?;
    let selector = engine.selector();
    selector.load_namespaces().await;
    if let Some(error) = selector.error() {
        bail!("Failed to load namespaces: {}", error);
    }
    let namespaces = selector.namespaces();

    if json {
        return print_json(&namespaces);
    }
    for namespace in &namespaces {
        println!("{}", namespace);
    }
    Ok(())
}

pub async fn pulse<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    namespace: Option<&str>,
    json: bool,
) -> Result<()> {
    connect(engine).await?;
    let selector = engine.selector();
    selector.load_pulse_metrics(namespace).await;
    let Some(pulse) = selector.pulse_metrics() else {
        bail!(
            "Failed to load pulse metrics: {}",
            selector.error().unwrap_or_default()
        );
    };

    if json {
        return print_json(&pulse);
    }

    println!(
        "Context: {}  Cluster: {}  User: {}  Kubernetes: {}",
        pulse.context, pulse.cluster, pulse.user, pulse.k8s_version
    );
    println!("Scope:   {}\n", namespace.unwrap_or("all namespaces"));

    println!("{:<14} {:>5} {:>5}", "WORKLOAD", "OK", "FAIL");
    let workloads: [(&str, ResourceCount); 6] = [
        ("Pods", pulse.pods),
        ("Deployments", pulse.deployments),
        ("StatefulSets", pulse.statefulsets),
        ("DaemonSets", pulse.daemonsets),
        ("ReplicaSets", pulse.replicasets),
        ("Jobs", pulse.jobs),
    ];
    for (name, count) in workloads {
        println!("{:<14} {:>5} {:>5}", name, count.ok, count.fail);
    }

    println!(
        "\nServices {}  Ingresses {}  ConfigMaps {}  Secrets {}  PVCs {}  Nodes {}",
        pulse.services, pulse.ingresses, pulse.configmaps, pulse.secrets, pulse.pvcs, pulse.nodes
    );
    println!(
        "CPU {}m / {}m allocatable  Memory {} MiB / {} MiB allocatable",
        pulse.cpu_capacity,
        pulse.cpu_allocatable,
        pulse.memory_capacity / (1024 * 1024),
        pulse.memory_allocatable / (1024 * 1024)
    );
    Ok(())
}
