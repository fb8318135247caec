//! Resource commands - list, search, logs and workload mutations.

use anyhow::{bail, Result};
use kubedesk_core::{CommandBridge, Engine, ResourceKind, View};
use serde_json::Value;

use super::{connect, print_json, truncate};

/// Keys tried, in order, for the STATUS column.
const STATUS_KEYS: &[&str] = &["status", "ready", "schedule", "service_type", "capacity"];

pub async fn get<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    kind: ResourceKind,
    namespace: Option<String>,
    json: bool,
) -> Result<()> {
    connect(engine).await?;
    engine.selector().select_namespace(namespace);
    engine.navigate(View::for_kind(kind));
    engine.refresh_current_view().await;

    if let Some(error) = engine.mirror().status(kind).error {
        bail!("Failed to load {}: {}", kind.display_name().to_lowercase(), error);
    }
    let items = engine.mirror().items_json(kind);

    if json {
        return print_json(&items);
    }

    let rows = items.as_array().map(Vec::as_slice).unwrap_or(&[]);
    if rows.is_empty() {
        println!("No {} found.", kind.display_name().to_lowercase());
        return Ok(());
    }

    // Table header
    if kind.is_namespaced() {
        print!("{:<20} ", "NAMESPACE");
    }
    println!("{:<40} {:<16} AGE", "NAME", "STATUS");
    println!("{}", "-".repeat(if kind.is_namespaced() { 85 } else { 64 }));

    for row in rows {
        if kind.is_namespaced() {
            print!("{:<20} ", truncate(&text(&row["namespace"]), 20));
        }
        let status = STATUS_KEYS
            .iter()
            .map(|key| &row[*key])
            .find(|value| !value.is_null())
            .map(text)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:<16} {}",
            truncate(&text(&row["name"]), 40),
            truncate(&status, 16),
            text(&row["age"])
        );
    }

    println!("\nTotal: {} {}", rows.len(), kind.display_name().to_lowercase());
    Ok(())
}

pub async fn search<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    query: &str,
    namespace: Option<String>,
    json: bool,
) -> Result<()> {
    connect(engine).await?;
    engine.mirror().load_all(namespace.as_deref()).await;
    engine.set_search_query(query);

    let Some(results) = engine.search() else {
        bail!("Search query is empty");
    };

    if json {
        return print_json(&results);
    }

    if results.total() == 0 {
        println!("No matches for \"{}\".", query);
        return Ok(());
    }

    for (kind, count) in results.groups() {
        println!("{} ({})", kind.display_name(), count);
        for name in results.names(kind) {
            println!("  {}", name);
        }
    }
    println!("\nTotal: {} matches", results.total());
    Ok(())
}

pub async fn logs<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    namespace: &str,
    pod: &str,
    container: Option<String>,
    tail_lines: Option<u32>,
    previous: bool,
) -> Result<()> {
    connect(engine).await?;
    let logs = engine
        .mirror()
        .pod_logs(namespace, pod, container.as_deref(), tail_lines, previous)
        .await;
    if let Some(error) = engine.selector().error() {
        bail!("Failed to fetch logs: {}", error);
    }
    print!("{}", logs);
    Ok(())
}

pub async fn delete_pod<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    namespace: &str,
    pod: &str,
) -> Result<()> {
    connect(engine).await?;
    if !engine.mirror().delete_pod(namespace, pod).await {
        bail!("Failed to delete pod: {}", last_error(engine));
    }
    println!("pod \"{}\" deleted", pod);
    Ok(())
}

pub async fn scale<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    namespace: &str,
    name: &str,
    replicas: u32,
) -> Result<()> {
    connect(engine).await?;
    if !engine
        .mirror()
        .scale_statefulset(namespace, name, replicas)
        .await
    {
        bail!("Failed to scale statefulset: {}", last_error(engine));
    }
    println!("statefulset \"{}\" scaled to {}", name, replicas);
    Ok(())
}

pub async fn restart<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    namespace: &str,
    name: &str,
) -> Result<()> {
    connect(engine).await?;
    if !engine.mirror().restart_statefulset(namespace, name).await {
        bail!("Failed to restart statefulset: {}", last_error(engine));
    }
    println!("statefulset \"{}\" restarted", name);
    Ok(())
}

fn last_error<B: CommandBridge + 'static>(engine: &Engine<B>) -> String {
    engine.selector().error().unwrap_or_default()
}

/// Plain-text form of a JSON cell.
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_cells() {
        assert_eq!(text(&json!("Running")), "Running");
        assert_eq!(text(&json!(3)), "3");
        assert_eq!(text(&json!(["80/TCP", "443/TCP"])), "80/TCP,443/TCP");
        assert_eq!(text(&Value::Null), "");
    }
}
