//! Port-forward commands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use kubedesk_core::{
    CommandBridge, Engine, PortForwardNotification, PortForwardRequest, PortForwardSession,
    ResourceType,
};
use serde_json::json;

use super::{connect, print_json, truncate};

/// How often `watch` drains queued notifications.
const WATCH_TICK: Duration = Duration::from_millis(500);

pub async fn list<B: CommandBridge + 'static>(engine: &Engine<B>, json: bool) -> Result<()> {
    let forwards = engine.port_forwards();
    let sessions = forwards.list().await;
    if let Some(error) = forwards.error() {
        bail!("Failed to list port forwards: {}", error);
    }

    if json {
        return print_json(&sessions);
    }
    print_sessions(&sessions);
    Ok(())
}

pub async fn start<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    target: &str,
    ports: &str,
    namespace: &str,
    context: Option<String>,
    json: bool,
) -> Result<()> {
    connect(engine).await?;
    let (resource_type, resource_name) = parse_target(target)?;
    let (local_port, remote_port) = parse_ports(ports)?;
    let context = context.unwrap_or_else(|| engine.selector().current_context());

    let session = engine
        .port_forwards()
        .start(PortForwardRequest {
            context,
            namespace: namespace.to_string(),
            resource_type,
            resource_name,
            local_port,
            remote_port,
        })
        .await?;

    if json {
        return print_json(&session);
    }
    println!(
        "Forwarding {} -> {}:{} ({})",
        session.local_address(),
        session.target(),
        session.remote_port,
        session.id
    );
    Ok(())
}

pub async fn stop<B: CommandBridge + 'static>(engine: &Engine<B>, id: &str) -> Result<()> {
    let forwards = engine.port_forwards();
    let sessions = forwards.list().await;
    let id = resolve_id(&sessions, id)?;
    forwards.stop(&id).await?;
    println!("Stopped port forward {}", id);
    Ok(())
}

pub async fn stop_all<B: CommandBridge + 'static>(engine: &Engine<B>) -> Result<()> {
    engine.port_forwards().stop_all().await?;
    println!("Stopped all port forwards");
    Ok(())
}

pub async fn ports<B: CommandBridge + 'static>(
    engine: &Engine<B>,
    target: &str,
    namespace: &str,
    json: bool,
) -> Result<()> {
    connect(engine).await?;
    let (resource_type, name) = parse_target(target)?;
    let context = engine.selector().current_context();
    let ports = engine
        .port_forwards()
        .resolve_ports(&context, namespace, resource_type, &name)
        .await;

    if json {
        return print_json(&ports);
    }
    if ports.is_empty() {
        println!("{} exposes no ports.", target);
        return Ok(());
    }
    for port in &ports {
        println!("{:<20} {}", port.display_name(), port.protocol);
    }
    Ok(())
}

/// Poll sessions in the background and print status changes until Ctrl-C.
pub async fn watch<B: CommandBridge + 'static>(engine: &Arc<Engine<B>>, json: bool) -> Result<()> {
    let sessions = engine.port_forwards().list().await;
    if !json {
        print_sessions(&sessions);
        println!("\nWatching for changes (Ctrl-C to stop)...");
    }

    engine.start_background_tasks();
    let color = atty::is(atty::Stream::Stdout) && !json;
    let mut ticker = tokio::time::interval(WATCH_TICK);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            _ = ticker.tick() => {
                for notification in engine.port_forwards().take_notifications() {
                    print_notification(&notification, json, color)?;
                }
            }
        }
    }

    engine.stop_background_tasks();
    Ok(())
}

fn print_notification(
    notification: &PortForwardNotification,
    json: bool,
    color: bool,
) -> Result<()> {
    let time = Local::now();
    if json {
        let line = json!({
            "time": time.to_rfc3339(),
            "type": notification.notification_type(),
            "sessionId": notification.session_id(),
            "message": notification.message(),
        });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    let kind = notification.notification_type();
    let kind = if color {
        let code = match notification {
            PortForwardNotification::Connected { .. } => "32",
            PortForwardNotification::Failed { .. } => "31",
            PortForwardNotification::Closed { .. } => "33",
        };
        format!("\x1b[{}m{:<9}\x1b[0m", code, kind)
    } else {
        format!("{:<9}", kind)
    };
    println!(
        "{} {} {}",
        time.format("%H:%M:%S"),
        kind,
        notification.message()
    );
    Ok(())
}

fn print_sessions(sessions: &[PortForwardSession]) {
    if sessions.is_empty() {
        println!("No port forwards.");
        return;
    }

    // Table header
    println!(
        "{:<10} {:<30} {:<16} {:<7} {:<9} {:<6} CONTEXT",
        "ID", "TARGET", "LOCAL", "REMOTE", "STATUS", "CONNS"
    );
    println!("{}", "-".repeat(100));

    for session in sessions {
        println!(
            "{:<10} {:<30} {:<16} {:<7} {:<9} {:<6} {}",
            truncate(&session.id, 10),
            truncate(&format!("{}/{}", session.namespace, session.target()), 30),
            session.local_address(),
            session.remote_port,
            session.status.as_str(),
            session.active_connections,
            session.context
        );
    }

    println!("\nTotal: {} port forwards", sessions.len());
}

/// Parse `pod/<name>` or `svc/<name>`.
fn parse_target(target: &str) -> Result<(ResourceType, String)> {
    let (kind, name) = target
        .split_once('/')
        .ok_or_else(|| anyhow!("Target must look like pod/<name> or svc/<name>, got '{}'", target))?;
    if name.is_empty() {
        bail!("Target '{}' has no resource name", target);
    }
    let resource_type = kind.parse::<ResourceType>().map_err(|e| anyhow!(e))?;
    Ok((resource_type, name.to_string()))
}

/// Parse `LOCAL:REMOTE`, or one port used for both.
fn parse_ports(ports: &str) -> Result<(u16, u16)> {
    let parse = |s: &str| {
        s.parse::<u16>()
            .with_context(|| format!("Invalid port '{}'", s))
    };
    match ports.split_once(':') {
        Some((local, remote)) => Ok((parse(local)?, parse(remote)?)),
        None => {
            let port = parse(ports)?;
            Ok((port, port))
        }
    }
}

/// Find the one session whose id starts with `prefix`.
fn resolve_id(sessions: &[PortForwardSession], prefix: &str) -> Result<String> {
    let mut matches = sessions.iter().filter(|s| s.id.starts_with(prefix));
    match (matches.next(), matches.next()) {
        (Some(session), None) => Ok(session.id.clone()),
        (Some(_), Some(_)) => bail!("Id prefix '{}' matches more than one session", prefix),
        // Let the backend report unknown ids.
        (None, _) => Ok(prefix.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        let (kind, name) = parse_target("svc/web").unwrap();
        assert_eq!(kind, ResourceType::Service);
        assert_eq!(name, "web");
        assert_eq!(parse_target("pod/web-0").unwrap().0, ResourceType::Pod);
        assert!(parse_target("web").is_err());
        assert!(parse_target("svc/").is_err());
        assert!(parse_target("deploy/api").is_err());
    }

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_ports("8080:80").unwrap(), (8080, 80));
        assert_eq!(parse_ports("5432").unwrap(), (5432, 5432));
        assert!(parse_ports("80:http").is_err());
        assert!(parse_ports("70000").is_err());
    }
}
