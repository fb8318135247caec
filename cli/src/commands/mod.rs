//! Subcommand implementations.

pub mod cluster;
pub mod config;
pub mod portforward;
pub mod resources;

use anyhow::{bail, Result};
use kubedesk_core::{CommandBridge, Engine};
use serde::Serialize;

/// Load contexts and fail unless a current context is available.
pub async fn connect<B: CommandBridge + 'static>(engine: &Engine<B>) -> Result<()> {
    let selector = engine.selector();
    selector.load_contexts().await;
    if let Some(error) = selector.error() {
        bail!("Failed to reach the cluster: {}", error);
    }
    if !selector.is_ready() {
        bail!("No current context. Run `kubedesk use-context <name>` first.");
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("web-0", 10), "web-0");
        assert_eq!(truncate("coredns-5d78c9869d-abcde", 10), "coredns-5…");
        assert_eq!(truncate("żółć-pod", 4), "żół…");
    }
}
