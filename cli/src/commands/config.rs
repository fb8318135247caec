//! Config command - show and change saved settings.

use anyhow::Result;
use kubedesk_core::{Config, ConfigStore};

use super::print_json;

pub fn show(store: &ConfigStore, config: &Config, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }

    println!("Config file: {}", store.path().display());
    println!();
    println!(
        "Port-forward poll interval: {} ms",
        config.port_forward_poll_interval_ms
    );
    println!(
        "Context poll interval:      {} ms",
        config.context_poll_interval_ms
    );
    println!(
        "Startup step delay:         {} ms",
        config.startup_step_delay_ms
    );
    println!("Bridge timeout:             {} s", config.bridge_timeout_secs);
    println!(
        "Discard stale completions:  {}",
        config.discard_stale_completions
    );
    println!(
        "Port-forward notifications: {}",
        config.port_forward_notifications
    );
    println!("Last view:                  {:?}", config.last_view);
    match &config.backend_command {
        Some(command) => println!("Backend command:            {}", command.join(" ")),
        None => println!("Backend command:            (not set)"),
    }
    Ok(())
}

pub async fn set_poll_interval(store: &ConfigStore, interval_ms: u64) -> Result<()> {
    store.set_port_forward_poll_interval(interval_ms).await?;
    println!("Port-forward poll interval set to {} ms", interval_ms);
    Ok(())
}

pub async fn set_backend(store: &ConfigStore, command: Vec<String>) -> Result<()> {
    if command.is_empty() {
        store.set_backend_command(None).await?;
        println!("Backend command cleared");
    } else {
        let line = command.join(" ");
        store.set_backend_command(Some(command)).await?;
        println!("Backend command set to: {}", line);
    }
    Ok(())
}
