//! KubeDesk CLI - Browse and manage Kubernetes clusters
//!
//! A command-line front end for the KubeDesk state layer. Talks to a
//! backend helper process over the command bridge, or to a simulated
//! cluster with `--simulate`.

mod commands;

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use kubedesk_core::{
    CommandBridge, Config, ConfigStore, Engine, InMemoryBackend, ResourceKind, StdioBridge,
};
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kubedesk")]
#[command(author, version, about = "Browse and manage Kubernetes clusters")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Use a simulated in-memory cluster instead of a backend process
    #[arg(long, global = true)]
    simulate: bool,

    /// Backend command line (e.g. "kubedesk-backend --stdio")
    #[arg(long, global = true, value_name = "CMD")]
    backend: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the startup diagnostics
    Startup,

    /// List kubeconfig contexts
    #[command(alias = "ctx")]
    Contexts,

    /// Switch the current context
    UseContext { name: String },

    /// List namespaces of the current context
    #[command(alias = "ns")]
    Namespaces,

    /// Show the health summary of the cluster
    Pulse {
        /// Only count resources in this namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// List resources of one kind
    Get {
        /// Resource kind (pods, deploy, svc, ...)
        kind: ResourceKind,

        /// Only show resources in this namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Search every resource kind by name
    Search {
        query: String,

        /// Only search in this namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Print the logs of a pod
    Logs {
        pod: String,

        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Container name (defaults to the first container)
        #[arg(short, long)]
        container: Option<String>,

        /// Number of lines from the end of the log
        #[arg(long)]
        tail: Option<u32>,

        /// Logs of the previous container instance
        #[arg(short, long)]
        previous: bool,
    },

    /// Delete a pod
    DeletePod {
        pod: String,

        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Scale a statefulset
    Scale {
        statefulset: String,
        replicas: u32,

        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Rolling-restart a statefulset
    Restart {
        statefulset: String,

        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Manage port forwards
    #[command(name = "pf", alias = "port-forward")]
    PortForward {
        #[command(subcommand)]
        action: PortForwardAction,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum PortForwardAction {
    /// List port-forward sessions
    #[command(alias = "ls")]
    List,
    /// Start forwarding a local port to a pod or service
    Start {
        /// Target as pod/<name> or svc/<name>
        target: String,
        /// LOCAL:REMOTE, or a single port used for both
        ports: String,
        #[arg(short, long, default_value = "default")]
        namespace: String,
        /// Context to forward in (defaults to the current one)
        #[arg(long)]
        context: Option<String>,
    },
    /// Stop a session by id (a unique prefix is enough)
    Stop { id: String },
    /// Stop every session
    StopAll,
    /// List the ports a pod or service exposes
    Ports {
        /// Target as pod/<name> or svc/<name>
        target: String,
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
    /// Follow session status changes until interrupted
    Watch,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set the port-forward poll interval in milliseconds
    SetPollInterval { ms: u64 },
    /// Set the backend command line (no arguments clears it)
    SetBackend {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = ConfigStore::new()?;
    let config = store.load().await?;

    let command = match cli.command {
        Commands::Config { action } => {
            match action.unwrap_or(ConfigAction::Show) {
                ConfigAction::Show => commands::config::show(&store, &config, cli.json)?,
                ConfigAction::SetPollInterval { ms } => {
                    commands::config::set_poll_interval(&store, ms).await?
                }
                ConfigAction::SetBackend { command } => {
                    commands::config::set_backend(&store, command).await?
                }
            }
            return Ok(());
        }
        other => other,
    };

    if cli.simulate {
        let bridge = Arc::new(InMemoryBackend::with_sample_cluster());
        return run(bridge, config, command, cli.json).await;
    }

    let command_line: Vec<String> = match cli.backend {
        Some(line) => line.split_whitespace().map(str::to_string).collect(),
        None => config.backend_command.clone().unwrap_or_default(),
    };
    let Some((program, args)) = command_line.split_first() else {
        bail!(
            "No backend configured. Pass --backend <CMD>, save one with \
             `kubedesk config set-backend`, or use --simulate."
        );
    };

    let bridge = Arc::new(StdioBridge::spawn(program, args, config.bridge_timeout())?);
    let result = run(Arc::clone(&bridge), config, command, cli.json).await;
    bridge.shutdown().await;
    result
}

async fn run<B: CommandBridge + 'static>(
    bridge: Arc<B>,
    config: Config,
    command: Commands,
    json: bool,
) -> Result<()> {
    let engine = Arc::new(Engine::new(bridge, config));

    match command {
        Commands::Startup => commands::cluster::startup(&engine, json).await?,
        Commands::Contexts => commands::cluster::contexts(&engine, json).await?,
        Commands::UseContext { name } => commands::cluster::use_context(&engine, &name).await?,
        Commands::Namespaces => commands::cluster::namespaces(&engine, json).await?,
        Commands::Pulse { namespace } => {
            commands::cluster::pulse(&engine, namespace.as_deref(), json).await?
        }
        Commands::Get { kind, namespace } => {
            commands::resources::get(&engine, kind, namespace, json).await?
        }
        Commands::Search { query, namespace } => {
            commands::resources::search(&engine, &query, namespace, json).await?
        }
        Commands::Logs {
            pod,
            namespace,
            container,
            tail,
            previous,
        } => {
            commands::resources::logs(&engine, &namespace, &pod, container, tail, previous)
                .await?
        }
        Commands::DeletePod { pod, namespace } => {
            commands::resources::delete_pod(&engine, &namespace, &pod).await?
        }
        Commands::Scale {
            statefulset,
            replicas,
            namespace,
        } => commands::resources::scale(&engine, &namespace, &statefulset, replicas).await?,
        Commands::Restart {
            statefulset,
            namespace,
        } => commands::resources::restart(&engine, &namespace, &statefulset).await?,
        Commands::PortForward { action } => match action {
            PortForwardAction::List => commands::portforward::list(&engine, json).await?,
            PortForwardAction::Start {
                target,
                ports,
                namespace,
                context,
            } => {
                commands::portforward::start(&engine, &target, &ports, &namespace, context, json)
                    .await?
            }
            PortForwardAction::Stop { id } => commands::portforward::stop(&engine, &id).await?,
            PortForwardAction::StopAll => commands::portforward::stop_all(&engine).await?,
            PortForwardAction::Ports { target, namespace } => {
                commands::portforward::ports(&engine, &target, &namespace, json).await?
            }
            PortForwardAction::Watch => commands::portforward::watch(&engine, json).await?,
        },
        // Handled before a bridge is started.
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Log to stderr so JSON output on stdout stays clean.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
