use axum::{Router, extract::Extension, routing::get};
use clap::Parser;
use command_fabric::command::engine::Command;
use command_fabric::command::handlers::{handle_commands, handle_status};
use command_fabric::config::NodeConfig;
use command_fabric::message::types::RoutingKey;
use command_fabric::outgoing::types::STATUS_OK;
use command_fabric::router::types::{CommandRequest, handler_fn};
use command_fabric::schedule::types::{ScheduleDefinition, TimerConfig, schedule_fn};
use command_fabric::transport::spawn_listener;
use command_fabric::transport::udp::UdpTransport;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "command-node", about = "Runs one command engine instance over UDP")]
struct Args {
    /// JSON config file; command line values override it.
    #[arg(long, env = "COMMAND_NODE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "COMMAND_NODE_BIND")]
    bind: Option<SocketAddr>,

    /// May be repeated.
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    #[arg(long, env = "COMMAND_NODE_HTTP")]
    http: Option<SocketAddr>,

    #[arg(long, env = "COMMAND_NODE_NAME")]
    name: Option<String>,

    #[arg(long, env = "COMMAND_NODE_LOG")]
    log_level: Option<String>,

    /// Take part in master job negotiation.
    #[arg(long)]
    master_job: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        config.peers.extend(self.peers);
        if self.http.is_some() {
            config.http_addr = self.http;
        }
        if let Some(name) = self.name {
            config.command_name = name;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if self.master_job {
            config.command.master_job.enabled = true;
        }

        Ok(config)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EchoRequest {
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    tracing::info!("Starting '{}' on {}", config.command_name, config.bind);
    if config.peers.is_empty() {
        tracing::info!("No peers configured, running standalone");
    } else {
        tracing::info!("Peers: {:?}", config.peers);
    }

    // 1. Transport (UDP):
    let transport = UdpTransport::bind(config.bind, config.peers.clone()).await?;
    let inbound = transport.clone().start()?;

    // 2. Command:
    let command = Command::builder(&config.command_name)
        .policy(config.command.clone())
        .dispatcher(transport.clone())
        .handler(
            RoutingKey::new(Some("node"), Some("echo"), None),
            handler_fn(|request: CommandRequest| async move {
                let echo: EchoRequest = request.payload()?;
                tracing::info!("Echo from {}: {}", request.message.originator_service_id, echo.text);
                Ok(request.reply(STATUS_OK, "OK", &echo)?.into_iter().collect())
            }),
        )
        .master_job_handler(
            RoutingKey::new(Some("node"), Some("leader"), None),
            handler_fn(|request: CommandRequest| async move {
                Ok(request
                    .reply(STATUS_OK, "OK", &request.service_id.0)?
                    .into_iter()
                    .collect())
            }),
        )
        .master_job_schedule(ScheduleDefinition::new(
            "leader-heartbeat",
            TimerConfig::every(Duration::from_secs(10)),
            schedule_fn(|schedule| async move {
                tracing::info!("Master heartbeat (run {})", schedule.executions() + 1);
                Ok(())
            }),
        ))
        .build()?;

    command.start()?;
    spawn_listener(command.clone(), inbound);
    tracing::info!("Service id: {}", command.service_id());

    // 3. Spawn stats reporter:
    let stats_command = command.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            let status = stats_command.master_job_status();
            tracing::info!(
                "Node stats: state={} known_master={:?} partners={} pending={}",
                status.state,
                status.known_master,
                status.partners.len(),
                stats_command.pending_outgoing()
            );
        }
    });

    // 4. HTTP diagnostics:
    let app = Router::new()
        .route("/status", get(handle_status))
        .route("/commands", get(handle_commands))
        .layer(Extension(command.clone()));

    let http_addr = config.http_addr();
    tracing::info!("HTTP server listening on {}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await?;

    tracing::info!("Shutting down '{}'", command.name());
    command.stop()?;

    Ok(())
}
