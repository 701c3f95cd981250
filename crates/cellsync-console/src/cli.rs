use anyhow::{bail, Context, Result};
use cellsync_core::{ChatRole, Command, ControlPlane, StatusSnapshot};
use clap::{Parser, Subcommand};
use std::{io::Write, path::PathBuf, sync::Arc};
use tokio::sync::mpsc;

use crate::chat::{ChatSession, SubmitOutcome};
use crate::config::Overrides;
use crate::dispatch::pick_random_port;
use crate::events::ConsoleEvent;
use crate::poller::fetch_cluster;
use crate::theme;
use crate::view::ViewModel;

#[derive(Parser, Debug)]
#[command(name = "cellsync")]
#[command(about = "CellSync cluster dashboard", long_about = None)]
pub struct Cli {
    /// Supervisor base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    pub poll_ms: Option<u64>,
    #[arg(long, global = true)]
    pub request_timeout_ms: Option<u64>,
    /// Path to config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            backend_url: self.backend_url.clone(),
            poll_ms: self.poll_ms,
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(rename_all = "kebab-case")]
pub enum Commands {
    /// Print cell status
    Status,
    /// Print supervisor logs
    Logs {
        #[arg(long)]
        tail: Option<usize>,
    },
    /// Start the cluster
    Start,
    /// Stop the cluster
    Stop,
    /// Kill the cell on a port
    Kill { port: u16 },
    /// Revive the cell on a port
    Revive { port: u16 },
    /// Kill one alive cell at random
    KillRandom,
    /// Send a message to the agent
    Chat {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
}

/// Runs one headless command. Control commands always print the status
/// fetched after them, even when the supervisor rejected the command.
pub async fn run(command: Commands, plane: Arc<dyn ControlPlane>, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Status => {
            let status = plane
                .fetch_status()
                .await
                .context("failed to fetch status")?;
            print_status(out, &status)?;
        }
        Commands::Logs { tail } => {
            let logs = plane.fetch_logs().await.context("failed to fetch logs")?;
            let start = tail.map_or(0, |tail| logs.len().saturating_sub(tail));
            for line in &logs[start..] {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Start => send_then_report(plane.as_ref(), Command::Start, out).await?,
        Commands::Stop => send_then_report(plane.as_ref(), Command::Stop, out).await?,
        Commands::Kill { port } => {
            send_then_report(plane.as_ref(), Command::Kill(port), out).await?
        }
        Commands::Revive { port } => {
            send_then_report(plane.as_ref(), Command::Revive(port), out).await?
        }
        Commands::KillRandom => {
            let status = plane
                .fetch_status()
                .await
                .context("failed to fetch status")?;
            let Some(port) = pick_random_port(&status.active_ports, &mut rand::thread_rng())
            else {
                writeln!(out, "no alive cells")?;
                return Ok(());
            };
            send_then_report(plane.as_ref(), Command::Kill(port), out).await?;
        }
        Commands::Chat { message } => chat_once(plane, message.join(" "), out).await?,
    }
    Ok(())
}

async fn send_then_report(
    plane: &dyn ControlPlane,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    let sent = plane.send_command(command).await;
    let state = fetch_cluster(plane)
        .await
        .context("failed to fetch status")?;
    print_status(out, &state.status)?;
    sent.with_context(|| format!("{command} failed"))
}

async fn chat_once(plane: Arc<dyn ControlPlane>, message: String, out: &mut impl Write) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(1);
    let mut session = ChatSession::new(plane, tx);
    let mut view = ViewModel::new("");

    if session.submit(&mut view, message) != (SubmitOutcome::Sent { ticket: 1 }) {
        bail!("message is empty");
    }
    match rx.recv().await {
        Some(ConsoleEvent::ChatReplied { ticket, result }) => {
            session.complete(&mut view, ticket, result);
        }
        _ => bail!("chat ended without a reply"),
    }

    let mut failed = false;
    for entry in view.transcript().iter().skip(1) {
        writeln!(out, "{}: {}", theme::role_prefix(entry.role), entry.content)?;
        failed |= entry.role == ChatRole::Error;
    }
    if failed {
        bail!("agent chat failed");
    }
    Ok(())
}

fn print_status(out: &mut impl Write, status: &StatusSnapshot) -> Result<()> {
    writeln!(
        out,
        "cells {}/{} alive",
        status.alive_count(),
        status.total_ports.len()
    )?;
    for cell in status.cells() {
        let state = if cell.alive { "ALIVE" } else { "DEAD" };
        writeln!(out, "{} {state}", cell.label())?;
    }
    Ok(())
}
