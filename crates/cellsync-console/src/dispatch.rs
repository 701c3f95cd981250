use cellsync_core::{Command, ControlPlane, StatusSnapshot};
use rand::{seq::SliceRandom, Rng};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::poller::PollTrigger;

/// Fire-and-forget control commands. The display is never updated from a
/// command response; every command is followed by one extra poll instead.
#[derive(Clone)]
pub struct Dispatcher {
    plane: Arc<dyn ControlPlane>,
    trigger: PollTrigger,
}

impl Dispatcher {
    pub fn new(plane: Arc<dyn ControlPlane>, trigger: PollTrigger) -> Self {
        Self { plane, trigger }
    }

    pub fn start(&self) -> JoinHandle<()> {
        self.dispatch(Command::Start)
    }

    pub fn stop(&self) -> JoinHandle<()> {
        self.dispatch(Command::Stop)
    }

    pub fn kill_port(&self, port: u16) -> JoinHandle<()> {
        self.dispatch(Command::Kill(port))
    }

    pub fn revive_port(&self, port: u16) -> JoinHandle<()> {
        self.dispatch(Command::Revive(port))
    }

    /// Kills one port picked from `status.active_ports`. Nothing is sent when
    /// no port is alive.
    pub fn kill_random_alive_port(&self, status: &StatusSnapshot) -> Option<(u16, JoinHandle<()>)> {
        let port = pick_random_port(&status.active_ports, &mut rand::thread_rng())?;
        Some((port, self.kill_port(port)))
    }

    fn dispatch(&self, command: Command) -> JoinHandle<()> {
        let plane = self.plane.clone();
        let trigger = self.trigger.clone();
        info!(event = "command_dispatch", command = %command);
        tokio::spawn(async move {
            if let Err(err) = plane.send_command(command).await {
                warn!(
                    event = "command_failed",
                    command = %command,
                    kind = err.kind(),
                    error = %err
                );
            }
            trigger.request();
        })
    }
}

pub fn pick_random_port<R: Rng + ?Sized>(active: &[u16], rng: &mut R) -> Option<u16> {
    active.choose(rng).copied()
}
