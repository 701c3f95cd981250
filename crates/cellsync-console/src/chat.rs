//! Chat session with the agent.
//!
//! A submission moves the session from idle to loading and back. While
//! loading, further submissions are rejected, so the entries of two
//! submissions never interleave. Action directives in a reply are reported
//! as system entries only; the agent has already executed them.

use cellsync_core::{AgentReply, ChatEntry, ClientError, ControlPlane};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::ConsoleEvent;
use crate::view::ViewModel;

pub const AGENT_FAILURE_MESSAGE: &str = "Failed to reach Agent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank message; nothing happened.
    Ignored,
    /// A previous submission is still loading.
    Busy,
    Sent { ticket: u64 },
}

pub struct ChatSession {
    plane: Arc<dyn ControlPlane>,
    events: mpsc::Sender<ConsoleEvent>,
    next_ticket: u64,
    in_flight: Option<u64>,
    active: bool,
}

impl ChatSession {
    pub fn new(plane: Arc<dyn ControlPlane>, events: mpsc::Sender<ConsoleEvent>) -> Self {
        Self {
            plane,
            events,
            next_ticket: 0,
            in_flight: None,
            active: true,
        }
    }

    pub fn submit(&mut self, view: &mut ViewModel, message: String) -> SubmitOutcome {
        if !self.active || message.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        if view.is_loading() {
            debug!(event = "chat_submit_rejected", reason = "loading");
            return SubmitOutcome::Busy;
        }

        view.append(ChatEntry::user(message.clone()));
        view.clear_input();
        view.set_loading(true);

        self.next_ticket = self.next_ticket.saturating_add(1);
        let ticket = self.next_ticket;
        self.in_flight = Some(ticket);

        let plane = self.plane.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = plane.chat(&message).await;
            if events
                .send(ConsoleEvent::ChatReplied { ticket, result })
                .await
                .is_err()
            {
                debug!(event = "chat_reply_discarded", ticket, reason = "loop_closed");
            }
        });
        info!(event = "chat_submitted", ticket);
        SubmitOutcome::Sent { ticket }
    }

    /// Applies the agent's answer for `ticket`. Returns false when the reply
    /// was discarded (stale ticket or torn-down session).
    pub fn complete(
        &mut self,
        view: &mut ViewModel,
        ticket: u64,
        result: Result<AgentReply, ClientError>,
    ) -> bool {
        if !self.active || self.in_flight != Some(ticket) {
            debug!(event = "chat_reply_discarded", ticket, reason = "stale");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(reply) => {
                let directive = reply.directive();
                view.append(ChatEntry::agent(reply.response));
                if let Some(directive) = directive {
                    info!(
                        event = "agent_action_reported",
                        action = %directive.action,
                        target = directive.target.as_deref().unwrap_or("null")
                    );
                    view.append(ChatEntry::system(directive.notice()));
                }
            }
            Err(err) => {
                warn!(
                    event = "chat_failed",
                    ticket,
                    kind = err.kind(),
                    error = %err
                );
                view.append(ChatEntry::error(AGENT_FAILURE_MESSAGE));
            }
        }
        view.set_loading(false);
        true
    }

    pub fn teardown(&mut self) {
        self.active = false;
        self.in_flight = None;
    }
}
