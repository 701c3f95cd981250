use async_trait::async_trait;
use cellsync_core::{AgentReply, ClientError, Command, ControlPlane, StatusSnapshot};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc;

use crate::app::App;
use crate::chat::ChatSession;
use crate::dispatch::Dispatcher;
use crate::events::ConsoleEvent;
use crate::poller::PollTrigger;
use crate::view::ViewModel;

/// In-memory control plane with scripted answers that records what it was asked.
pub(crate) struct ScriptedPlane {
    status: Mutex<Result<StatusSnapshot, ClientError>>,
    logs: Mutex<Result<Vec<String>, ClientError>>,
    command_result: Mutex<Result<(), ClientError>>,
    chat_replies: Mutex<VecDeque<Result<AgentReply, ClientError>>>,
    commands: Mutex<Vec<Command>>,
    chats: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    stall_status: AtomicBool,
}

impl ScriptedPlane {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(Ok(StatusSnapshot::default())),
            logs: Mutex::new(Ok(Vec::new())),
            command_result: Mutex::new(Ok(())),
            chat_replies: Mutex::new(VecDeque::new()),
            commands: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            stall_status: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_status(self, active: &[u16], total: &[u16]) -> Self {
        *self.status.lock().expect("status lock") = Ok(snapshot(active, total));
        self
    }

    pub(crate) fn with_logs(self, logs: &[&str]) -> Self {
        *self.logs.lock().expect("logs lock") =
            Ok(logs.iter().map(|line| line.to_string()).collect());
        self
    }

    /// Status requests never complete, like a supervisor that stopped answering.
    pub(crate) fn stalled_status(self) -> Self {
        self.stall_status.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_logs(self, err: ClientError) -> Self {
        *self.logs.lock().expect("logs lock") = Err(err);
        self
    }

    pub(crate) fn failing_commands(self, err: ClientError) -> Self {
        *self.command_result.lock().expect("command lock") = Err(err);
        self
    }

    pub(crate) fn with_chat_reply(self, reply: Result<AgentReply, ClientError>) -> Self {
        self.chat_replies
            .lock()
            .expect("chat lock")
            .push_back(reply);
        self
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().expect("commands lock").clone()
    }

    pub(crate) fn chats(&self) -> Vec<String> {
        self.chats.lock().expect("chats lock").clone()
    }

    pub(crate) fn status_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for ScriptedPlane {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.stall_status.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.status.lock().expect("status lock").clone()
    }

    async fn fetch_logs(&self) -> Result<Vec<String>, ClientError> {
        self.logs.lock().expect("logs lock").clone()
    }

    async fn send_command(&self, command: Command) -> Result<(), ClientError> {
        self.commands.lock().expect("commands lock").push(command);
        self.command_result.lock().expect("command lock").clone()
    }

    async fn chat(&self, message: &str) -> Result<AgentReply, ClientError> {
        self.chats
            .lock()
            .expect("chats lock")
            .push(message.to_string());
        self.chat_replies
            .lock()
            .expect("chat lock")
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("no scripted reply".to_string())))
    }
}

pub(crate) fn snapshot(active: &[u16], total: &[u16]) -> StatusSnapshot {
    StatusSnapshot {
        active_ports: active.to_vec(),
        total_ports: total.to_vec(),
    }
}

/// Dashboard wired to `plane`, with the poll-request and event receivers the
/// real loop would own.
pub(crate) fn app_with(
    plane: Arc<ScriptedPlane>,
) -> (App, mpsc::UnboundedReceiver<()>, mpsc::Receiver<ConsoleEvent>) {
    let (trigger, requests) = PollTrigger::channel();
    let (tx, events) = mpsc::channel(16);
    let dispatcher = Dispatcher::new(plane.clone(), trigger);
    let chat = ChatSession::new(plane, tx);
    let app = App::new(ViewModel::new(""), dispatcher, chat, "http://localhost:8000");
    (app, requests, events)
}
