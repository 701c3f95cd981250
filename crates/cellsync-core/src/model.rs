use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Cluster status as reported by the supervisor.
///
/// Ports are kept in the order the supervisor sent them; the console never
/// sorts, deduplicates or filters them. `active_ports ⊆ total_ports` is the
/// supervisor's invariant, not ours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub active_ports: Vec<u16>,
    pub total_ports: Vec<u16>,
}

impl StatusSnapshot {
    pub fn is_alive(&self, port: u16) -> bool {
        self.active_ports.contains(&port)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.total_ports.iter().map(|&port| Cell {
            port,
            alive: self.is_alive(port),
        })
    }

    pub fn alive_count(&self) -> usize {
        self.cells().filter(|cell| cell.alive).count()
    }
}

/// A worker process addressed by its port. Derived from a snapshot, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub port: u16,
    pub alive: bool,
}

impl Cell {
    pub fn label(&self) -> String {
        format!("Cell-{}", self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsPayload {
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
    System,
    Error,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Agent => "agent",
            ChatRole::System => "system",
            ChatRole::Error => "error",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Agent, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Error, content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Reply from `POST /agent/chat`.
///
/// When `action` is present the agent has already carried the action out on
/// the supervisor before answering; the console only reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_target",
        skip_serializing_if = "Option::is_none"
    )]
    pub target: Option<String>,
}

impl AgentReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            action: None,
            target: None,
        }
    }

    /// Any non-blank `action` is reported. Cluster-wide actions carry no
    /// target.
    pub fn directive(&self) -> Option<ActionDirective> {
        let action = self.action.as_deref().filter(|a| !a.trim().is_empty())?;
        let target = self
            .target
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);
        Some(ActionDirective {
            action: action.to_string(),
            target,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDirective {
    pub action: String,
    pub target: Option<String>,
}

impl ActionDirective {
    pub fn notice(&self) -> String {
        format!(
            "⚡ EXECUTING ACTION: {} on target {}",
            self.action,
            self.target.as_deref().unwrap_or("null")
        )
    }
}

/// Control command sent to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Kill(u16),
    Revive(u16),
}

impl Command {
    pub fn path(&self) -> String {
        match self {
            Command::Start => "/start".to_string(),
            Command::Stop => "/stop".to_string(),
            Command::Kill(port) => format!("/kill/{port}"),
            Command::Revive(port) => format!("/revive/{port}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Kill(_) => "kill",
            Command::Revive(_) => "revive",
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Command::Kill(port) | Command::Revive(port) => Some(*port),
            Command::Start | Command::Stop => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port() {
            Some(port) => write!(f, "{} {}", self.name(), port),
            None => f.write_str(self.name()),
        }
    }
}

/// Accepts a string, an integer, or null for the action target.
fn deserialize_target<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Option<Value> = Option::deserialize(deserializer)?;
    match val {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected string, number or null for target",
        )),
    }
}
