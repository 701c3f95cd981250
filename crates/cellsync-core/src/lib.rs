pub mod client;
pub mod error;
pub mod model;

pub use client::{ControlPlane, HttpControlPlane};
pub use error::ClientError;
pub use model::{
    ActionDirective, AgentReply, Cell, ChatEntry, ChatRequest, ChatRole, Command, LogsPayload,
    StatusSnapshot,
};
