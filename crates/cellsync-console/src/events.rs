use cellsync_core::{AgentReply, ClientError};

use crate::poller::ClusterState;

/// Completions delivered back onto the dashboard loop, applied one at a time.
#[derive(Debug)]
pub enum ConsoleEvent {
    Polled {
        seq: u64,
        result: Result<ClusterState, ClientError>,
    },
    ChatReplied {
        ticket: u64,
        result: Result<AgentReply, ClientError>,
    },
}
