use cellsync_core::{ChatEntry, StatusSnapshot};

pub const DEFAULT_GREETING: &str = "Hello! I am the CellSync Agent. How can I help you?";

/// Everything the dashboard displays. Rendering reads it; the poller, the
/// dispatcher follow-up polls and the chat session change it only through the
/// whole-value replace and append operations below.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    status: StatusSnapshot,
    logs: Vec<String>,
    transcript: Vec<ChatEntry>,
    loading: bool,
    input: String,
}

impl ViewModel {
    /// A blank greeting starts the transcript empty.
    pub fn new(greeting: &str) -> Self {
        let mut transcript = Vec::new();
        if !greeting.trim().is_empty() {
            transcript.push(ChatEntry::system(greeting));
        }
        Self {
            transcript,
            ..Self::default()
        }
    }

    pub fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Status and logs always move together.
    pub(crate) fn replace_cluster(&mut self, status: StatusSnapshot, logs: Vec<String>) {
        self.status = status;
        self.logs = logs;
    }

    pub(crate) fn append(&mut self, entry: ChatEntry) {
        self.transcript.push(entry);
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn push_input(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub(crate) fn pop_input(&mut self) {
        self.input.pop();
    }

    pub(crate) fn clear_input(&mut self) {
        self.input.clear();
    }
}
