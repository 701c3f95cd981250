use cellsync_core::Cell;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::chat::{ChatSession, SubmitOutcome};
use crate::dispatch::Dispatcher;
use crate::events::ConsoleEvent;
use crate::poller::PollSequencer;
use crate::view::ViewModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Cells,
    Chat,
}

pub struct App {
    view: ViewModel,
    dispatcher: Dispatcher,
    chat: ChatSession,
    sequencer: PollSequencer,
    backend_url: String,
    focus: Focus,
    selected: usize,
    show_help: bool,
    status_note: Option<String>,
    last_sync: Option<DateTime<Local>>,
    should_quit: bool,
}

impl App {
    pub fn new(
        view: ViewModel,
        dispatcher: Dispatcher,
        chat: ChatSession,
        backend_url: impl Into<String>,
    ) -> Self {
        Self {
            view,
            dispatcher,
            chat,
            sequencer: PollSequencer::default(),
            backend_url: backend_url.into(),
            focus: Focus::default(),
            selected: 0,
            show_help: false,
            status_note: None,
            last_sync: None,
            should_quit: false,
        }
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    #[cfg(test)]
    pub(crate) fn view_mut(&mut self) -> &mut ViewModel {
        &mut self.view
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status_note(&self) -> Option<&str> {
        self.status_note.as_deref()
    }

    pub fn last_sync(&self) -> Option<DateTime<Local>> {
        self.last_sync
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn selected_cell(&self) -> Option<Cell> {
        self.view.status().cells().nth(self.selected)
    }

    pub fn apply_event(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::Polled { seq, result } => match result {
                Ok(state) => {
                    if !self.sequencer.admit(seq) {
                        debug!(
                            event = "poll_discarded",
                            seq,
                            last_applied = self.sequencer.last_applied()
                        );
                        return;
                    }
                    self.view.replace_cluster(state.status, state.logs);
                    self.clamp_selection();
                    self.last_sync = Some(Local::now());
                }
                Err(err) => {
                    warn!(event = "poll_failed", seq, kind = err.kind(), error = %err);
                }
            },
            ConsoleEvent::ChatReplied { ticket, result } => {
                self.chat.complete(&mut self.view, ticket, result);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.focus {
            Focus::Cells => self.handle_cells_key(key),
            Focus::Chat => self.handle_chat_key(key),
        }
    }

    fn handle_cells_key(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter => self.show_help = false,
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected_cell(),
            KeyCode::Char('s') => {
                self.dispatcher.start();
                self.note("start requested");
            }
            KeyCode::Char('x') => {
                self.dispatcher.stop();
                self.note("stop requested");
            }
            KeyCode::Char('r') => self.kill_random(),
            KeyCode::Tab | KeyCode::Char('i') => self.focus = Focus::Chat,
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Cells,
            KeyCode::Enter => self.submit_chat(),
            KeyCode::Backspace => self.view.pop_input(),
            KeyCode::Char(ch) => {
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
                    self.view.push_input(ch);
                }
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.view.status().total_ports.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as i32 + delta).clamp(0, len as i32 - 1);
        self.selected = next as usize;
    }

    fn clamp_selection(&mut self) {
        let len = self.view.status().total_ports.len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn toggle_selected_cell(&mut self) {
        let Some(cell) = self.selected_cell() else {
            return;
        };
        if cell.alive {
            self.dispatcher.kill_port(cell.port);
            self.note(format!("kill {} requested", cell.label()));
        } else {
            self.dispatcher.revive_port(cell.port);
            self.note(format!("revive {} requested", cell.label()));
        }
    }

    fn kill_random(&mut self) {
        match self.dispatcher.kill_random_alive_port(self.view.status()) {
            Some((port, _)) => self.note(format!("kill Cell-{port} requested")),
            None => self.note("no alive cells"),
        }
    }

    fn submit_chat(&mut self) {
        let message = self.view.input().to_string();
        if self.chat.submit(&mut self.view, message) == SubmitOutcome::Busy {
            self.note("agent is still thinking");
        }
    }

    fn note(&mut self, note: impl Into<String>) {
        self.status_note = Some(note.into());
    }

    /// Stops chat completions from landing once the dashboard is closing.
    pub fn teardown(&mut self) {
        self.chat.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::ClusterState;
    use crate::testing::{app_with, snapshot, ScriptedPlane};
    use cellsync_core::{AgentReply, ChatRole, ClientError, Command};
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn polled(seq: u64, active: &[u16], total: &[u16], logs: &[&str]) -> ConsoleEvent {
        ConsoleEvent::Polled {
            seq,
            result: Ok(ClusterState {
                status: snapshot(active, total),
                logs: logs.iter().map(|line| line.to_string()).collect(),
            }),
        }
    }

    #[test]
    fn successful_poll_replaces_status_and_logs_verbatim() {
        let (mut app, _requests, _events) = app_with(Arc::new(ScriptedPlane::new()));

        app.apply_event(polled(1, &[5002, 5000], &[5002, 5000, 5001], &["b", "a"]));

        assert_eq!(app.view().status().active_ports, vec![5002, 5000]);
        assert_eq!(app.view().status().total_ports, vec![5002, 5000, 5001]);
        assert_eq!(app.view().logs(), ["b".to_string(), "a".to_string()]);
        assert!(app.last_sync().is_some());
    }

    #[test]
    fn stale_poll_is_discarded() {
        let (mut app, _requests, _events) = app_with(Arc::new(ScriptedPlane::new()));

        app.apply_event(polled(2, &[5000], &[5000], &["newer"]));
        app.apply_event(polled(1, &[], &[5000, 5001], &["older"]));

        assert_eq!(app.view().status().total_ports, vec![5000]);
        assert_eq!(app.view().logs(), ["newer".to_string()]);
    }

    #[test]
    fn failed_poll_leaves_display_unchanged() {
        let (mut app, _requests, _events) = app_with(Arc::new(ScriptedPlane::new()));
        app.apply_event(polled(1, &[5000], &[5000, 5001], &["kept"]));
        let status = app.view().status().clone();
        let logs = app.view().logs().to_vec();
        let synced = app.last_sync();

        app.apply_event(ConsoleEvent::Polled {
            seq: 2,
            result: Err(ClientError::Network("connection refused".to_string())),
        });

        assert_eq!(app.view().status(), &status);
        assert_eq!(app.view().logs(), logs.as_slice());
        assert_eq!(app.last_sync(), synced);

        // A failed poll does not consume its sequence slot.
        app.apply_event(polled(2, &[], &[5001], &[]));
        assert_eq!(app.view().status().total_ports, vec![5001]);
    }

    #[test]
    fn selection_stays_within_cells() {
        let (mut app, _requests, _events) = app_with(Arc::new(ScriptedPlane::new()));
        app.apply_event(polled(1, &[5000], &[5000, 5001, 5002], &[]));

        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected_index(), 2);

        app.apply_event(polled(2, &[5000], &[5000], &[]));
        assert_eq!(app.selected_index(), 0);
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.selected_cell().map(|cell| cell.port), Some(5000));
    }

    #[tokio::test]
    async fn enter_kills_alive_cell_and_revives_dead_one() {
        let plane = Arc::new(ScriptedPlane::new());
        let (mut app, mut requests, _events) = app_with(plane.clone());
        app.apply_event(polled(1, &[5000], &[5000, 5001], &[]));

        app.handle_key(key(KeyCode::Enter));
        requests.recv().await.expect("follow-up poll");
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char(' ')));
        requests.recv().await.expect("follow-up poll");

        assert_eq!(plane.commands(), vec![Command::Kill(5000), Command::Revive(5001)]);
        assert_eq!(app.status_note(), Some("revive Cell-5001 requested"));
    }

    #[tokio::test]
    async fn cluster_keys_send_start_stop_and_random_kill() {
        let plane = Arc::new(ScriptedPlane::new());
        let (mut app, mut requests, _events) = app_with(plane.clone());

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.status_note(), Some("no alive cells"));

        app.handle_key(key(KeyCode::Char('s')));
        requests.recv().await.expect("follow-up poll");
        app.apply_event(polled(1, &[5003], &[5003], &[]));
        app.handle_key(key(KeyCode::Char('r')));
        requests.recv().await.expect("follow-up poll");
        app.handle_key(key(KeyCode::Char('x')));
        requests.recv().await.expect("follow-up poll");

        assert_eq!(
            plane.commands(),
            vec![Command::Start, Command::Kill(5003), Command::Stop]
        );
    }

    #[tokio::test]
    async fn chat_focus_edits_and_submits_input() {
        let plane = Arc::new(ScriptedPlane::new().with_chat_reply(Ok(AgentReply::text("pong"))));
        let (mut app, _requests, mut events) = app_with(plane.clone());

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Chat);
        for ch in "pingq".chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
        app.handle_key(key(KeyCode::Backspace));
        assert!(!app.should_quit());
        assert_eq!(app.view().input(), "ping");

        app.handle_key(key(KeyCode::Enter));
        assert!(app.view().is_loading());
        app.apply_event(events.recv().await.expect("chat reply"));

        let roles: Vec<ChatRole> = app.view().transcript().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Agent]);
        assert_eq!(plane.chats(), vec!["ping".to_string()]);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.focus(), Focus::Cells);
    }

    #[test]
    fn quit_and_help_keys() {
        let (mut app, _requests, _events) = app_with(Arc::new(ScriptedPlane::new()));

        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.show_help());
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.show_help());

        app.handle_key(key(KeyCode::Char('i')));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn reply_after_teardown_is_dropped() {
        let plane = Arc::new(ScriptedPlane::new().with_chat_reply(Ok(AgentReply::text("late"))));
        let (mut app, _requests, mut events) = app_with(plane);

        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char('y')));
        app.handle_key(key(KeyCode::Enter));
        app.teardown();
        app.apply_event(events.recv().await.expect("chat reply"));

        assert_eq!(app.view().transcript().len(), 1);
    }
}
