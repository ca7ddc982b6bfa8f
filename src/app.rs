use crate::clusters::{ClusterRecord, ClusterSize, ClusterStore, ExamTrack, LifecycleOp};
use crate::config::LabConfig;
use crate::gate::ResolutionEvent;
use crate::input::Action;
use crate::responses::ResponseTable;
use crate::session::{PendingResolution, SessionId, TerminalSession};
use crate::toast::{ToastKind, ToastQueue};
use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Screen {
    Dashboard,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    ScheduleResolution {
        session: SessionId,
        pending: PendingResolution,
    },
}

pub struct App {
    running: bool,
    screen: Screen,
    user: String,
    banner: bool,
    table: Arc<ResponseTable>,
    store: ClusterStore,
    toasts: ToastQueue,
    selected: usize,
    session: Option<TerminalSession>,
    bound_cluster: Option<String>,
    next_session_id: u64,
    launch_track: ExamTrack,
    launch_size: ClusterSize,
    show_help: bool,
    status: String,
    scrollback: u16,
    seen_revision: u64,
}

const SCROLL_STEP: u16 = 5;

impl App {
    pub fn new(config: &LabConfig, store: ClusterStore, launch_track: ExamTrack) -> Self {
        Self {
            running: true,
            screen: Screen::Dashboard,
            user: config.user.clone(),
            banner: config.banner,
            table: Arc::new(config.responses.clone()),
            store,
            toasts: ToastQueue::new(config.toast_ttl),
            selected: 0,
            session: None,
            bound_cluster: None,
            next_session_id: 1,
            launch_track,
            launch_size: ClusterSize::MultiNode,
            show_help: false,
            status: "Ready".to_string(),
            scrollback: 0,
            seen_revision: 0,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn clusters(&self) -> &[ClusterRecord] {
        self.store.clusters()
    }

    pub fn running_clusters(&self) -> usize {
        self.store.running_count()
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.store.is_empty() {
            None
        } else {
            Some(self.selected.min(self.store.len() - 1))
        }
    }

    pub fn selected_cluster(&self) -> Option<&ClusterRecord> {
        self.selected_index().map(|index| &self.store.clusters()[index])
    }

    pub fn bound_cluster(&self) -> Option<&ClusterRecord> {
        self.bound_cluster
            .as_deref()
            .and_then(|id| self.store.find(id))
    }

    pub fn session(&self) -> Option<&TerminalSession> {
        self.session.as_ref()
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn launch_track(&self) -> ExamTrack {
        self.launch_track
    }

    pub fn launch_size(&self) -> ClusterSize {
        self.launch_size
    }

    pub fn with_launch_size(mut self, size: ClusterSize) -> Self {
        self.launch_size = size;
        self
    }

    /// Lines scrolled up from the newest transcript entry. Any transcript
    /// change snaps the view back to the bottom.
    pub fn terminal_scrollback(&mut self) -> u16 {
        if let Some(session) = &self.session {
            let revision = session.transcript().revision();
            if revision != self.seen_revision {
                self.seen_revision = revision;
                self.scrollback = 0;
            }
        }
        self.scrollback
    }

    /// Caps the scroll distance at what the rendered transcript allows.
    pub fn clamp_scrollback(&mut self, max: u16) -> u16 {
        self.scrollback = self.scrollback.min(max);
        self.scrollback
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn apply_action(&mut self, action: Action, now: Instant) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        let command = match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::OpenTerminal => {
                if let Some(id) = self.selected_cluster().map(|cluster| cluster.id.clone()) {
                    self.open_terminal(&id);
                }
                AppCommand::None
            }
            Action::CloseTerminal => {
                self.close_terminal("Back to dashboard");
                AppCommand::None
            }
            Action::ToggleCluster => {
                if let Some(cluster) = self.selected_cluster() {
                    let op = if cluster.is_running() {
                        LifecycleOp::Stop
                    } else {
                        LifecycleOp::Start
                    };
                    let id = cluster.id.clone();
                    self.begin_lifecycle(&id, op, now);
                }
                AppCommand::None
            }
            Action::StopCluster => {
                let target = match self.screen {
                    Screen::Terminal => self.bound_cluster.clone(),
                    Screen::Dashboard => self.selected_cluster().map(|cluster| cluster.id.clone()),
                };
                if let Some(id) = target {
                    self.begin_lifecycle(&id, LifecycleOp::Stop, now);
                }
                AppCommand::None
            }
            Action::DeleteCluster => {
                if let Some(id) = self.selected_cluster().map(|cluster| cluster.id.clone()) {
                    self.begin_lifecycle(&id, LifecycleOp::Delete, now);
                }
                AppCommand::None
            }
            Action::LaunchCluster => {
                self.launch_cluster(now);
                AppCommand::None
            }
            Action::CycleTrack => {
                self.launch_track = self.launch_track.next();
                self.status = format!(
                    "Launch track: {} ({})",
                    self.launch_track.name(),
                    self.launch_track.full_name()
                );
                AppCommand::None
            }
            Action::ToggleSize => {
                self.launch_size = self.launch_size.toggle();
                self.status = format!(
                    "Launch size: {} ({} nodes)",
                    self.launch_size.title(),
                    self.launch_size.node_count()
                );
                AppCommand::None
            }
            Action::DismissToast => {
                if let Some(toast) = self.toasts.dismiss_oldest() {
                    debug!(toast = toast.id, "toast dismissed");
                }
                AppCommand::None
            }
            Action::InputChar(c) => {
                if let Some(session) = self.session.as_mut() {
                    session.input_char(c);
                }
                AppCommand::None
            }
            Action::Backspace => {
                if let Some(session) = self.session.as_mut() {
                    session.backspace();
                }
                AppCommand::None
            }
            Action::HistoryPrevious => {
                if let Some(session) = self.session.as_mut() {
                    session.history_previous();
                }
                AppCommand::None
            }
            Action::HistoryNext => {
                if let Some(session) = self.session.as_mut() {
                    session.history_next();
                }
                AppCommand::None
            }
            Action::Complete => {
                if let Some(session) = self.session.as_mut() {
                    session.complete();
                }
                AppCommand::None
            }
            Action::ScrollUp => {
                if self.session.is_some() {
                    self.scrollback = self.scrollback.saturating_add(SCROLL_STEP);
                }
                AppCommand::None
            }
            Action::ScrollDown => {
                self.scrollback = self.scrollback.saturating_sub(SCROLL_STEP);
                AppCommand::None
            }
            Action::ClearScreen => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_screen();
                }
                AppCommand::None
            }
            Action::Submit => match self.session.as_mut() {
                Some(session) => match session.submit() {
                    Some(pending) => AppCommand::ScheduleResolution {
                        session: session.id(),
                        pending,
                    },
                    None => AppCommand::None,
                },
                None => AppCommand::None,
            },
        };

        self.enforce_terminal_gate();
        command
    }

    /// Applies a delivered resolution if it still belongs to the live session.
    pub fn on_resolved(&mut self, event: ResolutionEvent) -> bool {
        let Some(session) = self.session.as_mut() else {
            debug!(session = event.session.0, "resolution arrived after teardown");
            return false;
        };
        if session.id() != event.session {
            debug!(session = event.session.0, "resolution for a closed session");
            return false;
        }
        session.finish(event.token, event.resolution)
    }

    /// Expires toasts and lands lifecycle transitions that are due.
    pub fn tick(&mut self, now: Instant) {
        self.toasts.expire(now);

        if self.store.has_pending() {
            let events = self
                .store
                .complete_due(now, Local::now(), &mut rand::thread_rng());
            for event in events {
                debug!(cluster_id = %event.cluster_id, op = ?event.op, "lifecycle event applied");
                self.notify(event.op.done_message(), ToastKind::Success, now);
                self.status = format!("{}: {}", event.name, event.op.done_message());
            }
        }

        self.clamp_selection();
        self.enforce_terminal_gate();
    }

    /// Opens the shell of a cluster by id or name. Only running clusters qualify.
    pub fn open_terminal(&mut self, id_or_name: &str) -> bool {
        let Some(cluster) = self
            .store
            .clusters()
            .iter()
            .find(|cluster| cluster.id == id_or_name || cluster.name == id_or_name)
        else {
            self.status = format!("Cluster '{id_or_name}' not found");
            return false;
        };
        if !cluster.is_running() {
            self.status = format!(
                "{} is {}. Start it from the dashboard to access the terminal.",
                cluster.name, cluster.status
            );
            return false;
        }

        let id = cluster.id.clone();
        let name = cluster.name.clone();
        if let Some(index) = self.store.clusters().iter().position(|c| c.id == id) {
            self.selected = index;
        }

        let session_id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        let session = TerminalSession::new(session_id, self.user.clone(), name.clone(), self.table.clone());
        self.session = Some(if self.banner {
            session.with_banner()
        } else {
            session
        });
        self.bound_cluster = Some(id);
        self.screen = Screen::Terminal;
        self.scrollback = 0;
        self.status = format!("Connected to {name}");
        info!(session = session_id.0, cluster = %name, "terminal session opened");
        true
    }

    fn close_terminal(&mut self, status: &str) {
        if let Some(session) = self.session.take() {
            info!(session = session.id().0, "terminal session closed");
        }
        self.bound_cluster = None;
        self.screen = Screen::Dashboard;
        self.status = status.to_string();
    }

    fn enforce_terminal_gate(&mut self) {
        if self.session.is_none() {
            return;
        }
        let still_running = self.bound_cluster().is_some_and(ClusterRecord::is_running);
        if !still_running {
            self.close_terminal("Cluster is no longer running; terminal closed");
        }
    }

    fn begin_lifecycle(&mut self, id: &str, op: LifecycleOp, now: Instant) {
        match self.store.begin(id, op, now) {
            Ok(cluster) => {
                let name = cluster.name.clone();
                self.notify(op.progress_message(), ToastKind::Info, now);
                self.status = format!("{name}: {}", op.progress_message());
            }
            Err(error) => {
                self.notify(error.to_string(), ToastKind::Error, now);
                self.status = format!("{error:#}");
            }
        }
    }

    fn launch_cluster(&mut self, now: Instant) {
        let cluster = self.store.launch(
            self.launch_track,
            self.launch_size,
            &mut rand::thread_rng(),
            Local::now(),
        );
        let id = cluster.id.clone();
        self.notify("Cluster launched successfully!", ToastKind::Success, now);
        self.selected = 0;
        self.open_terminal(&id);
    }

    fn notify(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        let message = message.into();
        let id = self.toasts.push(message.clone(), kind, now);
        debug!(toast = id, kind = kind.label(), %message, "toast raised");
    }

    fn move_selection(&mut self, delta: isize) {
        if self.screen != Screen::Dashboard || self.store.is_empty() {
            return;
        }
        let max = self.store.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.store.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, Screen};
    use crate::clusters::{ClusterStatus, ClusterStore, ExamTrack};
    use crate::config::LabConfig;
    use crate::gate::ResolutionEvent;
    use crate::input::Action;
    use crate::transcript::EntryKind;
    use chrono::Local;
    use std::time::{Duration, Instant};

    fn app() -> App {
        App::new(
            &LabConfig::default(),
            ClusterStore::seeded(Local::now()),
            ExamTrack::Ckad,
        )
    }

    fn type_line(app: &mut App, line: &str, now: Instant) {
        for c in line.chars() {
            app.apply_action(Action::InputChar(c), now);
        }
    }

    fn submit(app: &mut App, now: Instant) -> Option<ResolutionEvent> {
        match app.apply_action(Action::Submit, now) {
            AppCommand::ScheduleResolution { session, pending } => Some(ResolutionEvent {
                session,
                token: pending.token,
                resolution: pending.resolution,
            }),
            AppCommand::None => None,
        }
    }

    #[test]
    fn opening_running_cluster_shows_terminal_with_banner() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::OpenTerminal, now);

        assert_eq!(app.screen(), Screen::Terminal);
        let session = app.session().expect("session");
        assert_eq!(session.prompt(), "student@ckad-practice-01:~$");
        assert_eq!(session.transcript().entries().len(), 6);
    }

    #[test]
    fn stopped_cluster_does_not_expose_terminal() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::Down, now);
        app.apply_action(Action::OpenTerminal, now);

        assert_eq!(app.screen(), Screen::Dashboard);
        assert!(app.session().is_none());
        assert!(app.status().contains("cka-exam-prep is stopped"));
    }

    #[test]
    fn end_to_end_unknown_command() {
        let mut app = app();
        let now = Instant::now();
        assert!(app.open_terminal("ckad-practice-01"));
        app.apply_action(Action::ClearScreen, now);

        type_line(&mut app, "foobar", now);
        let event = submit(&mut app, now).expect("scheduled");
        assert!(app.session().expect("session").is_processing());
        assert!(app.on_resolved(event));

        let entries = app.session().expect("session").transcript().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, EntryKind::Input);
        assert_eq!(entries[0].content, "foobar");
        assert_eq!(entries[1].content, "bash: foobar: command not found");
    }

    #[test]
    fn resolution_after_close_is_dropped() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        type_line(&mut app, "kubectl frobnicate", now);
        let event = submit(&mut app, now).expect("scheduled");

        app.apply_action(Action::CloseTerminal, now);
        assert!(!app.on_resolved(event.clone()));

        app.open_terminal("cluster-1");
        assert!(!app.on_resolved(event));
        let session = app.session().expect("fresh session");
        assert!(!session.is_processing());
        assert_eq!(session.transcript().entries().len(), 6);
    }

    #[test]
    fn stopping_bound_cluster_tears_down_session() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        type_line(&mut app, "ls", now);
        let event = submit(&mut app, now).expect("scheduled");

        app.apply_action(Action::StopCluster, now);
        assert_eq!(app.screen(), Screen::Dashboard);
        assert!(app.session().is_none());
        assert!(!app.on_resolved(event));

        app.tick(now + Duration::from_millis(1_500));
        let cluster = app.clusters().iter().find(|c| c.id == "cluster-1").expect("cluster");
        assert_eq!(cluster.status, ClusterStatus::Stopped);
        assert!(
            app.toasts()
                .toasts()
                .iter()
                .any(|toast| toast.message == "Cluster stopped")
        );
    }

    #[test]
    fn toggle_starts_stopped_cluster_after_delay() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::Down, now);
        app.apply_action(Action::ToggleCluster, now);
        assert_eq!(
            app.selected_cluster().map(|c| c.status),
            Some(ClusterStatus::Starting)
        );

        app.tick(now + Duration::from_millis(2_000));
        assert_eq!(
            app.selected_cluster().map(|c| c.status),
            Some(ClusterStatus::Running)
        );
        assert_eq!(app.running_clusters(), 2);
    }

    #[test]
    fn launch_opens_terminal_for_new_cluster() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::CycleTrack, now);
        app.apply_action(Action::LaunchCluster, now);

        assert_eq!(app.screen(), Screen::Terminal);
        let bound = app.bound_cluster().expect("bound cluster");
        assert!(bound.name.starts_with("cka-"));
        assert_eq!(app.clusters().len(), 3);
        assert_eq!(
            app.toasts().latest().map(|toast| toast.message.as_str()),
            Some("Cluster launched successfully!")
        );
    }

    #[test]
    fn delete_shrinks_list_and_clamps_selection() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::Down, now);
        app.apply_action(Action::DeleteCluster, now);
        app.tick(now + Duration::from_millis(1_000));

        assert_eq!(app.clusters().len(), 1);
        assert_eq!(app.selected_index(), Some(0));
    }

    #[test]
    fn toasts_expire_on_tick() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::ToggleCluster, now);
        assert!(!app.toasts().toasts().is_empty());

        app.tick(now + Duration::from_millis(1_500));
        app.tick(now + Duration::from_millis(6_000));
        assert!(app.toasts().toasts().is_empty());
    }

    #[test]
    fn invalid_lifecycle_raises_error_toast() {
        let mut app = app();
        let now = Instant::now();
        app.apply_action(Action::ToggleCluster, now);
        app.apply_action(Action::DeleteCluster, now);
        let latest = app.toasts().latest().expect("toast");
        assert_eq!(latest.kind, crate::toast::ToastKind::Error);
    }

    #[test]
    fn new_output_snaps_scrollback_to_bottom() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        assert_eq!(app.terminal_scrollback(), 0);

        app.apply_action(Action::ScrollUp, now);
        app.apply_action(Action::ScrollUp, now);
        assert_eq!(app.terminal_scrollback(), 10);

        type_line(&mut app, "pwd", now);
        let event = submit(&mut app, now).expect("scheduled");
        assert_eq!(app.terminal_scrollback(), 0);

        app.apply_action(Action::ScrollUp, now);
        app.on_resolved(event);
        assert_eq!(app.terminal_scrollback(), 0);
    }

    #[test]
    fn quit_stops_the_app() {
        let mut app = app();
        app.apply_action(Action::Quit, Instant::now());
        assert!(!app.running());
    }
}
