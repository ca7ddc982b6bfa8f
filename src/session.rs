use crate::resolver::{Resolution, resolve};
use crate::responses::ResponseTable;
use crate::transcript::{Transcript, TranscriptEntry};
use std::sync::Arc;
use tracing::debug;

const COMPLETION_PREFIX: &str = "kubectl get ";
const COMPLETION_RESOURCES: [&str; 5] = ["pods", "nodes", "services", "deployments", "namespaces"];
const FALLBACK_DISPLAY_NAME: &str = "cluster";
/// Commands shown as already run when a session opens with the banner.
const REPLAYED_COMMANDS: [&str; 2] = ["kubectl get nodes", "kubectl get pods -A"];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct PendingToken(u64);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SessionState {
    Idle,
    Processing(PendingToken),
}

/// Outcome of a submission that still has to wait out the processing delay.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PendingResolution {
    pub token: PendingToken,
    pub command: String,
    pub resolution: Resolution,
}

/// One simulated shell bound to a single cluster.
///
/// Owns the transcript, the line being typed and the command history. Created
/// when the terminal opens and dropped when it closes; a resolution arriving
/// after that is matched against nothing and ignored.
#[derive(Debug, Clone)]
pub struct TerminalSession {
    id: SessionId,
    user: String,
    display_name: String,
    table: Arc<ResponseTable>,
    transcript: Transcript,
    buffer: String,
    history: Vec<String>,
    history_cursor: Option<usize>,
    state: SessionState,
    next_token: u64,
}

impl TerminalSession {
    pub fn new(
        id: SessionId,
        user: impl Into<String>,
        display_name: impl Into<String>,
        table: Arc<ResponseTable>,
    ) -> Self {
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            FALLBACK_DISPLAY_NAME.to_string()
        } else {
            display_name
        };

        Self {
            id,
            user: user.into(),
            display_name,
            table,
            transcript: Transcript::default(),
            buffer: String::new(),
            history: Vec::new(),
            history_cursor: None,
            state: SessionState::Idle,
            next_token: 0,
        }
    }

    pub fn with_banner(mut self) -> Self {
        let welcome = format!("Welcome to {}", self.display_name);
        self.transcript.append(TranscriptEntry::output(welcome));
        self.transcript.append(TranscriptEntry::output(
            "Type \"help\" for available commands",
        ));
        for command in REPLAYED_COMMANDS {
            self.transcript.append(TranscriptEntry::input(command));
            if let Some(text) = resolve(command, &self.table).output() {
                self.transcript.append(TranscriptEntry::output(text));
            }
        }
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn prompt(&self) -> String {
        format!("{}@{}:~$", self.user, self.display_name)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn history_cursor(&self) -> Option<usize> {
        self.history_cursor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state(), SessionState::Processing(_))
    }

    pub fn input_char(&mut self, c: char) -> bool {
        if self.is_processing() {
            return false;
        }
        self.buffer.push(c);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        self.buffer.pop().is_some()
    }

    /// Submits the current line.
    ///
    /// Blank lines and submissions while processing are ignored. `clear`
    /// empties the transcript on the spot and records nothing else in it.
    /// Anything else echoes the line, locks the buffer and hands back the
    /// resolution to deliver once the processing delay has elapsed.
    pub fn submit(&mut self) -> Option<PendingResolution> {
        if self.is_processing() || self.buffer.trim().is_empty() {
            return None;
        }

        let command = std::mem::take(&mut self.buffer);
        self.history.push(command.clone());
        self.history_cursor = None;

        let resolution = resolve(&command, &self.table);
        if resolution == Resolution::Clear {
            self.transcript.reset();
            return None;
        }

        self.transcript.append(TranscriptEntry::input(command.clone()));
        let token = PendingToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.state = SessionState::Processing(token);
        debug!(session = self.id.0, command = %command, "command submitted");

        Some(PendingResolution {
            token,
            command,
            resolution,
        })
    }

    /// Applies a delayed resolution. Returns false when the token is stale.
    pub fn finish(&mut self, token: PendingToken, resolution: Resolution) -> bool {
        if self.state != SessionState::Processing(token) {
            debug!(session = self.id.0, "dropping stale resolution");
            return false;
        }

        if let Some(text) = resolution.output() {
            self.transcript.append(TranscriptEntry::output(text));
        }
        self.state = SessionState::Idle;
        true
    }

    pub fn history_previous(&mut self) -> bool {
        if self.is_processing() || self.history.is_empty() {
            return false;
        }

        let oldest = self.history.len() - 1;
        let cursor = match self.history_cursor {
            None => 0,
            Some(cursor) => (cursor + 1).min(oldest),
        };
        self.history_cursor = Some(cursor);
        self.buffer = self.history[oldest - cursor].clone();
        true
    }

    pub fn history_next(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }

        match self.history_cursor {
            None => false,
            Some(0) => {
                self.history_cursor = None;
                self.buffer.clear();
                true
            }
            Some(cursor) => {
                let cursor = cursor - 1;
                self.history_cursor = Some(cursor);
                self.buffer = self.history[self.history.len() - 1 - cursor].clone();
                true
            }
        }
    }

    /// Completes `kubectl get <partial>` against the known resource names.
    pub fn complete(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        let Some(partial) = self.buffer.strip_prefix(COMPLETION_PREFIX) else {
            return false;
        };
        let Some(resource) = COMPLETION_RESOURCES
            .iter()
            .find(|resource| resource.starts_with(partial))
        else {
            return false;
        };

        self.buffer = format!("{COMPLETION_PREFIX}{resource}");
        true
    }

    /// Clear-screen shortcut: empties the transcript in any state and leaves
    /// the buffer and history alone.
    pub fn clear_screen(&mut self) {
        self.transcript.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionId, SessionState, TerminalSession};
    use crate::resolver::Resolution;
    use crate::responses::ResponseTable;
    use crate::transcript::{EntryKind, TranscriptEntry};
    use std::sync::Arc;

    fn session() -> TerminalSession {
        TerminalSession::new(
            SessionId(1),
            "student",
            "ckad-practice-01",
            Arc::new(ResponseTable::builtin()),
        )
    }

    fn type_line(session: &mut TerminalSession, line: &str) {
        for c in line.chars() {
            session.input_char(c);
        }
    }

    fn run(session: &mut TerminalSession, line: &str) {
        type_line(session, line);
        if let Some(pending) = session.submit() {
            assert!(session.finish(pending.token, pending.resolution));
        }
    }

    #[test]
    fn prompt_uses_user_and_cluster_name() {
        assert_eq!(session().prompt(), "student@ckad-practice-01:~$");
        let unnamed = TerminalSession::new(
            SessionId(2),
            "student",
            " ",
            Arc::new(ResponseTable::builtin()),
        );
        assert_eq!(unnamed.prompt(), "student@cluster:~$");
    }

    #[test]
    fn banner_greets_with_cluster_name() {
        let session = session().with_banner();
        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0], TranscriptEntry::output("Welcome to ckad-practice-01"));
        let kinds: Vec<EntryKind> = entries.iter().map(|entry| entry.kind).collect();
        assert_eq!(
            kinds,
            [
                EntryKind::Output,
                EntryKind::Output,
                EntryKind::Input,
                EntryKind::Output,
                EntryKind::Input,
                EntryKind::Output,
            ]
        );
        assert_eq!(entries[2], TranscriptEntry::input("kubectl get nodes"));
        assert!(entries[3].content.contains("control-plane  Ready"));
        assert_eq!(entries[4], TranscriptEntry::input("kubectl get pods -A"));
        assert!(entries[5].content.starts_with("NAMESPACE"));
        assert!(session.history().is_empty());
    }

    #[test]
    fn submit_echoes_input_then_output_after_finish() {
        let mut session = session();
        type_line(&mut session, "kubectl get nodes");

        let pending = session.submit().expect("pending resolution");
        assert!(session.is_processing());
        assert_eq!(session.buffer(), "");
        assert_eq!(
            session.transcript().entries(),
            &[TranscriptEntry::input("kubectl get nodes")]
        );

        assert!(session.finish(pending.token, pending.resolution));
        assert_eq!(session.state(), SessionState::Idle);
        let last = session.transcript().entries().last().expect("output entry");
        assert_eq!(last.kind, EntryKind::Output);
        assert!(last.content.contains("control-plane  Ready"));
    }

    #[test]
    fn input_echo_keeps_original_casing() {
        let mut session = session();
        type_line(&mut session, "KUBECTL GET PODS");
        let pending = session.submit().expect("pending resolution");
        assert_eq!(
            session.transcript().entries()[0],
            TranscriptEntry::input("KUBECTL GET PODS")
        );
        assert!(pending.resolution.output().unwrap_or_default().contains("nginx"));
    }

    #[test]
    fn blank_submit_is_a_no_op() {
        let mut session = session();
        type_line(&mut session, "   ");
        assert!(session.submit().is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.transcript().entries().is_empty());
        assert!(session.history().is_empty());
        assert_eq!(session.buffer(), "   ");
    }

    #[test]
    fn buffer_is_locked_while_processing() {
        let mut session = session();
        type_line(&mut session, "pwd");
        let pending = session.submit().expect("pending resolution");

        assert!(!session.input_char('x'));
        assert!(!session.backspace());
        assert!(!session.history_previous());
        assert!(!session.complete());
        assert!(session.submit().is_none());
        assert_eq!(session.buffer(), "");

        session.finish(pending.token, pending.resolution);
        assert!(session.input_char('x'));
    }

    #[test]
    fn stale_token_is_ignored() {
        let mut session = session();
        type_line(&mut session, "pwd");
        let first = session.submit().expect("pending resolution");
        assert!(session.finish(first.token, first.resolution.clone()));

        let before = session.transcript().entries().len();
        assert!(!session.finish(first.token, first.resolution));
        assert_eq!(session.transcript().entries().len(), before);
    }

    #[test]
    fn clear_command_empties_transcript_without_echo() {
        let mut session = session().with_banner();
        run(&mut session, "ls");
        type_line(&mut session, "clear");

        assert!(session.submit().is_none());
        assert_eq!(session.transcript().entries().len(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.buffer(), "");
        assert_eq!(session.history(), &["ls".to_string(), "clear".to_string()]);
    }

    #[test]
    fn clear_shortcut_works_mid_processing_and_keeps_buffer() {
        let mut session = session();
        run(&mut session, "whoami");
        type_line(&mut session, "pwd");
        let pending = session.submit().expect("pending resolution");

        session.clear_screen();
        assert!(session.transcript().entries().is_empty());
        assert_eq!(session.history().len(), 2);

        session.finish(pending.token, pending.resolution);
        assert_eq!(session.transcript().entries().len(), 1);
    }

    #[test]
    fn clear_shortcut_leaves_buffer_untouched() {
        let mut session = session();
        type_line(&mut session, "kubectl get");
        session.clear_screen();
        assert_eq!(session.buffer(), "kubectl get");
    }

    #[test]
    fn history_previous_walks_back_and_saturates() {
        let mut session = session();
        for line in ["A", "B", "C"] {
            run(&mut session, line);
        }

        session.history_previous();
        assert_eq!(session.buffer(), "C");
        session.history_previous();
        assert_eq!(session.buffer(), "B");
        session.history_previous();
        assert_eq!(session.buffer(), "A");
        session.history_previous();
        assert_eq!(session.buffer(), "A");
        assert_eq!(session.history(), &["A", "B", "C"]);
    }

    #[test]
    fn history_next_returns_to_empty_line() {
        let mut session = session();
        for line in ["A", "B"] {
            run(&mut session, line);
        }

        assert!(!session.history_next());
        session.history_previous();
        session.history_previous();
        assert!(session.history_next());
        assert_eq!(session.buffer(), "B");
        assert!(session.history_next());
        assert_eq!(session.buffer(), "");
        assert_eq!(session.history_cursor(), None);
    }

    #[test]
    fn history_next_without_browsing_keeps_buffer() {
        let mut session = session();
        run(&mut session, "A");
        type_line(&mut session, "draft");
        assert!(!session.history_next());
        assert_eq!(session.buffer(), "draft");
    }

    #[test]
    fn submit_resets_history_cursor_and_keeps_duplicates() {
        let mut session = session();
        run(&mut session, "ls");
        session.history_previous();
        let pending = session.submit().expect("pending resolution");
        session.finish(pending.token, pending.resolution);

        assert_eq!(session.history_cursor(), None);
        assert_eq!(session.history(), &["ls", "ls"]);
    }

    #[test]
    fn tab_completes_resource_names() {
        let mut session = session();
        type_line(&mut session, "kubectl get po");
        assert!(session.complete());
        assert_eq!(session.buffer(), "kubectl get pods");

        let mut session = self::session();
        type_line(&mut session, "kubectl get de");
        session.complete();
        assert_eq!(session.buffer(), "kubectl get deployments");
    }

    #[test]
    fn tab_leaves_unknown_or_foreign_input_alone() {
        let mut session = session();
        type_line(&mut session, "kubectl get xyz");
        assert!(!session.complete());
        assert_eq!(session.buffer(), "kubectl get xyz");

        let mut session = self::session();
        type_line(&mut session, "kubectl describe po");
        assert!(!session.complete());
        assert_eq!(session.buffer(), "kubectl describe po");
    }

    #[test]
    fn finish_without_output_still_unlocks() {
        let mut session = session();
        type_line(&mut session, "ls");
        let pending = session.submit().expect("pending resolution");
        assert!(session.finish(pending.token, Resolution::Clear));
        assert!(!session.is_processing());
        assert_eq!(session.transcript().entries().len(), 1);
    }
}
