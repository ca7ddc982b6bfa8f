use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, Screen};
use crate::clusters::{ClusterRecord, ClusterStatus};
use crate::session::TerminalSession;
use crate::toast::ToastKind;
use crate::transcript::EntryKind;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PROMPT: Color = Color::Rgb(74, 222, 128);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_E: Color = Color::Rgb(13, 148, 136);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    match app.screen() {
        Screen::Dashboard => render_dashboard(frame, root[1], app),
        Screen::Terminal => render_terminal(frame, root[1], app),
    }
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_left_header_line(app);
    let right_line = build_right_header_line(app);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_left_header_line(app: &App) -> Line<'static> {
    let location = match app.screen() {
        Screen::Dashboard => "dashboard".to_string(),
        Screen::Terminal => app
            .bound_cluster()
            .map(|cluster| compact_text(&cluster.name, 28))
            .unwrap_or_else(|| "terminal".to_string()),
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " ⎈ kubelab ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.user(), 16)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(&mut spans, format!(" {location} "), Color::White, PL_C, BG);
    Line::from(spans)
}

fn build_right_header_line(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    let running = app.running_clusters();
    let (fg, bg) = if running > 0 {
        (Color::Black, PL_E)
    } else {
        (Color::White, Color::Rgb(30, 41, 59))
    };
    push_powerline_segment_rtl(
        &mut spans,
        format!(" {running}/{} running ", app.clusters().len()),
        fg,
        bg,
        BG,
    );
    Line::from(spans)
}

fn render_dashboard(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);
    render_cluster_table(frame, chunks[0], app);
    render_cluster_detail(frame, chunks[1], app);
}

fn render_cluster_table(frame: &mut Frame, area: Rect, app: &App) {
    let headers = [
        "NAME", "STATUS", "TRACK", "NODES", "IP", "CPU", "MEM", "PODS", "EXPIRES",
    ];
    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let now = Local::now();
    let rows = app.clusters().iter().map(|cluster| {
        let resources = cluster.resources;
        let percent = |value: Option<u8>| {
            value
                .map(|value| format!("{value}%"))
                .unwrap_or_else(|| "-".to_string())
        };
        Row::new(vec![
            Cell::from(cluster.name.clone()).style(Style::default().fg(Color::White)),
            Cell::from(cluster.status.label())
                .style(Style::default().fg(status_color(cluster.status))),
            Cell::from(cluster.track.name()),
            Cell::from(cluster.node_count.to_string()),
            Cell::from(cluster.ip.clone().unwrap_or_else(|| "-".to_string())),
            Cell::from(percent(resources.map(|r| r.cpu_usage))),
            Cell::from(percent(resources.map(|r| r.memory_usage))),
            Cell::from(
                resources
                    .map(|r| r.pod_count.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::from(cluster.time_remaining(now).unwrap_or_else(|| "-".to_string())),
        ])
        .style(Style::default().fg(MUTED))
    });

    let constraints = [
        Constraint::Min(18),
        Constraint::Length(9),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(12),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(11),
    ];
    let block = Block::default()
        .title(format!("Clusters ({})", app.clusters().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));

    if app.clusters().is_empty() {
        let empty = Paragraph::new("No clusters yet. Press n to launch one.")
            .block(block)
            .style(Style::default().fg(MUTED));
        frame.render_widget(empty, area);
        return;
    }

    let table = Table::new(rows, constraints)
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_cluster_detail(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = match app.selected_cluster() {
        Some(cluster) => cluster_detail_lines(cluster),
        None => vec![Line::from(Span::styled(
            "No cluster selected",
            Style::default().fg(MUTED),
        ))],
    };

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Next launch",
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )));
    lines.push(detail_line("Track", app.launch_track().full_name().to_string()));
    lines.push(detail_line(
        "Size",
        format!(
            "{} ({} nodes)",
            app.launch_size().title(),
            app.launch_size().node_count()
        ),
    ));

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Details")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(MUTED))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(panel, area);
}

fn cluster_detail_lines(cluster: &ClusterRecord) -> Vec<Line<'static>> {
    let mut lines = vec![
        detail_line("Name", cluster.name.clone()),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(MUTED)),
            Span::styled(
                cluster.status.label(),
                Style::default()
                    .fg(status_color(cluster.status))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        detail_line("Track", cluster.track.full_name().to_string()),
        detail_line("Nodes", cluster.node_count.to_string()),
        detail_line("Version", cluster.kube_version.clone()),
        detail_line(
            "Created",
            cluster.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ),
    ];
    if let Some(ip) = &cluster.ip {
        lines.push(detail_line("IP", ip.clone()));
    }
    if let Some(remaining) = cluster.time_remaining(Local::now()) {
        lines.push(detail_line("Time left", remaining));
    }
    if let Some(resources) = cluster.resources {
        lines.push(detail_line(
            "Usage",
            format!(
                "cpu {}%  mem {}%  pods {}",
                resources.cpu_usage, resources.memory_usage, resources.pod_count
            ),
        ));
    }
    if !cluster.is_running() && !cluster.status.is_transitional() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Start the cluster (s) to access the terminal.",
            Style::default().fg(WARN),
        )));
    }
    lines
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(MUTED)),
        Span::raw(value),
    ])
}

fn render_terminal(frame: &mut Frame, area: Rect, app: &mut App) {
    let scrollback = app.terminal_scrollback();
    let Some(session) = app.session() else {
        frame.render_widget(
            Paragraph::new("No terminal session").style(Style::default().fg(MUTED).bg(PANEL)),
            area,
        );
        return;
    };

    let prompt = session.prompt();
    let mut lines = transcript_lines(session, &prompt);
    let prompt_row = lines.len();
    let cursor_column = if session.is_processing() {
        lines.push(Line::from(Span::styled(
            "Processing...",
            Style::default().fg(MUTED).add_modifier(Modifier::ITALIC),
        )));
        None
    } else {
        lines.push(prompt_line(&prompt, session.buffer()));
        Some(prompt.chars().count() + 1 + session.buffer().chars().count())
    };

    let mut title = session.display_name().to_string();
    if let Some(cursor) = session.history_cursor() {
        title.push_str(&format!(" [history {}/{}]", cursor + 1, session.history().len()));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    let height = inner.height as usize;
    let bottom = lines.len().saturating_sub(height);

    // Never scroll past the first line.
    let scrollback = if scrollback as usize > bottom {
        app.clamp_scrollback(bottom.min(u16::MAX as usize) as u16)
    } else {
        scrollback
    };
    if scrollback > 0 {
        title.push_str(&format!(" [scrolled {scrollback}]"));
    }

    let offset = bottom - scrollback as usize;
    let paragraph = Paragraph::new(lines)
        .scroll((offset.min(u16::MAX as usize) as u16, 0))
        .block(block.title(title))
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);

    if let Some(column) = cursor_column
        && prompt_row >= offset
        && prompt_row - offset < height
    {
        let x = inner.x.saturating_add(column.min(u16::MAX as usize) as u16);
        if x < inner.x + inner.width {
            frame.set_cursor_position((x, inner.y + (prompt_row - offset) as u16));
        }
    }
}

fn transcript_lines(session: &TerminalSession, prompt: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in session.transcript().entries() {
        match entry.kind {
            EntryKind::Input => lines.push(prompt_line(prompt, &entry.content)),
            EntryKind::Output => lines.extend(entry.content.lines().map(|line| {
                Line::from(Span::styled(line.to_string(), Style::default().fg(MUTED)))
            })),
        }
    }
    lines
}

fn prompt_line(prompt: &str, content: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            prompt.to_string(),
            Style::default().fg(PROMPT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(content.to_string(), Style::default().fg(Color::White)),
    ])
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    let (mode_label, mode_bg) = match app.screen() {
        Screen::Dashboard => (" dash ", PL_A),
        Screen::Terminal => (" term ", PL_C),
    };
    push_powerline_segment(&mut spans, mode_label, Color::White, mode_bg, PL_B);
    let status_text = app.status();
    push_powerline_segment(
        &mut spans,
        format!(
            " {} {} ",
            footer_status_icon(status_text),
            compact_text(status_text, area.width.saturating_sub(24).max(24) as usize)
        ),
        Color::White,
        PL_B,
        BG,
    );

    let right_spans = build_footer_toast_spans(app, area.width.saturating_sub(28) as usize);
    let right_width = spans_width(&right_spans) as u16;
    if right_spans.is_empty() || right_width == 0 {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn build_footer_toast_spans(app: &App, max_width: usize) -> Vec<Span<'static>> {
    let Some(toast) = app.toasts().latest() else {
        return Vec::new();
    };
    if max_width < 8 {
        return Vec::new();
    }
    let (fg, bg) = toast_colors(toast.kind);
    let mut spans = Vec::new();
    push_powerline_segment_rtl(
        &mut spans,
        format!(
            " {} {} ",
            toast.kind.label(),
            compact_text(
                &toast.message,
                max_width.saturating_sub(toast.kind.label().len() + 4)
            )
        ),
        fg,
        bg,
        BG,
    );
    spans
}

fn toast_colors(kind: ToastKind) -> (Color, Color) {
    match kind {
        ToastKind::Success => (Color::Black, ACCENT),
        ToastKind::Info => (Color::White, PL_B),
        ToastKind::Error => (Color::Black, ERROR),
    }
}

fn status_color(status: ClusterStatus) -> Color {
    match status {
        ClusterStatus::Running => ACCENT,
        ClusterStatus::Stopped => MUTED,
        ClusterStatus::Starting | ClusterStatus::Stopping => WARN,
        ClusterStatus::Deleting => ERROR,
    }
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = ["not found", "cannot", "already", "no longer", "is stopped"]
        .iter()
        .any(|needle| status.contains(needle));
    if has_failure { "✗" } else { "✓" }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("\u{e0b0}", Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled("\u{e0b2}", Style::default().fg(bg).bg(next_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let screen = match app.screen() {
        Screen::Dashboard => "dashboard",
        Screen::Terminal => "terminal",
    };
    let mut lines = vec![
        Line::from(format!("kubelab help  screen:{screen}  user:{}", app.user())),
        Line::from(""),
    ];
    for line in contextual_help_lines(app.screen()) {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn contextual_help_lines(screen: Screen) -> Vec<&'static str> {
    match screen {
        Screen::Dashboard => vec![
            "j/k or arrows   move selection",
            "Enter           open terminal (running clusters only)",
            "s               start or stop selected cluster",
            "x / Delete      delete selected cluster",
            "n               launch a new cluster",
            "t / z           cycle launch track / toggle size",
            "Esc             dismiss oldest notification",
            "?               toggle help",
            "q / Ctrl+C      quit",
        ],
        Screen::Terminal => vec![
            "Enter           run command",
            "Up / Down       browse history",
            "Tab             complete kubectl get resources",
            "PageUp/PageDown scroll transcript",
            "Ctrl+L          clear screen",
            "Ctrl+X          stop cluster",
            "Esc             back to dashboard",
            "F1              toggle help",
            "Ctrl+C          quit",
        ],
    }
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{compact_text, render};
    use crate::app::App;
    use crate::clusters::{ClusterStore, ExamTrack};
    use crate::config::LabConfig;
    use crate::input::Action;
    use chrono::Local;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn app() -> App {
        App::new(
            &LabConfig::default(),
            ClusterStore::seeded(Local::now()),
            ExamTrack::Ckad,
        )
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).expect("terminal");
        terminal.draw(|frame| render(frame, app)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn dashboard_lists_seeded_clusters() {
        let mut app = app();
        let screen = draw(&mut app);
        assert!(screen.contains("ckad-practice-01"));
        assert!(screen.contains("cka-exam-prep"));
        assert!(screen.contains("1/2 running"));
    }

    #[test]
    fn terminal_shows_banner_and_prompt() {
        let mut app = app();
        assert!(app.open_terminal("ckad-practice-01"));
        let screen = draw(&mut app);
        assert!(screen.contains("Welcome to ckad-practice-01"));
        assert!(screen.contains("student@ckad-practice-01:~$"));
    }

    #[test]
    fn processing_indicator_replaces_prompt_line() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        for c in "pwd".chars() {
            app.apply_action(Action::InputChar(c), now);
        }
        app.apply_action(Action::Submit, now);
        let screen = draw(&mut app);
        assert!(screen.contains("Processing..."));
    }

    #[test]
    fn scrollback_stops_at_first_line() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        for _ in 0..20 {
            app.apply_action(Action::ScrollUp, now);
        }

        let mut terminal = Terminal::new(TestBackend::new(140, 12)).expect("terminal");
        terminal.draw(|frame| render(frame, &mut app)).expect("draw");

        // Banner, replayed commands and the prompt: 22 lines in an 8 line view.
        assert_eq!(app.terminal_scrollback(), 14);
        app.apply_action(Action::ScrollDown, now);
        assert_eq!(app.terminal_scrollback(), 9);
    }

    #[test]
    fn short_transcript_never_reports_scrolling() {
        let mut app = app();
        let now = Instant::now();
        app.open_terminal("cluster-1");
        for _ in 0..4 {
            app.apply_action(Action::ScrollUp, now);
        }

        let screen = draw(&mut app);
        assert!(!screen.contains("scrolled"));
        assert_eq!(app.terminal_scrollback(), 0);
    }

    #[test]
    fn help_modal_lists_terminal_keys() {
        let mut app = app();
        app.open_terminal("cluster-1");
        app.apply_action(Action::ToggleHelp, Instant::now());
        let screen = draw(&mut app);
        assert!(screen.contains("Ctrl+L"));
    }

    #[test]
    fn compact_text_adds_ellipsis() {
        assert_eq!(compact_text("kubernetes", 5), "kube…");
        assert_eq!(compact_text("pod", 5), "pod");
    }
}
