use crate::app::Screen;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    ToggleHelp,
    OpenTerminal,
    CloseTerminal,
    ToggleCluster,
    StopCluster,
    DeleteCluster,
    LaunchCluster,
    CycleTrack,
    ToggleSize,
    DismissToast,
    InputChar(char),
    Backspace,
    Submit,
    HistoryPrevious,
    HistoryNext,
    Complete,
    ClearScreen,
    ScrollUp,
    ScrollDown,
}

pub fn map_key(screen: Screen, key: KeyEvent) -> Option<Action> {
    match screen {
        Screen::Dashboard => map_dashboard_key(key),
        Screen::Terminal => map_terminal_key(key),
    }
}

fn map_dashboard_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Enter => Some(Action::OpenTerminal),
        KeyCode::Char('s') => Some(Action::ToggleCluster),
        KeyCode::Char('x') | KeyCode::Delete => Some(Action::DeleteCluster),
        KeyCode::Char('n') => Some(Action::LaunchCluster),
        KeyCode::Char('t') => Some(Action::CycleTrack),
        KeyCode::Char('z') => Some(Action::ToggleSize),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Esc => Some(Action::DismissToast),
        _ => None,
    }
}

fn map_terminal_key(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('l') if ctrl => Some(Action::ClearScreen),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),
        KeyCode::Char('x') if ctrl => Some(Action::StopCluster),
        KeyCode::Char('p') if ctrl => Some(Action::HistoryPrevious),
        KeyCode::Char('n') if ctrl => Some(Action::HistoryNext),
        KeyCode::Char('m') | KeyCode::Char('j') if ctrl => Some(Action::Submit),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Up => Some(Action::HistoryPrevious),
        KeyCode::Down => Some(Action::HistoryNext),
        KeyCode::Tab => Some(Action::Complete),
        KeyCode::PageUp => Some(Action::ScrollUp),
        KeyCode::PageDown => Some(Action::ScrollDown),
        KeyCode::F(1) => Some(Action::ToggleHelp),
        KeyCode::Esc => Some(Action::CloseTerminal),
        _ => None,
    }
}
