use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    ToggleExpand,
    SelectNode,
    NextTab,
    PrevTab,
    NextPanel,
    PrevPanel,
    CloseActiveTab,
    SplitActiveTab,
    ReloadActiveTab,
    ReorderLeft,
    ReorderRight,
    MoveTabToPrevPanel,
    MoveTabToNextPanel,
    FocusTerminal,
    LeaveTerminal,
    TerminalInput(Vec<u8>),
    StartJump,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    DetailPageUp,
    DetailPageDown,
    ToggleHelp,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Jump => map_input_mode_key(key),
        InputMode::Terminal => map_terminal_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Char(' ') => Some(Action::ToggleExpand),
        KeyCode::Enter => Some(Action::SelectNode),
        KeyCode::Char('h') if key.modifiers.is_empty() => Some(Action::PrevTab),
        KeyCode::Left => Some(Action::PrevTab),
        KeyCode::Char('l') if key.modifiers.is_empty() => Some(Action::NextTab),
        KeyCode::Right => Some(Action::NextTab),
        KeyCode::Tab => Some(Action::NextPanel),
        KeyCode::BackTab => Some(Action::PrevPanel),
        KeyCode::Char('x') => Some(Action::CloseActiveTab),
        KeyCode::Char('s') => Some(Action::SplitActiveTab),
        KeyCode::Char('R') => Some(Action::ReloadActiveTab),
        KeyCode::Char('[') => Some(Action::ReorderLeft),
        KeyCode::Char(']') => Some(Action::ReorderRight),
        KeyCode::Char('<') => Some(Action::MoveTabToPrevPanel),
        KeyCode::Char('>') => Some(Action::MoveTabToNextPanel),
        KeyCode::Char('t') => Some(Action::FocusTerminal),
        KeyCode::Char(';') => Some(Action::StartJump),
        KeyCode::PageUp => Some(Action::DetailPageUp),
        KeyCode::PageDown => Some(Action::DetailPageDown),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_input_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_terminal_mode_key(key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::LeaveTerminal);
    }
    encode_terminal_key(key).map(Action::TerminalInput)
}

/// Raw byte encoding of a key press for the PTY. Control characters use the
/// usual caret encoding; navigation keys emit their escape sequences.
fn encode_terminal_key(key: KeyEvent) -> Option<Vec<u8>> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() {
                Some(vec![(c as u8) & 0x1f])
            } else {
                None
            }
        }
        KeyCode::Char(c) => {
            let mut buffer = [0u8; 4];
            Some(c.encode_utf8(&mut buffer).as_bytes().to_vec())
        }
        KeyCode::Enter => Some(b"\r".to_vec()),
        KeyCode::Tab => Some(b"\t".to_vec()),
        KeyCode::Backspace => Some(vec![0x7f]),
        KeyCode::Esc => Some(vec![0x1b]),
        KeyCode::Up => Some(b"\x1b[A".to_vec()),
        KeyCode::Down => Some(b"\x1b[B".to_vec()),
        KeyCode::Right => Some(b"\x1b[C".to_vec()),
        KeyCode::Left => Some(b"\x1b[D".to_vec()),
        KeyCode::Home => Some(b"\x1b[H".to_vec()),
        KeyCode::End => Some(b"\x1b[F".to_vec()),
        KeyCode::Delete => Some(b"\x1b[3~".to_vec()),
        _ => None,
    }
}
