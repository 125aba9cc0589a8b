use std::io;
use std::time::Duration;

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::dispatcher::Command;

/// What the dashboard loop reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Command(Command),
    /// New terminal size as (columns, rows)
    Resize(u16, u16),
}

/// Source of input events. `next_event` must not block for longer than a
/// short poll timeout; `Ok(None)` means nothing happened.
pub trait InputSource {
    fn next_event(&mut self) -> io::Result<Option<InputEvent>>;
}

/// Map a raw terminal event to an input event; unbound keys map to `None`.
pub fn translate(event: CEvent) -> Option<InputEvent> {
    match event {
        CEvent::Resize(cols, rows) => Some(InputEvent::Resize(cols, rows)),
        CEvent::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) => {
            if kind == KeyEventKind::Release {
                return None;
            }
            match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(InputEvent::Quit)
                }
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(InputEvent::Quit),
                KeyCode::Char('p') | KeyCode::Char('P') => {
                    Some(InputEvent::Command(Command::TogglePause))
                }
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    Some(InputEvent::Command(Command::IncreaseVus))
                }
                KeyCode::Char('-') => Some(InputEvent::Command(Command::DecreaseVus)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Reads the real terminal through crossterm
pub struct TerminalInput {
    timeout: Duration,
}

impl TerminalInput {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl InputSource for TerminalInput {
    fn next_event(&mut self) -> io::Result<Option<InputEvent>> {
        if !event::poll(self.timeout)? {
            return Ok(None);
        }
        Ok(translate(event::read()?))
    }
}
