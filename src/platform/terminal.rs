//! Terminal setup and input
//!
//! `TerminalGuard` puts the terminal into the state the renderer needs and
//! puts it back exactly once, whether the game quits normally, fails, or
//! unwinds.

use std::io::{self, Write, stdout};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute, terminal,
};

use crate::error::SetupError;
use crate::input::{EventSource, Key, PointerButton, RawEvent};

/// Raw mode + alternate screen + mouse capture for the lifetime of the guard
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self, SetupError> {
        terminal::enable_raw_mode().map_err(SetupError::Terminal)?;
        // Dropping the guard on the error path below restores raw mode
        let guard = Self { active: true };
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::DisableLineWrap,
            EnableMouseCapture,
        )
        .map_err(SetupError::Terminal)?;
        log::debug!("Terminal in raw mode");
        Ok(guard)
    }

    /// Leave raw mode and the alternate screen. Safe to call more than once.
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let mut out = stdout();
        if let Err(e) = execute!(
            out,
            DisableMouseCapture,
            terminal::EnableLineWrap,
            cursor::Show,
            terminal::LeaveAlternateScreen,
        ) {
            log::warn!("Failed to reset terminal screen: {}", e);
        }
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to leave raw mode: {}", e);
        }
        let _ = out.flush();
        log::debug!("Terminal restored");
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Translate a crossterm event into the game's raw event
pub fn map_event(event: &Event) -> RawEvent {
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) => {
            // Releases and auto-repeats are not taps
            if *kind != KeyEventKind::Press {
                return RawEvent::Other;
            }
            let key = match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
                KeyCode::Esc => Key::Escape,
                KeyCode::Char(' ') => Key::Space,
                KeyCode::Up => Key::Up,
                KeyCode::Enter => Key::Enter,
                KeyCode::Char(c) => Key::Char(*c),
                _ => Key::Other,
            };
            RawEvent::KeyDown(key)
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => RawEvent::PointerDown(PointerButton::Left),
            MouseEventKind::Down(MouseButton::Right) => RawEvent::PointerDown(PointerButton::Right),
            MouseEventKind::Down(MouseButton::Middle) => {
                RawEvent::PointerDown(PointerButton::Middle)
            }
            _ => RawEvent::Other,
        },
        _ => RawEvent::Other,
    }
}

/// Non-blocking crossterm event source
#[derive(Debug, Default)]
pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn drain(&mut self, out: &mut Vec<RawEvent>) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            let raw = map_event(&event::read()?);
            log::trace!("Input {:?}", raw);
            out.push(raw);
        }
        Ok(())
    }
}
