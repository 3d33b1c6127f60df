//! Input classification and debouncing
//!
//! Raw events from the host are sorted into quit / tap / ignored. Taps flap
//! immediately; gesture jumps go through a cooldown so a detector that keeps
//! firing cannot flap faster than a person can actually jump.

use std::io;

use crate::consts::JUMP_COOLDOWN;

/// Keys the game distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Up,
    Enter,
    Char(char),
    /// Ctrl-C delivered as a key press (raw terminal mode)
    Interrupt,
    Other,
}

/// Pointer buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Discrete event from the host's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// Window closed or host asked us to stop
    Quit,
    KeyDown(Key),
    PointerDown(PointerButton),
    TouchDown,
    /// Anything else (resize, focus, pointer motion...)
    Other,
}

/// What a raw event means to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    Quit,
    Tap,
    Ignored,
}

/// Source of raw events, drained once per tick
pub trait EventSource {
    /// Append every event that arrived since the last call. Must not block.
    fn drain(&mut self, out: &mut Vec<RawEvent>) -> io::Result<()>;
}

pub fn classify(event: &RawEvent) -> InputClass {
    match event {
        RawEvent::Quit => InputClass::Quit,
        RawEvent::KeyDown(Key::Escape | Key::Interrupt | Key::Char('q')) => InputClass::Quit,
        RawEvent::KeyDown(Key::Space | Key::Up | Key::Enter) => InputClass::Tap,
        RawEvent::PointerDown(PointerButton::Left) => InputClass::Tap,
        RawEvent::TouchDown => InputClass::Tap,
        _ => InputClass::Ignored,
    }
}

/// Result of scanning one tick's events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventScan {
    pub quit: bool,
    pub tapped: bool,
}

/// Scan events in arrival order; a quit ends the scan immediately
pub fn scan(events: &[RawEvent]) -> EventScan {
    let mut result = EventScan::default();
    for event in events {
        match classify(event) {
            InputClass::Quit => {
                result.quit = true;
                break;
            }
            InputClass::Tap => result.tapped = true,
            InputClass::Ignored => {}
        }
    }
    result
}

/// Decide whether this tick flaps.
///
/// Taps always flap and leave the cooldown untouched. A gesture jump flaps
/// only if no gesture was accepted yet or more than `cooldown` seconds have
/// passed since the last accepted one. Returns the decision and the updated
/// time of the last accepted gesture.
pub fn poll(
    now: f64,
    last_jump_time: Option<f64>,
    cooldown: f64,
    tapped: bool,
    gesture_jump: bool,
) -> (bool, Option<f64>) {
    let gesture_accepted =
        gesture_jump && last_jump_time.is_none_or(|last| now - last > cooldown);
    let last_jump_time = if gesture_accepted {
        Some(now)
    } else {
        last_jump_time
    };
    (tapped || gesture_accepted, last_jump_time)
}

/// Stateful wrapper around `poll`
#[derive(Debug, Clone)]
pub struct Debouncer {
    cooldown: f64,
    last_jump_time: Option<f64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(JUMP_COOLDOWN)
    }
}

impl Debouncer {
    pub fn new(cooldown: f64) -> Self {
        Self {
            cooldown,
            last_jump_time: None,
        }
    }

    pub fn last_jump_time(&self) -> Option<f64> {
        self.last_jump_time
    }

    /// True when this tick should produce a flap
    pub fn poll(&mut self, now: f64, tapped: bool, gesture_jump: bool) -> bool {
        let (flap, last) = poll(now, self.last_jump_time, self.cooldown, tapped, gesture_jump);
        self.last_jump_time = last;
        flap
    }
}
