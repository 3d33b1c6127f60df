//! Platform layer
//!
//! The game core never touches the terminal directly. This module provides:
//! - `terminal`: raw mode / alternate screen guard and the crossterm event source
//! - `render`: half-block pixel renderer drawing a session into the terminal

pub mod render;
pub mod terminal;

use std::io;

use crate::session::Session;

pub use render::{PixelBuf, Rgb, TerminalRenderer};
pub use terminal::{TerminalEvents, TerminalGuard, map_event};

/// Display collaborator, called once per tick after the session has stepped
pub trait Renderer {
    fn present(&mut self, session: &Session) -> io::Result<()>;
}
