//! Raw-mode terminal lifecycle.
//!
//! The viewer runs on the alternate screen with the hardware cursor hidden
//! (the caret is painted as a reverse-video cell). Restoration must happen
//! on every exit path, including panics, so entering hands back an RAII
//! guard and the backend also restores on drop as a last resort.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;

pub struct CrosstermBackend {
    raw_active: bool,
}

/// Restores the terminal when dropped.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { raw_active: false }
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    /// Enter raw mode + alternate screen and return the restoring guard.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        if !self.raw_active {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.raw_active = true;
        }
        Ok(TerminalGuard { backend: self })
    }

    fn restore(&mut self) {
        if self.raw_active {
            let _ = execute!(stdout(), LeaveAlternateScreen, Show);
            let _ = disable_raw_mode();
            self.raw_active = false;
        }
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        self.restore();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        self.backend.restore();
    }
}
