//! Editable code surface: one authoritative text buffer rendered as two
//! visually stacked layers.
//!
//! The interactive layer owns the text and the caret; the highlighted
//! layer is derived read-only state, re-computed from the buffer on every
//! change by asking the highlight provider. Both layers are positioned
//! through the single [`SurfaceMetrics`] object and the single
//! display-width function in this crate, so caret and glyph geometry
//! cannot drift apart: there is nothing to keep in sync because nothing is
//! duplicated.
//!
//! Edits are reported upward through the returned [`EditReport`]; the
//! composing view forwards `changed` to the execution session. Editing
//! never blocks on highlighting availability — before the provider is
//! ready the derived layer is plain text.

use core_events::{KeyCode, KeyEvent, KeyModifiers};
use core_highlight::TokenSpan;
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Shared geometry for both layers of the surface. One instance is
/// consumed by caret projection, layer layout, and the page renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceMetrics {
    /// Columns of padding on each side of the code block.
    pub pad_x: u16,
    /// Rows of padding above and below the code block.
    pub pad_y: u16,
    /// Spaces inserted per Tab press.
    pub tab_width: u8,
    /// Minimum visible rows of the block, padding included.
    pub min_rows: u16,
}

impl Default for SurfaceMetrics {
    fn default() -> Self {
        Self {
            pad_x: 2,
            pad_y: 1,
            tab_width: 4,
            min_rows: 6,
        }
    }
}

/// What a keystroke did to the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditReport {
    /// The text buffer changed (the session must be told).
    pub changed: bool,
    /// The caret moved (a repaint is due even without a text change).
    pub caret_moved: bool,
}

impl EditReport {
    fn changed() -> Self {
        Self {
            changed: true,
            caret_moved: true,
        }
    }

    fn moved() -> Self {
        Self {
            changed: false,
            caret_moved: true,
        }
    }
}

/// Caret position: line index plus grapheme index within that line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caret {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug)]
pub struct EditableSurface {
    lines: Vec<String>,
    caret: Caret,
    metrics: SurfaceMetrics,
}

impl EditableSurface {
    pub fn new(text: &str, metrics: SurfaceMetrics) -> Self {
        Self {
            lines: split_lines(text),
            caret: Caret::default(),
            metrics,
        }
    }

    pub fn metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    pub fn caret(&self) -> Caret {
        self.caret
    }

    /// The authoritative text, newline-joined.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(String::as_str)
    }

    /// Replace the buffer (exercise switch, reset). The caret is clamped
    /// into the new text; the derived layer follows on the next frame.
    pub fn reset_text(&mut self, text: &str) {
        self.lines = split_lines(text);
        self.caret = Caret::default();
        trace!(target: "surface", lines = self.lines.len(), "reset_text");
    }

    /// Apply one keystroke to the interactive layer.
    pub fn handle_key(&mut self, key: KeyEvent) -> EditReport {
        let chorded = key.mods.intersects(KeyModifiers::CTRL | KeyModifiers::ALT);
        let report = match key.code {
            KeyCode::Char(c) if !c.is_control() && !chorded => {
                self.insert_str(&c.to_string());
                EditReport::changed()
            }
            KeyCode::Tab => {
                let spaces = " ".repeat(self.metrics.tab_width as usize);
                self.insert_str(&spaces);
                EditReport::changed()
            }
            KeyCode::Enter => {
                self.split_line();
                EditReport::changed()
            }
            KeyCode::Backspace => {
                if self.delete_before() {
                    EditReport::changed()
                } else {
                    EditReport::default()
                }
            }
            KeyCode::Delete => {
                if self.delete_at() {
                    EditReport::changed()
                } else {
                    EditReport::default()
                }
            }
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_vertical(-1),
            KeyCode::Down => self.move_vertical(1),
            KeyCode::Home => {
                self.caret.col = 0;
                EditReport::moved()
            }
            KeyCode::End => {
                self.caret.col = grapheme_count(&self.lines[self.caret.line]);
                EditReport::moved()
            }
            _ => EditReport::default(),
        };
        if report.changed {
            trace!(target: "surface", line = self.caret.line, col = self.caret.col, "edit");
        }
        report
    }

    // --- derived layers ---------------------------------------------------

    /// The read-only highlighted layer: per-line token spans derived from
    /// the current buffer via the shared provider (plain before readiness).
    pub fn highlight_layer(&self) -> Vec<Vec<TokenSpan>> {
        core_highlight::classify(&self.text())
    }

    /// Caret cell relative to the block origin, computed through the same
    /// metrics and width function as the highlighted glyphs.
    pub fn caret_projection(&self) -> (u16, u16) {
        let row = self.metrics.pad_y as usize + self.caret.line;
        let prefix = grapheme_prefix(&self.lines[self.caret.line], self.caret.col);
        let col = self.metrics.pad_x as usize + display_width(prefix);
        (row as u16, col as u16)
    }

    /// Total block height in rows, padding included.
    pub fn block_rows(&self) -> u16 {
        let content = self.lines.len() as u16 + 2 * self.metrics.pad_y;
        content.max(self.metrics.min_rows)
    }

    // --- edit primitives --------------------------------------------------

    fn insert_str(&mut self, s: &str) {
        let line = &mut self.lines[self.caret.line];
        let at = byte_offset(line, self.caret.col);
        line.insert_str(at, s);
        self.caret.col += grapheme_count(s);
    }

    fn split_line(&mut self) {
        let line = &mut self.lines[self.caret.line];
        let at = byte_offset(line, self.caret.col);
        let tail = line.split_off(at);
        self.lines.insert(self.caret.line + 1, tail);
        self.caret.line += 1;
        self.caret.col = 0;
    }

    fn delete_before(&mut self) -> bool {
        if self.caret.col > 0 {
            let line = &mut self.lines[self.caret.line];
            let start = byte_offset(line, self.caret.col - 1);
            let end = byte_offset(line, self.caret.col);
            line.replace_range(start..end, "");
            self.caret.col -= 1;
            true
        } else if self.caret.line > 0 {
            let tail = self.lines.remove(self.caret.line);
            self.caret.line -= 1;
            self.caret.col = grapheme_count(&self.lines[self.caret.line]);
            self.lines[self.caret.line].push_str(&tail);
            true
        } else {
            false
        }
    }

    fn delete_at(&mut self) -> bool {
        let count = grapheme_count(&self.lines[self.caret.line]);
        if self.caret.col < count {
            let line = &mut self.lines[self.caret.line];
            let start = byte_offset(line, self.caret.col);
            let end = byte_offset(line, self.caret.col + 1);
            line.replace_range(start..end, "");
            true
        } else if self.caret.line + 1 < self.lines.len() {
            let tail = self.lines.remove(self.caret.line + 1);
            self.lines[self.caret.line].push_str(&tail);
            true
        } else {
            false
        }
    }

    fn move_left(&mut self) -> EditReport {
        if self.caret.col > 0 {
            self.caret.col -= 1;
            EditReport::moved()
        } else if self.caret.line > 0 {
            self.caret.line -= 1;
            self.caret.col = grapheme_count(&self.lines[self.caret.line]);
            EditReport::moved()
        } else {
            EditReport::default()
        }
    }

    fn move_right(&mut self) -> EditReport {
        let count = grapheme_count(&self.lines[self.caret.line]);
        if self.caret.col < count {
            self.caret.col += 1;
            EditReport::moved()
        } else if self.caret.line + 1 < self.lines.len() {
            self.caret.line += 1;
            self.caret.col = 0;
            EditReport::moved()
        } else {
            EditReport::default()
        }
    }

    fn move_vertical(&mut self, delta: isize) -> EditReport {
        let target = self.caret.line as isize + delta;
        if target < 0 || target as usize >= self.lines.len() {
            return EditReport::default();
        }
        self.caret.line = target as usize;
        let count = grapheme_count(&self.lines[self.caret.line]);
        self.caret.col = self.caret.col.min(count);
        EditReport::moved()
    }
}

// --- shared text measurement ---------------------------------------------

fn split_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Byte offset of the grapheme with the given index (line length when the
/// index is past the end).
fn byte_offset(s: &str, col: usize) -> usize {
    s.grapheme_indices(true)
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn grapheme_prefix(s: &str, col: usize) -> &str {
    &s[..byte_offset(s, col)]
}

/// The one display-width function both layers measure columns with.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}
