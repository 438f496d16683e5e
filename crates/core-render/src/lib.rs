//! Rendering primitives and page assembly.
//!
//! A `Frame` is a logical grid of styled cells. Cells store full grapheme
//! clusters for leader cells along with their visual width; continuation
//! cells (width == 0) occupy the remaining columns of a multi-column
//! cluster and never print text. Emission iterates leader cells only, so
//! wide glyphs are printed exactly once.
//!
//! Invariants:
//! - Leader: width >= 1, `cluster` non-empty.
//! - Continuation: width == 0, `cluster` empty.
//! - Continuations immediately follow their leader horizontally.
//!
//! The document pages are composed into a frame sized to the full document
//! height; the emitter then writes a terminal-height window of it, which
//! is what vertical scrolling selects.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub mod backend;
pub mod emit;
pub mod layout;
pub mod theme;
pub mod views;

pub use backend::{CrosstermBackend, TerminalGuard};

use crossterm::style::Color;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellAttrs: u8 {
        const BOLD      = 0b0000_0001;
        const DIM       = 0b0000_0010;
        const REVERSE   = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
        const ITALIC    = 0b0001_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub attrs: CellAttrs,
}

impl CellStyle {
    pub fn fg(color: Color) -> Self {
        Self {
            fg: Some(color),
            ..Self::default()
        }
    }

    pub fn with_attrs(mut self, attrs: CellAttrs) -> Self {
        self.attrs |= attrs;
        self
    }

    pub fn bold() -> Self {
        Self::default().with_attrs(CellAttrs::BOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Full grapheme cluster (leader cells only). Empty for continuations.
    pub cluster: String,
    /// Visual width in terminal columns. `0` designates a continuation.
    pub width: u8,
    pub style: CellStyle,
}

impl Cell {
    #[inline]
    pub fn leader(cluster: &str, width: u16, style: CellStyle) -> Self {
        Self {
            cluster: cluster.to_string(),
            width: width.max(1) as u8,
            style,
        }
    }

    #[inline]
    pub fn continuation(style: CellStyle) -> Self {
        Self {
            cluster: String::new(),
            width: 0,
            style,
        }
    }

    #[inline]
    pub fn is_leader(&self) -> bool {
        self.width > 0
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            cluster: " ".to_string(),
            width: 1,
            style: CellStyle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Set a full cluster at (x, y) and populate continuation cells.
    pub fn set_cluster(&mut self, x: u16, y: u16, cluster: &str, width: u16, style: CellStyle) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = width.max(1).min(self.width - x);
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = Cell::leader(cluster, w, style);
        }
        for dx in 1..w {
            if let Some(c_idx) = self.index(x + dx, y) {
                self.cells[c_idx] = Cell::continuation(style);
            }
        }
    }

    /// Write a string starting at (x, y), clipping at the frame edge.
    /// Returns the column after the last written cluster.
    pub fn put_str(&mut self, x: u16, y: u16, text: &str, style: CellStyle) -> u16 {
        let mut col = x;
        for cluster in text.graphemes(true) {
            if cluster == "\n" || cluster == "\r" {
                continue;
            }
            let w = UnicodeWidthStr::width(cluster).max(1) as u16;
            if col >= self.width {
                break;
            }
            self.set_cluster(col, y, cluster, w, style);
            col = col.saturating_add(w);
        }
        col
    }

    /// Apply additional style over an existing span (leader + continuations).
    pub fn apply_style_span(&mut self, x: u16, y: u16, span_width: u16, f: impl Fn(&mut CellStyle)) {
        let span = span_width.min(self.width.saturating_sub(x));
        for dx in 0..span {
            if let Some(idx) = self.index(x + dx, y) {
                f(&mut self.cells[idx].style);
            }
        }
    }

    /// Iterate leader cells of a row, yielding (cluster, width, style, x).
    pub fn row_leaders(&self, y: u16) -> impl Iterator<Item = (&str, u16, CellStyle, u16)> + '_ {
        let width = self.width;
        let start = y as usize * width as usize;
        let mut x = 0u16;
        std::iter::from_fn(move || {
            while x < width {
                let cell = &self.cells[start + x as usize];
                if cell.is_leader() {
                    let w = cell.width as u16;
                    let out = (&*cell.cluster, w, cell.style, x);
                    x = x.saturating_add(w);
                    return Some(out);
                }
                x += 1;
            }
            None
        })
    }

    /// Plain text of a row (testing / diagnostics).
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        self.row_leaders(y).map(|(c, _, _, _)| c).collect()
    }

    /// Copy a vertical window of `rows` rows starting at `top` into a new
    /// frame (the scroll viewport). Rows past the bottom come out blank.
    pub fn window(&self, top: u16, rows: u16) -> Frame {
        let mut out = Frame::new(self.width, rows);
        for dy in 0..rows {
            let Some(src_y) = top.checked_add(dy) else {
                break;
            };
            if src_y >= self.height {
                break;
            }
            let src = src_y as usize * self.width as usize;
            let dst = dy as usize * self.width as usize;
            out.cells[dst..dst + self.width as usize]
                .clone_from_slice(&self.cells[src..src + self.width as usize]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_str_writes_and_reports_end_column() {
        let mut f = Frame::new(20, 2);
        let end = f.put_str(2, 0, "hello", CellStyle::default());
        assert_eq!(end, 7);
        assert_eq!(f.row_text(0).trim_end(), "  hello".trim_end());
        assert!(f.row_text(0).starts_with("  hello"));
    }

    #[test]
    fn wide_cluster_occupies_leader_plus_continuation() {
        let mut f = Frame::new(10, 1);
        f.put_str(0, 0, "日x", CellStyle::default());
        let leaders: Vec<_> = f.row_leaders(0).collect();
        assert_eq!(leaders[0].0, "日");
        assert_eq!(leaders[0].1, 2);
        assert_eq!(leaders[1].0, "x");
        assert_eq!(leaders[1].3, 2, "x starts after the wide glyph's two columns");
    }

    #[test]
    fn put_str_clips_at_frame_edge() {
        let mut f = Frame::new(4, 1);
        f.put_str(0, 0, "abcdef", CellStyle::default());
        assert_eq!(f.row_text(0), "abcd");
    }

    #[test]
    fn window_extracts_scroll_viewport() {
        let mut f = Frame::new(5, 4);
        for y in 0..4 {
            f.put_str(0, y, &format!("row{y}"), CellStyle::default());
        }
        let w = f.window(1, 2);
        assert_eq!(w.height, 2);
        assert_eq!(w.row_text(0), "row1 ");
        assert_eq!(w.row_text(1), "row2 ");

        let past = f.window(3, 3);
        assert_eq!(past.row_text(0), "row3 ");
        assert_eq!(past.row_text(1), "     ", "rows past the end are blank");
    }

    #[test]
    fn apply_style_span_mutates_existing_cells() {
        let mut f = Frame::new(8, 1);
        f.put_str(0, 0, "stale", CellStyle::default());
        f.apply_style_span(0, 0, 5, |s| s.attrs |= CellAttrs::REVERSE);
        for (_, _, style, x) in f.row_leaders(0) {
            if x < 5 {
                assert!(style.attrs.contains(CellAttrs::REVERSE));
            }
        }
    }
}
