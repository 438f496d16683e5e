//! Full-frame emission: translate a `Frame` window into one batch of
//! crossterm commands.
//!
//! Every event that changes visible state repaints the whole viewport.
//! The documents here are a few thousand cells; a full repaint is well
//! under a millisecond of terminal writing, so no partial-repaint
//! machinery is warranted. Styles are diffed cell-to-cell to keep escape
//! sequence volume down.

use crate::{CellAttrs, CellStyle, Frame};
use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{
        Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
};
use std::io::Write;

/// Write one frame window to the terminal starting at row 0.
pub fn draw_frame(out: &mut impl Write, frame: &Frame) -> Result<()> {
    let mut current: Option<CellStyle> = None;
    for y in 0..frame.height {
        queue!(out, MoveTo(0, y))?;
        for (cluster, _w, style, _x) in frame.row_leaders(y) {
            if current != Some(style) {
                apply_style(out, style)?;
                current = Some(style);
            }
            queue!(out, Print(cluster))?;
        }
    }
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    out.flush()?;
    Ok(())
}

fn apply_style(out: &mut impl Write, style: CellStyle) -> Result<()> {
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    if let Some(fg) = style.fg {
        queue!(out, SetForegroundColor(fg))?;
    }
    if let Some(bg) = style.bg {
        queue!(out, SetBackgroundColor(bg))?;
    }
    if style.attrs.contains(CellAttrs::BOLD) {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if style.attrs.contains(CellAttrs::DIM) {
        queue!(out, SetAttribute(Attribute::Dim))?;
    }
    if style.attrs.contains(CellAttrs::REVERSE) {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    if style.attrs.contains(CellAttrs::UNDERLINE) {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    if style.attrs.contains(CellAttrs::ITALIC) {
        queue!(out, SetAttribute(Attribute::Italic))?;
    }
    Ok(())
}

/// Convenience used by tests: frames drawn to a buffer must contain every
/// leader cluster in row order.
pub fn frame_to_plain_text(frame: &Frame) -> String {
    let mut s = String::new();
    for y in 0..frame.height {
        s.push_str(&frame.row_text(y));
        s.push('\n');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellStyle;
    use crossterm::style::Color;

    #[test]
    fn draw_frame_emits_all_clusters_in_order() {
        let mut frame = Frame::new(6, 2);
        frame.put_str(0, 0, "alpha", CellStyle::default());
        frame.put_str(0, 1, "beta", CellStyle::fg(Color::Blue));
        let mut buf: Vec<u8> = Vec::new();
        draw_frame(&mut buf, &frame).unwrap();
        let emitted = String::from_utf8_lossy(&buf);
        assert!(emitted.contains("alpha"));
        assert!(emitted.contains("beta"));
        let a = emitted.find("alpha").unwrap();
        let b = emitted.find("beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn plain_text_mirror_matches_rows() {
        let mut frame = Frame::new(4, 2);
        frame.put_str(0, 0, "ab", CellStyle::default());
        let text = frame_to_plain_text(&frame);
        assert!(text.starts_with("ab  \n"));
    }
}
