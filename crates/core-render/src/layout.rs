//! Layout helpers shared by the page views: word wrapping, box drawing,
//! centering, title truncation.

use crate::{CellStyle, Frame};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Greedy word wrap to the given column width. Words wider than the width
/// are hard-broken so no output line ever exceeds it.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut line = String::new();
        let mut line_w = 0usize;
        for word in raw_line.split_whitespace() {
            let word_w = UnicodeWidthStr::width(word);
            let sep = usize::from(!line.is_empty());
            if line_w + sep + word_w <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_w += sep + word_w;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_w = 0;
            }
            if word_w <= width {
                line.push_str(word);
                line_w = word_w;
            } else {
                // Hard-break an overlong word cluster by cluster.
                for cluster in word.graphemes(true) {
                    let cw = UnicodeWidthStr::width(cluster);
                    if line_w + cw > width && !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                        line_w = 0;
                    }
                    line.push_str(cluster);
                    line_w += cw;
                }
            }
        }
        lines.push(line);
    }
    lines
}

/// Column at which `text` starts when centered in `width` columns.
pub fn centered_x(text: &str, width: u16) -> u16 {
    let w = UnicodeWidthStr::width(text) as u16;
    width.saturating_sub(w) / 2
}

/// Truncate a title for the footer navigation, ellipsis included.
pub fn truncate_title(title: &str, max_clusters: usize) -> String {
    let clusters: Vec<&str> = title.graphemes(true).collect();
    if clusters.len() <= max_clusters {
        title.to_string()
    } else {
        let mut out: String = clusters[..max_clusters].concat();
        out.push_str("...");
        out
    }
}

/// Draw a single-line box with the given outer geometry.
pub fn draw_box(frame: &mut Frame, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
    if w < 2 || h < 2 {
        return;
    }
    let right = x + w - 1;
    let bottom = y + h - 1;
    frame.set_cluster(x, y, "┌", 1, style);
    frame.set_cluster(right, y, "┐", 1, style);
    frame.set_cluster(x, bottom, "└", 1, style);
    frame.set_cluster(right, bottom, "┘", 1, style);
    for cx in x + 1..right {
        frame.set_cluster(cx, y, "─", 1, style);
        frame.set_cluster(cx, bottom, "─", 1, style);
    }
    for cy in y + 1..bottom {
        frame.set_cluster(x, cy, "│", 1, style);
        frame.set_cluster(right, cy, "│", 1, style);
    }
}

/// Horizontal rule across [x, x+w).
pub fn draw_hline(frame: &mut Frame, x: u16, y: u16, w: u16, style: CellStyle) {
    for cx in x..x.saturating_add(w) {
        frame.set_cluster(cx, y, "─", 1, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert!(lines.iter().all(|l| UnicodeWidthStr::width(l.as_str()) <= 10));
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_hard_breaks_overlong_words() {
        let lines = wrap("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_preserves_blank_lines() {
        let lines = wrap("a\n\nb", 10);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn truncation_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_title("short", 20), "short");
        assert_eq!(
            truncate_title("Program to display a welcome message", 20),
            "Program to display a..."
        );
    }

    #[test]
    fn box_corners_and_edges() {
        let mut f = Frame::new(6, 4);
        draw_box(&mut f, 0, 0, 6, 4, CellStyle::default());
        assert_eq!(f.row_text(0), "┌────┐");
        assert_eq!(f.row_text(3), "└────┘");
        assert!(f.row_text(1).starts_with('│'));
        assert!(f.row_text(1).ends_with('│'));
    }

    #[test]
    fn centering_splits_slack_evenly() {
        assert_eq!(centered_x("abcd", 10), 3);
        assert_eq!(centered_x("toolongtext", 4), 0);
    }
}
