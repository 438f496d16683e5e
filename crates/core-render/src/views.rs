//! Document-page composition: the paginated index and the exercise record
//! page. Each view renders into a frame sized to the full document height;
//! the caller windows it for the terminal viewport.

use crate::layout::{centered_x, draw_box, draw_hline, truncate_title, wrap};
use crate::{CellAttrs, CellStyle, Frame, theme};
use core_catalog::Exercise;
use core_surface::EditableSurface;

/// Page column width: an A4-ish ribbon centered in the terminal.
const PAGE_MAX_WIDTH: u16 = 88;
const PAGE_MIN_WIDTH: u16 = 40;

const RESULT_SENTENCE: &str =
    "The program was successfully executed and the output was verified.";

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

fn page_geometry(width: u16) -> (u16, u16) {
    let page_w = width.clamp(PAGE_MIN_WIDTH, PAGE_MAX_WIDTH);
    let x0 = width.saturating_sub(page_w) / 2;
    (x0, page_w)
}

// -------------------------------------------------------------------------
// Index page
// -------------------------------------------------------------------------

pub struct IndexModel<'a> {
    pub heading: &'a str,
    pub subheading: &'a str,
    pub entries: &'a [Exercise],
    /// Serial number of the first visible row.
    pub start_serial: usize,
    /// Selected row within `entries`.
    pub selected: usize,
    pub page: usize,
    pub total_pages: usize,
    /// Blank rows pad the table up to this count per page.
    pub per_page: usize,
}

/// Render the index document. Also returns the row of the selected entry
/// so the caller can keep it inside the viewport.
pub fn draw_index(model: &IndexModel<'_>, width: u16) -> (Frame, u16) {
    let (x0, page_w) = page_geometry(width.max(PAGE_MIN_WIDTH));
    let estimated = model.per_page as u16 + 24;
    let mut f = Frame::new(width.max(PAGE_MIN_WIDTH), estimated);

    let hint = "↑/↓ select   Enter open   ←/→ page   Ctrl-C quit";
    f.put_str(x0, 0, hint, theme::chrome());

    let content_x = x0 + 2;
    let content_w = page_w - 4;
    let mut y = 2;

    // Centered document header.
    let heading = model.heading.to_uppercase();
    f.put_str(
        x0 + centered_x(&heading, page_w),
        y,
        &heading,
        CellStyle::bold(),
    );
    y += 1;
    f.put_str(
        x0 + centered_x(model.subheading, page_w),
        y,
        model.subheading,
        CellStyle::default(),
    );
    y += 1;
    draw_hline(&mut f, content_x, y, content_w, theme::border());
    y += 2;

    let index_title = "INDEX";
    f.put_str(
        x0 + centered_x(index_title, page_w),
        y,
        index_title,
        theme::heading(),
    );
    y += 2;

    // Table: serial | title | sign.
    let serial_w: u16 = 7;
    let sign_w: u16 = 8;
    let title_w = content_w - serial_w - sign_w - 2;
    let header_y = y;
    let mut selected_row = header_y;
    f.put_str(content_x, header_y, "S.No.", CellStyle::bold());
    f.put_str(content_x + serial_w + 1, header_y, "Name of Experiment", CellStyle::bold());
    f.put_str(
        content_x + serial_w + 1 + title_w + 1,
        header_y,
        "Sign",
        CellStyle::bold(),
    );
    y += 1;
    draw_hline(&mut f, content_x, y, content_w, theme::border());
    y += 1;

    for row in 0..model.per_page {
        match model.entries.get(row) {
            Some(exercise) => {
                let serial = format!("{:>4}.", model.start_serial + row);
                f.put_str(content_x, y, &serial, CellStyle::default());
                let title = truncate_title(&exercise.title, title_w as usize - 4);
                f.put_str(content_x + serial_w + 1, y, &title, CellStyle::default());
                if row == model.selected {
                    selected_row = y;
                    f.apply_style_span(content_x, y, content_w, |s| {
                        s.attrs |= CellAttrs::REVERSE;
                    });
                }
            }
            None => {
                // Padded blank row keeps the printed footprint stable.
            }
        }
        y += 1;
    }

    draw_hline(&mut f, content_x, y, content_w, theme::border());
    y += 2;

    let footer = format!("Page {} of {}", model.page, model.total_pages);
    f.put_str(x0 + centered_x(&footer, page_w), y, &footer, theme::chrome());
    y += 1;

    (f.window(0, y + 1), selected_row)
}

// -------------------------------------------------------------------------
// Exercise page
// -------------------------------------------------------------------------

pub struct ExerciseModel<'a> {
    pub exercise: &'a Exercise,
    pub surface: &'a EditableSurface,
    pub output: &'a str,
    pub stale: bool,
    pub running: bool,
    pub editor_focused: bool,
    pub spinner_phase: usize,
    pub page_number: usize,
    pub total_pages: usize,
    pub prev_title: Option<&'a str>,
    pub next_title: Option<&'a str>,
}

pub fn draw_exercise(model: &ExerciseModel<'_>, width: u16) -> Frame {
    let (x0, page_w) = page_geometry(width.max(PAGE_MIN_WIDTH));
    let content_x = x0 + 2;
    let content_w = page_w - 4;

    let aim_lines = wrap(&model.exercise.aim, content_w as usize);
    let mut proc_lines: Vec<String> = Vec::new();
    for (i, step) in model.exercise.procedure.iter().enumerate() {
        let numbered = format!("{}. {}", i + 1, step);
        for (j, line) in wrap(&numbered, content_w as usize - 3).into_iter().enumerate() {
            if j == 0 {
                proc_lines.push(line);
            } else {
                proc_lines.push(format!("   {line}"));
            }
        }
    }
    let result_lines = wrap(RESULT_SENTENCE, content_w as usize);

    let code_inner = model.surface.block_rows();
    let output_lines: Vec<&str> = model.output.split('\n').collect();
    let console_inner = (output_lines.len() as u16 + 2).max(5);

    let estimated = 30
        + aim_lines.len() as u16
        + proc_lines.len() as u16
        + code_inner
        + console_inner
        + result_lines.len() as u16;
    let mut f = Frame::new(width.max(PAGE_MIN_WIDTH), estimated);

    let hint = if model.editor_focused {
        "Esc leave editor   F5 run   F6 reset   Ctrl-C quit"
    } else {
        "Esc index   ←/→ prev/next   i edit   F5 run   F6 reset   Home/End first/last"
    };
    f.put_str(x0, 0, hint, theme::chrome());

    let mut y = 2;

    // Header block.
    let header_h = 4;
    draw_box(&mut f, content_x, y, content_w, header_h, theme::border());
    let number = format!("EXPERIMENT NO: {}", model.exercise.id);
    f.put_str(x0 + centered_x(&number, page_w), y + 1, &number, CellStyle::bold());
    let title = model.exercise.title.to_uppercase();
    f.put_str(
        x0 + centered_x(&title, page_w),
        y + 2,
        &title,
        CellStyle::bold().with_attrs(CellAttrs::UNDERLINE),
    );
    y += header_h + 1;

    // AIM.
    f.put_str(content_x, y, "AIM", theme::heading());
    y += 1;
    for line in &aim_lines {
        f.put_str(content_x, y, line, CellStyle::default());
        y += 1;
    }
    y += 1;

    // PROCEDURE.
    f.put_str(content_x, y, "PROCEDURE", theme::heading());
    y += 1;
    for line in &proc_lines {
        f.put_str(content_x, y, line, CellStyle::default());
        y += 1;
    }
    y += 1;

    // SOURCE CODE heading with right-aligned status badges.
    f.put_str(content_x, y, "SOURCE CODE", theme::heading());
    let mut badge_x = content_x + content_w;
    if model.running {
        let badge = format!("{} RUNNING...", SPINNER[model.spinner_phase % SPINNER.len()]);
        badge_x -= badge.len() as u16;
        f.put_str(badge_x, y, &badge, theme::running_badge());
    }
    if model.stale {
        let badge = "OUTPUT STALE";
        badge_x = badge_x.saturating_sub(badge.len() as u16 + 2);
        f.put_str(badge_x, y, badge, theme::stale_badge());
    }
    y += 1;

    // Code block: highlighted layer beneath, caret painted over.
    let code_top = y;
    draw_box(&mut f, content_x, code_top, content_w, code_inner + 2, theme::border());
    f.put_str(
        content_x + content_w - 10,
        code_top,
        " Editable ",
        theme::chrome(),
    );
    let metrics = model.surface.metrics();
    let glyph_x = content_x + 1 + metrics.pad_x;
    let glyph_y = code_top + 1 + metrics.pad_y;
    for (i, line) in model.surface.highlight_layer().iter().enumerate() {
        let mut x = glyph_x;
        for span in line {
            x = f.put_str(x, glyph_y + i as u16, &span.text, theme::token_style(span.class));
        }
    }
    if model.editor_focused {
        // Caret and glyphs share SurfaceMetrics: the projection already
        // includes the block padding, so only the box origin is added.
        let (crow, ccol) = model.surface.caret_projection();
        let abs_x = content_x + 1 + ccol;
        let abs_y = code_top + 1 + crow;
        f.apply_style_span(abs_x, abs_y, 1, |s| s.attrs |= CellAttrs::REVERSE);
    }
    y = code_top + code_inner + 2 + 1;

    // OUTPUT console panel.
    f.put_str(content_x, y, "OUTPUT", theme::heading());
    y += 1;
    let console_top = y;
    let console_style = if model.stale {
        theme::stale_border()
    } else {
        theme::border()
    };
    draw_box(&mut f, content_x, console_top, content_w, console_inner + 2, console_style);
    f.put_str(content_x + 2, console_top, " Console Output ", theme::chrome());
    for (i, line) in output_lines.iter().enumerate() {
        f.put_str(
            content_x + 2,
            console_top + 2 + i as u16,
            line,
            CellStyle::default(),
        );
    }
    y = console_top + console_inner + 2 + 1;

    // RESULT.
    f.put_str(content_x, y, "RESULT", theme::heading());
    y += 1;
    for line in &result_lines {
        f.put_str(content_x, y, line, CellStyle::default());
        y += 1;
    }
    y += 1;

    // Footer navigation.
    draw_hline(&mut f, content_x, y, content_w, theme::chrome());
    y += 1;
    if let Some(prev) = model.prev_title {
        let label = format!("← {}", truncate_title(prev, 20));
        f.put_str(content_x, y, &label, theme::chrome());
    }
    if let Some(next) = model.next_title {
        let label = format!("{} →", truncate_title(next, 20));
        let w = label.chars().count() as u16;
        f.put_str(content_x + content_w - w, y, &label, theme::chrome());
    }
    y += 1;
    let page = format!("Page {} of {}", model.page_number, model.total_pages);
    f.put_str(x0 + centered_x(&page, page_w), y, &page, theme::chrome());
    y += 1;

    f.window(0, y + 1)
}
