//! Fixed paper-record palette: black ink on the default background, token
//! colors kept muted so the page still reads like a printed document.

use crate::{CellAttrs, CellStyle};
use core_highlight::TokenClass;
use crossterm::style::Color;

pub fn token_style(class: TokenClass) -> CellStyle {
    match class {
        TokenClass::Plain => CellStyle::default(),
        TokenClass::Keyword => CellStyle::fg(Color::Blue).with_attrs(CellAttrs::BOLD),
        TokenClass::String => CellStyle::fg(Color::DarkGreen),
        TokenClass::Comment => CellStyle::fg(Color::DarkGrey).with_attrs(CellAttrs::ITALIC),
        TokenClass::Number => CellStyle::fg(Color::Magenta),
        TokenClass::Function => CellStyle::fg(Color::Cyan),
    }
}

pub fn heading() -> CellStyle {
    CellStyle::bold().with_attrs(CellAttrs::UNDERLINE)
}

pub fn chrome() -> CellStyle {
    CellStyle::fg(Color::DarkGrey)
}

pub fn border() -> CellStyle {
    CellStyle::default()
}

/// Console panel border while the displayed output is unconfirmed for the
/// current text.
pub fn stale_border() -> CellStyle {
    CellStyle::fg(Color::Yellow)
}

pub fn stale_badge() -> CellStyle {
    CellStyle::fg(Color::Yellow).with_attrs(CellAttrs::BOLD)
}

pub fn running_badge() -> CellStyle {
    CellStyle::fg(Color::Cyan).with_attrs(CellAttrs::BOLD)
}
