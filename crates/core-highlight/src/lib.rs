//! Shared Python highlighter.
//!
//! The grammar is a process-wide resource initialized at most once: every
//! editable surface calls [`ensure_ready`] and racing callers share a
//! single load through a `tokio::sync::OnceCell`. Until the load finishes
//! (or forever, if it fails) classification degrades to plain text and
//! markup rendering degrades to HTML-escaped plain text — raw user text is
//! never emitted as markup.
//!
//! [`classify`] and [`render`] are pure functions of `(text, ready-state)`:
//! a fresh parser is built per call, so repeated calls on the same input
//! yield identical output.

use tokio::sync::OnceCell;
use tokio::task;
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser};

/// `Some(language)` once loaded, `None` when the load failed permanently.
static GRAMMAR: OnceCell<Option<Language>> = OnceCell::const_new();

/// Token classification attached to a span of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Plain,
    Keyword,
    String,
    Comment,
    Number,
    Function,
}

impl TokenClass {
    /// CSS-style class name used in markup output.
    pub fn markup_class(self) -> Option<&'static str> {
        match self {
            TokenClass::Plain => None,
            TokenClass::Keyword => Some("tok-keyword"),
            TokenClass::String => Some("tok-string"),
            TokenClass::Comment => Some("tok-comment"),
            TokenClass::Number => Some("tok-number"),
            TokenClass::Function => Some("tok-function"),
        }
    }
}

/// One classified run of text. Spans never cross line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub class: TokenClass,
    pub text: String,
}

/// True once the grammar finished loading successfully.
pub fn is_ready() -> bool {
    matches!(GRAMMAR.get(), Some(Some(_)))
}

/// Trigger the one-time grammar load. Safe to race from any number of
/// surfaces: exactly one load sequence executes; later callers observe the
/// stored outcome immediately. Returns `true` when highlighting is
/// available, `false` when the provider is permanently degraded.
pub async fn ensure_ready() -> bool {
    GRAMMAR
        .get_or_init(|| async {
            match task::spawn_blocking(load_grammar).await {
                Ok(Ok(language)) => {
                    debug!(target: "highlight", "grammar_ready");
                    Some(language)
                }
                Ok(Err(reason)) => {
                    warn!(target: "highlight", reason, "grammar_load_failed");
                    None
                }
                Err(join_err) => {
                    warn!(target: "highlight", ?join_err, "grammar_load_panicked");
                    None
                }
            }
        })
        .await
        .is_some()
}

/// Build the Python language and probe it with a trivial parse so an ABI
/// mismatch is caught here instead of on the first keystroke.
fn load_grammar() -> Result<Language, &'static str> {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|_| "language version mismatch")?;
    parser
        .parse("pass\n", None)
        .ok_or("probe parse produced no tree")?;
    Ok(language)
}

/// Per-line token spans for the given text, honoring the current
/// ready-state. Not ready (or degraded): every line is one Plain span.
pub fn classify(text: &str) -> Vec<Vec<TokenSpan>> {
    match GRAMMAR.get() {
        Some(Some(language)) => classify_with(text, Some(language)),
        _ => classify_with(text, None),
    }
}

/// Markup rendering of the given text: classified spans wrapped in
/// `<span class="tok-…">`, all text HTML-escaped. The not-ready fallback is
/// the escaped text with no wrappers.
pub fn render(text: &str) -> String {
    match GRAMMAR.get() {
        Some(Some(language)) => render_with(text, Some(language)),
        _ => render_with(text, None),
    }
}

/// HTML-escape `&`, `<` and `>` (in that order of concern; `&` first).
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// -------------------------------------------------------------------------
// Grammar-parameterized internals (unit-testable without the global cell)
// -------------------------------------------------------------------------

fn classify_with(text: &str, language: Option<&Language>) -> Vec<Vec<TokenSpan>> {
    let Some(language) = language else {
        return plain_lines(text);
    };
    let Some(ranges) = classified_ranges(text, language) else {
        return plain_lines(text);
    };
    split_into_lines(text, &ranges)
}

fn render_with(text: &str, language: Option<&Language>) -> String {
    let lines = classify_with(text, language);
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for span in line {
            match span.class.markup_class() {
                Some(class) => {
                    out.push_str("<span class=\"");
                    out.push_str(class);
                    out.push_str("\">");
                    out.push_str(&escape(&span.text));
                    out.push_str("</span>");
                }
                None => out.push_str(&escape(&span.text)),
            }
        }
    }
    out
}

fn plain_lines(text: &str) -> Vec<Vec<TokenSpan>> {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                Vec::new()
            } else {
                vec![TokenSpan {
                    class: TokenClass::Plain,
                    text: line.to_string(),
                }]
            }
        })
        .collect()
}

/// Classified byte ranges, sorted by start offset, non-overlapping.
fn classified_ranges(text: &str, language: &Language) -> Option<Vec<(usize, usize, TokenClass)>> {
    let mut parser = Parser::new();
    parser.set_language(language).ok()?;
    let tree = parser.parse(text, None)?;
    let mut ranges = Vec::new();
    visit(tree.root_node(), &mut ranges);
    ranges.sort_by_key(|r| (r.0, r.1));
    // Defensive dedup: keep the earliest classification where ranges touch.
    let mut out: Vec<(usize, usize, TokenClass)> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if out.last().is_none_or(|last| r.0 >= last.1) {
            out.push(r);
        }
    }
    Some(out)
}

fn visit(node: Node<'_>, out: &mut Vec<(usize, usize, TokenClass)>) {
    match node.kind() {
        "comment" => {
            out.push((node.start_byte(), node.end_byte(), TokenClass::Comment));
            return;
        }
        // The whole string literal (quotes, content, interpolations) reads
        // as one string token, matching how the printed record looks.
        "string" | "concatenated_string" => {
            out.push((node.start_byte(), node.end_byte(), TokenClass::String));
            return;
        }
        "integer" | "float" => {
            out.push((node.start_byte(), node.end_byte(), TokenClass::Number));
            return;
        }
        "true" | "false" | "none" => {
            out.push((node.start_byte(), node.end_byte(), TokenClass::Keyword));
            return;
        }
        "function_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.push((name.start_byte(), name.end_byte(), TokenClass::Function));
            }
        }
        "call" => {
            if let Some(callee) = node.child_by_field_name("function")
                && callee.kind() == "identifier"
            {
                out.push((callee.start_byte(), callee.end_byte(), TokenClass::Function));
            }
        }
        _ => {}
    }

    if node.child_count() == 0 {
        // Anonymous alphabetic tokens are the grammar's keywords; operators
        // and punctuation stay plain.
        if !node.is_named() && node.kind().chars().all(|c| c.is_ascii_alphabetic()) {
            out.push((node.start_byte(), node.end_byte(), TokenClass::Keyword));
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, out);
    }
}

/// Split sorted classified ranges along line boundaries, filling gaps with
/// Plain spans.
fn split_into_lines(text: &str, ranges: &[(usize, usize, TokenClass)]) -> Vec<Vec<TokenSpan>> {
    let mut lines = Vec::new();
    let mut range_idx = 0;
    let mut line_start = 0;
    for line in text.split('\n') {
        let line_end = line_start + line.len();
        let mut spans = Vec::new();
        let mut cursor = line_start;
        while range_idx < ranges.len() {
            let (start, end, class) = ranges[range_idx];
            if start >= line_end {
                break;
            }
            let start = start.max(line_start);
            let end_in_line = end.min(line_end);
            if end_in_line <= cursor {
                range_idx += 1;
                continue;
            }
            if start > cursor {
                spans.push(TokenSpan {
                    class: TokenClass::Plain,
                    text: text[cursor..start].to_string(),
                });
            }
            spans.push(TokenSpan {
                class,
                text: text[start..end_in_line].to_string(),
            });
            cursor = end_in_line;
            if end <= line_end {
                range_idx += 1;
            } else {
                // Multi-line token (triple-quoted string): resume on the
                // next line without consuming the range.
                break;
            }
        }
        if cursor < line_end {
            spans.push(TokenSpan {
                class: TokenClass::Plain,
                text: text[cursor..line_end].to_string(),
            });
        }
        lines.push(spans);
        line_start = line_end + 1;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> Language {
        load_grammar().expect("bundled grammar must load")
    }

    fn line_text(spans: &[TokenSpan]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn fallback_render_escapes_markup_characters() {
        let out = render_with("x = 1 < 2 > 0 & True\nprint(x)", None);
        assert!(!out.contains('<'));
        assert_eq!(out, "x = 1 &lt; 2 &gt; 0 &amp; True\nprint(x)");
    }

    #[test]
    fn fallback_classify_is_plain() {
        let lines = classify_with("a = 1\nb = 2", None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].class, TokenClass::Plain);
        assert_eq!(line_text(&lines[0]), "a = 1");
    }

    #[test]
    fn ready_render_preserves_characters_and_classifies() {
        let lang = loaded();
        let out = render_with("def greet():\n    print('hi')  # say hi", Some(&lang));
        assert!(out.contains("<span class=\"tok-keyword\">def</span>"));
        assert!(out.contains("<span class=\"tok-function\">greet</span>"));
        assert!(out.contains("<span class=\"tok-string\">'hi'</span>"));
        assert!(out.contains("<span class=\"tok-comment\"># say hi</span>"));
    }

    #[test]
    fn ready_render_escapes_user_markup() {
        let lang = loaded();
        let out = render_with("x = \"<b>&\"", Some(&lang));
        assert!(out.contains("&lt;b&gt;&amp;"));
        assert!(!out.contains("<b>"));
    }

    #[test]
    fn render_is_deterministic() {
        let lang = loaded();
        let src = "for i in range(3):\n    print(i)\n";
        assert_eq!(render_with(src, Some(&lang)), render_with(src, Some(&lang)));
        assert_eq!(classify_with(src, Some(&lang)), classify_with(src, Some(&lang)));
    }

    #[test]
    fn classified_line_text_reassembles_source() {
        let lang = loaded();
        let src = "total = 1 + 2  # sum\nmsg = 'ok'";
        let lines = classify_with(src, Some(&lang));
        let rebuilt: Vec<String> = lines.iter().map(|l| line_text(l)).collect();
        assert_eq!(rebuilt.join("\n"), src);
    }

    #[test]
    fn numbers_and_keywords_are_tagged() {
        let lang = loaded();
        let lines = classify_with("if x == 42:\n    return None", Some(&lang));
        let classes: Vec<TokenClass> = lines
            .iter()
            .flatten()
            .map(|s| s.class)
            .collect();
        assert!(classes.contains(&TokenClass::Keyword));
        assert!(classes.contains(&TokenClass::Number));
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let lang = loaded();
        let src = "s = \"\"\"one\ntwo\"\"\"\nprint(s)";
        let lines = classify_with(src, Some(&lang));
        assert_eq!(lines.len(), 3);
        assert!(lines[0].iter().any(|s| s.class == TokenClass::String));
        assert!(lines[1].iter().any(|s| s.class == TokenClass::String));
        let rebuilt: Vec<String> = lines.iter().map(|l| line_text(l)).collect();
        assert_eq!(rebuilt.join("\n"), src);
    }

    #[tokio::test]
    async fn ensure_ready_is_idempotent_and_publishes_readiness() {
        assert!(ensure_ready().await);
        assert!(is_ready());
        // Second call observes the already-ready state.
        assert!(ensure_ready().await);
        let out = render("print('hello')");
        assert!(out.contains("tok-function") || out.contains("tok-string"));
    }
}
