//! Output renderers for annotated lines.
//!
//! All renderers work from [`Markup::segments`], which flattens the layered
//! spans into non-overlapping runs of text.

use std::fmt::Write as _;

use serde::Serialize;

use crate::annotation::{Markup, MarkupSpan, SpanStyle};

/// Output format for annotated lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// SGR colors and OSC 8 hyperlinks for terminals.
    #[default]
    Ansi,
    /// HTML fragments with `<span class>` and `<a href>`.
    Html,
    /// One JSON object per line.
    Json,
}

/// Render one line in `format`.
pub fn render_line(format: OutputFormat, text: &str, markup: &Markup) -> serde_json::Result<String> {
    Ok(match format {
        OutputFormat::Ansi => render_ansi(text, markup),
        OutputFormat::Html => render_html(text, markup),
        OutputFormat::Json => render_json(text, markup)?,
    })
}

// ---------------------------------------------------------------------------
// ANSI
// ---------------------------------------------------------------------------

fn sgr_codes(style: &SpanStyle) -> Vec<String> {
    let mut codes = Vec::new();
    if style.bold {
        codes.push("1".to_string());
    }
    if style.italic {
        codes.push("3".to_string());
    }
    if style.underline {
        codes.push("4".to_string());
    }
    if let Some([r, g, b]) = style.fg {
        codes.push(format!("38;2;{r};{g};{b}"));
    }
    if let Some([r, g, b]) = style.bg {
        codes.push(format!("48;2;{r};{g};{b}"));
    }
    codes
}

/// Terminal rendering: SGR attributes plus OSC 8 hyperlinks.
pub fn render_ansi(text: &str, markup: &Markup) -> String {
    if markup.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 32);
    for segment in markup.segments(text) {
        if let Some(href) = segment.link {
            let _ = write!(out, "\x1b]8;;{href}\x1b\\");
        }
        let codes = segment.style.as_ref().map(sgr_codes).unwrap_or_default();
        if codes.is_empty() {
            out.push_str(segment.text);
        } else {
            let _ = write!(out, "\x1b[{}m{}\x1b[0m", codes.join(";"), segment.text);
        }
        if segment.link.is_some() {
            out.push_str("\x1b]8;;\x1b\\");
        }
    }
    out
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn css_for(style: &SpanStyle) -> String {
    let mut css = Vec::new();
    if let Some([r, g, b]) = style.fg {
        css.push(format!("color:#{r:02x}{g:02x}{b:02x}"));
    }
    if let Some([r, g, b]) = style.bg {
        css.push(format!("background-color:#{r:02x}{g:02x}{b:02x}"));
    }
    if style.bold {
        css.push("font-weight:bold".to_string());
    }
    if style.italic {
        css.push("font-style:italic".to_string());
    }
    if style.underline {
        css.push("text-decoration:underline".to_string());
    }
    css.join(";")
}

/// HTML fragment for one line (no wrapping element).
pub fn render_html(text: &str, markup: &Markup) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for segment in markup.segments(text) {
        if let Some(href) = segment.link {
            let _ = write!(out, "<a class=\"console-link\" href=\"{}\">", escape_html(href));
        }
        match &segment.style {
            Some(style) => {
                out.push_str("<span");
                if !segment.classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", escape_html(&segment.classes.join(" ")));
                }
                let css = css_for(style);
                if !css.is_empty() {
                    let _ = write!(out, " style=\"{css}\"");
                }
                let _ = write!(out, ">{}</span>", escape_html(segment.text));
            }
            None => out.push_str(&escape_html(segment.text)),
        }
        if segment.link.is_some() {
            out.push_str("</a>");
        }
    }
    out
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonLine<'a> {
    line: usize,
    text: &'a str,
    spans: &'a [MarkupSpan],
}

/// One JSON object: line number, raw text and the layered spans.
pub fn render_json(text: &str, markup: &Markup) -> serde_json::Result<String> {
    serde_json::to_string(&JsonLine {
        line: markup.line,
        text,
        spans: &markup.spans,
    })
}
