//! Core data types for console annotation.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Identity of one provider registration. Assigned by the registry in
/// registration order; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProviderId(pub(crate) u64);

impl ProviderId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One line of console output as handed to an annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleLine<'a> {
    /// Absolute, 0-based line number in the stream. Sessions may start at
    /// any number.
    pub number: usize,
    /// Raw line text without the trailing newline.
    pub text: &'a str,
}

impl<'a> ConsoleLine<'a> {
    pub fn new(number: usize, text: &'a str) -> Self {
        Self { number, text }
    }
}

/// Whether an annotator wants to see further lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Keep the annotator in the chain.
    Continue,
    /// Retire the annotator after this line.
    Stop,
}

/// Visual style attached to a span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpanStyle {
    /// Style class for renderers that use stylesheets (e.g. `error`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Foreground color as [r, g, b].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg: Option<[u8; 3]>,
    /// Background color as [r, g, b].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<[u8; 3]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
}

impl SpanStyle {
    /// Style carrying only a class.
    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Default::default()
        }
    }

    pub fn with_fg(mut self, fg: [u8; 3]) -> Self {
        self.fg = Some(fg);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// What a span does to the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decoration {
    Style(SpanStyle),
    Link { href: String },
}

/// A decorated byte range produced by one annotator for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Byte range within the line text.
    pub range: Range<usize>,
    pub decoration: Decoration,
}

impl Span {
    pub fn style(range: Range<usize>, style: SpanStyle) -> Self {
        Self {
            range,
            decoration: Decoration::Style(style),
        }
    }

    pub fn link(range: Range<usize>, href: impl Into<String>) -> Self {
        Self {
            range,
            decoration: Decoration::Link { href: href.into() },
        }
    }
}

/// An annotator's output for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub spans: Vec<Span>,
    pub next: Continuation,
}

impl Contribution {
    /// Nothing on this line; keep going.
    pub fn empty() -> Self {
        Self {
            spans: Vec::new(),
            next: Continuation::Continue,
        }
    }

    /// Spans for this line; keep going.
    pub fn spans(spans: Vec<Span>) -> Self {
        Self {
            spans,
            next: Continuation::Continue,
        }
    }

    /// Nothing on this line and nothing more to do.
    pub fn finished() -> Self {
        Self {
            spans: Vec::new(),
            next: Continuation::Stop,
        }
    }

    /// Keep these spans but retire after this line.
    pub fn then_stop(mut self) -> Self {
        self.next = Continuation::Stop;
        self
    }
}

/// A span after merging into a line's markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupSpan {
    pub range: Range<usize>,
    pub decoration: Decoration,
    /// Position of the producing annotator in its chain; higher layers draw
    /// on top of lower ones.
    pub layer: usize,
    /// Registration that produced the span.
    pub provider: ProviderId,
}

/// Merged markup for one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Markup {
    /// Line number the markup belongs to.
    pub line: usize,
    /// Spans in layer order, then in the order each annotator produced them.
    pub spans: Vec<MarkupSpan>,
}

/// A run of text with uniform decoration, produced by [`Markup::segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub range: Range<usize>,
    pub text: &'a str,
    /// Classes from every covering style span, bottom layer first.
    pub classes: Vec<String>,
    /// Combined style; `None` when no style span covers the segment.
    pub style: Option<SpanStyle>,
    /// Link of the topmost covering link span.
    pub link: Option<&'a str>,
}

impl Markup {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            spans: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans produced by one registration.
    pub fn spans_from(&self, provider: ProviderId) -> impl Iterator<Item = &MarkupSpan> {
        self.spans.iter().filter(move |s| s.provider == provider)
    }

    /// Flatten layered spans over `text` into non-overlapping segments.
    ///
    /// Later layers draw on top: colors from a higher layer replace those
    /// below, flags accumulate, and the topmost link wins. Uncovered text
    /// becomes plain segments, so the segments always tile `text` exactly.
    pub fn segments<'a>(&'a self, text: &'a str) -> Vec<Segment<'a>> {
        let mut cuts: Vec<usize> = vec![0, text.len()];
        for span in &self.spans {
            cuts.push(span.range.start.min(text.len()));
            cuts.push(span.range.end.min(text.len()));
        }
        cuts.sort_unstable();
        cuts.dedup();

        let mut ordered: Vec<&MarkupSpan> = self.spans.iter().collect();
        ordered.sort_by_key(|s| s.layer);

        let mut segments = Vec::with_capacity(cuts.len());
        for window in cuts.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start == end || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                continue;
            }
            let mut classes = Vec::new();
            let mut style: Option<SpanStyle> = None;
            let mut link = None;
            for span in ordered
                .iter()
                .filter(|s| s.range.start <= start && s.range.end >= end)
            {
                match &span.decoration {
                    Decoration::Style(layer) => {
                        if let Some(class) = &layer.class {
                            classes.push(class.clone());
                        }
                        let merged = style.get_or_insert_with(SpanStyle::default);
                        merged.class = layer.class.clone().or(merged.class.take());
                        merged.fg = layer.fg.or(merged.fg);
                        merged.bg = layer.bg.or(merged.bg);
                        merged.bold |= layer.bold;
                        merged.italic |= layer.italic;
                        merged.underline |= layer.underline;
                    }
                    Decoration::Link { href } => link = Some(href.as_str()),
                }
            }
            segments.push(Segment {
                range: start..end,
                text: &text[start..end],
                classes,
                style,
                link,
            });
        }
        segments
    }
}
