//! Shared integration test helpers for par-annotate.
//!
//! ```ignore
//! mod common;
//! use common::{FnProvider, classes_of, spans_text};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a
//! subset of helpers is used per test file.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use par_annotate::annotation::{
    AnnotateError, AnnotatorProvider, BindError, BoundType, ConsoleLine, Contribution, Decoration,
    LineAnnotator, Markup, Owner, Span, SpanStyle,
};

type Factory = Arc<dyn Fn(&dyn Owner) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> + Send + Sync>;

/// Provider built from a closure, with an optional bound type and a call
/// counter.
pub struct FnProvider {
    name: String,
    bound: Option<BoundType>,
    factory: Factory,
    calls: AtomicUsize,
}

impl FnProvider {
    pub fn new<F>(name: &str, factory: F) -> Self
    where
        F: Fn(&dyn Owner) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            bound: None,
            factory: Arc::new(factory),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider whose annotator marks every line with `class`.
    pub fn marking(name: &str, class: &'static str) -> Self {
        Self::new(name, move |_| Ok(Some(Box::new(WholeLine(class)))))
    }

    pub fn bound(mut self, bound: BoundType) -> Self {
        self.bound = Some(bound);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnnotatorProvider for FnProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn bound_type(&self) -> Result<BoundType, BindError> {
        Ok(self.bound.unwrap_or(BoundType::Any))
    }

    fn create_annotator(
        &self,
        owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.factory)(owner)
    }
}

/// Styles each non-empty line end to end.
pub struct WholeLine(pub &'static str);

impl LineAnnotator for WholeLine {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        if line.text.is_empty() {
            return Ok(Contribution::empty());
        }
        Ok(Contribution::spans(vec![Span::style(
            0..line.text.len(),
            SpanStyle::class(self.0),
        )]))
    }
}

pub fn arc(provider: FnProvider) -> Arc<FnProvider> {
    Arc::new(provider)
}

/// Style classes in markup order.
pub fn classes_of(markup: &Markup) -> Vec<String> {
    markup
        .spans
        .iter()
        .filter_map(|s| match &s.decoration {
            Decoration::Style(style) => style.class.clone(),
            Decoration::Link { .. } => None,
        })
        .collect()
}

/// `(covered text, href)` for each link span.
pub fn links_of(markup: &Markup, text: &str) -> Vec<(String, String)> {
    markup
        .spans
        .iter()
        .filter_map(|s| match &s.decoration {
            Decoration::Link { href } => Some((text[s.range.clone()].to_string(), href.clone())),
            Decoration::Style(_) => None,
        })
        .collect()
}

/// Covered text of every span in markup order.
pub fn spans_text<'a>(markup: &Markup, text: &'a str) -> Vec<&'a str> {
    markup.spans.iter().map(|s| &text[s.range.clone()]).collect()
}
