//! Run preamble styling (`Started by ...`, `Building in workspace ...`).

use crate::annotation::{
    AnnotateError, AnnotatorProvider, BindError, BoundType, ConsoleLine, Contribution,
    LineAnnotator, Owner, Run, Span, SpanStyle,
};

const PREAMBLE_COLOR: [u8; 3] = [147, 153, 178];

/// Line prefixes that make up a run preamble.
const PREAMBLE_PREFIXES: &[&str] = &[
    "Started by ",
    "Running as ",
    "Running on ",
    "Building in workspace ",
    "Building remotely on ",
    "Building on ",
    "Obtained ",
    "Checking out ",
    "Cloning ",
    "Fetching ",
    "Commit message: ",
    "The recommended git tool is",
    "using credential ",
    " > git ",
    "[Pipeline] Start of Pipeline",
];

fn is_preamble(text: &str) -> bool {
    PREAMBLE_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// Styles the preamble a run prints before its own output. Applies to run
/// owners only and leaves the chain at the first line past the preamble.
#[derive(Debug, Default)]
pub struct PreambleProvider;

impl PreambleProvider {
    pub const NAME: &'static str = concat!(module_path!(), "::PreambleProvider");
}

impl AnnotatorProvider for PreambleProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn bound_type(&self) -> Result<BoundType, BindError> {
        Ok(BoundType::of::<dyn Run>())
    }

    fn create_annotator(
        &self,
        _owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        Ok(Some(Box::new(PreambleAnnotator)))
    }
}

struct PreambleAnnotator;

impl LineAnnotator for PreambleAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        if !is_preamble(line.text) {
            return Ok(Contribution::finished());
        }
        let end = line.text.trim_end().len();
        let style = SpanStyle::class("preamble")
            .with_fg(PREAMBLE_COLOR)
            .italic();
        Ok(Contribution::spans(vec![Span::style(0..end, style)]))
    }
}
