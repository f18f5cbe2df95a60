//! URL detection.

use std::sync::OnceLock;

use regex::Regex;

use crate::annotation::{
    AnnotateError, AnnotatorProvider, ConsoleLine, Contribution, LineAnnotator, Owner, Span,
};

/// Client script shipped with [`LinkProvider`].
pub const SCRIPT: &[u8] = include_bytes!("../../assets/link_provider.js");

/// URL pattern that matches common URL schemes
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        // Explicit schemes, or bare hosts starting with www.
        Regex::new(
            r"(?x)
            \b(?:
                (?:https?|ftps?|file|git|ssh)://[^\s<>{}|\\^`\[\]]+
                |
                www\.[^\s<>{}|\\^`\[\]]+
            )\b
            ",
        )
        .expect("Failed to compile URL regex")
    })
}

/// Link target for a matched URL. Bare `www.` hosts get an `http://` scheme.
fn href_for(url: &str) -> String {
    if url.starts_with("www.") {
        format!("http://{url}")
    } else {
        url.to_string()
    }
}

/// Find URLs in `text` as link spans.
pub fn find_links(text: &str) -> Vec<Span> {
    url_regex()
        .find_iter(text)
        .map(|m| Span::link(m.range(), href_for(m.as_str())))
        .collect()
}

/// Turns URLs in console output into links.
#[derive(Debug, Default)]
pub struct LinkProvider;

impl LinkProvider {
    pub const NAME: &'static str = concat!(module_path!(), "::LinkProvider");
}

impl AnnotatorProvider for LinkProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_annotator(
        &self,
        _owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        Ok(Some(Box::new(LinkAnnotator)))
    }
}

struct LinkAnnotator;

impl LineAnnotator for LinkAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        if !line.text.contains("://") && !line.text.contains("www.") {
            return Ok(Contribution::empty());
        }
        Ok(Contribution::spans(find_links(line.text)))
    }
}
