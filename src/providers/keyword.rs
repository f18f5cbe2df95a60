//! Whole-word keyword highlighting (`ERROR`, `WARNING`, `SUCCESS`, ...).

use std::collections::HashMap;
use std::sync::Arc;

use par_annotate_config::KeywordRule;
use regex::Regex;

use crate::annotation::{
    AnnotateError, AnnotatorProvider, ConsoleLine, Contribution, LineAnnotator, Owner, Span,
    SpanStyle,
};

/// Compiled keyword set shared by every session.
#[derive(Debug)]
struct KeywordMatcher {
    pattern: Regex,
    styles: HashMap<String, SpanStyle>,
}

impl KeywordMatcher {
    fn compile(rules: &[KeywordRule]) -> Result<Option<Self>, regex::Error> {
        let mut styles = HashMap::new();
        let mut alternatives = Vec::new();
        for rule in rules.iter().filter(|r| !r.word.is_empty()) {
            if styles.contains_key(&rule.word) {
                continue;
            }
            let mut style = SpanStyle::class(rule.class.clone());
            style.fg = rule.color;
            style.bold = rule.bold;
            styles.insert(rule.word.clone(), style);
            alternatives.push(regex::escape(&rule.word));
        }
        if alternatives.is_empty() {
            return Ok(None);
        }
        // Longest first so WARNING wins over WARN.
        alternatives.sort_by_key(|a| std::cmp::Reverse(a.len()));
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|")))?;
        Ok(Some(Self { pattern, styles }))
    }

    fn spans(&self, text: &str) -> Vec<Span> {
        self.pattern
            .find_iter(text)
            .filter_map(|m| {
                self.styles
                    .get(m.as_str())
                    .map(|style| Span::style(m.range(), style.clone()))
            })
            .collect()
    }
}

/// Styles configured keywords wherever they appear as whole words.
pub struct KeywordProvider {
    matcher: Option<Arc<KeywordMatcher>>,
}

impl KeywordProvider {
    pub const NAME: &'static str = concat!(module_path!(), "::KeywordProvider");

    /// Build from keyword rules. Empty words are ignored; the first rule for
    /// a repeated word wins.
    pub fn new(rules: &[KeywordRule]) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: KeywordMatcher::compile(rules)?.map(Arc::new),
        })
    }

    /// Provider with the default keyword set.
    pub fn with_defaults() -> Result<Self, regex::Error> {
        Self::new(&par_annotate_config::defaults::keyword_rules())
    }
}

impl AnnotatorProvider for KeywordProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_annotator(
        &self,
        _owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        Ok(self.matcher.as_ref().map(|matcher| {
            Box::new(KeywordAnnotator {
                matcher: Arc::clone(matcher),
            }) as Box<dyn LineAnnotator>
        }))
    }
}

struct KeywordAnnotator {
    matcher: Arc<KeywordMatcher>,
}

impl LineAnnotator for KeywordAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        Ok(Contribution::spans(self.matcher.spans(line.text)))
    }
}
