//! `AnnotationChain` struct and its line-driving logic.

use std::fmt;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::entry::{ChainEntry, RetireReason, Retired};
use crate::annotation::session::panic_message;
use crate::annotation::types::{
    ConsoleLine, Continuation, Contribution, Markup, MarkupSpan, ProviderId,
};

/// Ordered chain of live annotators for one viewing session.
///
/// Owned by exactly one session and driven through `&mut self`. The chain is
/// `Send`, so a host can move it onto the task serving the session.
pub struct AnnotationChain {
    live: Vec<ChainEntry>,
    retired: Vec<Retired>,
    next_line: usize,
}

impl AnnotationChain {
    pub(crate) fn from_entries(entries: Vec<ChainEntry>) -> Self {
        Self {
            live: entries,
            retired: Vec::new(),
            next_line: 0,
        }
    }

    /// A chain with no annotators. Every line yields empty markup.
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Set the number of the first line the host will feed.
    pub fn starting_at(mut self, offset: usize) -> Self {
        self.next_line = offset;
        self
    }

    /// Number the next call to [`Self::annotate`] will use.
    pub fn next_line(&self) -> usize {
        self.next_line
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// True once no annotator is left; further lines are passed through.
    pub fn is_exhausted(&self) -> bool {
        self.live.is_empty()
    }

    /// Live annotators in layer order, as `(registration, provider name)`.
    pub fn live_providers(&self) -> impl Iterator<Item = (ProviderId, &str)> {
        self.live.iter().map(|e| (e.provider, e.name.as_str()))
    }

    /// Annotators that have left the chain, in retirement order.
    pub fn retired(&self) -> &[Retired] {
        &self.retired
    }

    /// Annotate the next line in sequence.
    pub fn annotate(&mut self, text: &str) -> Markup {
        let number = self.next_line;
        self.annotate_line(number, text)
    }

    /// Annotate a line with an explicit number. Numbering continues from
    /// `number + 1`.
    pub fn annotate_line(&mut self, number: usize, text: &str) -> Markup {
        self.next_line = number.saturating_add(1);
        let mut markup = Markup::new(number);
        if self.live.is_empty() {
            return markup;
        }

        let line = ConsoleLine::new(number, text);
        let entries = std::mem::take(&mut self.live);
        self.live.reserve(entries.len());

        for mut entry in entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.annotator.annotate(&line)));
            match outcome {
                Ok(Ok(Contribution { spans, next })) => {
                    for span in spans {
                        if !is_valid_range(&span.range, text) {
                            crate::debug_trace!(
                                "CHAIN",
                                "dropping span {:?} from {} on line {} (len {})",
                                span.range,
                                entry.name,
                                number,
                                text.len()
                            );
                            continue;
                        }
                        markup.spans.push(MarkupSpan {
                            range: span.range,
                            decoration: span.decoration,
                            layer: entry.layer,
                            provider: entry.provider,
                        });
                    }
                    match next {
                        Continuation::Continue => self.live.push(entry),
                        Continuation::Stop => {
                            crate::debug_log!(
                                "CHAIN",
                                "{} finished on line {}",
                                entry.name,
                                number
                            );
                            self.retired
                                .push(entry.retire(number, RetireReason::Finished));
                        }
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("Annotator {} failed on line {}: {}", entry.name, number, e);
                    self.retired
                        .push(entry.retire(number, RetireReason::Failed(e.to_string())));
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref()).to_string();
                    log::warn!(
                        "Annotator {} panicked on line {}: {}",
                        entry.name,
                        number,
                        message
                    );
                    self.retired
                        .push(entry.retire(number, RetireReason::Panicked(message)));
                }
            }
        }

        if self.live.is_empty() {
            crate::debug_log!("CHAIN", "chain exhausted after line {}", number);
        }
        markup
    }

    /// Annotate consecutive lines starting at [`Self::next_line`].
    pub fn annotate_all<'a, I>(&mut self, lines: I) -> Vec<Markup>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().map(|line| self.annotate(line)).collect()
    }
}

fn is_valid_range(range: &Range<usize>, text: &str) -> bool {
    range.start < range.end
        && range.end <= text.len()
        && text.is_char_boundary(range.start)
        && text.is_char_boundary(range.end)
}

impl Default for AnnotationChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AnnotationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationChain")
            .field("live", &self.live)
            .field("retired", &self.retired)
            .field("next_line", &self.next_line)
            .finish()
    }
}
