//! Stack trace styling for JVM, Python, JavaScript, Rust and Go traces.
//!
//! Frames are recognised by their shape alone, so a session that starts in
//! the middle of a trace still styles the frames it sees. The inside-trace
//! flag only extends styling to indented continuation lines (source excerpts
//! under Python frames and the like).

use std::sync::OnceLock;

use regex::Regex;

use crate::annotation::{
    AnnotateError, AnnotatorProvider, ConsoleLine, Contribution, LineAnnotator, Owner, Span,
    SpanStyle,
};

const HEADER_COLOR: [u8; 3] = [243, 139, 168];
const FRAME_COLOR: [u8; 3] = [108, 112, 134];
const CAUSE_COLOR: [u8; 3] = [250, 179, 135];

fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^(?:
                Exception\ in\ thread\ "[^"]*"\ .*
                | [\w.$]*(?:Exception|Error)(?::.*)?
                | Traceback\ \(most\ recent\ call\ last\):
                | thread\ '.*'\ panicked\ at.*
                | goroutine\ \d+\ \[.*
            )$
            "#,
        )
        .expect("re_header: pattern is valid and should always compile")
    })
}

fn re_frame() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^\s+(?:
                at\ \S.*
                | File\ ".*",\ line\ \d+.*
                | \.\.\.\ \d+\ (?:more|common\ frames\ omitted)
                | \d+:\s+\S.*
            )$
            "#,
        )
        .expect("re_frame: pattern is valid and should always compile")
    })
}

fn re_cause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*Caused by:\s")
            .expect("re_cause: pattern is valid and should always compile")
    })
}

/// What a line is within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceLine {
    Header,
    Cause,
    Frame,
    Continuation,
    Other,
}

fn classify(text: &str, in_trace: bool) -> TraceLine {
    if re_cause().is_match(text) {
        TraceLine::Cause
    } else if re_frame().is_match(text) {
        TraceLine::Frame
    } else if re_header().is_match(text) {
        TraceLine::Header
    } else if in_trace && text.starts_with([' ', '\t']) && !text.trim().is_empty() {
        TraceLine::Continuation
    } else {
        TraceLine::Other
    }
}

/// Styles exception headers, frames and `Caused by:` lines.
#[derive(Debug, Default)]
pub struct StackTraceProvider;

impl StackTraceProvider {
    pub const NAME: &'static str = concat!(module_path!(), "::StackTraceProvider");
}

impl AnnotatorProvider for StackTraceProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create_annotator(
        &self,
        _owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        Ok(Some(Box::new(StackTraceAnnotator::default())))
    }
}

#[derive(Debug, Default)]
struct StackTraceAnnotator {
    in_trace: bool,
}

impl LineAnnotator for StackTraceAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        let kind = classify(line.text, self.in_trace);
        let style = match kind {
            TraceLine::Header => SpanStyle::class("stack-header")
                .with_fg(HEADER_COLOR)
                .bold(),
            TraceLine::Cause => SpanStyle::class("stack-cause").with_fg(CAUSE_COLOR).bold(),
            TraceLine::Frame | TraceLine::Continuation => {
                SpanStyle::class("stack-frame").with_fg(FRAME_COLOR)
            }
            TraceLine::Other => {
                self.in_trace = false;
                return Ok(Contribution::empty());
            }
        };
        self.in_trace = true;

        let start = line.text.len() - line.text.trim_start().len();
        let end = line.text.trim_end().len();
        if start >= end {
            return Ok(Contribution::empty());
        }
        Ok(Contribution::spans(vec![Span::style(start..end, style)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Decoration;

    fn run(lines: &[&str], first: usize) -> Vec<Option<String>> {
        let mut annotator = StackTraceAnnotator::default();
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let contribution = annotator
                    .annotate(&ConsoleLine::new(first + i, text))
                    .unwrap();
                contribution.spans.first().and_then(|s| match &s.decoration {
                    Decoration::Style(style) => style.class.clone(),
                    Decoration::Link { .. } => None,
                })
            })
            .collect()
    }

    fn c(class: &str) -> Option<String> {
        Some(class.to_string())
    }

    #[test]
    fn test_java_trace() {
        let classes = run(
            &[
                "java.lang.IllegalStateException: boom",
                "\tat com.acme.App.run(App.java:10)",
                "\tat com.acme.App.main(App.java:3)",
                "Caused by: java.io.IOException: disk",
                "\t... 2 more",
                "Build step finished",
            ],
            0,
        );
        assert_eq!(
            classes,
            vec![
                c("stack-header"),
                c("stack-frame"),
                c("stack-frame"),
                c("stack-cause"),
                c("stack-frame"),
                None,
            ]
        );
    }

    #[test]
    fn test_python_trace_with_source_lines() {
        let classes = run(
            &[
                "Traceback (most recent call last):",
                "  File \"main.py\", line 4, in <module>",
                "    run()",
                "ValueError: bad value",
                "done",
                "    indented but not in a trace",
            ],
            0,
        );
        assert_eq!(
            classes,
            vec![
                c("stack-header"),
                c("stack-frame"),
                c("stack-frame"),
                c("stack-header"),
                None,
                None,
            ]
        );
    }

    #[test]
    fn test_mid_stream_start_recognises_frames() {
        let classes = run(
            &["\tat com.acme.App.run(App.java:10)", "\tat com.acme.App.main(App.java:3)"],
            120,
        );
        assert_eq!(classes, vec![c("stack-frame"), c("stack-frame")]);
    }

    #[test]
    fn test_span_skips_indentation() {
        let mut annotator = StackTraceAnnotator::default();
        let text = "\tat a.B.c(B.java:1)  ";
        let contribution = annotator.annotate(&ConsoleLine::new(0, text)).unwrap();
        assert_eq!(contribution.spans[0].range, 1..text.trim_end().len());
    }

    #[test]
    fn test_rust_and_go_headers() {
        assert_eq!(
            run(&["thread 'main' panicked at src/main.rs:2:5:"], 0),
            vec![c("stack-header")]
        );
        assert_eq!(run(&["goroutine 1 [running]:"], 0), vec![c("stack-header")]);
    }

    #[test]
    fn test_ordinary_lines_untouched() {
        assert_eq!(run(&["ERROR: build failed", "Compiling foo v0.1.0"], 0), vec![None, None]);
    }
}
