//! Shared test fakes for annotation tests.
//!
//! ```ignore
//! use crate::annotation::testing::{StaticProvider, ScriptedAnnotator, Step};
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::binding::BoundType;
use super::owner::Owner;
use super::traits::{AnnotateError, AnnotatorProvider, BindError, LineAnnotator};
use super::types::{ConsoleLine, Contribution, Span, SpanStyle};

/// Contributes nothing and never stops.
pub struct NeverAnnotator;

impl LineAnnotator for NeverAnnotator {
    fn annotate(&mut self, _line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        Ok(Contribution::empty())
    }
}

/// Styles every non-empty line end to end with a fixed class.
pub struct MarkAnnotator {
    pub class: String,
}

impl MarkAnnotator {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

impl LineAnnotator for MarkAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        if line.text.is_empty() {
            return Ok(Contribution::empty());
        }
        Ok(Contribution::spans(vec![Span::style(
            0..line.text.len(),
            SpanStyle::class(self.class.clone()),
        )]))
    }
}

/// One scripted reaction of a [`ScriptedAnnotator`].
#[derive(Debug, Clone)]
pub enum Step {
    /// Mark the whole line and continue.
    Mark,
    /// Mark the whole line, then stop.
    MarkThenStop,
    /// Contribute nothing and stop.
    Stop,
    /// Return an error.
    Fail,
    /// Panic.
    Panic,
    /// Emit a span with this raw range.
    Raw(std::ops::Range<usize>),
}

/// Plays back a fixed list of steps, then contributes nothing forever.
/// Records every line number it sees.
pub struct ScriptedAnnotator {
    class: String,
    steps: VecDeque<Step>,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedAnnotator {
    pub fn new(class: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            class: class.into(),
            steps: steps.into_iter().collect(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared log of the line numbers this annotator was called with.
    pub fn seen(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.seen)
    }

    fn whole_line(&self, line: &ConsoleLine<'_>) -> Vec<Span> {
        if line.text.is_empty() {
            return Vec::new();
        }
        vec![Span::style(
            0..line.text.len(),
            SpanStyle::class(self.class.clone()),
        )]
    }
}

impl LineAnnotator for ScriptedAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        self.seen.lock().push(line.number);
        match self.steps.pop_front() {
            None => Ok(Contribution::empty()),
            Some(Step::Mark) => Ok(Contribution::spans(self.whole_line(line))),
            Some(Step::MarkThenStop) => Ok(Contribution::spans(self.whole_line(line)).then_stop()),
            Some(Step::Stop) => Ok(Contribution::finished()),
            Some(Step::Fail) => Err(AnnotateError::LineFailed {
                line: line.number,
                reason: "scripted failure".to_string(),
            }),
            Some(Step::Panic) => panic!("scripted panic on line {}", line.number),
            Some(Step::Raw(range)) => Ok(Contribution::spans(vec![Span::style(
                range,
                SpanStyle::class(self.class.clone()),
            )])),
        }
    }
}

type MakeAnnotator = Arc<dyn Fn() -> Box<dyn LineAnnotator> + Send + Sync>;

#[derive(Clone, Copy)]
enum BindMode {
    Default,
    Declared(BoundType),
    Error,
    Panic,
}

#[derive(Clone, Copy)]
enum CreateMode {
    Accept,
    Decline,
    Fail,
    Panic,
}

/// Configurable provider for registry and session tests.
///
/// By default it binds to every owner and creates a [`MarkAnnotator`] whose
/// class is the provider name.
pub struct StaticProvider {
    name: String,
    bind: BindMode,
    create: CreateMode,
    make: MakeAnnotator,
    bind_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let class = name.clone();
        Self {
            name,
            bind: BindMode::Default,
            create: CreateMode::Accept,
            make: Arc::new(move || Box::new(MarkAnnotator::new(class.clone()))),
            bind_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn bound_to<T: ?Sized + 'static>(mut self) -> Self {
        self.bind = BindMode::Declared(BoundType::of::<T>());
        self
    }

    pub fn with_bind_error(mut self) -> Self {
        self.bind = BindMode::Error;
        self
    }

    pub fn with_bind_panic(mut self) -> Self {
        self.bind = BindMode::Panic;
        self
    }

    pub fn declining(mut self) -> Self {
        self.create = CreateMode::Decline;
        self
    }

    pub fn failing(mut self) -> Self {
        self.create = CreateMode::Fail;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.create = CreateMode::Panic;
        self
    }

    /// Use `make` to build each session's annotator.
    pub fn with_annotator<F>(mut self, make: F) -> Self
    where
        F: Fn() -> Box<dyn LineAnnotator> + Send + Sync + 'static,
    {
        self.make = Arc::new(make);
        self
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

impl AnnotatorProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn bound_type(&self) -> Result<BoundType, BindError> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        match self.bind {
            BindMode::Default => Ok(BoundType::Any),
            BindMode::Declared(bound) => Ok(bound),
            BindMode::Error => Err(BindError {
                provider: self.name.clone(),
                reason: "declaration unavailable".to_string(),
            }),
            BindMode::Panic => panic!("bound_type panicked"),
        }
    }

    fn create_annotator(
        &self,
        _owner: &dyn Owner,
    ) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        match self.create {
            CreateMode::Accept => Ok(Some((self.make)())),
            CreateMode::Decline => Ok(None),
            CreateMode::Fail => Err(AnnotateError::CreateFailed("scripted failure".to_string())),
            CreateMode::Panic => panic!("create_annotator panicked"),
        }
    }
}
