//! Links `#123` build references to the referenced build of the same job.

use std::sync::OnceLock;

use regex::Regex;

use crate::annotation::{
    AnnotateError, Build, ConsoleLine, Contribution, LineAnnotator, OwnerFactory, Span,
    TypedProvider,
};

fn re_build_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\B#(\d+)\b")
            .expect("re_build_ref: pattern is valid and should always compile")
    })
}

/// Factory half of [`BuildReferenceProvider`]; written against [`Build`].
#[derive(Debug, Default)]
pub struct BuildReferences;

/// Provider bound to [`Build`] owners.
pub type BuildReferenceProvider = TypedProvider<Build, BuildReferences>;

impl BuildReferences {
    pub const NAME: &'static str = concat!(module_path!(), "::BuildReferenceProvider");

    pub fn provider() -> BuildReferenceProvider {
        TypedProvider::new(BuildReferences)
    }
}

impl OwnerFactory<Build> for BuildReferences {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn create(&self, build: &Build) -> Result<Option<Box<dyn LineAnnotator>>, AnnotateError> {
        let Some(job_url) = build.job_url.as_deref() else {
            crate::debug_trace!("SESSION", "no job URL for {}#{}", build.job, build.number);
            return Ok(None);
        };
        Ok(Some(Box::new(BuildReferenceAnnotator {
            base: job_url.trim_end_matches('/').to_string(),
        })))
    }
}

struct BuildReferenceAnnotator {
    base: String,
}

impl LineAnnotator for BuildReferenceAnnotator {
    fn annotate(&mut self, line: &ConsoleLine<'_>) -> Result<Contribution, AnnotateError> {
        if !line.text.contains('#') {
            return Ok(Contribution::empty());
        }
        let spans = re_build_ref()
            .captures_iter(line.text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                // Skip HTML character references such as `&#123`.
                if line.text[..whole.start()].ends_with('&') {
                    return None;
                }
                let number = caps.get(1)?.as_str();
                Some(Span::link(
                    whole.range(),
                    format!("{}/{}/", self.base, number),
                ))
            })
            .collect();
        Ok(Contribution::spans(spans))
    }
}
