//! Bridges between YAML configuration and the runtime annotation types.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use par_annotate_config::Config;

use crate::annotation::{
    AnnotatorProvider, AssetExchange, DirAssetSource, ProviderRegistry, StaticAssetSource,
};
use crate::providers::{
    BuildReferences, KeywordProvider, LinkProvider, PreambleProvider, StackTraceProvider,
};

/// Build a [`ProviderRegistry`] holding the enabled built-in providers.
///
/// Registration order, and so layer order, is fixed: keywords, links, stack
/// traces, preamble, build references.
pub fn build_default_registry(config: &Config) -> Result<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    populate_registry(&registry, config)?;
    Ok(registry)
}

/// Replace the contents of `registry` with the providers `config` enables.
///
/// The new provider list is published in one step. Sessions already started
/// keep the chains they were built with.
pub fn populate_registry(registry: &ProviderRegistry, config: &Config) -> Result<()> {
    let annotators = &config.annotators;
    let keywords = if annotators.keywords.enabled {
        Some(
            KeywordProvider::new(&annotators.keywords.rules)
                .context("Failed to compile keyword rules")?,
        )
    } else {
        None
    };

    let mut providers: Vec<Arc<dyn AnnotatorProvider>> = Vec::new();
    if let Some(keywords) = keywords {
        providers.push(Arc::new(keywords));
    }
    if annotators.links.enabled {
        providers.push(Arc::new(LinkProvider));
    }
    if annotators.stack_traces.enabled {
        providers.push(Arc::new(StackTraceProvider));
    }
    if annotators.preamble.enabled {
        providers.push(Arc::new(PreambleProvider));
    }
    if annotators.build_refs.enabled {
        providers.push(Arc::new(BuildReferences::provider()));
    }

    registry.replace_all(providers);
    crate::debug_info!("SESSION", "registry populated with {} providers", registry.len());
    Ok(())
}

/// Build the [`AssetExchange`]: the configured directory first, then the
/// scripts bundled with the built-in providers.
pub fn build_asset_exchange(config: &Config) -> AssetExchange {
    let mut exchange =
        AssetExchange::new().with_max_age(Duration::from_secs(config.assets.max_age_secs));
    if let Some(dir) = &config.assets.dir {
        if !dir.is_dir() {
            log::warn!("Asset directory {} does not exist", dir.display());
        }
        exchange = exchange.with_source(DirAssetSource::new(dir));
    }
    exchange.with_source(StaticAssetSource::builtin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Build, LogFile};

    #[test]
    fn test_default_registry_order() {
        let registry = build_default_registry(&Config::default()).unwrap();
        let names: Vec<String> = registry.list_providers().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                KeywordProvider::NAME,
                LinkProvider::NAME,
                StackTraceProvider::NAME,
                PreambleProvider::NAME,
                BuildReferences::NAME,
            ]
        );
    }

    #[test]
    fn test_disabled_providers_are_skipped() {
        let mut config = Config::default();
        config.annotators.links.enabled = false;
        config.annotators.preamble.enabled = false;
        let registry = build_default_registry(&config).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.snapshot().find_by_name(LinkProvider::NAME).is_none());
    }

    #[test]
    fn test_owner_kinds_get_different_chains() {
        let registry = build_default_registry(&Config::default()).unwrap();
        let build = Build::new("app", 5).with_job_url("https://ci/job/app");
        assert_eq!(registry.start_session(&build).live_count(), 5);
        assert_eq!(registry.start_session(&Build::new("app", 5)).live_count(), 4);
        assert_eq!(registry.start_session(&LogFile::new("x")).live_count(), 3);
    }

    #[test]
    fn test_repopulate_keeps_running_sessions() {
        let registry = build_default_registry(&Config::default()).unwrap();
        let chain = registry.start_session(&LogFile::new("x"));

        let mut config = Config::default();
        config.annotators.keywords.enabled = false;
        populate_registry(&registry, &config).unwrap();

        assert_eq!(chain.live_count(), 3);
        assert_eq!(registry.start_session(&LogFile::new("x")).live_count(), 2);
    }

    #[test]
    fn test_asset_exchange_serves_link_script() {
        let config = Config::default();
        let registry = build_default_registry(&config).unwrap();
        let exchange = build_asset_exchange(&config);

        assert!(exchange.has_asset(&LinkProvider));
        assert!(!exchange.has_asset(&StackTraceProvider));
        let asset = exchange
            .serve(
                "/annotators/par_annotate/providers/links/LinkProvider/script.js",
                &registry.snapshot(),
            )
            .unwrap();
        assert_eq!(asset.bytes, crate::providers::links::SCRIPT);
        assert_eq!(asset.cache_control(), "public, max-age=86400");
    }
}
