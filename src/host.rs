//! Host side of the annotation core: owns the registry and asset exchange,
//! opens one session per console stream and runs the CLI commands.

use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use par_annotate_config::Config;

use crate::annotation::{
    AnnotationChain, Asset, AssetError, AssetExchange, Build, LogFile, Owner, ProviderRegistry,
    ProviderSnapshot, SessionResolver,
};
use crate::cli::{BuildSpec, Commands, RuntimeOptions};
use crate::config_bridge::{build_asset_exchange, build_default_registry, populate_registry};
use crate::render::{OutputFormat, escape_html, render_line};

/// Poll interval while following a growing file.
const FOLLOW_POLL: Duration = Duration::from_millis(250);

/// Row of `par-annotate providers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRow {
    pub position: usize,
    pub name: String,
    pub bound: String,
    pub asset: Option<String>,
}

/// Registry, assets and reload state shared by all sessions.
pub struct Host {
    registry: ProviderRegistry,
    assets: AssetExchange,
    /// Bumped on every reload so following sessions can rebuild their chain.
    generation: AtomicU64,
}

impl Host {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            registry: build_default_registry(config)?,
            assets: build_asset_exchange(config),
            generation: AtomicU64::new(0),
        })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn assets(&self) -> &AssetExchange {
        &self.assets
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Re-register providers from `config`. Running sessions keep their
    /// chains; the asset directory is fixed for the host's lifetime.
    pub fn reload(&self, config: &Config) -> Result<()> {
        populate_registry(&self.registry, config)?;
        self.assets.invalidate();
        self.generation.fetch_add(1, Ordering::AcqRel);
        log::info!("Providers reloaded ({} registered)", self.registry.len());
        Ok(())
    }

    pub fn provider_rows(&self) -> Vec<ProviderRow> {
        self.registry
            .snapshot()
            .iter()
            .enumerate()
            .map(|(position, p)| ProviderRow {
                position,
                name: p.name().to_string(),
                bound: p.bound_type().to_string(),
                asset: self.assets.asset_location(p.provider()),
            })
            .collect()
    }

    pub fn serve_asset(&self, request_path: &str) -> Result<Asset, AssetError> {
        self.assets.serve(request_path, &self.registry.snapshot())
    }

    /// `<script>` tags for the assets of the providers live in `chain`.
    /// `snapshot` must be the one the chain was resolved from.
    fn script_tags(&self, chain: &AnnotationChain, snapshot: &ProviderSnapshot) -> Vec<String> {
        chain
            .live_providers()
            .filter_map(|(id, _)| snapshot.get(id))
            .filter_map(|p| self.assets.asset_location(p.provider()))
            .map(|src| format!("<script src=\"{}\"></script>", escape_html(&src)))
            .collect()
    }

    /// Annotate `text` as one session of `owner`, emitting lines from `from`.
    pub fn annotate_text(
        &self,
        owner: &dyn Owner,
        text: &str,
        from: usize,
        format: OutputFormat,
    ) -> Result<Vec<String>> {
        let snapshot = self.registry.snapshot();
        let mut chain = SessionResolver::resolve(owner, &snapshot).starting_at(from);
        let mut out = Vec::new();
        if format == OutputFormat::Html {
            out.extend(self.script_tags(&chain, &snapshot));
        }
        for line in text.lines().skip(from) {
            let markup = chain.annotate(line);
            out.push(render_line(format, line, &markup).context("Failed to render line")?);
        }
        crate::debug_log!(
            "SESSION",
            "session for {} done at line {}; {} annotators retired",
            owner.display_name(),
            chain.next_line(),
            chain.retired().len()
        );
        Ok(out)
    }
}

/// Owner for a console file: the named build when given, else the file.
pub fn owner_for(path: &Path, build: Option<&BuildSpec>, job_url: Option<&str>) -> Box<dyn Owner> {
    match build {
        Some(spec) => {
            let mut owner = Build::new(spec.job.clone(), spec.number);
            if let Some(url) = job_url {
                owner = owner.with_job_url(url);
            }
            Box::new(owner)
        }
        None => Box::new(LogFile::new(path)),
    }
}

fn read_console(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Annotate every file concurrently, one blocking task per session.
/// Results come back in argument order.
pub async fn annotate_files(
    host: Arc<Host>,
    files: Vec<PathBuf>,
    from: usize,
    format: OutputFormat,
    build: Option<BuildSpec>,
    job_url: Option<String>,
) -> Vec<(PathBuf, Result<Vec<String>>)> {
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let host = Arc::clone(&host);
            let build = build.clone();
            let job_url = job_url.clone();
            let task_path = path.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let owner = owner_for(&task_path, build.as_ref(), job_url.as_deref());
                let text = read_console(&task_path)?;
                host.annotate_text(owner.as_ref(), &text, from, format)
            });
            (path, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("Session task failed: {e}")),
        };
        results.push((path, result));
    }
    results
}

/// Follow a growing file, annotating lines as they are appended.
///
/// After a config reload the session is restarted at the current line with
/// the new providers. Runs until an I/O error.
pub fn follow_file(
    host: &Host,
    path: &Path,
    owner: &dyn Owner,
    from: usize,
    format: OutputFormat,
) -> Result<()> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut generation = host.generation();
    let mut chain = host.registry().start_session(owner).starting_at(from);
    let mut number = 0usize;
    // Bytes of a line still being written.
    let mut pending = Vec::new();
    let stdout = io::stdout();

    loop {
        let read = reader
            .read_until(b'\n', &mut pending)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            std::thread::sleep(FOLLOW_POLL);
            continue;
        }
        if pending.last() != Some(&b'\n') {
            continue;
        }
        let line = String::from_utf8_lossy(&pending)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        pending.clear();

        if number >= from {
            let current = host.generation();
            if current != generation {
                generation = current;
                chain = host.registry().start_session(owner).starting_at(number);
                log::info!(
                    "Restarted session for {} at line {}",
                    owner.display_name(),
                    number
                );
            }
            let markup = chain.annotate_line(number, &line);
            let rendered = render_line(format, &line, &markup)?;
            let mut out = stdout.lock();
            writeln!(out, "{rendered}")?;
            out.flush()?;
        }
        number += 1;
    }
}

/// Reload the host whenever the config file changes.
#[cfg(feature = "watcher")]
fn spawn_config_reloader(host: Arc<Host>, path: PathBuf, debounce_ms: u64) {
    use par_annotate_config::ConfigWatcher;

    let watcher = match ConfigWatcher::new(&path, debounce_ms) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("Config hot reload disabled: {e:#}");
            return;
        }
    };
    std::thread::spawn(move || {
        loop {
            let Some(event) = watcher.recv_timeout(Duration::from_secs(1)) else {
                continue;
            };
            match Config::load_from(&event.path) {
                Ok(config) => {
                    if let Err(e) = host.reload(&config) {
                        log::error!("Failed to apply reloaded config: {e:#}");
                    }
                }
                Err(e) => log::error!("Failed to reload config: {e:#}"),
            }
        }
    });
}

fn print_asset(asset: &Asset) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Content-Type: {}", asset.content_type)?;
    writeln!(out, "Cache-Control: {}", asset.cache_control())?;
    if let Some(modified) = asset.last_modified_header() {
        writeln!(out, "Last-Modified: {modified}")?;
    }
    writeln!(out)?;
    out.write_all(&asset.bytes)?;
    out.flush()?;
    Ok(())
}

/// Run a parsed command. Returns the process exit code.
pub async fn run(options: RuntimeOptions, config: Config, config_path: PathBuf) -> Result<i32> {
    let host = Arc::new(Host::new(&config)?);

    match options.command {
        Commands::Providers => {
            for row in host.provider_rows() {
                println!(
                    "{:>2}  {:<60}  {:<28}  {}",
                    row.position,
                    row.name,
                    row.bound,
                    row.asset.as_deref().unwrap_or("-")
                );
            }
            Ok(0)
        }
        Commands::Asset { request_path } => match host.serve_asset(&request_path) {
            Ok(asset) => {
                print_asset(&asset)?;
                Ok(0)
            }
            Err(AssetError::NotFound(path)) => {
                eprintln!("not found: {path}");
                Ok(1)
            }
            Err(e) => Err(e.into()),
        },
        Commands::Annotate {
            files,
            from,
            format,
            build,
            job_url,
            follow: false,
        } => {
            let mut code = 0;
            for (path, result) in annotate_files(host, files, from, format, build, job_url).await {
                match result {
                    Ok(lines) => {
                        let mut out = io::stdout().lock();
                        for line in lines {
                            writeln!(out, "{line}")?;
                        }
                    }
                    Err(e) => {
                        eprintln!("par-annotate: {}: {e:#}", path.display());
                        code = 1;
                    }
                }
            }
            Ok(code)
        }
        Commands::Annotate {
            files,
            from,
            format,
            build,
            job_url,
            follow: true,
        } => {
            #[cfg(feature = "watcher")]
            spawn_config_reloader(Arc::clone(&host), config_path, config.reload_debounce_ms);
            #[cfg(not(feature = "watcher"))]
            let _ = config_path;

            let handles: Vec<_> = files
                .into_iter()
                .map(|path| {
                    let host = Arc::clone(&host);
                    let build = build.clone();
                    let job_url = job_url.clone();
                    tokio::task::spawn_blocking(move || {
                        let owner = owner_for(&path, build.as_ref(), job_url.as_deref());
                        follow_file(&host, &path, owner.as_ref(), from, format)
                            .with_context(|| format!("Stopped following {}", path.display()))
                    })
                })
                .collect();
            let mut code = 0;
            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        eprintln!("par-annotate: {e:#}");
                        code = 1;
                    }
                    Err(e) => {
                        eprintln!("par-annotate: session task failed: {e}");
                        code = 1;
                    }
                }
            }
            Ok(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LinkProvider;

    fn host() -> Host {
        Host::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_owner_for() {
        let owner = owner_for(Path::new("a.log"), None, None);
        assert!(owner.downcast_ref::<LogFile>().is_some());

        let spec = BuildSpec {
            job: "app".to_string(),
            number: 3,
        };
        let owner = owner_for(Path::new("a.log"), Some(&spec), Some("https://ci/job/app"));
        let build = owner.downcast_ref::<Build>().unwrap();
        assert_eq!(build.job_url.as_deref(), Some("https://ci/job/app"));
    }

    #[test]
    fn test_provider_rows() {
        let rows = host().provider_rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].bound, "*");
        let link = rows.iter().find(|r| r.name == LinkProvider::NAME).unwrap();
        assert_eq!(
            link.asset.as_deref(),
            Some("/annotators/par_annotate/providers/links/LinkProvider/script.js")
        );
        assert!(rows.iter().filter(|r| r.asset.is_some()).count() == 1);
    }

    #[test]
    fn test_annotate_text_from_offset() {
        let host = host();
        let text = "line zero\nERROR: line one\nline two";
        let lines = host
            .annotate_text(&LogFile::new("x"), text, 1, OutputFormat::Json)
            .unwrap();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["line"], 1);
        assert_eq!(first["spans"][0]["decoration"]["class"], "error");
    }

    #[test]
    fn test_html_output_includes_scripts() {
        let lines = host()
            .annotate_text(&LogFile::new("x"), "see http://x/y", 0, OutputFormat::Html)
            .unwrap();
        assert_eq!(
            lines[0],
            "<script src=\"/annotators/par_annotate/providers/links/LinkProvider/script.js\"></script>"
        );
        assert!(lines[1].contains("<a class=\"console-link\" href=\"http://x/y\">"));
    }

    #[test]
    fn test_reload_bumps_generation() {
        let host = host();
        let mut config = Config::default();
        config.annotators.links.enabled = false;
        host.reload(&config).unwrap();
        assert_eq!(host.generation(), 1);
        assert_eq!(host.registry().len(), 4);
        assert!(host
            .serve_asset("/annotators/par_annotate/providers/links/LinkProvider/script.js")
            .is_err());
    }

    #[test]
    fn test_sessions_during_reload_see_whole_registry() {
        let host = Arc::new(host());
        let reloader = {
            let host = Arc::clone(&host);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    host.reload(&Config::default()).unwrap();
                }
            })
        };
        let owner = LogFile::new("x.log");
        while !reloader.is_finished() {
            assert_eq!(host.registry().start_session(&owner).live_count(), 3);
        }
        reloader.join().unwrap();
        assert_eq!(host.generation(), 500);
    }

    #[test]
    fn test_script_tags_use_session_snapshot() {
        let host = host();
        let snapshot = host.registry().snapshot();
        let chain = SessionResolver::resolve(&LogFile::new("x"), &snapshot);

        host.reload(&Config::default()).unwrap();
        assert!(host.registry().snapshot().get(chain.live_providers().next().unwrap().0).is_none());

        assert_eq!(
            host.script_tags(&chain, &snapshot),
            vec![
                "<script src=\"/annotators/par_annotate/providers/links/LinkProvider/script.js\"></script>"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_annotate_files_keeps_argument_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        fs::write(&a, "first\n").unwrap();
        fs::write(&b, "second\n").unwrap();
        let missing = dir.path().join("missing.log");

        let results = annotate_files(
            Arc::new(host()),
            vec![b.clone(), missing.clone(), a.clone()],
            0,
            OutputFormat::Ansi,
            None,
            None,
        )
        .await;
        assert_eq!(results[0].0, b);
        assert_eq!(results[0].1.as_ref().unwrap(), &vec!["second".to_string()]);
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1.as_ref().unwrap(), &vec!["first".to_string()]);
    }
}
