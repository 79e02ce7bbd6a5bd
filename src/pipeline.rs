//! Blocklist regeneration pipeline.
//!
//! A run goes through these stages, strictly in order:
//!
//! 1. take the run lock
//! 2. fetch and compile the allow-list
//! 3. for each deny-list: fetch, extract and filter zones, render directives
//! 4. promote the staged file over the destination
//! 5. unless in dry-run mode: check the configuration, then reload the resolver
//!
//! The first fatal error stops the run. The staged file and the lock are
//! released on every exit path.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, instrument};

use crate::blocklist::{AllowPatternSet, ExtractStats, RemoteLoader, ZoneExtractor};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::RunLock;
use crate::render::ConfigRenderer;
use crate::service::{CommandRunner, ConfigValidator, ServiceReloader};
use crate::writer::{AtomicConfigWriter, WriterError};

/// Outcome of one deny-list source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub url: String,
    pub stats: ExtractStats,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Path the configuration was written to.
    pub destination: PathBuf,
    /// Per-source counters, in configured order.
    pub sources: Vec<SourceReport>,
    /// Whether the checker and the reload were run.
    pub reloaded: bool,
}

impl RunReport {
    /// Total number of directives written.
    #[must_use]
    pub fn directives(&self) -> usize {
        self.sources.iter().map(|s| s.stats.accepted).sum()
    }
}

/// Regenerates the resolver blocklist.
pub struct Pipeline<R> {
    config: Config,
    loader: RemoteLoader,
    validator: ConfigValidator,
    reloader: ServiceReloader,
    runner: R,
}

impl<R: CommandRunner> Pipeline<R> {
    /// Create a pipeline for `config`, running external commands with `runner`.
    pub fn new(config: Config, runner: R) -> Result<Self> {
        let loader = RemoteLoader::new(config.http_timeout())?;
        Ok(Self {
            validator: ConfigValidator::new(config.check_command.clone()),
            reloader: ServiceReloader::new(config.reload_command.clone()),
            config,
            loader,
            runner,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline once.
    ///
    /// With `dry_run` set, the configuration is written to that path instead
    /// of the configured one and the resolver is neither checked nor reloaded.
    #[instrument(skip_all, fields(dry_run = ?dry_run))]
    pub async fn run(&self, dry_run: Option<&Path>) -> Result<RunReport> {
        let destination = dry_run.map_or_else(|| self.config.config_path.clone(), Path::to_path_buf);

        let _lock = if self.config.run_lock {
            Some(RunLock::acquire(RunLock::path_for(&destination))?)
        } else {
            None
        };

        let allow = self.fetch_allow_patterns().await?;

        let mut writer = AtomicConfigWriter::create(&destination, self.config.file_mode)?;
        let sources = self.render_sources(&mut writer, &allow).await?;

        let check_staged = dry_run.is_none() && self.config.validate_before_promote;
        if check_staged {
            let staged = writer.seal()?;
            self.validator
                .check(&self.runner, staged)
                .await
                .map_err(Error::Validation)?;
        }

        writer.finish()?;

        let report = RunReport {
            destination,
            sources,
            reloaded: dry_run.is_none(),
        };
        info!(
            path = %report.destination.display(),
            directives = report.directives(),
            "installed blocklist configuration"
        );

        if dry_run.is_some() {
            info!("dry run, skipping configuration check and reload");
            return Ok(report);
        }

        if !check_staged {
            self.validator
                .check(&self.runner, &report.destination)
                .await
                .map_err(Error::Validation)?;
        }
        self.reloader
            .reload(&self.runner)
            .await
            .map_err(Error::Reload)?;

        Ok(report)
    }

    async fn fetch_allow_patterns(&self) -> Result<AllowPatternSet> {
        let url = &self.config.allow_patterns_url;
        let body = self.loader.fetch(url).await?;
        let allow = AllowPatternSet::parse(&mut body.as_bytes())?;
        info!(url = %url, count = allow.len(), "loaded allow patterns");
        Ok(allow)
    }

    async fn render_sources(
        &self,
        writer: &mut AtomicConfigWriter,
        allow: &AllowPatternSet,
    ) -> Result<Vec<SourceReport>> {
        let mut renderer = ConfigRenderer::new(writer);
        renderer
            .header(&Local::now())
            .map_err(WriterError::Write)?;

        let mut reports = Vec::with_capacity(self.config.deny_hosts_urls.len());
        for url in &self.config.deny_hosts_urls {
            let body = self.loader.fetch(url).await?;
            renderer.begin_source(url).map_err(WriterError::Write)?;

            let mut zones = ZoneExtractor::new(body.lines(), url, allow);
            for zone in zones.by_ref() {
                renderer.directive(&zone).map_err(WriterError::Write)?;
            }

            let stats = zones.stats();
            info!(
                url = %url,
                accepted = stats.accepted,
                allowed = stats.allowed,
                rejected = stats.rejected,
                "processed deny-list"
            );
            reports.push(SourceReport {
                url: url.clone(),
                stats,
            });
        }

        Ok(reports)
    }
}
