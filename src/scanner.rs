// scanner.rs - Scan Orchestration
// Purpose: Wire generator -> job queue -> worker pool -> result queue -> sink and join them in order

use crate::catalog::{PREFIXES, load_payloads};
use crate::config::{ProbeMode, ScanConfig};
use crate::filter::FilterEngine;
use crate::jobs::JobSpace;
use crate::limiter::RateLimiter;
use crate::output::ResultSink;
use crate::probe::{Prober, RequestStrategy};
use crate::stats::{ScanStats, ScanSummary};
use crate::worker::{WorkerContext, WorkerPool};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct Scanner {
    prober: Arc<dyn Prober>,
    filters: FilterEngine,
    limiter: RateLimiter,
    space: JobSpace,
    concurrency: usize,
    queue_capacity: usize,
    provider_domain: String,
    output_file: PathBuf,
    verbose: bool,
    show_progress: bool,
    probe_mode: ProbeMode,
}

impl Scanner {
    /// Production scanner backed by the shared reqwest client
    pub fn new(config: &ScanConfig, targets: Vec<String>) -> Result<Self, ScanError> {
        let strategy = RequestStrategy::from_config(config)?;
        Ok(Self::with_prober(config, targets, Arc::new(strategy)))
    }

    /// Scanner driven by any prober (mock transports in tests)
    pub fn with_prober(config: &ScanConfig, targets: Vec<String>, prober: Arc<dyn Prober>) -> Self {
        let payloads = load_payloads(config.wordlist.as_deref());
        let prefixes = PREFIXES.iter().map(|p| p.to_string()).collect();
        Self::with_job_space(config, JobSpace::new(targets, prefixes, payloads), prober)
    }

    pub fn with_job_space(config: &ScanConfig, space: JobSpace, prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            filters: FilterEngine::from_specs(&config.filters, config.probe_mode),
            limiter: RateLimiter::new(config.delay_ms),
            space,
            concurrency: config.concurrency.max(1),
            queue_capacity: config.queue_capacity(),
            provider_domain: config.provider_domain.clone(),
            output_file: config.output_file.clone(),
            verbose: config.verbose,
            show_progress: config.show_progress,
            probe_mode: config.probe_mode,
        }
    }

    pub fn total_jobs(&self) -> u64 {
        self.space.total()
    }

    pub fn probe_mode(&self) -> ProbeMode {
        self.probe_mode
    }

    pub fn filters(&self) -> &FilterEngine {
        &self.filters
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress || self.verbose {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");

        let bar = ProgressBar::new(self.total_jobs());
        bar.set_style(style);
        bar
    }

    /// Scan the whole job space. Returns after the sink has been joined.
    pub async fn run(self) -> ScanSummary {
        let start = Instant::now();
        let total_jobs = self.total_jobs();
        let progress = self.progress_bar();
        let stats = Arc::new(ScanStats::default());

        let (job_tx, job_rx) = mpsc::channel(self.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.queue_capacity);

        let sink = ResultSink::start(self.output_file.clone(), result_rx, progress.clone());
        let generator = tokio::spawn(self.space.feed(job_tx));

        let pool = WorkerPool::new(WorkerContext {
            prober: self.prober,
            filters: self.filters,
            limiter: self.limiter,
            provider_domain: self.provider_domain,
            verbose: self.verbose,
            stats: Arc::clone(&stats),
            progress: progress.clone(),
        });

        debug!(total_jobs, workers = self.concurrency, "scan started");
        pool.run(self.concurrency, job_rx, result_tx).await;

        let generated = match generator.await {
            Ok(sent) => sent,
            Err(e) => {
                error!(error = %e, "job generator failed");
                0
            }
        };

        let report = sink.wait().await;
        progress.finish_and_clear();

        ScanSummary {
            total_jobs,
            generated,
            probed: stats.probed(),
            transport_errors: stats.transport_errors(),
            filtered: stats.filtered(),
            findings: stats.hits(),
            written: report.written,
            output_ok: report.file_ok,
            elapsed: start.elapsed(),
        }
    }
}
