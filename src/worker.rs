// worker.rs - Worker Pool
// Purpose: N tasks draining the shared job queue: delay -> probe -> filter -> emit

use crate::config::SUCCESS_CODE;
use crate::filter::FilterEngine;
use crate::jobs::Job;
use crate::limiter::RateLimiter;
use crate::output::Finding;
use crate::probe::{ProbeResult, Prober};
use crate::stats::ScanStats;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Everything a worker reads while processing jobs. Shared read-only.
pub struct WorkerContext {
    pub prober: Arc<dyn Prober>,
    pub filters: FilterEngine,
    pub limiter: RateLimiter,
    pub provider_domain: String,
    pub verbose: bool,
    pub stats: Arc<ScanStats>,
    pub progress: ProgressBar,
}

/// ffuf-style per-probe line for the diagnostic stream
pub fn diagnostic_line(job: &Job, result: &ProbeResult, url: &str) -> String {
    format!(
        "{} [Status: {}, Size: {}, Words: {}, Lines: {}]   {}",
        job.payload, result.status_code, result.content_length, result.word_count, result.line_count, url
    )
}

pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
}

impl WorkerPool {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Run exactly `concurrency` workers until the job queue is closed and
    /// drained. Returns only after every worker has exited; the result
    /// queue closes when the last sender clone is dropped here.
    pub async fn run(&self, concurrency: usize, jobs: mpsc::Receiver<Job>, results: mpsc::Sender<Finding>) {
        let jobs = Arc::new(Mutex::new(jobs));
        let mut handles = Vec::with_capacity(concurrency);

        for worker_id in 0..concurrency {
            let ctx = Arc::clone(&self.ctx);
            let jobs = Arc::clone(&jobs);
            let results = results.clone();

            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, ctx, jobs, results).await;
            }));
        }
        drop(results);

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    ctx: Arc<WorkerContext>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    results: mpsc::Sender<Finding>,
) {
    debug!(worker_id, "worker started");
    let mut processed = 0u64;

    loop {
        let job = {
            let mut rx = jobs.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        processed += 1;
        if let Some(finding) = process_job(&ctx, job).await {
            if results.send(finding).await.is_err() {
                warn!(worker_id, "result queue closed, finding dropped");
            }
        }
    }

    debug!(worker_id, processed, "worker finished");
}

/// Zero or one finding per job. Transport failures drop the job.
pub async fn process_job(ctx: &WorkerContext, job: Job) -> Option<Finding> {
    ctx.limiter.wait().await;

    let url = job.url(&ctx.provider_domain);
    let outcome = ctx.prober.probe(&url).await;

    ctx.stats.record_probe();
    ctx.progress.inc(1);

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            ctx.stats.record_transport_error();
            debug!(url = %url, error = %e, "probe failed");
            return None;
        }
    };

    if ctx.filters.should_skip(&result) {
        ctx.stats.record_filtered();
        return None;
    }

    if ctx.verbose {
        eprintln!("{}", diagnostic_line(&job, &result, &url));
    }

    if result.status_code != SUCCESS_CODE {
        return None;
    }

    ctx.stats.record_hit();
    Some(Finding {
        url,
        size: result.content_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterBuilder;
    use crate::probe::TransportError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned responses keyed by URL; anything else is a 404
    struct MapProber {
        responses: HashMap<String, ProbeResult>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for MapProber {
        async fn probe(&self, url: &str) -> Result<ProbeResult, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("unreachable") {
                return Err(TransportError::Connect(url.to_string()));
            }
            Ok(self.responses.get(url).copied().unwrap_or(ProbeResult {
                status_code: 404,
                content_length: 0,
                word_count: 0,
                line_count: 0,
            }))
        }
    }

    fn ok(size: i64) -> ProbeResult {
        ProbeResult {
            status_code: 200,
            content_length: size,
            word_count: 0,
            line_count: 0,
        }
    }

    fn context(responses: &[(&str, ProbeResult)], filters: FilterEngine) -> (WorkerContext, Arc<MapProber>) {
        let prober = Arc::new(MapProber {
            responses: responses.iter().map(|(u, r)| (u.to_string(), *r)).collect(),
            calls: AtomicUsize::new(0),
        });
        let ctx = WorkerContext {
            prober: prober.clone(),
            filters,
            limiter: RateLimiter::new(0),
            provider_domain: "s3.amazonaws.com".to_string(),
            verbose: false,
            stats: Arc::new(ScanStats::default()),
            progress: ProgressBar::hidden(),
        };
        (ctx, prober)
    }

    fn job(target: &str, prefix: &str, payload: &str) -> Job {
        Job {
            target: target.to_string(),
            prefix: prefix.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_diagnostic_line_format() {
        let result = ProbeResult {
            status_code: 403,
            content_length: 243,
            word_count: 4,
            line_count: 2,
        };
        assert_eq!(
            diagnostic_line(&job("b", "", ".env"), &result, "https://b.s3.amazonaws.com/.env"),
            ".env [Status: 403, Size: 243, Words: 4, Lines: 2]   https://b.s3.amazonaws.com/.env"
        );
    }

    #[tokio::test]
    async fn test_success_becomes_finding() {
        let (ctx, _) = context(&[("https://bucket1.s3.amazonaws.com/.env", ok(42))], FilterEngine::default());

        let finding = process_job(&ctx, job("bucket1", "", ".env")).await;
        assert_eq!(
            finding,
            Some(Finding {
                url: "https://bucket1.s3.amazonaws.com/.env".to_string(),
                size: 42,
            })
        );
        assert_eq!(ctx.stats.hits(), 1);
    }

    #[tokio::test]
    async fn test_non_success_is_dropped() {
        let (ctx, _) = context(&[], FilterEngine::default());
        assert_eq!(process_job(&ctx, job("bucket1", "", ".env")).await, None);
        assert_eq!(ctx.stats.probed(), 1);
        assert_eq!(ctx.stats.hits(), 0);
    }

    #[tokio::test]
    async fn test_filtered_success_is_dropped() {
        let filters = FilterBuilder::new().with_sizes("42").build();
        let (ctx, _) = context(&[("https://bucket1.s3.amazonaws.com/.env", ok(42))], filters);

        assert_eq!(process_job(&ctx, job("bucket1", "", ".env")).await, None);
        assert_eq!(ctx.stats.filtered(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_fatal() {
        let (ctx, _) = context(&[], FilterEngine::default());
        assert_eq!(process_job(&ctx, job("unreachable", "", ".env")).await, None);
        assert_eq!(ctx.stats.transport_errors(), 1);
    }

    #[tokio::test]
    async fn test_pool_consumes_every_job_once() {
        let (ctx, prober) = context(
            &[
                ("https://alpha.s3.amazonaws.com/backup/db.sql", ok(7)),
                ("https://beta.s3.amazonaws.com/.env", ok(9)),
            ],
            FilterEngine::default(),
        );
        let stats = Arc::clone(&ctx.stats);
        let pool = WorkerPool::new(ctx);

        let (job_tx, job_rx) = mpsc::channel(4);
        let (result_tx, mut result_rx) = mpsc::channel::<Finding>(4);

        let generator = tokio::spawn(async move {
            for target in ["alpha", "beta", "unreachable"] {
                for prefix in ["", "backup/"] {
                    for payload in [".env", "db.sql"] {
                        job_tx.send(job(target, prefix, payload)).await.unwrap();
                    }
                }
            }
        });

        let collector = tokio::spawn(async move {
            let mut found = Vec::new();
            while let Some(finding) = result_rx.recv().await {
                found.push(finding.url);
            }
            found
        });

        pool.run(3, job_rx, result_tx).await;
        generator.await.unwrap();
        let mut found = collector.await.unwrap();
        found.sort();

        assert_eq!(
            found,
            vec![
                "https://alpha.s3.amazonaws.com/backup/db.sql",
                "https://beta.s3.amazonaws.com/.env",
            ]
        );
        assert_eq!(prober.calls.load(Ordering::SeqCst), 12);
        assert_eq!(stats.probed(), 12);
        assert_eq!(stats.transport_errors(), 4);
    }

    /// Holds every call open for a while and records the widest overlap seen
    struct SlowProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, _url: &str) -> Result<ProbeResult, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ok(1))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_runs_exactly_concurrency_workers() {
        let prober = Arc::new(SlowProber {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let stats = Arc::new(ScanStats::default());
        let pool = WorkerPool::new(WorkerContext {
            prober: prober.clone(),
            filters: FilterEngine::default(),
            limiter: RateLimiter::new(0),
            provider_domain: "s3.amazonaws.com".to_string(),
            verbose: false,
            stats: Arc::clone(&stats),
            progress: ProgressBar::hidden(),
        });

        let (job_tx, job_rx) = mpsc::channel(80);
        let (result_tx, mut result_rx) = mpsc::channel::<Finding>(80);

        for i in 0..40 {
            job_tx.send(job(&format!("bucket{}", i), "", ".env")).await.unwrap();
        }
        drop(job_tx);

        let collector = tokio::spawn(async move {
            let mut count = 0;
            while result_rx.recv().await.is_some() {
                count += 1;
            }
            count
        });

        pool.run(8, job_rx, result_tx).await;

        assert_eq!(collector.await.unwrap(), 40);
        assert_eq!(stats.probed(), 40);
        assert_eq!(prober.peak.load(Ordering::SeqCst), 8);
        assert_eq!(prober.in_flight.load(Ordering::SeqCst), 0);
    }
}
