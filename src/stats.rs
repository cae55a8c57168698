// stats.rs - Scan Statistics
// Purpose: Lock-free counters shared by workers and the end-of-scan summary

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by every worker
#[derive(Debug, Default)]
pub struct ScanStats {
    probed: AtomicU64,
    transport_errors: AtomicU64,
    filtered: AtomicU64,
    hits: AtomicU64,
}

impl ScanStats {
    pub fn record_probe(&self) {
        self.probed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probed(&self) -> u64 {
        self.probed.load(Ordering::Relaxed)
    }

    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Final figures for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub total_jobs: u64,
    pub generated: u64,
    pub probed: u64,
    pub transport_errors: u64,
    pub filtered: u64,
    pub findings: u64,
    /// Findings that reached the output file
    pub written: u64,
    pub output_ok: bool,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn text(&self) -> String {
        format!(
            "Jobs: {}/{}\nProbed: {}\nTransport errors: {}\nFiltered: {}\nFound: {}\nElapsed: {:.2?}\n",
            self.generated,
            self.total_jobs,
            self.probed,
            self.transport_errors,
            self.filtered,
            self.findings,
            self.elapsed
        )
    }
}
