// jobs.rs - Job Space Generation
// Purpose: Lazy bucket × prefix × payload product fed into the bounded job queue

use tokio::sync::mpsc;
use tracing::debug;

/// One probe unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub target: String,
    pub prefix: String,
    pub payload: String,
}

impl Job {
    /// `https://{target}.{domain}/{prefix}{payload}`
    pub fn url(&self, provider_domain: &str) -> String {
        format!(
            "https://{}.{}/{}{}",
            self.target, provider_domain, self.prefix, self.payload
        )
    }
}

/// The full job space. Iterating it never mutates it, so it can be walked
/// any number of times in the same order.
#[derive(Debug, Clone)]
pub struct JobSpace {
    targets: Vec<String>,
    prefixes: Vec<String>,
    payloads: Vec<String>,
}

impl JobSpace {
    pub fn new(targets: Vec<String>, prefixes: Vec<String>, payloads: Vec<String>) -> Self {
        Self {
            targets,
            prefixes,
            payloads,
        }
    }

    /// Total number of jobs, known before anything is generated
    pub fn total(&self) -> u64 {
        self.targets.len() as u64 * self.prefixes.len() as u64 * self.payloads.len() as u64
    }

    /// Targets outermost, payloads innermost
    pub fn iter(&self) -> impl Iterator<Item = Job> + '_ {
        self.targets.iter().flat_map(move |target| {
            self.prefixes.iter().flat_map(move |prefix| {
                self.payloads.iter().map(move |payload| Job {
                    target: target.clone(),
                    prefix: prefix.clone(),
                    payload: payload.clone(),
                })
            })
        })
    }

    /// Push every job into the queue, suspending while it is full.
    /// Dropping the sender on return closes the queue for the workers.
    pub async fn feed(self, jobs: mpsc::Sender<Job>) -> u64 {
        let mut sent = 0u64;
        for job in self.iter() {
            if jobs.send(job).await.is_err() {
                debug!(sent, "job queue closed early, generator stopping");
                break;
            }
            sent += 1;
        }
        debug!(sent, "job generation complete");
        sent
    }
}
