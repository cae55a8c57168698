// output.rs - Result Sink
// Purpose: Single consumer that writes findings to the output file and the console

use colored::*;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub const RESULTS_HEADER: &str = "--- S3 SCAN RESULTS ---";

/// An object that answered with the success code and survived the filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub url: String,
    pub size: i64,
}

impl Finding {
    pub fn line(&self) -> String {
        format!("✅ [FOUND] {} (Size: {})", self.url, self.size)
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output file: {0}")]
    Write(#[from] io::Error),
}

/// The durable half of the sink. Flushed on close and, as a fallback, on drop.
struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|source| SinkError::Create {
            path: path.display().to_string(),
            source,
        })?;
        let mut sink = Self {
            writer: BufWriter::new(file),
        };
        sink.write_line(RESULTS_HEADER)?;
        Ok(sink)
    }

    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    fn close(mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// What the consumer managed to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    pub received: u64,
    pub written: u64,
    pub file_ok: bool,
}

/// Handle to the running consumer task
#[derive(Debug)]
pub struct ResultSink {
    handle: JoinHandle<SinkReport>,
}

impl ResultSink {
    /// Launch the consumer. It drains `results` until every sender is gone.
    ///
    /// A file that cannot be created or written is logged and dropped; the
    /// consumer keeps printing to the console so the scan is never blocked.
    pub fn start(path: PathBuf, results: mpsc::Receiver<Finding>, console: ProgressBar) -> Self {
        let handle = tokio::task::spawn_blocking(move || consume(&path, results, &console));
        Self { handle }
    }

    /// Block until the consumer has drained the queue and closed the file
    pub async fn wait(self) -> SinkReport {
        match self.handle.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "result sink task failed");
                SinkReport {
                    received: 0,
                    written: 0,
                    file_ok: false,
                }
            }
        }
    }
}

fn consume(path: &Path, mut results: mpsc::Receiver<Finding>, console: &ProgressBar) -> SinkReport {
    let mut file = match FileSink::create(path) {
        Ok(file) => Some(file),
        Err(e) => {
            error!(error = %e, "findings will only be shown on the console");
            None
        }
    };
    let mut file_ok = file.is_some();

    console.suspend(|| println!("{}", RESULTS_HEADER.bold()));

    let mut received = 0u64;
    let mut written = 0u64;

    while let Some(finding) = results.blocking_recv() {
        received += 1;
        let line = finding.line();

        console.suspend(|| println!("{}", line.green().bold()));

        let write_failed = match file.as_mut().map(|sink| sink.write_line(&line)) {
            Some(Ok(())) => {
                written += 1;
                false
            }
            Some(Err(e)) => {
                error!(url = %finding.url, error = %e, "failed to write finding");
                true
            }
            None => false,
        };
        if write_failed {
            file = None;
            file_ok = false;
        }
    }

    if let Some(sink) = file {
        if let Err(e) = sink.close() {
            error!(error = %e, "failed to flush output file");
            file_ok = false;
        }
    }

    debug!(received, written, "result sink finished");

    SinkReport {
        received,
        written,
        file_ok,
    }
}
