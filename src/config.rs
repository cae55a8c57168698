// config.rs - Scan Configuration
// Purpose: Defaults, tuning constants and the validated configuration handed to the engine

use std::path::{Path, PathBuf};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════

pub const DEFAULT_OUTPUT_FILE: &str = "found_secrets.txt";
pub const DEFAULT_THREAD_COUNT: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 6;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DELAY_MS: u64 = 0;

/// Both queues hold `concurrency * CHANNEL_BUFFER_MULTI` items.
pub const CHANNEL_BUFFER_MULTI: usize = 10;

/// Status code that marks an object as readable.
pub const SUCCESS_CODE: u16 = 200;

pub const DEFAULT_PROVIDER_DOMAIN: &str = "s3.amazonaws.com";
pub const DEFAULT_USER_AGENT: &str = "S3Hunter/2.0";

/// Prefix emitted by other tools for buckets that refused listing.
pub const PROTECTED_PREFIX: &str = "Protected S3 Bucket: ";
pub const MIN_BUCKET_NAME_LEN: usize = 3;
pub const S3_URL_REGEX: &str = r"http[s]?://([a-zA-Z0-9.-]+)\.s3\.amazonaws\.com";

/// Jitter is +/- this fraction of the base delay.
pub const JITTER_PERCENTAGE: f64 = 0.1;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("either -l (list file) or -u (single URL) must be provided")]
    MissingInput,
    #[error("input file does not exist: {0}")]
    InputFileNotFound(String),
    #[error("thread count must be positive")]
    NonPositiveConcurrency,
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
    #[error("provider domain must not be empty")]
    EmptyDomain,
}

/// Which HTTP method each probe uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// HEAD only: status and Content-Length, no body.
    #[default]
    Head,
    /// GET with body analysis (word and line counts).
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserAgentPolicy {
    /// Pick a browser User-Agent at random for every request.
    #[default]
    Rotate,
    Fixed(String),
}

/// Raw comma-separated filter specs, one per axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpecs {
    pub codes: String,
    pub sizes: String,
    pub words: String,
    pub lines: String,
}

impl FilterSpecs {
    pub fn uses_body_axes(&self) -> bool {
        !self.words.trim().is_empty() || !self.lines.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub list_file: Option<PathBuf>,
    pub single_url: Option<String>,
    pub output_file: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub delay_ms: u64,
    pub verbose: bool,
    pub wordlist: Option<PathBuf>,
    pub filters: FilterSpecs,
    pub probe_mode: ProbeMode,
    pub provider_domain: String,
    pub user_agent: UserAgentPolicy,
    /// Skip TLS certificate verification. Off unless explicitly requested.
    pub insecure: bool,
    pub show_progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            list_file: None,
            single_url: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            concurrency: DEFAULT_THREAD_COUNT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            delay_ms: DEFAULT_DELAY_MS,
            verbose: false,
            wordlist: None,
            filters: FilterSpecs::default(),
            probe_mode: ProbeMode::Head,
            provider_domain: DEFAULT_PROVIDER_DOMAIN.to_string(),
            user_agent: UserAgentPolicy::Rotate,
            insecure: false,
            show_progress: true,
        }
    }
}

impl ScanConfig {
    /// Checks everything that must hold before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_file.is_none() && self.single_url.is_none() {
            return Err(ConfigError::MissingInput);
        }
        if let Some(ref path) = self.list_file {
            if !Path::new(path).exists() {
                return Err(ConfigError::InputFileNotFound(path.display().to_string()));
            }
        }
        if self.concurrency == 0 {
            return Err(ConfigError::NonPositiveConcurrency);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.provider_domain.trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        Ok(())
    }

    pub fn queue_capacity(&self) -> usize {
        self.concurrency.max(1) * CHANNEL_BUFFER_MULTI
    }
}
