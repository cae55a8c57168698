// main.rs - S3Hunter v2.0 - Public Bucket Object Enumeration
// Purpose: CLI front end: parse flags, load targets, run the scanner, print the summary
// License: MIT

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use s3hunter::config::{
    DEFAULT_DELAY_MS, DEFAULT_OUTPUT_FILE, DEFAULT_PROVIDER_DOMAIN, DEFAULT_THREAD_COUNT, DEFAULT_TIMEOUT_SECS,
    FilterSpecs, ProbeMode, ScanConfig, UserAgentPolicy,
};
use s3hunter::scanner::Scanner;
use s3hunter::stats::ScanSummary;
use s3hunter::targets::{extract_targets, read_lines};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// S3Hunter - probe public buckets for exposed secrets, configs and backups
#[derive(Parser, Debug)]
#[command(
    name = "s3hunter",
    version = "2.0.0",
    about = "Enumerate readable objects in publicly addressable S3 buckets",
    long_about = r#"
S3Hunter probes every bucket with a catalog of key prefixes and sensitive
filenames (.env, credentials, SQL dumps, terraform state, ...) and reports
objects that answer 200.

  EXAMPLES:
    s3hunter -u https://acme-assets.s3.amazonaws.com
    s3hunter -l buckets.txt -t 200 --delay 50 -o hits.txt
    s3hunter -l buckets.txt -g --fw 0 --fc 403,404
"#
)]
struct Args {
    // ═══════════════════════════════════════════════════════════════════════════
    // TARGET OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File with bucket URLs or names (one per line, # for comments)
    #[arg(short, long, value_name = "FILE", help_heading = "Target Options")]
    list: Option<PathBuf>,

    /// Single bucket URL or name
    #[arg(short, long, value_name = "URL", help_heading = "Target Options")]
    url: Option<String>,

    /// Provider domain used to build virtual-hosted bucket URLs.
    /// Input URLs are only parsed for *.s3.amazonaws.com; give other providers' buckets as plain names
    #[arg(long, default_value = DEFAULT_PROVIDER_DOMAIN, value_name = "DOMAIN", help_heading = "Target Options")]
    domain: String,

    /// Custom payload wordlist (falls back to the built-in catalog if unreadable)
    #[arg(short, long, value_name = "FILE", help_heading = "Target Options")]
    wordlist: Option<PathBuf>,

    // ═══════════════════════════════════════════════════════════════════════════
    // FILTER OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Filter HTTP status codes (e.g. 404,403)
    #[arg(long = "fc", value_name = "CODES", default_value = "", help_heading = "Filters")]
    filter_code: String,

    /// Filter HTTP response sizes (e.g. 0,1024)
    #[arg(long = "fs", value_name = "SIZES", default_value = "", help_heading = "Filters")]
    filter_size: String,

    /// Filter by amount of words (needs -g to be meaningful)
    #[arg(long = "fw", value_name = "WORDS", default_value = "", help_heading = "Filters")]
    filter_word: String,

    /// Filter by amount of lines (needs -g to be meaningful)
    #[arg(long = "fl", value_name = "LINES", default_value = "", help_heading = "Filters")]
    filter_line: String,

    // ═══════════════════════════════════════════════════════════════════════════
    // REQUEST OPTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Use GET and analyse the body (word/line counts) instead of HEAD
    #[arg(short = 'g', long = "get", help_heading = "Requests")]
    full_body: bool,

    /// Fixed User-Agent (default: rotate common browser agents)
    #[arg(long, value_name = "UA", help_heading = "Requests")]
    user_agent: Option<String>,

    /// Skip TLS certificate verification (self-signed or misconfigured endpoints)
    #[arg(long, help_heading = "Requests")]
    insecure: bool,

    // ═══════════════════════════════════════════════════════════════════════════
    // PERFORMANCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = DEFAULT_THREAD_COUNT, value_name = "NUM", help_heading = "Performance")]
    threads: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_name = "SECONDS", help_heading = "Performance")]
    timeout: u64,

    /// Base delay between requests per worker, in milliseconds (+/- 10% jitter)
    #[arg(long, default_value_t = DEFAULT_DELAY_MS, value_name = "MS", help_heading = "Performance")]
    delay: u64,

    // ═══════════════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Output file for findings
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE, value_name = "FILE", help_heading = "Output")]
    output: PathBuf,

    /// Print every probe result to stderr (debug mode)
    #[arg(short, long, help_heading = "Output")]
    verbose: bool,

    /// Disable the progress bar
    #[arg(long, help_heading = "Output")]
    no_progress: bool,
}

impl Args {
    fn into_config(self) -> ScanConfig {
        ScanConfig {
            list_file: self.list,
            single_url: self.url,
            output_file: self.output,
            concurrency: self.threads,
            timeout_secs: self.timeout,
            delay_ms: self.delay,
            verbose: self.verbose,
            wordlist: self.wordlist,
            filters: FilterSpecs {
                codes: self.filter_code,
                sizes: self.filter_size,
                words: self.filter_word,
                lines: self.filter_line,
            },
            probe_mode: if self.full_body { ProbeMode::Get } else { ProbeMode::Head },
            provider_domain: self.domain,
            user_agent: self.user_agent.map(UserAgentPolicy::Fixed).unwrap_or_default(),
            insecure: self.insecure,
            show_progress: !self.no_progress,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config();
    init_tracing(config.verbose);

    if let Err(e) = config.validate() {
        eprintln!("{}", format!("❌ Error loading config: {}", e).red().bold());
        std::process::exit(1);
    }

    let targets = match load_targets(&config) {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("{}", format!("❌ Error reading input file: {:#}", e).red().bold());
            std::process::exit(1);
        }
    };

    if targets.is_empty() {
        println!("{}", "⚠️ No valid buckets found in input.".yellow());
        return Ok(());
    }

    let scanner = Scanner::new(&config, targets.clone()).context("Failed to initialise scanner")?;

    print_banner();
    print_scan_plan(&config, &scanner, targets.len());

    let summary = scanner.run().await;
    print_summary(&summary, &config);

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "s3hunter=debug" } else { "s3hunter=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// List-file lines first, then the single URL
fn load_targets(config: &ScanConfig) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    if let Some(ref path) = config.list_file {
        lines.extend(read_lines(path)?);
    }
    if let Some(ref url) = config.single_url {
        lines.push(url.trim().to_string());
    }

    Ok(extract_targets(&lines))
}

fn print_banner() {
    println!("{}", "═══════════════════════════════════════════════════════════════".cyan().bold());
    println!("{}", "  🔥 S3Hunter v2.0 - Public Bucket Object Enumeration".white().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".cyan().bold());
}

fn print_scan_plan(config: &ScanConfig, scanner: &Scanner, bucket_count: usize) {
    let mode = match config.probe_mode {
        ProbeMode::Head => "HEAD".cyan().to_string(),
        ProbeMode::Get => "GET (body analysis)".yellow().to_string(),
    };

    println!("{}", format!("📦 Buckets: {} | 🧵 Threads: {}", bucket_count, config.concurrency).cyan());
    println!("{}", format!("🎯 Jobs: {} | Mode: {}", scanner.total_jobs(), mode).cyan());
    if config.delay_ms > 0 {
        println!("{}", format!("⏱️  Delay: {}ms (+/- 10% jitter)", config.delay_ms).cyan());
    }
    if config.insecure {
        println!("{}", "⚠️  TLS certificate verification disabled".yellow());
    }
    if config.probe_mode == ProbeMode::Head && scanner.filters().has_body_axes() {
        println!(
            "{}",
            "⚠️  --fw/--fl without -g: word and line counts are always 0 under HEAD".yellow()
        );
    }
    println!("{}", "--------------------------------------------------".cyan());
}

fn print_summary(summary: &ScanSummary, config: &ScanConfig) {
    println!();
    println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
    println!("{}", "  SCAN SUMMARY".yellow().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
    print!("{}", summary.text().cyan());

    if summary.findings > 0 {
        println!("{}", format!("🚨 {} readable objects found", summary.findings).green().bold());
    }
    if !summary.output_ok {
        println!(
            "{}",
            format!("⚠️  Output file {} could not be written; findings above are console-only", config.output_file.display()).yellow()
        );
    }

    println!(
        "{}",
        format!(
            "\n🏁 Scan completed in {:.2?}. Check '{}'.",
            summary.elapsed,
            config.output_file.display()
        )
        .green()
        .bold()
    );
}
