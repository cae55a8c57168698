// probe.rs - HTTP Probe Strategies
// Purpose: Issue one request per candidate object and reduce the response to a ProbeResult
//  - HEAD: status + Content-Length only (fast, no body)
//  - GET: additionally word/line counts over the first 1 MiB of the body

use crate::config::{DEFAULT_IDLE_TIMEOUT_SECS, ProbeMode, ScanConfig, UserAgentPolicy};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upper bound on body bytes analysed per GET probe
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Browser User-Agents rotated per request
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// What one HTTP round trip told us about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub status_code: u16,
    /// Content-Length header, `-1` when absent
    pub content_length: i64,
    pub word_count: usize,
    pub line_count: usize,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// One request per call, no retries.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResult, TransportError>;
}

/// Build the client shared by every worker.
///
/// Certificate verification is only disabled when `insecure` was requested.
pub fn build_client(config: &ScanConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_idle_timeout(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(config.concurrency)
        .danger_accept_invalid_certs(config.insecure)
        .build()
}

fn pick_user_agent(policy: &UserAgentPolicy) -> &str {
    match policy {
        UserAgentPolicy::Fixed(agent) => agent.as_str(),
        UserAgentPolicy::Rotate => USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(crate::config::DEFAULT_USER_AGENT),
    }
}

fn header_content_length(headers: &HeaderMap) -> i64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(-1)
}

// ═══════════════════════════════════════════════════════════════════════════
// HEAD
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct HeadProbe {
    client: Client,
    user_agent: UserAgentPolicy,
}

impl HeadProbe {
    pub fn new(client: Client, user_agent: UserAgentPolicy) -> Self {
        Self { client, user_agent }
    }
}

#[async_trait]
impl Prober for HeadProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResult, TransportError> {
        let response = self
            .client
            .head(url)
            .header(USER_AGENT, pick_user_agent(&self.user_agent))
            .send()
            .await?;

        Ok(ProbeResult {
            status_code: response.status().as_u16(),
            content_length: header_content_length(response.headers()),
            word_count: 0,
            line_count: 0,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// GET
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct GetProbe {
    client: Client,
    user_agent: UserAgentPolicy,
}

impl GetProbe {
    pub fn new(client: Client, user_agent: UserAgentPolicy) -> Self {
        Self { client, user_agent }
    }
}

#[async_trait]
impl Prober for GetProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResult, TransportError> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, pick_user_agent(&self.user_agent))
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let content_length = header_content_length(response.headers());

        let mut counter = BodyCounter::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if !counter.feed(&chunk) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // Keep whatever was counted before the body broke off.
                    debug!(url, error = %e, "body read error");
                    break;
                }
            }
        }
        let (word_count, line_count) = counter.finish();

        Ok(ProbeResult {
            status_code,
            content_length,
            word_count,
            line_count,
        })
    }
}

/// Streaming word/line counter over a capped body prefix.
///
/// Lines are `\n`-terminated (a trailing `\r` is dropped); a final
/// unterminated line still counts. Words are whitespace-delimited tokens.
#[derive(Debug)]
pub struct BodyCounter {
    pending: Vec<u8>,
    remaining: usize,
    words: usize,
    lines: usize,
}

impl Default for BodyCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyCounter {
    pub fn new() -> Self {
        Self::with_cap(MAX_BODY_SIZE)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            pending: Vec::new(),
            remaining: cap,
            words: 0,
            lines: 0,
        }
    }

    /// Feed the next chunk. Returns false once the cap has been reached.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        let take = chunk.len().min(self.remaining);
        self.remaining -= take;

        for piece in chunk[..take].split_inclusive(|&b| b == b'\n') {
            match piece.split_last() {
                Some((&b'\n', line)) => {
                    self.pending.extend_from_slice(line);
                    self.flush_line();
                }
                _ => self.pending.extend_from_slice(piece),
            }
        }

        self.remaining > 0
    }

    fn flush_line(&mut self) {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        self.lines += 1;
        self.words += String::from_utf8_lossy(&self.pending).split_whitespace().count();
        self.pending.clear();
    }

    /// `(word_count, line_count)`
    pub fn finish(mut self) -> (usize, usize) {
        if !self.pending.is_empty() {
            self.flush_line();
        }
        (self.words, self.lines)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STRATEGY SELECTION
// ═══════════════════════════════════════════════════════════════════════════

/// The probe used for a whole run, chosen once from the configured mode
#[derive(Debug, Clone)]
pub enum RequestStrategy {
    Head(HeadProbe),
    Get(GetProbe),
}

impl RequestStrategy {
    pub fn new(client: Client, mode: ProbeMode, user_agent: UserAgentPolicy) -> Self {
        match mode {
            ProbeMode::Head => RequestStrategy::Head(HeadProbe::new(client, user_agent)),
            ProbeMode::Get => RequestStrategy::Get(GetProbe::new(client, user_agent)),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(config)?;
        Ok(Self::new(client, config.probe_mode, config.user_agent.clone()))
    }

    pub fn mode(&self) -> ProbeMode {
        match self {
            RequestStrategy::Head(_) => ProbeMode::Head,
            RequestStrategy::Get(_) => ProbeMode::Get,
        }
    }
}

#[async_trait]
impl Prober for RequestStrategy {
    async fn probe(&self, url: &str) -> Result<ProbeResult, TransportError> {
        match self {
            RequestStrategy::Head(head) => head.probe(url).await,
            RequestStrategy::Get(get) => get.probe(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn count(chunks: &[&[u8]]) -> (usize, usize) {
        let mut counter = BodyCounter::new();
        for chunk in chunks {
            counter.feed(chunk);
        }
        counter.finish()
    }

    /// Serve one canned HTTP response and return the base URL
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    /// Local strategy that ignores any proxy set in the environment
    fn local_strategy(mode: ProbeMode) -> RequestStrategy {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap();
        RequestStrategy::new(client, mode, UserAgentPolicy::Fixed("s3hunter-test".to_string()))
    }

    #[test]
    fn test_counts_three_lines_seven_words() {
        assert_eq!(count(&[b"alpha beta\ngamma delta epsilon\nzeta eta\n"]), (7, 3));
    }

    #[test]
    fn test_unterminated_last_line_counts() {
        assert_eq!(count(&[b"one two\nthree"]), (3, 2));
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        assert_eq!(count(&[b"a b\r\n\r\n  c  \r\n"]), (3, 3));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(count(&[]), (0, 0));
        assert_eq!(count(&[b""]), (0, 0));
    }

    #[test]
    fn test_words_split_across_chunks() {
        assert_eq!(count(&[b"hel", b"lo wor", b"ld\nbye"]), (3, 2));
    }

    #[test]
    fn test_cap_truncates_body() {
        let mut counter = BodyCounter::with_cap(8);
        assert!(!counter.feed(b"one two three\nfour\n"));
        // only "one two " survives the cap
        assert_eq!(counter.finish(), (2, 1));
    }

    #[test]
    fn test_strategy_follows_mode() {
        let client = Client::new();
        let head = RequestStrategy::new(client.clone(), ProbeMode::Head, UserAgentPolicy::Rotate);
        let get = RequestStrategy::new(client, ProbeMode::Get, UserAgentPolicy::Rotate);
        assert_eq!(head.mode(), ProbeMode::Head);
        assert_eq!(get.mode(), ProbeMode::Get);
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = ScanConfig {
            probe_mode: ProbeMode::Get,
            ..ScanConfig::default()
        };
        let strategy = RequestStrategy::from_config(&config).unwrap();
        assert_eq!(strategy.mode(), ProbeMode::Get);
    }

    #[test]
    fn test_fixed_user_agent() {
        let policy = UserAgentPolicy::Fixed("S3Hunter/2.0".to_string());
        assert_eq!(pick_user_agent(&policy), "S3Hunter/2.0");
        assert!(USER_AGENTS.contains(&pick_user_agent(&UserAgentPolicy::Rotate)));
    }

    #[tokio::test]
    async fn test_get_probe_counts_body() {
        let body = "alpha beta\ngamma delta epsilon\nzeta eta\n";
        let base = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let strategy = local_strategy(ProbeMode::Get);
        let result = strategy.probe(&format!("{}/.env", base)).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.content_length, body.len() as i64);
        assert_eq!(result.word_count, 7);
        assert_eq!(result.line_count, 3);
    }

    #[tokio::test]
    async fn test_head_probe_reads_headers_only() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 42\r\nConnection: close\r\n\r\n".to_string(),
        )
        .await;

        let strategy = local_strategy(ProbeMode::Head);
        let result = strategy.probe(&format!("{}/.env", base)).await.unwrap();

        assert_eq!(
            result,
            ProbeResult {
                status_code: 200,
                content_length: 42,
                word_count: 0,
                line_count: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let strategy = local_strategy(ProbeMode::Head);
        let result = strategy.probe(&format!("http://{}/.env", addr)).await;
        assert!(result.is_err());
    }
}
