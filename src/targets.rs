// targets.rs - Bucket Name Extraction
// Purpose: Turn pasted URLs, tool output and raw names into a deduplicated target list

use crate::config::{MIN_BUCKET_NAME_LEN, PROTECTED_PREFIX, S3_URL_REGEX};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

static S3_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(S3_URL_REGEX).expect("S3 URL pattern is a valid regex"));

/// Read a list file, skipping blank lines and `#` comments.
/// Invalid UTF-8 is replaced rather than ending the read early.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut lines = Vec::new();
    for raw in reader.split(b'\n') {
        let raw = raw.context(format!("Failed to read {}", path.display()))?;
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            lines.push(line.to_string());
        }
    }

    Ok(lines)
}

/// Extract bucket names, keeping first-seen order.
/// Only `*.s3.amazonaws.com` URLs are recognised; anything else is
/// treated as a raw bucket name.
pub fn extract_targets(lines: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for line in lines {
        let captured = S3_URL.captures(line).and_then(|cap| cap.get(1));

        let name = match captured {
            Some(m) => Some(m.as_str().to_string()),
            None => parse_raw_name(line),
        };

        if let Some(name) = name {
            if seen.insert(name.clone()) {
                targets.push(name);
            }
        }
    }

    targets
}

fn parse_raw_name(line: &str) -> Option<String> {
    let cleaned = line.strip_prefix(PROTECTED_PREFIX).unwrap_or(line);

    if cleaned.contains(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    if cleaned.len() <= MIN_BUCKET_NAME_LEN {
        return None;
    }

    Some(cleaned.to_string())
}
