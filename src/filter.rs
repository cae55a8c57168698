// filter.rs - Response Filtering
// Purpose: ffuf-style suppression of probe results by status, size, words and lines

use crate::config::{FilterSpecs, ProbeMode};
use crate::probe::ProbeResult;
use std::collections::HashSet;
use std::num::ParseIntError;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
#[error("invalid integer '{token}' in filter list: {source}")]
pub struct FilterParseError {
    pub token: String,
    #[source]
    pub source: ParseIntError,
}

/// Membership set over integers. Empty means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerSet {
    values: HashSet<i64>,
}

impl IntegerSet {
    /// Parse `"200, 403,,500"`-style input. Blank tokens are skipped and the
    /// first non-numeric token fails the whole list.
    pub fn parse(input: &str) -> Result<Self, FilterParseError> {
        let mut values = HashSet::new();

        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let value = token.parse::<i64>().map_err(|source| FilterParseError {
                token: token.to_string(),
                source,
            })?;
            values.insert(value);
        }

        Ok(Self { values })
    }

    pub fn contains(&self, value: i64) -> bool {
        self.values.contains(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Decides which completed probes are hidden from output.
///
/// Word and line counts are only populated by GET probes. Under HEAD they are
/// always zero, so `-fw`/`-fl` then only test for "empty interpreted body":
/// `-fw 0` suppresses every HEAD result.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    pub codes: IntegerSet,
    pub sizes: IntegerSet,
    pub words: IntegerSet,
    pub lines: IntegerSet,
}

impl FilterEngine {
    /// True when the result matches any configured axis
    pub fn should_skip(&self, result: &ProbeResult) -> bool {
        if !self.codes.is_empty() && self.codes.contains(i64::from(result.status_code)) {
            return true;
        }
        if !self.sizes.is_empty() && self.sizes.contains(result.content_length) {
            return true;
        }
        if !self.words.is_empty() && self.words.contains(result.word_count as i64) {
            return true;
        }
        if !self.lines.is_empty() && self.lines.contains(result.line_count as i64) {
            return true;
        }
        false
    }

    pub fn is_unconstrained(&self) -> bool {
        self.codes.is_empty() && self.sizes.is_empty() && self.words.is_empty() && self.lines.is_empty()
    }

    pub fn has_body_axes(&self) -> bool {
        !self.words.is_empty() || !self.lines.is_empty()
    }

    /// Build from raw specs, warning when body filters meet HEAD probing
    pub fn from_specs(specs: &FilterSpecs, mode: ProbeMode) -> Self {
        let engine = FilterBuilder::new()
            .with_codes(&specs.codes)
            .with_sizes(&specs.sizes)
            .with_words(&specs.words)
            .with_lines(&specs.lines)
            .build();

        if mode == ProbeMode::Head && engine.has_body_axes() {
            warn!(
                "word/line filters are set with HEAD probing; counts are always 0 without -g, \
                 so these filters only match empty bodies"
            );
        }

        engine
    }
}

/// Collects per-axis parse failures instead of aborting. A failed axis
/// stays unconstrained and the failure is reported once in `build`.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    codes: IntegerSet,
    sizes: IntegerSet,
    words: IntegerSet,
    lines: IntegerSet,
    errors: Vec<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_axis(&mut self, flag: &str, input: &str) -> IntegerSet {
        match IntegerSet::parse(input) {
            Ok(set) => set,
            Err(e) => {
                self.errors.push(format!("{} '{}': {}", flag, input, e));
                IntegerSet::default()
            }
        }
    }

    pub fn with_codes(mut self, input: &str) -> Self {
        self.codes = self.parse_axis("-fc", input);
        self
    }

    pub fn with_sizes(mut self, input: &str) -> Self {
        self.sizes = self.parse_axis("-fs", input);
        self
    }

    pub fn with_words(mut self, input: &str) -> Self {
        self.words = self.parse_axis("-fw", input);
        self
    }

    pub fn with_lines(mut self, input: &str) -> Self {
        self.lines = self.parse_axis("-fl", input);
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn build(self) -> FilterEngine {
        if !self.errors.is_empty() {
            warn!(
                count = self.errors.len(),
                details = %self.errors.join("; "),
                "ignoring malformed filters"
            );
        }

        FilterEngine {
            codes: self.codes,
            sizes: self.sizes,
            words: self.words,
            lines: self.lines,
        }
    }
}
