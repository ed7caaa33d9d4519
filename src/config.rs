//! Process-wide defaults and the pluggable mismatch reporter.
//!
//! A [`GuardConfig`] is an explicit value handed to every validator builder,
//! not hidden global state: call sites capture the defaults they were built
//! with, so mutating a config afterwards never retroactively changes an
//! already-built validator.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Receives every schema mismatch, independent of whether it is also raised.
///
/// The default implementation logs through `tracing`; hosts that want
/// test-framework-native output (or to collect mismatches) supply their own.
pub trait Reporter: Send + Sync {
    fn report(&self, call_site: &str, message: &str);
}

/// Default reporter: a `tracing` warning naming the offending call site.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, call_site: &str, message: &str) {
        tracing::warn!("There are some mismatches in {call_site}:\n{message}");
    }
}

/// Per-call-site policy, resolved once at validator build time from explicit
/// overrides falling back to [`GuardConfig`] defaults. Immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ValidationPolicy {
    /// Full structural validation: extra and missing fields both fail.
    pub strict: bool,
    /// Rewrite the schema to exact-match form before either check.
    pub force_strict: bool,
    /// Escalate reported mismatches to raised errors.
    pub raise_on_mismatch: bool,
    /// Return the mock unvalidated when the spec cannot be fetched.
    pub skip_if_spec_unavailable: bool,
    /// Mount prefix stripped from the mock's own route before comparison.
    pub prefix: Option<String>,
}

/// Process-wide defaults, resolved into a per-call-site policy at build time.
#[derive(Clone)]
pub struct GuardConfig {
    /// Directory holding one cached parsed spec per spec location.
    pub cache_dir: PathBuf,
    /// Maximum age of a cached spec before it is deleted and refetched.
    pub cache_ttl: Duration,
    /// Bound on the single fetch attempt per cache miss.
    pub fetch_timeout: Duration,
    /// Default strictness for call sites that do not override it.
    pub strict: bool,
    /// Default raise-vs-report-only behavior for schema mismatches.
    pub raise_on_mismatch: bool,
    /// Default for returning the mock unvalidated when the spec is unreachable.
    pub skip_if_spec_unavailable: bool,
    /// Mismatch output channel.
    pub reporter: Arc<dyn Reporter>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            cache_dir: PathBuf::from("cache_parsed_specs"),
            cache_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(30),
            strict: false,
            raise_on_mismatch: false,
            skip_if_spec_unavailable: false,
            reporter: Arc::new(ConsoleReporter),
        }
    }
}

impl fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardConfig")
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl", &self.cache_ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("strict", &self.strict)
            .field("raise_on_mismatch", &self.raise_on_mismatch)
            .field("skip_if_spec_unavailable", &self.skip_if_spec_unavailable)
            .finish_non_exhaustive()
    }
}

impl GuardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_raise_on_mismatch(mut self, raise: bool) -> Self {
        self.raise_on_mismatch = raise;
        self
    }

    pub fn with_skip_if_spec_unavailable(mut self, skip: bool) -> Self {
        self.skip_if_spec_unavailable = skip;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }
}
