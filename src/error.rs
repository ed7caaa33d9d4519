//! Error types for spec-vs-mock validation.

use std::path::PathBuf;

/// Everything that can abort a validated mock call.
///
/// Only two conditions are non-fatal by policy: [`Fetch`](Self::Fetch) when the
/// call site opts into `skip_if_spec_unavailable`, and
/// [`Mismatch`](Self::Mismatch) unless `raise_on_mismatch` is set. Every other
/// variant signals a setup defect (broken spec, unsupported mock construction)
/// and always propagates.
#[derive(Debug, thiserror::Error)]
pub enum SpecGuardError {
    /// Spec unreachable: connect failure, timeout, or non-2xx status.
    #[error("Failed to fetch spec from {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Spec retrieved but not parseable as an OpenAPI document.
    #[error("Failed to parse spec from {url}: {reason}")]
    Parse { url: String, reason: String },

    /// The mock's matcher tree contained nothing resolvable to (method, path).
    #[error("There is no valid matcher in {call_site}")]
    NoMatcher { call_site: String },

    /// No spec operation matched the mock's matcher.
    #[error(
        "Mocked API method: '{matcher}'\nwas not found in the {spec_url} \
         for the validation of {call_site}.\nPresented units:\n{candidates}"
    )]
    NotFound {
        matcher: String,
        spec_url: String,
        call_site: String,
        candidates: String,
    },

    /// More than one spec operation matched; never resolved by priority.
    #[error(
        "Matcher '{matcher}' matched more than one operation in {spec_url} \
         for the validation of {call_site}:\n{matches}"
    )]
    Ambiguous {
        matcher: String,
        spec_url: String,
        call_site: String,
        matches: String,
    },

    /// The resolved operation declares no response schema to validate against.
    #[error(
        "API method '{method} {path}' in the {spec_url} lacks a response \
         structure for the validation of {call_site}"
    )]
    MissingSchema {
        method: String,
        path: String,
        spec_url: String,
        call_site: String,
    },

    /// The mock's response body is not valid JSON.
    #[error("JSON expected in response body of {call_site}: {reason}")]
    BodyDecode { call_site: String, reason: String },

    /// The decoded body violates the response schema under the active policy.
    #[error("There are some mismatches in {call_site}:\n{detail}")]
    Mismatch { call_site: String, detail: String },

    /// Cache directory or entry could not be read or written.
    #[error("Cache I/O failure at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking bridge could not construct its runtime.
    #[error("Failed to start blocking validation runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl SpecGuardError {
    /// True for the one condition `skip_if_spec_unavailable` may swallow.
    pub fn is_fetch(&self) -> bool {
        matches!(self, SpecGuardError::Fetch { .. })
    }
}
