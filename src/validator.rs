//! The orchestrator wrapping mock-producing call sites.
//!
//! Per validated call, strictly in order: produce mock → short-circuit checks
//! → compile matcher → load spec (cache or fetch) → resolve to exactly one
//! operation → decode body → validate → report/raise. Validation is a side
//! effect: the produced mock is handed back unchanged.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::SpecCache;
use crate::config::{GuardConfig, Reporter, ValidationPolicy};
use crate::error::SpecGuardError;
use crate::matcher::{compile_matcher, resolve, MockMatcher};
use crate::validate::check_response;

/// What the mocking layer's mock object must expose to be validated.
///
/// Implemented by a thin adapter over the host mocking framework. The
/// validator only reads through this interface and never mutates the mock.
pub trait MockHandle {
    /// The mock's route-matching rule.
    fn matcher(&self) -> MockMatcher;

    /// Raw response body bytes.
    fn body(&self) -> Vec<u8>;

    /// True when the response is a pass-through/relay: there is no literal
    /// body to validate structurally, so validation is skipped.
    fn is_relay(&self) -> bool {
        false
    }
}

/// Validates mocks produced at one call site against one spec location.
///
/// Built once per decorated call site; policy values are captured at build
/// time and never re-read from the config afterwards.
#[derive(Clone)]
pub struct SpecValidator {
    spec_url: Option<String>,
    call_site: String,
    policy: ValidationPolicy,
    cache: SpecCache,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for SpecValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecValidator")
            .field("spec_url", &self.spec_url)
            .field("call_site", &self.call_site)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Builder resolving per-call-site overrides against [`GuardConfig`] defaults.
pub struct SpecValidatorBuilder {
    config: GuardConfig,
    spec_url: Option<String>,
    call_site: String,
    strict: Option<bool>,
    force_strict: bool,
    raise_on_mismatch: Option<bool>,
    skip_if_spec_unavailable: Option<bool>,
    prefix: Option<String>,
}

impl SpecValidator {
    pub fn builder(config: GuardConfig) -> SpecValidatorBuilder {
        SpecValidatorBuilder {
            config,
            spec_url: None,
            call_site: "unnamed mock".to_string(),
            strict: None,
            force_strict: false,
            raise_on_mismatch: None,
            skip_if_spec_unavailable: None,
            prefix: None,
        }
    }

    /// Validate one produced mock. Returns `Ok(())` both on success and on
    /// every policy-sanctioned skip; the caller keeps its mock either way.
    pub async fn validate<M: MockHandle>(&self, mock: &M) -> Result<(), SpecGuardError> {
        let Some(spec_url) = &self.spec_url else {
            debug!(call_site = %self.call_site, "no spec location, validation disabled");
            return Ok(());
        };

        if mock.is_relay() {
            debug!(call_site = %self.call_site, "relay response, nothing to validate");
            return Ok(());
        }

        let external = mock.matcher();
        let Some(node) = compile_matcher(&external, self.policy.prefix.as_deref()) else {
            return Err(SpecGuardError::NoMatcher {
                call_site: self.call_site.clone(),
            });
        };

        let index = match self.cache.load(spec_url).await {
            Ok(index) => index,
            Err(err) if err.is_fetch() && self.policy.skip_if_spec_unavailable => {
                warn!(
                    call_site = %self.call_site,
                    error = %err,
                    "spec unavailable, returning mock unvalidated"
                );
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let record = resolve(&node, &index, spec_url, &self.call_site)?;
        debug!(
            call_site = %self.call_site,
            method = %record.method,
            path = %record.path,
            "matcher resolved to one spec operation"
        );

        let body: Value =
            serde_json::from_slice(&mock.body()).map_err(|e| SpecGuardError::BodyDecode {
                call_site: self.call_site.clone(),
                reason: e.to_string(),
            })?;

        match check_response(record, &body, &self.policy, spec_url, &self.call_site) {
            Ok(()) => Ok(()),
            Err(SpecGuardError::Mismatch { call_site, detail }) => {
                // reporting always happens; raising is a separate policy knob
                self.reporter.report(&call_site, &detail);
                if self.policy.raise_on_mismatch {
                    Err(SpecGuardError::Mismatch { call_site, detail })
                } else {
                    Ok(())
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Wrap an asynchronously-completing mock producer, returning its mock
    /// unchanged after validation.
    pub async fn checked<M, F, Fut>(&self, produce: F) -> Result<M, SpecGuardError>
    where
        M: MockHandle,
        F: FnOnce() -> Fut,
        Fut: Future<Output = M>,
    {
        let mock = produce().await;
        self.validate(&mock).await?;
        Ok(mock)
    }

    /// Wrap a synchronous mock producer from outside any async runtime.
    pub fn checked_blocking<M, F>(&self, produce: F) -> Result<M, SpecGuardError>
    where
        M: MockHandle,
        F: FnOnce() -> M,
    {
        let mock = produce();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SpecGuardError::Runtime)?;
        runtime.block_on(self.validate(&mock))?;
        Ok(mock)
    }
}

impl SpecValidatorBuilder {
    /// Spec location to validate against. Leaving it unset disables
    /// validation for this call site entirely.
    pub fn spec_url(mut self, url: impl Into<String>) -> Self {
        self.spec_url = Some(url.into());
        self
    }

    /// Name of the decorated call site, used in every report and error.
    pub fn call_site(mut self, name: impl Into<String>) -> Self {
        self.call_site = name.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn force_strict(mut self, force_strict: bool) -> Self {
        self.force_strict = force_strict;
        self
    }

    pub fn raise_on_mismatch(mut self, raise: bool) -> Self {
        self.raise_on_mismatch = Some(raise);
        self
    }

    pub fn skip_if_spec_unavailable(mut self, skip: bool) -> Self {
        self.skip_if_spec_unavailable = Some(skip);
        self
    }

    /// Mount prefix the mock's routes carry but the spec's paths do not.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> SpecValidator {
        let policy = ValidationPolicy {
            strict: self.strict.unwrap_or(self.config.strict),
            force_strict: self.force_strict,
            raise_on_mismatch: self.raise_on_mismatch.unwrap_or(self.config.raise_on_mismatch),
            skip_if_spec_unavailable: self
                .skip_if_spec_unavailable
                .unwrap_or(self.config.skip_if_spec_unavailable),
            prefix: self.prefix,
        };

        SpecValidator {
            cache: SpecCache::new(&self.config),
            reporter: self.config.reporter.clone(),
            spec_url: self.spec_url,
            call_site: self.call_site,
            policy,
        }
    }
}
