//! Spec-vs-mock validation for contract and integration tests.
//!
//! This library keeps HTTP mock definitions consistent with the OpenAPI
//! contract they stand in for. A [`SpecValidator`] wraps a mock-producing
//! call site: it fetches and caches the spec, resolves the mock's
//! route-matching rule to exactly one spec operation, and validates the
//! mock's JSON response body against that operation's response schema. The
//! mock itself is returned unchanged; validation surfaces only through the
//! configured reporter and, by policy, raised errors.
//!
//! # Example
//!
//! ```no_run
//! use specguard::{GuardConfig, MockHandle, SpecValidator};
//!
//! # async fn example<M: MockHandle>(make_user_mock: impl FnOnce() -> M) {
//! let validator = SpecValidator::builder(GuardConfig::default())
//!     .spec_url("https://example.test/api/openapi.yml")
//!     .call_site("test_get_user")
//!     .strict(true)
//!     .raise_on_mismatch(true)
//!     .build();
//!
//! let mock = make_user_mock();
//! validator.validate(&mock).await.expect("mock drifted from the contract");
//! # }
//! ```

mod cache;
mod config;
mod error;
mod matcher;
mod normalize;
mod spec;
mod validate;
mod validator;

pub use cache::SpecCache;
pub use config::{ConsoleReporter, GuardConfig, Reporter, ValidationPolicy};
pub use error::SpecGuardError;
pub use matcher::{compile_matcher, resolve, MatcherNode, MockMatcher};
pub use normalize::normalize_path;
pub use spec::{OperationRecord, SpecIndex};
pub use validate::check_response;
pub use validator::{MockHandle, SpecValidator, SpecValidatorBuilder};
