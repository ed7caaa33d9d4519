//! Path canonicalization for comparing mock routes against spec routes.
//!
//! Mocks and specs author the same logical route independently: the mock may
//! mount internal `/__service__/` routing segments and name its path
//! parameters differently from the spec. Both sides are normalized to a
//! canonical form before any comparison.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical token every templated segment collapses to.
pub const TEMPLATE_TOKEN: &str = "{var}";

static INTERNAL_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/__[a-zA-Z0-9_]+__").expect("internal segment pattern is valid"));

static TEMPLATE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[a-zA-Z0-9_]+\}").expect("template segment pattern is valid"));

/// Normalize a path so independently authored routes become comparable.
///
/// Applied in order:
/// 1. internal mock-routing segments (`/__name__`) are removed, since they
///    are invisible to the real API surface;
/// 2. every templated segment (`{id}`, `{user_id}`, ...) collapses to
///    [`TEMPLATE_TOKEN`], so parameter names never affect equality.
///
/// Literal segment case is preserved; methods are case-folded elsewhere.
/// The function is idempotent.
pub fn normalize_path(path: &str) -> String {
    let stripped = INTERNAL_SEGMENT.replace_all(path, "");
    TEMPLATE_SEGMENT.replace_all(&stripped, TEMPLATE_TOKEN).into_owned()
}
