//! Matcher compilation and resolution against a spec index.
//!
//! The mocking layer owns its matcher vocabulary; this module decodes that
//! tree at the boundary into an owned [`MatcherNode`] union and evaluates it
//! against every (method, path) key of a [`SpecIndex`], demanding exactly one
//! match. The external tree is only read, never mutated or shared.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SpecGuardError;
use crate::normalize::{normalize_path, TEMPLATE_TOKEN};
use crate::spec::{OperationRecord, SpecIndex};

/// The mocking layer's matcher tree, as this crate consumes it.
///
/// Method equality, a route pattern, and the two combinators are the shapes
/// resolution understands. Anything else the mocking layer nests in its tree
/// (header matchers, query matchers, ...) decodes into [`Unsupported`] and is
/// skipped during compilation rather than silently matching everything.
///
/// [`Unsupported`]: MockMatcher::Unsupported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockMatcher {
    /// Equality check on the HTTP method.
    Method { expected: String },
    /// Route check on the request path.
    Route { path: String },
    /// Conjunction of sub-matchers.
    All {
        #[serde(rename = "all_of")]
        matchers: Vec<MockMatcher>,
    },
    /// Disjunction of sub-matchers.
    Any {
        #[serde(rename = "any_of")]
        matchers: Vec<MockMatcher>,
    },
    /// Any node shape this crate does not recognize.
    Unsupported(Value),
}

/// Compiled predicate over a spec index entry. Owned by this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherNode {
    /// Matches entries with this (uppercase) method.
    MethodEquals(String),
    /// Matches entries whose normalized path equals, or templated-accepts,
    /// this normalized mock path.
    RouteEquals(String),
    /// All children must match.
    AllOf(Vec<MatcherNode>),
    /// At least one child must match.
    AnyOf(Vec<MatcherNode>),
}

/// Compile the external tree into an owned predicate.
///
/// `prefix`, when set, is stripped from the mock's own route before
/// normalization, so mocks mounted under a path prefix compare correctly
/// against spec paths that exclude it. Unsupported children of a combinator
/// are skipped; a tree with nothing resolvable compiles to `None`.
pub fn compile_matcher(matcher: &MockMatcher, prefix: Option<&str>) -> Option<MatcherNode> {
    match matcher {
        MockMatcher::Method { expected } => {
            Some(MatcherNode::MethodEquals(expected.to_uppercase()))
        }
        MockMatcher::Route { path } => {
            let path = match prefix.and_then(|p| strip_route_prefix(path, p)) {
                Some(rest) => rest,
                None => path.as_str(),
            };
            Some(MatcherNode::RouteEquals(normalize_path(path)))
        }
        MockMatcher::All { matchers } => {
            let children: Vec<_> = matchers
                .iter()
                .filter_map(|m| compile_matcher(m, prefix))
                .collect();
            (!children.is_empty()).then_some(MatcherNode::AllOf(children))
        }
        MockMatcher::Any { matchers } => {
            let children: Vec<_> = matchers
                .iter()
                .filter_map(|m| compile_matcher(m, prefix))
                .collect();
            (!children.is_empty()).then_some(MatcherNode::AnyOf(children))
        }
        MockMatcher::Unsupported(_) => None,
    }
}

/// Strip `prefix` only on a segment boundary: the remainder must be empty or
/// start a new segment, so `/api` never bites into `/apiv2/users`.
fn strip_route_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

impl MatcherNode {
    /// Evaluate this predicate against one spec index key.
    pub fn matches(&self, method: &str, path: &str) -> bool {
        match self {
            MatcherNode::MethodEquals(expected) => expected.eq_ignore_ascii_case(method),
            MatcherNode::RouteEquals(mock_path) => {
                mock_path == path || template_accepts(path, mock_path)
            }
            MatcherNode::AllOf(children) => children.iter().all(|c| c.matches(method, path)),
            MatcherNode::AnyOf(children) => children.iter().any(|c| c.matches(method, path)),
        }
    }
}

/// Asymmetric route fallback: the spec's template accepts the mock's path.
///
/// Mocks are often written with concrete example values where the spec has a
/// parameter (`/2.0/42` against `/2.0/{id}`), so a spec placeholder segment
/// accepts any non-empty mock segment. A mock placeholder against a spec
/// literal does not match. Known to be asymmetric; carried deliberately.
fn template_accepts(spec_path: &str, mock_path: &str) -> bool {
    let spec_segments: Vec<&str> = spec_path.split('/').collect();
    let mock_segments: Vec<&str> = mock_path.split('/').collect();

    spec_segments.len() == mock_segments.len()
        && spec_segments.iter().zip(&mock_segments).all(|(spec, mock)| {
            if *spec == TEMPLATE_TOKEN {
                !mock.is_empty()
            } else {
                spec == mock
            }
        })
}

impl fmt::Display for MatcherNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherNode::MethodEquals(method) => write!(f, "method == {method}"),
            MatcherNode::RouteEquals(path) => write!(f, "route == {path}"),
            MatcherNode::AllOf(children) => {
                write!(f, "all(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            MatcherNode::AnyOf(children) => {
                write!(f, "any(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Resolve a compiled matcher to exactly one operation.
///
/// Zero matches and multiple matches are both failures: the former carries the
/// full unit listing for diagnosability, the latter is never broken by
/// priority or declaration order.
pub fn resolve<'a>(
    node: &MatcherNode,
    index: &'a SpecIndex,
    spec_url: &str,
    call_site: &str,
) -> Result<&'a OperationRecord, SpecGuardError> {
    let matched: Vec<&OperationRecord> = index
        .iter()
        .filter(|((method, path), _)| node.matches(method, path))
        .map(|(_, record)| record)
        .collect();

    match matched.as_slice() {
        [record] => Ok(record),
        [] => Err(SpecGuardError::NotFound {
            matcher: node.to_string(),
            spec_url: spec_url.to_string(),
            call_site: call_site.to_string(),
            candidates: index.unit_listing(),
        }),
        many => Err(SpecGuardError::Ambiguous {
            matcher: node.to_string(),
            spec_url: spec_url.to_string(),
            call_site: call_site.to_string(),
            matches: many
                .iter()
                .map(|r| format!("({}, {})", r.method, r.path))
                .collect::<Vec<_>>()
                .join("\n"),
        }),
    }
}
