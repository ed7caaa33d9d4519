//! OpenAPI document indexing.
//!
//! This is deliberately not a general OpenAPI toolkit: the index keeps exactly
//! what resolution and response validation need, one record per
//! (method, path) operation with its success-response schema, keyed for
//! comparison against compiled mock matchers.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::SpecGuardError;
use crate::normalize::normalize_path;

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// One operation extracted from the spec. Immutable once built.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// Canonical uppercase HTTP method.
    pub method: String,
    /// Normalized path template.
    pub path: String,
    /// Success-response schema, bundled with the document's `components` so
    /// internal `$ref`s stay resolvable. Legitimately absent for operations
    /// the spec documents without a response structure.
    pub response_schema: Option<Value>,
}

/// Read-only mapping from (uppercase method, normalized path) to operation.
///
/// Ordered so diagnostic listings come out stable across runs.
#[derive(Debug, Clone, Default)]
pub struct SpecIndex {
    entries: BTreeMap<(String, String), OperationRecord>,
}

impl SpecIndex {
    /// Build the index from a parsed OpenAPI document.
    ///
    /// Fails with [`SpecGuardError::Parse`] when the document carries no
    /// usable `paths` object; individual operations without schemas are kept
    /// (an absent schema is a distinct condition from "operation not found").
    pub fn from_document(doc: &Value, spec_url: &str) -> Result<Self, SpecGuardError> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| SpecGuardError::Parse {
                url: spec_url.to_string(),
                reason: "document has no 'paths' object".to_string(),
            })?;

        let components = doc.get("components");
        let mut entries = BTreeMap::new();

        for (raw_path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for (method, operation) in item {
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let record = OperationRecord {
                    method: method.to_uppercase(),
                    path: normalize_path(raw_path),
                    response_schema: extract_response_schema(operation)
                        .map(|schema| bundle_components(schema, components)),
                };
                entries.insert((record.method.clone(), record.path.clone()), record);
            }
        }

        Ok(SpecIndex { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &OperationRecord)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, method: &str, path: &str) -> Option<&OperationRecord> {
        self.entries.get(&(method.to_string(), path.to_string()))
    }

    /// One `(METHOD, path)` per line, for not-found diagnostics.
    pub fn unit_listing(&self) -> String {
        self.entries
            .keys()
            .map(|(method, path)| format!("({method}, {path})"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Pull the success-response JSON schema out of an operation object.
///
/// Preference order: `200`, then the lowest other 2xx status, then `default`.
/// Within a response, `application/json` content wins; otherwise the first
/// declared content type is taken.
fn extract_response_schema(operation: &Value) -> Option<&Value> {
    let responses = operation.get("responses")?.as_object()?;

    let mut status_keys: Vec<&String> = responses
        .keys()
        .filter(|k| k.len() == 3 && k.starts_with('2'))
        .collect();
    status_keys.sort();

    let response = status_keys
        .first()
        .and_then(|k| responses.get(k.as_str()))
        .or_else(|| responses.get("default"))?;

    let content = response.get("content")?.as_object()?;
    let media = content
        .get("application/json")
        .or_else(|| content.values().next())?;
    media.get("schema")
}

/// Attach the document's `components` to a schema so `#/components/...`
/// references resolve against the schema itself once it leaves the document.
fn bundle_components(schema: &Value, components: Option<&Value>) -> Value {
    let mut bundled = schema.clone();
    if let (Some(obj), Some(components)) = (bundled.as_object_mut(), components) {
        obj.entry("components").or_insert_with(|| components.clone());
    }
    bundled
}
