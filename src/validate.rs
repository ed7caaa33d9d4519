//! Response-body-vs-schema validation under the strictness policy.
//!
//! Non-strict is a substitution check: the body must satisfy the schema
//! wherever the schema constrains it, and undocumented extra fields pass.
//! Strict (and `force_strict`) rewrites the schema to exact-match form first:
//! every declared property becomes required and undeclared properties are
//! rejected, recursively, including schemas reachable through bundled
//! `components` references.

use serde_json::Value;

use crate::config::ValidationPolicy;
use crate::error::SpecGuardError;
use crate::spec::OperationRecord;

/// Check a decoded mock body against the operation's response schema.
///
/// An operation without a declared response schema is a spec-authoring
/// problem, not a mock problem, and fails with
/// [`SpecGuardError::MissingSchema`] regardless of policy.
pub fn check_response(
    record: &OperationRecord,
    body: &Value,
    policy: &ValidationPolicy,
    spec_url: &str,
    call_site: &str,
) -> Result<(), SpecGuardError> {
    let Some(schema) = &record.response_schema else {
        return Err(SpecGuardError::MissingSchema {
            method: record.method.clone(),
            path: record.path.clone(),
            spec_url: spec_url.to_string(),
            call_site: call_site.to_string(),
        });
    };

    let effective = if policy.strict || policy.force_strict {
        forced_strict(schema)
    } else {
        schema.clone()
    };

    let validator = jsonschema::validator_for(&effective).map_err(|e| SpecGuardError::Parse {
        url: spec_url.to_string(),
        reason: format!(
            "response schema of '{} {}' does not compile: {e}",
            record.method, record.path
        ),
    })?;

    let violations: Vec<String> = validator
        .iter_errors(body)
        .map(|error| {
            let at = error.instance_path().to_string();
            if at.is_empty() {
                format!("- {error}")
            } else {
                format!("- at '{at}': {error}")
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SpecGuardError::Mismatch {
            call_site: call_site.to_string(),
            detail: violations.join("\n"),
        })
    }
}

/// Rewrite a schema so only exact structural matches validate.
///
/// Every object schema gets `required` = all declared properties and
/// `additionalProperties: false`. Applied recursively through `properties`,
/// `items`, the `allOf`/`anyOf`/`oneOf` combinators, and the schemas of a
/// bundled `components` section so `$ref` targets are tightened too.
fn forced_strict(schema: &Value) -> Value {
    let mut exact = schema.clone();
    tighten(&mut exact);
    exact
}

fn tighten(node: &mut Value) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };

    if let Some(schemas) = obj
        .get_mut("components")
        .and_then(|c| c.get_mut("schemas"))
        .and_then(Value::as_object_mut)
    {
        for schema in schemas.values_mut() {
            tighten(schema);
        }
    }

    let declared: Option<Vec<Value>> = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect());

    if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
        for prop in props.values_mut() {
            tighten(prop);
        }
    }
    if let Some(declared) = declared {
        obj.insert("required".to_string(), Value::Array(declared));
        obj.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    if let Some(items) = obj.get_mut("items") {
        tighten(items);
    }
    for combinator in ["allOf", "anyOf", "oneOf"] {
        if let Some(branches) = obj.get_mut(combinator).and_then(Value::as_array_mut) {
            for branch in branches {
                tighten(branch);
            }
        }
    }
}
