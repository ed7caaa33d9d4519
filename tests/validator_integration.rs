//! End-to-end validation flows against a spec served over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use specguard::{GuardConfig, MockHandle, MockMatcher, Reporter, SpecGuardError, SpecValidator};

const SPEC_YAML: &str = r#"
openapi: "3.0.0"
info:
  title: billing
  version: "2.0"
paths:
  /2.0/{user_id}:
    get:
      responses:
        "200":
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: integer
  /2.0/reports/daily:
    get:
      responses:
        "200":
          description: produced out of band
  /3.0/{user_id}:
    get:
      responses:
        "200":
          content:
            application/json:
              schema:
                type: object
                properties:
                  id:
                    type: integer
"#;

struct StaticMock {
    matcher: MockMatcher,
    body: Vec<u8>,
    relay: bool,
}

impl StaticMock {
    fn get(path: &str, body: Value) -> Self {
        StaticMock {
            matcher: MockMatcher::All {
                matchers: vec![
                    MockMatcher::Method {
                        expected: "GET".to_string(),
                    },
                    MockMatcher::Route {
                        path: path.to_string(),
                    },
                ],
            },
            body: body.to_string().into_bytes(),
            relay: false,
        }
    }

    fn with_raw_body(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }
}

impl MockHandle for StaticMock {
    fn matcher(&self) -> MockMatcher {
        self.matcher.clone()
    }

    fn body(&self) -> Vec<u8> {
        self.body.clone()
    }

    fn is_relay(&self) -> bool {
        self.relay
    }
}

#[derive(Default)]
struct CollectingReporter {
    messages: Mutex<Vec<(String, String)>>,
}

impl Reporter for CollectingReporter {
    fn report(&self, call_site: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((call_site.to_string(), message.to_string()));
    }
}

struct SpecServer {
    server: mockito::ServerGuard,
    _cache_dir: tempfile::TempDir,
    config: GuardConfig,
}

async fn spec_server() -> SpecServer {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/openapi.yml")
        .with_body(SPEC_YAML)
        .create_async()
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = GuardConfig::new()
        .with_cache_dir(cache_dir.path())
        .with_fetch_timeout(Duration::from_secs(5));

    SpecServer {
        server,
        _cache_dir: cache_dir,
        config,
    }
}

impl SpecServer {
    fn spec_url(&self) -> String {
        format!("{}/openapi.yml", self.server.url())
    }
}

#[tokio::test]
async fn conforming_mock_is_returned_unchanged() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_get_user")
        .strict(true)
        .raise_on_mismatch(true)
        .build();

    let mock = validator
        .checked(|| async { StaticMock::get("/2.0/42", json!({"id": 42})) })
        .await
        .unwrap();

    assert_eq!(mock.body, json!({"id": 42}).to_string().into_bytes());
}

#[tokio::test]
async fn strict_type_mismatch_raises_when_configured() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_get_user")
        .strict(true)
        .raise_on_mismatch(true)
        .build();

    let mock = StaticMock::get("/2.0/42", json!({"id": "42"}));
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(matches!(err, SpecGuardError::Mismatch { .. }));
    assert!(err.to_string().contains("test_get_user"));
}

#[tokio::test]
async fn mismatch_is_reported_but_not_raised_by_default() {
    let env = spec_server().await;
    let reporter = Arc::new(CollectingReporter::default());
    let config = env.config.clone().with_reporter(reporter.clone());

    let validator = SpecValidator::builder(config)
        .spec_url(env.spec_url())
        .call_site("test_get_user")
        .strict(true)
        .build();

    let mock = StaticMock::get("/2.0/42", json!({"id": "42"}));
    validator.validate(&mock).await.unwrap();

    let messages = reporter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "test_get_user");
    assert!(messages[0].1.contains("/id"));
}

#[tokio::test]
async fn extra_field_passes_non_strict_and_fails_force_strict() {
    let env = spec_server().await;
    let body = json!({"id": 42, "undocumented": true});

    let lenient = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_lenient")
        .raise_on_mismatch(true)
        .build();
    lenient
        .validate(&StaticMock::get("/2.0/42", body.clone()))
        .await
        .unwrap();

    let forced = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_forced")
        .force_strict(true)
        .raise_on_mismatch(true)
        .build();
    let err = forced
        .validate(&StaticMock::get("/2.0/42", body))
        .await
        .unwrap_err();
    assert!(matches!(err, SpecGuardError::Mismatch { .. }));
}

#[tokio::test]
async fn unknown_route_reports_every_known_unit() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_unknown")
        .build();

    let mock = StaticMock::get("/4.0/unknown", json!({}));
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(matches!(err, SpecGuardError::NotFound { .. }));

    let message = err.to_string();
    assert!(message.contains("(GET, /2.0/{var})"));
    assert!(message.contains("(GET, /2.0/reports/daily)"));
    assert!(message.contains("(GET, /3.0/{var})"));
}

#[tokio::test]
async fn overly_broad_matcher_is_ambiguous() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_ambiguous")
        .build();

    let mock = StaticMock {
        matcher: MockMatcher::Any {
            matchers: vec![
                MockMatcher::Route {
                    path: "/2.0/{id}".to_string(),
                },
                MockMatcher::Route {
                    path: "/3.0/{id}".to_string(),
                },
            ],
        },
        body: b"{}".to_vec(),
        relay: false,
    };
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(matches!(err, SpecGuardError::Ambiguous { .. }));
}

#[tokio::test]
async fn operation_without_response_schema_is_fatal() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_reports")
        .build();

    let mock = StaticMock::get("/2.0/reports/daily", json!({}));
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(matches!(err, SpecGuardError::MissingSchema { .. }));
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_bad_body")
        .build();

    let mock = StaticMock::get("/2.0/42", json!({})).with_raw_body(b"<html>nope</html>");
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(matches!(err, SpecGuardError::BodyDecode { .. }));
}

#[tokio::test]
async fn prefixed_mock_routes_resolve_against_unprefixed_spec() {
    let env = spec_server().await;
    let validator = SpecValidator::builder(env.config.clone())
        .spec_url(env.spec_url())
        .call_site("test_prefixed")
        .prefix("/api")
        .raise_on_mismatch(true)
        .build();

    let mock = StaticMock::get("/api/2.0/42", json!({"id": 42}));
    validator.validate(&mock).await.unwrap();
}

#[tokio::test]
async fn unreachable_spec_propagates_a_fetch_error() {
    let cache_dir = tempfile::tempdir().unwrap();
    let config = GuardConfig::new()
        .with_cache_dir(cache_dir.path())
        .with_fetch_timeout(Duration::from_millis(200));

    let validator = SpecValidator::builder(config)
        .spec_url("http://127.0.0.1:9/openapi.yml")
        .call_site("test_unreachable")
        .build();

    let mock = StaticMock::get("/2.0/42", json!({"id": 42}));
    let err = validator.validate(&mock).await.unwrap_err();
    assert!(err.is_fetch());
}

#[tokio::test]
async fn unreachable_spec_is_skipped_when_policy_allows() {
    let cache_dir = tempfile::tempdir().unwrap();
    let config = GuardConfig::new()
        .with_cache_dir(cache_dir.path())
        .with_fetch_timeout(Duration::from_millis(200));

    let validator = SpecValidator::builder(config)
        .spec_url("http://127.0.0.1:9/openapi.yml")
        .call_site("test_skipped")
        .skip_if_spec_unavailable(true)
        .build();

    let mock = validator
        .checked(|| async { StaticMock::get("/2.0/42", json!({"id": 42})) })
        .await
        .unwrap();
    assert!(!mock.body.is_empty());
}

#[tokio::test]
async fn second_call_site_reuses_the_cached_spec() {
    let mut server = mockito::Server::new_async().await;
    let spec = server
        .mock("GET", "/openapi.yml")
        .with_body(SPEC_YAML)
        .expect(1)
        .create_async()
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = GuardConfig::new().with_cache_dir(cache_dir.path());
    let url = format!("{}/openapi.yml", server.url());

    for call_site in ["test_first", "test_second"] {
        let validator = SpecValidator::builder(config.clone())
            .spec_url(url.as_str())
            .call_site(call_site)
            .build();
        validator
            .validate(&StaticMock::get("/2.0/42", json!({"id": 42})))
            .await
            .unwrap();
    }

    spec.assert_async().await;
}
