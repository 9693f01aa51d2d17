//! Probes: single interactions with a service under test
//!
//! A probe never fails outward. Transport errors, unexpected statuses and
//! payloads that do not match the expectation all end up as a failed
//! [`ProbeResult`] whose message carries the underlying error text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::common::config::{Service, ServicesConfig};
use crate::common::{truncate_body, Error, Result};
use crate::transport::{Method, Request, Response, Transport};

use super::collector::{Payload, ProbeResult};

/// Longest response body excerpt embedded in a failure message
const BODY_EXCERPT_CHARS: usize = 200;

/// How a successful response is interpreted
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expect {
    /// Liveness endpoint; any JSON body means the service is up
    Alive,
    /// A created entity carrying `id` and `name`, captured for later steps
    Entity {
        #[serde(default = "default_noun")]
        noun: String,
    },
    /// A JSON array, reported by count and stored under `key`
    Collection { key: String },
    /// An object whose `field` is reported in the message as `label: value`
    Field { field: String, label: String },
    /// Any JSON document, reported with a fixed message
    Document { message: String },
}

fn default_noun() -> String {
    "user".to_string()
}

fn default_method() -> Method {
    Method::Get
}

/// An entity created by an earlier step
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub record: Payload,
}

impl Entity {
    /// Extract identity from a created record; both `id` and `name` are required
    pub fn from_record(record: Payload) -> Result<Self> {
        let id = match record.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(Error::MalformedPayload(format!("unusable id {}", other)));
            }
            None => return Err(Error::MalformedPayload("missing field 'id'".to_string())),
        };
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedPayload("missing field 'name'".to_string()))?
            .to_string();

        Ok(Self { id, name, record })
    }
}

/// What a probe produced
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub result: ProbeResult,
    /// Set only by a successful `Entity` probe
    pub entity: Option<Entity>,
}

impl ProbeOutcome {
    fn recorded(result: ProbeResult) -> Self {
        Self {
            result,
            entity: None,
        }
    }
}

/// One named interaction with a service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Probe {
    pub name: String,
    pub service: Service,
    #[serde(default = "default_method")]
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Verb phrase used in failure messages, e.g. "create user"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub expect: Expect,
}

impl Probe {
    /// GET `/health` on a service
    pub fn health(service: Service) -> Self {
        Self {
            name: format!("{} Health", service.label()),
            service,
            method: Method::Get,
            path: "/health".to_string(),
            body: None,
            action: None,
            expect: Expect::Alive,
        }
    }

    pub fn is_health(&self) -> bool {
        self.expect == Expect::Alive
    }

    /// Call the service and interpret the response
    pub async fn run(
        &self,
        transport: &dyn Transport,
        services: &ServicesConfig,
        timeout: Duration,
    ) -> ProbeOutcome {
        let url = format!("{}{}", services.base_url(self.service), self.path);
        tracing::debug!(probe = %self.name, method = %self.method, %url, "running probe");

        let request = Request {
            method: self.method,
            url,
            body: self.body.clone(),
            timeout,
        };

        let outcome = match transport.call(request).await {
            Ok(response) if response.is_ok() => self.interpret(&response),
            Ok(response) => Err(Error::unexpected_status(
                response.status,
                &truncate_body(&response.body, BODY_EXCERPT_CHARS),
            )),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(probe = %self.name, error = %e, "probe failed");
                ProbeOutcome::recorded(ProbeResult::failed(&self.name, self.failure_message(&e)))
            }
        }
    }

    fn interpret(&self, response: &Response) -> Result<ProbeOutcome> {
        let body = response
            .json()
            .map_err(|e| Error::MalformedPayload(format!("invalid JSON: {}", e)))?;

        let outcome = match &self.expect {
            Expect::Alive => ProbeOutcome::recorded(ProbeResult::passed(
                &self.name,
                format!("{} is running: {}", self.service.label(), body),
                into_payload(body),
            )),
            Expect::Entity { noun } => {
                let Value::Object(record) = body else {
                    return Err(Error::MalformedPayload(format!(
                        "expected a {} object",
                        noun
                    )));
                };
                let entity = Entity::from_record(record)?;
                ProbeOutcome {
                    result: ProbeResult::passed(
                        &self.name,
                        format!("Created {}: {} (ID: {})", noun, entity.name, entity.id),
                        entity.record.clone(),
                    ),
                    entity: Some(entity),
                }
            }
            Expect::Collection { key } => {
                let Value::Array(items) = body else {
                    return Err(Error::MalformedPayload(format!("expected a list of {}", key)));
                };
                let count = items.len();
                let mut data = Payload::new();
                data.insert(key.clone(), Value::Array(items));
                data.insert("count".to_string(), Value::from(count));
                ProbeOutcome::recorded(ProbeResult::passed(
                    &self.name,
                    format!("Found {} {} in {}", count, key, self.service.label()),
                    data,
                ))
            }
            Expect::Field { field, label } => {
                let Value::Object(record) = body else {
                    return Err(Error::MalformedPayload("expected a JSON object".to_string()));
                };
                let value = record
                    .get(field)
                    .ok_or_else(|| Error::MalformedPayload(format!("missing field '{}'", field)))?;
                let message = format!("{}: {}", label, display_value(value));
                ProbeOutcome::recorded(ProbeResult::passed(&self.name, message, record))
            }
            Expect::Document { message } => ProbeOutcome::recorded(ProbeResult::passed(
                &self.name,
                message.clone(),
                into_payload(body),
            )),
        };

        Ok(outcome)
    }

    fn failure_message(&self, error: &Error) -> String {
        if self.is_health() {
            let label = self.service.label();
            return match error {
                Error::UnexpectedStatus { status, .. } => {
                    format!("{} returned status {}", label, status)
                }
                e if e.is_transport() => format!("{} is not running: {}", label, e),
                e => format!("{} health check failed: {}", label, e),
            };
        }

        let action = self
            .action
            .clone()
            .unwrap_or_else(|| format!("run '{}'", self.name));
        if error.is_transport() {
            format!("Error trying to {}: {}", action, error)
        } else {
            format!("Failed to {}: {}", action, error)
        }
    }
}

/// A probe template run once per created entity
///
/// `name`, `path` and `action` may reference `{id}` and `{name}` of the entity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FanoutProbe {
    pub name: String,
    pub service: Service,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub expect: Expect,
}

impl FanoutProbe {
    /// Placeholders a template may use
    pub const PLACEHOLDERS: [&'static str; 2] = ["id", "name"];

    /// Bind the template to one entity
    pub fn instantiate(&self, entity: &Entity) -> Probe {
        Probe {
            name: fill(&self.name, entity),
            service: self.service,
            method: Method::Get,
            path: fill(&self.path, entity),
            body: None,
            action: self.action.as_ref().map(|a| fill(a, entity)),
            expect: self.expect.clone(),
        }
    }
}

/// Substitute placeholders in one pass
///
/// Substituted text is never rescanned, so an entity name containing `{id}`
/// stays literal. Unknown placeholders are kept as written.
fn fill(template: &str, entity: &Entity) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            rest = &rest[start..];
            break;
        };
        match &after[..end] {
            "id" => out.push_str(&entity.id),
            "name" => out.push_str(&entity.name),
            _ => out.push_str(&rest[start..start + end + 2]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Names inside `{...}` in a template
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                found.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    found
}

fn into_payload(body: Value) -> Payload {
    match body {
        Value::Object(map) => map,
        other => {
            let mut map = Payload::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockReply, MockTransport};
    use serde_json::json;

    const PRIMARY: &str = "http://localhost:8000";
    const SECONDARY: &str = "http://localhost:8001";

    fn services() -> ServicesConfig {
        ServicesConfig::default()
    }

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    fn create_probe() -> Probe {
        Probe {
            name: "Create User 1".to_string(),
            service: Service::Primary,
            method: Method::Post,
            path: "/users".to_string(),
            body: Some(json!({"name": "Alice Johnson", "email": "alice@example.com", "age": 25})),
            action: Some("create user".to_string()),
            expect: Expect::Entity {
                noun: "user".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_health_success_keeps_payload() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            &format!("{}/health", PRIMARY),
            MockReply::ok(json!({"status": "healthy", "service": "users"})),
        );

        let out = Probe::health(Service::Primary)
            .run(&mock, &services(), timeout())
            .await;

        assert!(out.result.success);
        assert_eq!(out.result.name, "Service 1 Health");
        assert!(out.result.message.starts_with("Service 1 is running: "));
        assert_eq!(out.result.data["status"], "healthy");
        assert!(out.entity.is_none());
    }

    #[tokio::test]
    async fn test_health_failures() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            &format!("{}/health", SECONDARY),
            MockReply::status(503, "unavailable"),
        );

        let out = Probe::health(Service::Secondary)
            .run(&mock, &services(), timeout())
            .await;
        assert!(!out.result.success);
        assert_eq!(out.result.message, "Service 2 returned status 503");

        // Nothing routed for the primary service
        let out = Probe::health(Service::Primary)
            .run(&mock, &services(), timeout())
            .await;
        assert!(!out.result.success);
        assert!(out.result.message.starts_with("Service 1 is not running: "));
        assert!(out.result.message.contains("connection refused"));
        assert!(out.result.data.is_empty());
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_a_failure() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            &format!("{}/users", PRIMARY),
            MockReply::Json {
                status: 201,
                body: json!({"id": 1, "name": "Alice Johnson"}),
            },
        );

        let out = create_probe().run(&mock, &services(), timeout()).await;
        assert!(!out.result.success);
        assert!(out.result.message.starts_with("Failed to create user: status 201"));
        assert!(out.entity.is_none());
    }

    #[tokio::test]
    async fn test_create_captures_entity_and_sends_body() {
        let mock = MockTransport::new();
        mock.on_fn(Method::Post, &format!("{}/users", PRIMARY), |req| {
            let mut user = req.body.clone().unwrap();
            user["id"] = json!(7);
            MockReply::ok(user)
        });

        let out = create_probe().run(&mock, &services(), timeout()).await;
        assert!(out.result.success);
        assert_eq!(out.result.message, "Created user: Alice Johnson (ID: 7)");
        assert_eq!(out.result.data["email"], "alice@example.com");

        let entity = out.entity.unwrap();
        assert_eq!(entity.id, "7");
        assert_eq!(entity.name, "Alice Johnson");

        let calls = mock.calls();
        assert_eq!(calls[0].body.as_ref().unwrap()["age"], 25);
    }

    #[tokio::test]
    async fn test_create_without_id_is_malformed() {
        let mock = MockTransport::new();
        mock.on(
            Method::Post,
            &format!("{}/users", PRIMARY),
            MockReply::ok(json!({"name": "Alice Johnson"})),
        );

        let out = create_probe().run(&mock, &services(), timeout()).await;
        assert!(!out.result.success);
        assert_eq!(
            out.result.message,
            "Failed to create user: malformed payload: missing field 'id'"
        );
        assert!(out.entity.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            &format!("{}/analytics", SECONDARY),
            MockReply::status(200, "<html>oops</html>"),
        );

        let probe = Probe {
            name: "Get Analytics".to_string(),
            service: Service::Secondary,
            method: Method::Get,
            path: "/analytics".to_string(),
            body: None,
            action: Some("get analytics".to_string()),
            expect: Expect::Document {
                message: "Analytics retrieved successfully".to_string(),
            },
        };

        let out = probe.run(&mock, &services(), timeout()).await;
        assert!(!out.result.success);
        assert!(out
            .result
            .message
            .starts_with("Failed to get analytics: malformed payload: invalid JSON"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_result() {
        let mock = MockTransport::new();
        mock.on_delayed(
            Method::Get,
            &format!("{}/users", PRIMARY),
            Duration::from_millis(500),
            MockReply::ok(json!([])),
        );

        let probe = Probe {
            name: "Get All Users".to_string(),
            service: Service::Primary,
            method: Method::Get,
            path: "/users".to_string(),
            body: None,
            action: Some("get users".to_string()),
            expect: Expect::Collection {
                key: "users".to_string(),
            },
        };

        let out = probe
            .run(&mock, &services(), Duration::from_millis(10))
            .await;
        assert!(!out.result.success);
        assert!(out.result.message.starts_with("Error trying to get users: "));
        assert!(out.result.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_collection_counts_items() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            &format!("{}/users", PRIMARY),
            MockReply::ok(json!([{"id": 1}, {"id": 2}])),
        );

        let probe = Probe {
            name: "Get All Users".to_string(),
            service: Service::Primary,
            method: Method::Get,
            path: "/users".to_string(),
            body: None,
            action: None,
            expect: Expect::Collection {
                key: "users".to_string(),
            },
        };

        let out = probe.run(&mock, &services(), timeout()).await;
        assert!(out.result.success);
        assert_eq!(out.result.message, "Found 2 users in Service 1");
        assert_eq!(out.result.data["count"], 2);
        assert_eq!(out.result.data["users"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_entity_ids() {
        let record = |v: Value| v.as_object().unwrap().clone();

        let e = Entity::from_record(record(json!({"id": "u-1", "name": "Bob"}))).unwrap();
        assert_eq!(e.id, "u-1");

        assert!(Entity::from_record(record(json!({"id": 3}))).is_err());
        assert!(Entity::from_record(record(json!({"id": null, "name": "Bob"}))).is_err());
        assert!(Entity::from_record(record(json!({"id": "", "name": "Bob"}))).is_err());
    }

    #[test]
    fn test_fanout_instantiation() {
        let template = FanoutProbe {
            name: "Processed Data - {name}".to_string(),
            service: Service::Primary,
            path: "/users/{id}/processed".to_string(),
            action: Some("get processed data".to_string()),
            expect: Expect::Field {
                field: "service2_status".to_string(),
                label: "Service 2 status".to_string(),
            },
        };
        let entity = Entity {
            id: "42".to_string(),
            name: "Carol Davis".to_string(),
            record: Payload::new(),
        };

        let probe = template.instantiate(&entity);
        assert_eq!(probe.name, "Processed Data - Carol Davis");
        assert_eq!(probe.path, "/users/42/processed");
        assert_eq!(probe.method, Method::Get);
        assert_eq!(probe.action.as_deref(), Some("get processed data"));
    }

    #[test]
    fn test_fill_does_not_rescan_values() {
        let entity = Entity {
            id: "{name}".to_string(),
            name: "{id}".to_string(),
            record: Payload::new(),
        };
        assert_eq!(fill("/users/{id}/{name}", &entity), "/users/{name}/{id}");
        assert_eq!(fill("a {other} b {id", &entity), "a {other} b {id");
        assert_eq!(fill("no placeholders", &entity), "no placeholders");
    }

    #[tokio::test]
    async fn test_missing_field_is_malformed() {
        let mock = MockTransport::new();
        mock.on(
            Method::Get,
            &format!("{}/users/7/processed", PRIMARY),
            MockReply::ok(json!({"user_id": 7})),
        );

        let template = FanoutProbe {
            name: "Processed Data - {name}".to_string(),
            service: Service::Primary,
            path: "/users/{id}/processed".to_string(),
            action: Some("get processed data".to_string()),
            expect: Expect::Field {
                field: "service2_status".to_string(),
                label: "Service 2 status".to_string(),
            },
        };
        let entity = Entity {
            id: "7".to_string(),
            name: "Eve".to_string(),
            record: Payload::new(),
        };

        let out = template.instantiate(&entity).run(&mock, &services(), timeout()).await;
        assert!(!out.result.success);
        assert_eq!(out.result.name, "Processed Data - Eve");
        assert_eq!(
            out.result.message,
            "Failed to get processed data: malformed payload: missing field 'service2_status'"
        );
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("/users/{id}/x/{name}"), vec!["id", "name"]);
        assert!(placeholders("/health").is_empty());
        assert_eq!(placeholders("/a/{oops"), Vec::<&str>::new());
    }
}
