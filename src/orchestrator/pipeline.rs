//! Pipeline definition
//!
//! A pipeline is an ordered list of step descriptors interpreted by the
//! orchestrator. The built-in pipeline exercises the user service and the
//! processing service; custom pipelines can be loaded from YAML:
//!
//! ```yaml
//! steps:
//!   - step: probe
//!     name: Service 1 Health
//!     service: primary
//!     path: /health
//!     expect: { kind: alive }
//!   - step: gate
//!   - step: fanout
//!     name: Processed Data - {name}
//!     service: primary
//!     path: /users/{id}/processed
//!     expect: { kind: field, field: service2_status, label: Service 2 status }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

use crate::common::config::Service;
use crate::common::{Error, Result};
use crate::transport::Method;

use super::probe::{placeholders, Expect, FanoutProbe, Probe};

/// A single step of the pipeline
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Run one probe and record its result
    Probe(Probe),
    /// Abort the run unless every result recorded so far succeeded
    Gate,
    /// Run a probe once per entity created by earlier steps
    Fanout(FanoutProbe),
}

/// Ordered list of steps
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Pipeline {
    pub steps: Vec<Step>,
}

/// Records posted by the create steps of the built-in pipeline
pub fn seed_users() -> Vec<serde_json::Value> {
    vec![
        json!({"name": "Alice Johnson", "email": "alice@example.com", "age": 25}),
        json!({"name": "Bob Smith", "email": "bob@company.com", "age": 35}),
        json!({"name": "Carol Davis", "email": "carol@university.edu", "age": 45}),
        json!({"name": "David Wilson", "email": "david@startup.io", "age": 28}),
    ]
}

impl Pipeline {
    /// The built-in end-to-end pipeline
    ///
    /// Health of both services, gate, user creation, listing, per-user
    /// processed data, analytics and the cross-service check.
    pub fn standard() -> Self {
        let mut steps = vec![
            Step::Probe(Probe::health(Service::Primary)),
            Step::Probe(Probe::health(Service::Secondary)),
            Step::Gate,
        ];

        for (i, user) in seed_users().into_iter().enumerate() {
            steps.push(Step::Probe(Probe {
                name: format!("Create User {}", i + 1),
                service: Service::Primary,
                method: Method::Post,
                path: "/users".to_string(),
                body: Some(user),
                action: Some("create user".to_string()),
                expect: Expect::Entity {
                    noun: "user".to_string(),
                },
            }));
        }

        steps.push(Step::Probe(Probe {
            name: "Get All Users".to_string(),
            service: Service::Primary,
            method: Method::Get,
            path: "/users".to_string(),
            body: None,
            action: Some("get users".to_string()),
            expect: Expect::Collection {
                key: "users".to_string(),
            },
        }));

        steps.push(Step::Fanout(FanoutProbe {
            name: "Processed Data - {name}".to_string(),
            service: Service::Primary,
            path: "/users/{id}/processed".to_string(),
            action: Some("get processed data".to_string()),
            expect: Expect::Field {
                field: "service2_status".to_string(),
                label: "Service 2 status".to_string(),
            },
        }));

        steps.push(Step::Probe(Probe {
            name: "Get Analytics".to_string(),
            service: Service::Secondary,
            method: Method::Get,
            path: "/analytics".to_string(),
            body: None,
            action: Some("get analytics".to_string()),
            expect: Expect::Document {
                message: "Analytics retrieved successfully".to_string(),
            },
        }));

        steps.push(Step::Probe(Probe {
            name: "Cross-Service Test".to_string(),
            service: Service::Secondary,
            method: Method::Get,
            path: "/cross-service-test".to_string(),
            body: None,
            action: Some("test cross-service communication".to_string()),
            expect: Expect::Document {
                message: "Cross-service communication successful".to_string(),
            },
        }));

        Self { steps }
    }

    /// Load and validate a pipeline from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a pipeline from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let pipeline: Self = serde_yaml::from_str(content)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Liveness checks that run before the first gate
    ///
    /// These form the quick health view. Steps with other expectations are
    /// skipped so the view never mutates a service.
    pub fn health_probes(&self) -> impl Iterator<Item = &Probe> {
        self.steps
            .iter()
            .take_while(|step| !matches!(step, Step::Gate))
            .filter_map(|step| match step {
                Step::Probe(probe) if probe.is_health() => Some(probe),
                _ => None,
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Pipeline("pipeline has no steps".to_string()));
        }

        for (i, step) in self.steps.iter().enumerate() {
            let step_num = i + 1;
            match step {
                Step::Gate => {}
                Step::Probe(probe) => {
                    check_path(step_num, &probe.path)?;
                    if !placeholders(&probe.path).is_empty() {
                        return Err(Error::Pipeline(format!(
                            "step {}: only fanout steps may use placeholders ('{}')",
                            step_num, probe.path
                        )));
                    }
                    if probe.body.is_some() && probe.method == Method::Get {
                        return Err(Error::Pipeline(format!(
                            "step {}: GET probe '{}' cannot carry a body",
                            step_num, probe.name
                        )));
                    }
                }
                Step::Fanout(fanout) => {
                    check_path(step_num, &fanout.path)?;
                    let action = fanout.action.as_deref().unwrap_or_default();
                    for template in [fanout.name.as_str(), fanout.path.as_str(), action] {
                        if let Some(unknown) = placeholders(template)
                            .into_iter()
                            .find(|p| !FanoutProbe::PLACEHOLDERS.iter().any(|known| known == p))
                        {
                            return Err(Error::Pipeline(format!(
                                "step {}: unknown placeholder '{{{}}}' in '{}'",
                                step_num, unknown, template
                            )));
                        }
                    }
                    if matches!(fanout.expect, Expect::Entity { .. }) {
                        return Err(Error::Pipeline(format!(
                            "step {}: fanout probes cannot create entities",
                            step_num
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_path(step_num: usize, path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(Error::Pipeline(format!(
            "step {}: path '{}' must start with '/'",
            step_num, path
        )))
    }
}
