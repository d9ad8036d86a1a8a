//! Inbound request verifier.
//!
//! `RequestVerifier` checks raw JSON envelopes before they are deserialized
//! and dispatched. Verification runs in two phases:
//!
//! 1. **Structural**: the payload is validated against the surface's JSON
//!    Schema with the `jsonschema` crate.
//! 2. **Semantic**: each `RequestRule` for the surface is evaluated in order.
//!
//! All failures are collected before returning so callers see the full set
//! in one pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use campus_contracts::error::{CampusError, CampusResult};

use crate::rules::{default_rules, RequestRule, Surface};
use crate::schema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub rule_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub surface: Surface,
    pub passed: bool,
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// Collapse a failed report into one `ValidationError`.
    pub fn into_result(self) -> CampusResult<()> {
        if self.passed {
            return Ok(());
        }
        let reasons: Vec<String> = self
            .failures
            .into_iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect();
        Err(CampusError::validation(format!(
            "invalid {} request: {}",
            self.surface,
            reasons.join("; ")
        )))
    }
}

struct SurfaceChecks {
    validator: jsonschema::Validator,
    rules: Vec<RequestRule>,
}

/// Validates gateway, attendance, and audit-query envelopes.
pub struct RequestVerifier {
    surfaces: HashMap<Surface, SurfaceChecks>,
}

impl RequestVerifier {
    /// Compile the built-in schemas and rule sets.
    pub fn new() -> CampusResult<Self> {
        let mut surfaces = HashMap::new();
        for (surface, document) in [
            (Surface::Gateway, schema::gateway()),
            (Surface::Attendance, schema::attendance()),
            (Surface::AuditQuery, schema::audit_query()),
        ] {
            let validator =
                jsonschema::validator_for(&document).map_err(|e| CampusError::ConfigError {
                    reason: format!("invalid JSON Schema for {surface} requests: {e}"),
                })?;
            surfaces.insert(
                surface,
                SurfaceChecks {
                    validator,
                    rules: default_rules(surface),
                },
            );
        }
        Ok(Self { surfaces })
    }

    /// Append an extra rule for `surface`.
    pub fn add_rule(&mut self, surface: Surface, rule: RequestRule) {
        if let Some(checks) = self.surfaces.get_mut(&surface) {
            checks.rules.push(rule);
        }
    }

    /// Run both phases and report every failure.
    pub fn verify(&self, surface: Surface, payload: &serde_json::Value) -> VerificationReport {
        let mut failures = Vec::new();

        let Some(checks) = self.surfaces.get(&surface) else {
            return VerificationReport {
                surface,
                passed: false,
                failures: vec![VerificationFailure {
                    rule_id: "surface".to_string(),
                    message: format!("no checks registered for {surface} requests"),
                }],
            };
        };

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        for error in checks.validator.iter_errors(payload) {
            let message = format!("JSON Schema violation at {}: {}", error.instance_path, error);
            warn!(%surface, %message, "structural validation failure");
            failures.push(VerificationFailure {
                rule_id: "json-schema".to_string(),
                message,
            });
        }

        // ── Phase 2: Semantic rule evaluation ────────────────────────────────
        for rule in &checks.rules {
            if let Some(message) = rule.evaluate(payload) {
                warn!(%surface, rule_id = %rule.rule_id, %message, "semantic rule failed");
                failures.push(VerificationFailure {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
        }

        let passed = failures.is_empty();
        debug!(%surface, passed, failure_count = failures.len(), "request verification complete");

        VerificationReport {
            surface,
            passed,
            failures,
        }
    }

    /// `verify`, collapsed to a `ValidationError` on failure.
    pub fn check(&self, surface: Surface, payload: &serde_json::Value) -> CampusResult<()> {
        self.verify(surface, payload).into_result()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
