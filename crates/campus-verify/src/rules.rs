//! Semantic rules evaluated after structural validation.
//!
//! Each rule applies to requests whose `action` matches (or to every request
//! on the surface when `action` is `None`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which inbound surface a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Gateway,
    Attendance,
    AuditQuery,
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Surface::Gateway => "gateway",
            Surface::Attendance => "attendance",
            Surface::AuditQuery => "audit_query",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// The field must be present and non-null.
    RequiredField { field_path: String },
    /// The field must be absent or null.
    ForbiddenField { field_path: String },
    /// The array at `field_path` must hold between `min` and `max` items.
    ItemCount {
        field_path: String,
        min: usize,
        max: Option<usize>,
    },
    /// `date_from` must precede `date_to` when both are present.
    DateRangeOrdered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRule {
    pub rule_id: String,
    pub description: String,
    /// Restrict the rule to one `action`; `None` applies it to all.
    pub action: Option<String>,
    pub kind: RuleKind,
}

fn rule(id: &str, description: &str, action: Option<&str>, kind: RuleKind) -> RequestRule {
    RequestRule {
        rule_id: id.to_string(),
        description: description.to_string(),
        action: action.map(str::to_string),
        kind,
    }
}

fn required(field: &str) -> RuleKind {
    RuleKind::RequiredField {
        field_path: field.to_string(),
    }
}

fn forbidden(field: &str) -> RuleKind {
    RuleKind::ForbiddenField {
        field_path: field.to_string(),
    }
}

/// The built-in rule set for `surface`.
pub fn default_rules(surface: Surface) -> Vec<RequestRule> {
    match surface {
        Surface::Gateway => vec![
            rule(
                "status-required",
                "set_status needs a status",
                Some("set_status"),
                required("status"),
            ),
            rule(
                "role-required",
                "set_role needs a role_name",
                Some("set_role"),
                required("role_name"),
            ),
            rule(
                "no-status-on-role",
                "set_role carries no status",
                Some("set_role"),
                forbidden("status"),
            ),
            rule(
                "no-role-on-status",
                "set_status carries no role_name",
                Some("set_status"),
                forbidden("role_name"),
            ),
            rule(
                "bare-delete",
                "delete_user carries no status",
                Some("delete_user"),
                forbidden("status"),
            ),
            rule(
                "bare-delete-role",
                "delete_user carries no role_name",
                Some("delete_user"),
                forbidden("role_name"),
            ),
        ],
        Surface::Attendance => vec![
            rule(
                "single-mark",
                "mark carries exactly one entry",
                Some("mark"),
                RuleKind::ItemCount {
                    field_path: "entries".to_string(),
                    min: 1,
                    max: Some(1),
                },
            ),
            rule(
                "bulk-entries",
                "bulk_mark carries at least one entry",
                Some("bulk_mark"),
                RuleKind::ItemCount {
                    field_path: "entries".to_string(),
                    min: 1,
                    max: None,
                },
            ),
            rule(
                "proxy-student",
                "flag_proxy names a student",
                Some("flag_proxy"),
                required("student_id"),
            ),
            rule(
                "proxy-signal",
                "flag_proxy carries a signal",
                Some("flag_proxy"),
                required("signal"),
            ),
            rule(
                "unmark-student",
                "unmark names a student",
                Some("unmark"),
                required("student_id"),
            ),
            rule(
                "lock-bare",
                "lock carries no entries",
                Some("lock"),
                forbidden("entries"),
            ),
        ],
        Surface::AuditQuery => vec![rule(
            "date-range",
            "date_from must be before date_to",
            None,
            RuleKind::DateRangeOrdered,
        )],
    }
}

/// Resolve a dot-notation path; `None` when any segment is missing or null.
pub(crate) fn resolve_path<'v>(
    value: &'v serde_json::Value,
    path: &str,
) -> Option<&'v serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) if !v.is_null() => current = v,
            _ => return None,
        }
    }
    Some(current)
}

fn timestamp(value: &serde_json::Value, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    match resolve_path(value, field).and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(s) => s
            .parse::<DateTime<Utc>>()
            .map(Some)
            .map_err(|e| format!("'{field}' is not an RFC 3339 timestamp: {e}")),
    }
}

impl RequestRule {
    /// Evaluate against `payload`; `Some(message)` on failure.
    pub fn evaluate(&self, payload: &serde_json::Value) -> Option<String> {
        if let Some(action) = &self.action {
            if payload.get("action").and_then(|a| a.as_str()) != Some(action.as_str()) {
                return None;
            }
        }

        match &self.kind {
            RuleKind::RequiredField { field_path } => resolve_path(payload, field_path)
                .is_none()
                .then(|| format!("required field '{field_path}' is missing or null")),

            RuleKind::ForbiddenField { field_path } => resolve_path(payload, field_path)
                .is_some()
                .then(|| format!("field '{field_path}' is not accepted here")),

            RuleKind::ItemCount {
                field_path,
                min,
                max,
            } => {
                let count = resolve_path(payload, field_path)
                    .and_then(|v| v.as_array())
                    .map_or(0, Vec::len);
                if count < *min || max.is_some_and(|max| count > max) {
                    Some(match max {
                        Some(max) if max == min => {
                            format!("'{field_path}' must hold exactly {min} item(s), got {count}")
                        }
                        Some(max) => format!(
                            "'{field_path}' must hold {min}..={max} items, got {count}"
                        ),
                        None => format!(
                            "'{field_path}' must hold at least {min} item(s), got {count}"
                        ),
                    })
                } else {
                    None
                }
            }

            RuleKind::DateRangeOrdered => {
                let from = timestamp(payload, "date_from");
                let to = timestamp(payload, "date_to");
                match (from, to) {
                    (Err(e), _) | (_, Err(e)) => Some(e),
                    (Ok(Some(from)), Ok(Some(to))) if from >= to => Some(format!(
                        "date_from ({from}) must be before date_to ({to})"
                    )),
                    _ => None,
                }
            }
        }
    }
}
