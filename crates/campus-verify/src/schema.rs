//! JSON Schema documents for the three inbound request surfaces.
//!
//! These describe shape only: field types, closed sets, and numeric bounds.
//! Which fields an individual `action` needs is checked by the semantic
//! rules in `rules`.

use serde_json::{json, Value};

use campus_contracts::audit::AuditQuery;

fn non_empty_string() -> Value {
    json!({ "type": "string", "minLength": 1 })
}

fn session_ref() -> Value {
    json!({
        "type": "object",
        "required": ["course_id", "timetable_slot_id", "scope", "date", "period"],
        "properties": {
            "course_id": non_empty_string(),
            "timetable_slot_id": non_empty_string(),
            "scope": {
                "type": "object",
                "required": ["department_id", "program", "year", "section"],
                "properties": {
                    "department_id": non_empty_string(),
                    "program": non_empty_string(),
                    "year": { "type": "integer", "minimum": 1, "maximum": 8 },
                    "section": non_empty_string()
                }
            },
            "date": { "type": "string", "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}$" },
            "period": { "type": "integer", "minimum": 1, "maximum": 16 }
        }
    })
}

pub fn gateway() -> Value {
    json!({
        "type": "object",
        "required": ["action", "actor_id", "target_id"],
        "properties": {
            "action": { "enum": ["set_status", "set_role", "delete_user"] },
            "actor_id": non_empty_string(),
            "target_id": non_empty_string(),
            "status": { "enum": ["active", "inactive", "suspended", "pending"] },
            "role_name": non_empty_string()
        },
        "additionalProperties": false
    })
}

pub fn attendance() -> Value {
    json!({
        "type": "object",
        "required": ["action", "actor_id", "session_ref"],
        "properties": {
            "action": { "enum": ["mark", "bulk_mark", "flag_proxy", "lock", "unmark"] },
            "actor_id": non_empty_string(),
            "session_ref": session_ref(),
            "entries": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["student_id", "status"],
                    "properties": {
                        "student_id": non_empty_string(),
                        "status": { "enum": ["present", "late", "absent"] },
                        "late_minutes": { "type": ["integer", "null"], "minimum": 0 }
                    }
                }
            },
            "student_id": non_empty_string(),
            "signal": {
                "type": "object",
                "required": ["source", "score", "reason"],
                "properties": {
                    "source": non_empty_string(),
                    "score": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                    "reason": { "type": "string" }
                }
            }
        },
        "additionalProperties": false
    })
}

pub fn audit_query() -> Value {
    json!({
        "type": "object",
        "required": ["page_size"],
        "properties": {
            "action_type": {
                "enum": [
                    "marked", "edited", "bulk_marked", "proxy_detected", "deleted",
                    "session_locked", "update_status", "update_role", "delete_user"
                ]
            },
            "date_from": { "type": "string" },
            "date_to": { "type": "string" },
            "actor_id": non_empty_string(),
            "target_id": non_empty_string(),
            "order": { "enum": ["descending", "ascending"] },
            "page_token": non_empty_string(),
            "page_size": {
                "type": "integer",
                "minimum": 1,
                "maximum": AuditQuery::MAX_PAGE_SIZE
            }
        },
        "additionalProperties": false
    })
}
