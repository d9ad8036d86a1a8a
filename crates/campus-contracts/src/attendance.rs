//! Attendance session and record types.
//!
//! A session is one class-period instance; a record is one student's mark
//! within it. Records carry a `version` that stores bump on every write so
//! concurrent edits to the same (session, student) pair serialize.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CampusError;
use crate::principal::{DepartmentId, PrincipalId};

/// Roll-number style identifier of a student.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub uuid::Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The cohort a session is taught to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassScope {
    pub department_id: DepartmentId,
    pub program: String,
    pub year: u8,
    pub section: String,
}

impl fmt::Display for ClassScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/y{}/{}",
            self.department_id, self.program, self.year, self.section
        )
    }
}

/// How callers name a session. The first mark against a new ref creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRef {
    pub course_id: CourseId,
    pub timetable_slot_id: String,
    pub scope: ClassScope,
    pub date: NaiveDate,
    pub period: u8,
}

impl SessionRef {
    /// The uniqueness key: at most one session per scope, date, and period.
    pub fn key(&self) -> SessionKey {
        SessionKey {
            scope: self.scope.clone(),
            date: self.date,
            period: self.period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub scope: ClassScope,
    pub date: NaiveDate,
    pub period: u8,
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.scope, self.date, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub id: SessionId,
    pub course_id: CourseId,
    pub timetable_slot_id: String,
    pub scope: ClassScope,
    pub date: NaiveDate,
    pub period: u8,
    pub is_locked: bool,
    pub created_by: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub locked_by: Option<PrincipalId>,
    pub locked_at: Option<DateTime<Utc>>,
}

impl AttendanceSession {
    pub fn department(&self) -> &DepartmentId {
        &self.scope.department_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = CampusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "late" => Ok(AttendanceStatus::Late),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(CampusError::validation(format!(
                "unknown attendance status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    /// Zero unless `status` is `Late`.
    pub late_minutes: u32,
    /// Number of post-creation writes that changed the mark.
    pub edit_count: u32,
    pub marked_by: PrincipalId,
    pub last_edited_by: Option<PrincipalId>,
    /// Set by a proxy flag; cleared only by human review outside the core.
    pub under_review: bool,
    /// Bumped by the store on every committed write.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// One student's mark in a single or bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkEntry {
    pub student_id: StudentId,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub late_minutes: Option<u32>,
}

impl MarkEntry {
    pub fn new(student_id: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            student_id: StudentId::new(student_id),
            status,
            late_minutes: None,
        }
    }

    pub fn late(student_id: impl Into<String>, minutes: u32) -> Self {
        Self {
            student_id: StudentId::new(student_id),
            status: AttendanceStatus::Late,
            late_minutes: Some(minutes),
        }
    }
}

/// An externally computed suspicion that someone answered for the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxySignal {
    /// The detector that raised the signal.
    pub source: String,
    /// Detector confidence in `0.0..=1.0`.
    pub score: f64,
    pub reason: String,
}

/// A single write inside an atomic `AttendanceStore::commit` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    /// Create a record. Fails if one already exists for the student.
    Insert(AttendanceRecord),
    /// Replace a record read at `expected_version`.
    Update {
        record: AttendanceRecord,
        expected_version: u64,
    },
    /// Remove a record read at `expected_version`.
    Delete {
        student_id: StudentId,
        expected_version: u64,
    },
}

impl RecordWrite {
    pub fn student_id(&self) -> &StudentId {
        match self {
            RecordWrite::Insert(record) => &record.student_id,
            RecordWrite::Update { record, .. } => &record.student_id,
            RecordWrite::Delete { student_id, .. } => student_id,
        }
    }
}

/// What a single mark did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Created(AttendanceRecord),
    Edited {
        record: AttendanceRecord,
        old_status: AttendanceStatus,
        overridden: bool,
    },
    /// The mark matched the stored one; nothing was written.
    Unchanged(AttendanceRecord),
}

impl MarkOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            MarkOutcome::Created(record)
            | MarkOutcome::Edited { record, .. }
            | MarkOutcome::Unchanged(record) => record,
        }
    }
}

/// Aggregate result of a bulk mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMarkSummary {
    pub session_id: SessionId,
    pub count: usize,
    pub created: usize,
    pub edited: usize,
    pub unchanged: usize,
    pub overridden: bool,
}
