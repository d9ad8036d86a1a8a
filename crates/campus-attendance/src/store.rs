//! In-memory implementation of `AttendanceStore`.
//!
//! All tables sit behind one `Mutex`. `commit` applies a batch to a copy of
//! the session's records and swaps it in only when every write passed its
//! version check, so a batch is all-or-nothing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{Datelike, Utc};
use tracing::debug;

use campus_contracts::{
    attendance::{
        AttendanceRecord, AttendanceSession, AttendanceStatus, ClassScope, RecordWrite, SessionId,
        SessionKey, SessionRef, StudentId,
    },
    error::{CampusError, CampusResult},
    late_pass::AttendanceCounts,
    principal::PrincipalId,
};
use campus_core::traits::AttendanceStore;

#[derive(Default)]
struct AttendanceTables {
    enrolment: HashMap<ClassScope, HashSet<StudentId>>,
    sessions: HashMap<SessionId, AttendanceSession>,
    keys: HashMap<SessionKey, SessionId>,
    records: HashMap<SessionId, BTreeMap<StudentId, AttendanceRecord>>,
}

impl AttendanceTables {
    fn session(&self, id: &SessionId) -> CampusResult<&AttendanceSession> {
        self.sessions
            .get(id)
            .ok_or_else(|| CampusError::not_found(format!("attendance session '{id}'")))
    }
}

#[derive(Default)]
pub struct InMemoryAttendanceStore {
    tables: Mutex<AttendanceTables>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `students` to the cohort described by `scope`.
    pub fn enroll<I, S>(&self, scope: &ClassScope, students: I) -> CampusResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tables = self.lock()?;
        tables
            .enrolment
            .entry(scope.clone())
            .or_default()
            .extend(students.into_iter().map(StudentId::new));
        Ok(())
    }

    /// Tally one student's marks across every session in a calendar month.
    pub fn counts_for(
        &self,
        student: &StudentId,
        month: u32,
        year: i32,
    ) -> CampusResult<AttendanceCounts> {
        let tables = self.lock()?;
        let mut counts = AttendanceCounts::default();

        for session in tables
            .sessions
            .values()
            .filter(|s| s.date.month() == month && s.date.year() == year)
        {
            let record = tables
                .records
                .get(&session.id)
                .and_then(|records| records.get(student));
            match record.map(|r| r.status) {
                Some(AttendanceStatus::Present) => counts.present += 1,
                Some(AttendanceStatus::Late) => counts.late += 1,
                Some(AttendanceStatus::Absent) => counts.absent += 1,
                None => {}
            }
        }

        Ok(counts)
    }

    fn lock(&self) -> CampusResult<MutexGuard<'_, AttendanceTables>> {
        self.tables
            .lock()
            .map_err(|e| CampusError::store(format!("attendance store lock poisoned: {e}")))
    }
}

impl AttendanceStore for InMemoryAttendanceStore {
    fn is_enrolled(&self, scope: &ClassScope, student: &StudentId) -> CampusResult<bool> {
        Ok(self
            .lock()?
            .enrolment
            .get(scope)
            .is_some_and(|students| students.contains(student)))
    }

    fn find_session(&self, key: &SessionKey) -> CampusResult<Option<AttendanceSession>> {
        let tables = self.lock()?;
        Ok(tables
            .keys
            .get(key)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    fn open_session(
        &self,
        session_ref: &SessionRef,
        created_by: &PrincipalId,
    ) -> CampusResult<AttendanceSession> {
        let mut tables = self.lock()?;
        let key = session_ref.key();

        if let Some(id) = tables.keys.get(&key) {
            let session = tables.session(id)?;
            if session.course_id != session_ref.course_id
                || session.timetable_slot_id != session_ref.timetable_slot_id
            {
                return Err(CampusError::validation(format!(
                    "session {key} already belongs to course '{}' slot '{}'",
                    session.course_id, session.timetable_slot_id
                )));
            }
            return Ok(session.clone());
        }

        let session = AttendanceSession {
            id: SessionId::new(),
            course_id: session_ref.course_id.clone(),
            timetable_slot_id: session_ref.timetable_slot_id.clone(),
            scope: session_ref.scope.clone(),
            date: session_ref.date,
            period: session_ref.period,
            is_locked: false,
            created_by: created_by.clone(),
            created_at: Utc::now(),
            locked_by: None,
            locked_at: None,
        };

        tables.keys.insert(key, session.id);
        tables.records.insert(session.id, BTreeMap::new());
        tables.sessions.insert(session.id, session.clone());

        debug!(session_id = %session.id, created_by = %created_by, "attendance session opened");
        Ok(session)
    }

    fn lock_session(
        &self,
        session: &SessionId,
        locked_by: &PrincipalId,
    ) -> CampusResult<AttendanceSession> {
        let mut tables = self.lock()?;
        let stored = tables
            .sessions
            .get_mut(session)
            .ok_or_else(|| CampusError::not_found(format!("attendance session '{session}'")))?;

        if stored.is_locked {
            return Err(CampusError::SessionLocked {
                session_id: session.to_string(),
            });
        }

        stored.is_locked = true;
        stored.locked_by = Some(locked_by.clone());
        stored.locked_at = Some(Utc::now());
        Ok(stored.clone())
    }

    fn record(
        &self,
        session: &SessionId,
        student: &StudentId,
    ) -> CampusResult<Option<AttendanceRecord>> {
        Ok(self
            .lock()?
            .records
            .get(session)
            .and_then(|records| records.get(student))
            .cloned())
    }

    fn records(&self, session: &SessionId) -> CampusResult<Vec<AttendanceRecord>> {
        Ok(self
            .lock()?
            .records
            .get(session)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn commit(
        &self,
        session: &SessionId,
        observed_locked: bool,
        writes: &[RecordWrite],
    ) -> CampusResult<Vec<AttendanceRecord>> {
        let mut tables = self.lock()?;

        if tables.session(session)?.is_locked != observed_locked {
            return Err(CampusError::conflict(format!(
                "lock state of session '{session}' changed since it was read"
            )));
        }

        let mut working = tables.records.get(session).cloned().unwrap_or_default();
        let mut committed = Vec::with_capacity(writes.len());
        let now = Utc::now();

        for write in writes {
            let student = write.student_id();
            let current = working.get(student).map(|r| r.version);

            match write {
                RecordWrite::Insert(record) => {
                    if current.is_some() {
                        return Err(CampusError::conflict(format!(
                            "student '{student}' was marked concurrently"
                        )));
                    }
                    let mut record = record.clone();
                    record.session_id = *session;
                    record.version = 1;
                    record.updated_at = now;
                    working.insert(student.clone(), record.clone());
                    committed.push(record);
                }
                RecordWrite::Update {
                    record,
                    expected_version,
                } => {
                    if current != Some(*expected_version) {
                        return Err(stale(student, *expected_version, current));
                    }
                    let mut record = record.clone();
                    record.version = expected_version + 1;
                    record.updated_at = now;
                    working.insert(student.clone(), record.clone());
                    committed.push(record);
                }
                RecordWrite::Delete {
                    expected_version, ..
                } => {
                    if current != Some(*expected_version) {
                        return Err(stale(student, *expected_version, current));
                    }
                    working.remove(student);
                }
            }
        }

        tables.records.insert(*session, working);
        debug!(session_id = %session, writes = writes.len(), "attendance batch committed");
        Ok(committed)
    }
}

fn stale(student: &StudentId, expected: u64, current: Option<u64>) -> CampusError {
    CampusError::conflict(match current {
        Some(v) => format!("record for '{student}' is at version {v}, expected {expected}"),
        None => format!("record for '{student}' no longer exists"),
    })
}
