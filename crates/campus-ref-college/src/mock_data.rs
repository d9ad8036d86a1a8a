//! Simulated college data for the reference runtime.
//!
//! All data in this module is hardcoded and fictional. It stands in for the
//! staff directory and enrolment tables of a real deployment.

use chrono::NaiveDate;

use campus_attendance::InMemoryAttendanceStore;
use campus_contracts::{
    attendance::{ClassScope, CourseId, SessionRef, StudentId},
    error::CampusResult,
    principal::{DepartmentId, Principal},
};
use campus_core::InMemoryPrincipalStore;

// ── Staff directory (mock) ───────────────────────────────────────────────────

/// Every principal the scenarios refer to, as (id, role, department).
///
/// - `admin-1`       admin, outside every department
/// - `hod-cse`       head of Computer Science
/// - `hod-ece`       head of Electronics
/// - `teacher-cse-1` / `teacher-cse-2` teach in CSE
/// - `teacher-ece-1` teaches in ECE
/// - `staff-cse-7`   a CSE teacher used as a mutation target
const STAFF: &[(&str, &str, Option<&str>)] = &[
    ("admin-1", "admin", None),
    ("admin-2", "admin", None),
    ("hod-cse", "hod", Some("cse")),
    ("hod-ece", "hod", Some("ece")),
    ("teacher-cse-1", "teacher", Some("cse")),
    ("teacher-cse-2", "teacher", Some("cse")),
    ("teacher-ece-1", "teacher", Some("ece")),
    ("staff-cse-7", "teacher", Some("cse")),
    ("staff-ece-3", "teacher", Some("ece")),
];

pub fn staff() -> Vec<Principal> {
    STAFF
        .iter()
        .map(|(id, role, dept)| Principal::new(*id, *role, *dept))
        .collect()
}

/// Seed `store` with the staff directory.
pub fn seed_staff(store: &InMemoryPrincipalStore) -> CampusResult<()> {
    for principal in staff() {
        store.insert(principal)?;
    }
    Ok(())
}

// ── Cohorts (mock) ───────────────────────────────────────────────────────────

pub fn cse_2a() -> ClassScope {
    ClassScope {
        department_id: DepartmentId::new("cse"),
        program: "btech".to_string(),
        year: 2,
        section: "A".to_string(),
    }
}

pub fn ece_3b() -> ClassScope {
    ClassScope {
        department_id: DepartmentId::new("ece"),
        program: "btech".to_string(),
        year: 3,
        section: "B".to_string(),
    }
}

/// Roll numbers `{prefix}001..={prefix}{count}`.
pub fn roster(prefix: &str, count: u32) -> Vec<StudentId> {
    (1..=count)
        .map(|n| StudentId::new(format!("{prefix}{n:03}")))
        .collect()
}

/// Forty students in CSE 2-A.
pub fn cse_2a_roster() -> Vec<StudentId> {
    roster("24CS", 40)
}

/// Thirty students in ECE 3-B.
pub fn ece_3b_roster() -> Vec<StudentId> {
    roster("23EC", 30)
}

/// Enrol both mock cohorts in `store`.
pub fn seed_enrolment(store: &InMemoryAttendanceStore) -> CampusResult<()> {
    store.enroll(&cse_2a(), cse_2a_roster().into_iter().map(|s| s.0))?;
    store.enroll(&ece_3b(), ece_3b_roster().into_iter().map(|s| s.0))?;
    Ok(())
}

// ── Timetable (mock) ─────────────────────────────────────────────────────────

/// A teaching day in September of the mock term.
pub fn term_day(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, day).unwrap_or(NaiveDate::MIN)
}

/// CS201 Data Structures for CSE 2-A on `date`, period `period`.
pub fn data_structures(date: NaiveDate, period: u8) -> SessionRef {
    SessionRef {
        course_id: CourseId("CS201".to_string()),
        timetable_slot_id: format!("cse-2a-p{period}"),
        scope: cse_2a(),
        date,
        period,
    }
}

/// EC305 Signals and Systems for ECE 3-B on `date`, period `period`.
pub fn signals(date: NaiveDate, period: u8) -> SessionRef {
    SessionRef {
        course_id: CourseId("EC305".to_string()),
        timetable_slot_id: format!("ece-3b-p{period}"),
        scope: ece_3b(),
        date,
        period,
    }
}
