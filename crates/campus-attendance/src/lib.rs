//! # campus-attendance
//!
//! Attendance marking, locking, and late-pass aggregation.
//!
//! [`AttendanceStateMachine`] owns the session and record lifecycle and
//! writes every accountable change to the audit ledger. [`LatePassAggregator`]
//! derives monthly late counters from committed late transitions, and
//! [`AttendanceConfig`] carries the tunable policy.

pub mod config;
pub mod late_pass;
pub mod machine;
pub mod store;

pub use config::AttendanceConfig;
pub use late_pass::{attendance_percentage, DeductionPolicy, LatePassAggregator};
pub use machine::{
    AttendanceStateMachine, BulkMarkReceipt, LockReceipt, MarkReceipt, ProxyFlagReceipt,
    UnmarkReceipt,
};
pub use store::InMemoryAttendanceStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use campus_audit::InMemoryAuditLedger;
    use campus_contracts::{
        attendance::{
            AttendanceStatus, ClassScope, CourseId, MarkEntry, MarkOutcome, ProxySignal,
            RecordWrite, SessionRef, StudentId,
        },
        audit::{ActionType, AuditLogEntry},
        error::CampusError,
        principal::{AccountStatus, DepartmentId, Principal, PrincipalId},
    };
    use campus_core::traits::AttendanceStore;
    use campus_core::InMemoryPrincipalStore;
    use campus_policy::TomlPermissionOracle;

    use crate::{
        AttendanceConfig, AttendanceStateMachine, InMemoryAttendanceStore, LatePassAggregator,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    const ROLES: &str = r#"
        [[permissions]]
        name = "mark-attendance"

        [[permissions]]
        name = "lock-attendance"

        [[permissions]]
        name = "override-attendance-lock"

        [[roles]]
        name = "teacher"
        grants = [{ permission = "mark-attendance", scope = "department" }]

        [[roles]]
        name = "hod"
        grants = [
            { permission = "mark-attendance", scope = "department" },
            { permission = "lock-attendance", scope = "department" },
            { permission = "override-attendance-lock", scope = "department" },
        ]
    "#;

    struct Harness {
        machine: AttendanceStateMachine,
        ledger: Arc<InMemoryAuditLedger>,
        store: Arc<InMemoryAttendanceStore>,
        principals: Arc<InMemoryPrincipalStore>,
        late_pass: Arc<LatePassAggregator>,
    }

    fn cse() -> ClassScope {
        ClassScope {
            department_id: DepartmentId::new("cse"),
            program: "btech".to_string(),
            year: 2,
            section: "A".to_string(),
        }
    }

    fn session_ref(period: u8) -> SessionRef {
        SessionRef {
            course_id: CourseId("CS201".to_string()),
            timetable_slot_id: format!("mon-p{period}"),
            scope: cse(),
            date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            period,
        }
    }

    fn roll(i: usize) -> String {
        format!("21CS{:03}", i)
    }

    fn present(i: usize) -> MarkEntry {
        MarkEntry::new(roll(i), AttendanceStatus::Present)
    }

    fn absent(i: usize) -> MarkEntry {
        MarkEntry::new(roll(i), AttendanceStatus::Absent)
    }

    fn harness() -> Harness {
        let principals = Arc::new(InMemoryPrincipalStore::new());
        principals.insert(Principal::new("teacher-cse", "teacher", Some("cse"))).unwrap();
        principals.insert(Principal::new("teacher-ece", "teacher", Some("ece"))).unwrap();
        principals.insert(Principal::new("hod-cse", "hod", Some("cse"))).unwrap();

        let store = Arc::new(InMemoryAttendanceStore::new());
        store.enroll(&cse(), (1..=40).map(roll)).unwrap();

        let ledger = Arc::new(InMemoryAuditLedger::new());
        let config = AttendanceConfig::default();
        let late_pass = Arc::new(LatePassAggregator::new(
            config.deduction_policy().unwrap(),
            config.threshold(),
        ));

        let machine = AttendanceStateMachine::new(
            Arc::new(TomlPermissionOracle::from_toml_str(ROLES).unwrap()),
            ledger.clone(),
            principals.clone(),
            store.clone(),
            late_pass.clone(),
            config,
        );

        Harness {
            machine,
            ledger,
            store,
            principals,
            late_pass,
        }
    }

    fn id(s: &str) -> PrincipalId {
        PrincipalId::new(s)
    }

    fn entries_of(h: &Harness, action: ActionType) -> Vec<AuditLogEntry> {
        h.ledger
            .entries()
            .unwrap()
            .into_iter()
            .filter(|e| e.action_type == action)
            .collect()
    }

    fn stored_status(h: &Harness, period: u8, student: &str) -> AttendanceStatus {
        let session = h.store.find_session(&session_ref(period).key()).unwrap().unwrap();
        h.store
            .record(&session.id, &StudentId::new(student))
            .unwrap()
            .unwrap()
            .status
    }

    fn signal() -> ProxySignal {
        ProxySignal {
            source: "face-match".to_string(),
            score: 0.91,
            reason: "face did not match enrolment photo".to_string(),
        }
    }

    // ── 1. Marking ────────────────────────────────────────────────────────────

    #[test]
    fn test_first_mark_creates_session_and_record() {
        let h = harness();

        let receipt = h
            .machine
            .mark_single(&id("teacher-cse"), &session_ref(1), &present(1))
            .unwrap();

        assert!(matches!(receipt.outcome, MarkOutcome::Created(_)));
        let entry = receipt.entry.unwrap();
        assert_eq!(entry.action_type, ActionType::Marked);
        assert_eq!(entry.actor_role, "teacher");
        assert_eq!(receipt.outcome.record().edit_count, 0);
        assert!(h.store.find_session(&session_ref(1).key()).unwrap().is_some());
    }

    /// Every post-creation change produces one `edited` entry with old → new.
    #[test]
    fn test_edit_increments_count_and_audits_old_and_new() {
        let h = harness();
        let r = session_ref(1);
        let teacher = id("teacher-cse");

        h.machine.mark_single(&teacher, &r, &absent(1)).unwrap();
        h.machine.mark_single(&teacher, &r, &MarkEntry::late(roll(1), 7)).unwrap();
        let receipt = h
            .machine
            .mark_single(&teacher, &r, &present(1))
            .unwrap();

        let record = receipt.outcome.record();
        assert_eq!(record.edit_count, 2);
        assert_eq!(record.late_minutes, 0);
        assert_eq!(record.last_edited_by, Some(teacher.clone()));

        let edits = entries_of(&h, ActionType::Edited);
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].detail["old_status"], json!("absent"));
        assert_eq!(edits[0].detail["new_status"], json!("late"));
        assert_eq!(edits[1].detail["old_status"], json!("late"));
        assert_eq!(edits[1].detail["new_status"], json!("present"));
        assert_eq!(edits[1].detail["override"], json!(false));
    }

    #[test]
    fn test_identical_remark_is_a_no_op() {
        let h = harness();
        let r = session_ref(1);
        let mark = MarkEntry::late(roll(3), 5);

        h.machine.mark_single(&id("teacher-cse"), &r, &mark).unwrap();
        let again = h.machine.mark_single(&id("teacher-cse"), &r, &mark).unwrap();

        assert!(matches!(again.outcome, MarkOutcome::Unchanged(_)));
        assert!(again.entry.is_none());
        assert_eq!(again.outcome.record().edit_count, 0);
        assert_eq!(h.ledger.len(), 1);
    }

    #[test]
    fn test_late_minutes_validation() {
        let h = harness();
        let r = session_ref(1);

        let mut present_with_minutes = present(1);
        present_with_minutes.late_minutes = Some(10);
        assert!(matches!(
            h.machine.mark_single(&id("teacher-cse"), &r, &present_with_minutes),
            Err(CampusError::ValidationError { .. })
        ));

        assert!(matches!(
            h.machine.mark_single(&id("teacher-cse"), &r, &MarkEntry::late(roll(1), 500)),
            Err(CampusError::ValidationError { .. })
        ));

        // Explicit zero on a non-late status is harmless.
        let mut absent_zero = absent(1);
        absent_zero.late_minutes = Some(0);
        assert!(h.machine.mark_single(&id("teacher-cse"), &r, &absent_zero).is_ok());
    }

    #[test]
    fn test_unenrolled_student_is_validation_error() {
        let h = harness();

        let result = h.machine.mark_single(
            &id("teacher-cse"),
            &session_ref(1),
            &MarkEntry::new("99ME001", AttendanceStatus::Present),
        );

        assert!(matches!(result, Err(CampusError::ValidationError { .. })));
        assert!(h.store.find_session(&session_ref(1).key()).unwrap().is_none());
        assert!(h.ledger.is_empty());
    }

    #[test]
    fn test_other_department_teacher_is_forbidden() {
        let h = harness();

        let result = h.machine.mark_single(
            &id("teacher-ece"),
            &session_ref(1),
            &present(1),
        );

        assert!(matches!(result, Err(CampusError::Forbidden { .. })));
    }

    #[test]
    fn test_inactive_or_unknown_actor_is_forbidden() {
        let h = harness();
        let mut suspended = Principal::new("teacher-gone", "teacher", Some("cse"));
        suspended.status = AccountStatus::Suspended;
        h.principals.insert(suspended).unwrap();

        for actor in ["teacher-gone", "nobody"] {
            let result = h.machine.mark_single(
                &id(actor),
                &session_ref(1),
                &present(1),
            );
            assert!(matches!(result, Err(CampusError::Forbidden { .. })), "{actor}");
        }
    }

    /// The (scope, date, period) key cannot be reused by a different course.
    #[test]
    fn test_session_key_collision_is_validation_error() {
        let h = harness();
        h.machine
            .mark_single(&id("teacher-cse"), &session_ref(1), &present(1))
            .unwrap();

        let mut other = session_ref(1);
        other.course_id = CourseId("CS299".to_string());
        let result = h
            .machine
            .mark_single(&id("teacher-cse"), &other, &present(2));

        assert!(matches!(result, Err(CampusError::ValidationError { .. })));
    }

    // ── 2. Locking ────────────────────────────────────────────────────────────

    #[test]
    fn test_locked_session_rejects_ordinary_writes() {
        let h = harness();
        let r = session_ref(2);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(1)).unwrap();

        let lock = h.machine.lock_session(&id("hod-cse"), &r).unwrap();
        assert!(lock.session.is_locked);
        assert_eq!(lock.entry.action_type, ActionType::SessionLocked);
        assert_eq!(lock.entry.detail["record_count"], json!(1));

        let result = h
            .machine
            .mark_single(&id("teacher-cse"), &r, &absent(1));
        assert!(matches!(result, Err(CampusError::SessionLocked { .. })));

        // Even an identical re-mark is refused once locked.
        let result = h
            .machine
            .mark_single(&id("teacher-cse"), &r, &present(1));
        assert!(matches!(result, Err(CampusError::SessionLocked { .. })));

        assert_eq!(stored_status(&h, 2, &roll(1)), AttendanceStatus::Present);
    }

    #[test]
    fn test_override_write_is_audited_as_override() {
        let h = harness();
        let r = session_ref(2);
        h.machine.mark_single(&id("teacher-cse"), &r, &absent(1)).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();

        let receipt = h
            .machine
            .mark_single(&id("hod-cse"), &r, &present(1))
            .unwrap();

        match &receipt.outcome {
            MarkOutcome::Edited { old_status, overridden, .. } => {
                assert_eq!(*old_status, AttendanceStatus::Absent);
                assert!(*overridden);
            }
            other => panic!("expected Edited, got {:?}", other),
        }
        let entry = receipt.entry.unwrap();
        assert_eq!(entry.action_type, ActionType::Edited);
        assert_eq!(entry.detail["override"], json!(true));
    }

    /// A record first created after the lock is still tagged `edited`.
    #[test]
    fn test_override_creation_is_tagged_edited() {
        let h = harness();
        let r = session_ref(2);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(1)).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();

        let receipt = h
            .machine
            .mark_single(&id("hod-cse"), &r, &present(2))
            .unwrap();

        assert!(matches!(receipt.outcome, MarkOutcome::Created(_)));
        let entry = receipt.entry.unwrap();
        assert_eq!(entry.action_type, ActionType::Edited);
        assert_eq!(entry.detail["override"], json!(true));
        assert_eq!(entry.detail["old_status"], serde_json::Value::Null);
    }

    #[test]
    fn test_lock_is_one_way_and_permissioned() {
        let h = harness();
        let r = session_ref(3);

        assert!(matches!(
            h.machine.lock_session(&id("hod-cse"), &r),
            Err(CampusError::NotFound { .. })
        ));

        h.machine.mark_single(&id("teacher-cse"), &r, &present(1)).unwrap();

        assert!(matches!(
            h.machine.lock_session(&id("teacher-cse"), &r),
            Err(CampusError::Forbidden { .. })
        ));

        h.machine.lock_session(&id("hod-cse"), &r).unwrap();
        assert!(matches!(
            h.machine.lock_session(&id("hod-cse"), &r),
            Err(CampusError::SessionLocked { .. })
        ));
        assert_eq!(entries_of(&h, ActionType::SessionLocked).len(), 1);
    }

    // ── 3. Bulk marking ───────────────────────────────────────────────────────

    #[test]
    fn test_bulk_mark_forty_students_writes_one_entry() {
        let h = harness();
        let marks: Vec<MarkEntry> = (1..=40)
            .map(|i| match i % 10 {
                0 => absent(i),
                7 => MarkEntry::late(roll(i), 4),
                _ => present(i),
            })
            .collect();

        let receipt = h.machine.mark_bulk(&id("teacher-cse"), &session_ref(4), &marks).unwrap();

        assert_eq!(receipt.summary.count, 40);
        assert_eq!(receipt.summary.created, 40);
        assert_eq!(h.ledger.len(), 1);

        let bulk = entries_of(&h, ActionType::BulkMarked);
        assert_eq!(bulk.len(), 1);
        assert_eq!(bulk[0].detail["count"], json!(40));

        let session = h.store.find_session(&session_ref(4).key()).unwrap().unwrap();
        assert_eq!(h.store.records(&session.id).unwrap().len(), 40);
    }

    #[test]
    fn test_bulk_remark_counts_edits_and_unchanged() {
        let h = harness();
        let r = session_ref(4);
        let first: Vec<MarkEntry> = (1..=5).map(|i| present(i)).collect();
        h.machine.mark_bulk(&id("teacher-cse"), &r, &first).unwrap();

        let mut second = first.clone();
        second[0].status = AttendanceStatus::Absent;
        second.push(present(6));

        let receipt = h.machine.mark_bulk(&id("teacher-cse"), &r, &second).unwrap();
        assert_eq!(receipt.summary.count, 6);
        assert_eq!(receipt.summary.created, 1);
        assert_eq!(receipt.summary.edited, 1);
        assert_eq!(receipt.summary.unchanged, 4);
        assert_eq!(entries_of(&h, ActionType::BulkMarked).len(), 2);
    }

    #[test]
    fn test_bulk_rejects_whole_batch_on_bad_entry() {
        let h = harness();
        let r = session_ref(4);

        assert!(matches!(
            h.machine.mark_bulk(&id("teacher-cse"), &r, &[]),
            Err(CampusError::ValidationError { .. })
        ));

        let duplicated = vec![
            present(1),
            absent(1),
        ];
        assert!(matches!(
            h.machine.mark_bulk(&id("teacher-cse"), &r, &duplicated),
            Err(CampusError::ValidationError { .. })
        ));

        let with_stranger = vec![
            present(1),
            MarkEntry::new("99ME001", AttendanceStatus::Present),
        ];
        assert!(matches!(
            h.machine.mark_bulk(&id("teacher-cse"), &r, &with_stranger),
            Err(CampusError::ValidationError { .. })
        ));

        assert!(h.store.find_session(&r.key()).unwrap().is_none());
        assert!(h.ledger.is_empty());
    }

    #[test]
    fn test_bulk_on_locked_session_needs_override() {
        let h = harness();
        let r = session_ref(4);
        let marks = vec![present(1)];
        h.machine.mark_bulk(&id("teacher-cse"), &r, &marks).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();

        assert!(matches!(
            h.machine.mark_bulk(&id("teacher-cse"), &r, &marks),
            Err(CampusError::SessionLocked { .. })
        ));

        let receipt = h.machine.mark_bulk(&id("hod-cse"), &r, &marks).unwrap();
        assert!(receipt.summary.overridden);
        assert_eq!(receipt.entry.detail["override"], json!(true));
    }

    /// Each record a bulk override writes carries its own `edited` entry.
    #[test]
    fn test_bulk_override_audits_each_written_record() {
        let h = harness();
        let r = session_ref(4);
        let first = vec![
            present(1),
            absent(3),
        ];
        h.machine.mark_bulk(&id("teacher-cse"), &r, &first).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();
        let before = h.ledger.len();

        let correction = vec![
            absent(1),
            present(2),
            absent(3),
        ];
        let receipt = h.machine.mark_bulk(&id("hod-cse"), &r, &correction).unwrap();
        assert_eq!(receipt.summary.unchanged, 1);

        let written: Vec<AuditLogEntry> = h.ledger.entries().unwrap().split_off(before);
        let actions: Vec<ActionType> = written.iter().map(|e| e.action_type).collect();
        assert_eq!(
            actions,
            vec![ActionType::Edited, ActionType::Edited, ActionType::BulkMarked]
        );

        assert_eq!(written[0].detail["student_id"], json!(roll(1)));
        assert_eq!(written[0].detail["old_status"], json!("present"));
        assert_eq!(written[0].detail["new_status"], json!("absent"));
        assert_eq!(written[0].detail["override"], json!(true));

        assert_eq!(written[1].detail["student_id"], json!(roll(2)));
        assert_eq!(written[1].detail["old_status"], serde_json::Value::Null);
        assert_eq!(written[1].detail["override"], json!(true));
    }

    // ── 4. Proxy flags and unmarking ──────────────────────────────────────────

    #[test]
    fn test_flag_proxy_never_changes_status() {
        let h = harness();
        let r = session_ref(5);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(8)).unwrap();

        let receipt = h
            .machine
            .flag_proxy(&id("teacher-cse"), &r, &StudentId::new(roll(8)), &signal())
            .unwrap();

        assert_eq!(receipt.record.status, AttendanceStatus::Present);
        assert_eq!(receipt.record.edit_count, 0);
        assert!(receipt.record.under_review);
        assert_eq!(receipt.entry.action_type, ActionType::ProxyDetected);
        assert_eq!(receipt.entry.detail["source"], json!("face-match"));
        assert_eq!(stored_status(&h, 5, &roll(8)), AttendanceStatus::Present);
        assert!(entries_of(&h, ActionType::Edited).is_empty());
    }

    #[test]
    fn test_flag_proxy_allowed_after_lock() {
        let h = harness();
        let r = session_ref(5);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(8)).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();

        assert!(h
            .machine
            .flag_proxy(&id("teacher-cse"), &r, &StudentId::new(roll(8)), &signal())
            .is_ok());
    }

    #[test]
    fn test_flag_proxy_validation() {
        let h = harness();
        let r = session_ref(5);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(8)).unwrap();

        assert!(matches!(
            h.machine.flag_proxy(&id("teacher-cse"), &r, &StudentId::new(roll(9)), &signal()),
            Err(CampusError::NotFound { .. })
        ));

        let mut bad = signal();
        bad.score = 1.5;
        assert!(matches!(
            h.machine.flag_proxy(&id("teacher-cse"), &r, &StudentId::new(roll(8)), &bad),
            Err(CampusError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_unmark_removes_record_and_audits_old_status() {
        let h = harness();
        let r = session_ref(6);
        h.machine.mark_single(&id("teacher-cse"), &r, &absent(2)).unwrap();

        let receipt = h.machine.unmark(&id("teacher-cse"), &r, &StudentId::new(roll(2))).unwrap();

        assert_eq!(receipt.entry.action_type, ActionType::Deleted);
        assert_eq!(receipt.entry.detail["old_status"], json!("absent"));
        let session = h.store.find_session(&r.key()).unwrap().unwrap();
        assert!(h.store.record(&session.id, &StudentId::new(roll(2))).unwrap().is_none());

        assert!(matches!(
            h.machine.unmark(&id("teacher-cse"), &r, &StudentId::new(roll(2))),
            Err(CampusError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unmark_through_lock_is_tagged_edited() {
        let h = harness();
        let r = session_ref(6);
        h.machine.mark_single(&id("teacher-cse"), &r, &absent(2)).unwrap();
        h.machine.lock_session(&id("hod-cse"), &r).unwrap();

        assert!(matches!(
            h.machine.unmark(&id("teacher-cse"), &r, &StudentId::new(roll(2))),
            Err(CampusError::SessionLocked { .. })
        ));

        let receipt = h.machine.unmark(&id("hod-cse"), &r, &StudentId::new(roll(2))).unwrap();
        assert_eq!(receipt.entry.action_type, ActionType::Edited);
        assert_eq!(receipt.entry.detail["old_status"], json!("absent"));
        assert_eq!(receipt.entry.detail["new_status"], serde_json::Value::Null);
        assert_eq!(receipt.entry.detail["removed"], json!(true));
        assert_eq!(receipt.entry.detail["override"], json!(true));
        assert!(entries_of(&h, ActionType::Deleted).is_empty());
    }

    // ── 5. Late-pass feed ─────────────────────────────────────────────────────

    #[test]
    fn test_late_transitions_feed_aggregator() {
        let h = harness();
        let r = session_ref(7);
        let teacher = id("teacher-cse");
        let student = StudentId::new(roll(4));

        h.machine.mark_single(&teacher, &r, &MarkEntry::late(roll(4), 3)).unwrap();
        assert_eq!(h.late_pass.late_count(&student, 3, 2026).unwrap(), 1);

        // Changing minutes on an already-late record is not a new late.
        h.machine.mark_single(&teacher, &r, &MarkEntry::late(roll(4), 9)).unwrap();
        assert_eq!(h.late_pass.late_count(&student, 3, 2026).unwrap(), 1);

        h.machine.mark_single(&teacher, &r, &present(4)).unwrap();
        assert_eq!(h.late_pass.late_count(&student, 3, 2026).unwrap(), 1, "never decreases");

        h.machine.mark_single(&teacher, &r, &MarkEntry::late(roll(4), 2)).unwrap();
        assert_eq!(h.late_pass.late_count(&student, 3, 2026).unwrap(), 2);

        h.machine.unmark(&teacher, &r, &student).unwrap();
        assert_eq!(h.late_pass.late_count(&student, 3, 2026).unwrap(), 2);
    }

    // ── 6. Durability and concurrency ─────────────────────────────────────────

    /// A commit whose audit write fails is reported, never swallowed.
    #[test]
    fn test_audit_failure_after_commit_is_inconsistent_state() {
        let h = harness();
        let r = session_ref(8);
        h.ledger.set_offline(true);

        let result = h
            .machine
            .mark_single(&id("teacher-cse"), &r, &present(1));

        assert!(matches!(result, Err(CampusError::InconsistentState { .. })));
        assert_eq!(stored_status(&h, 8, &roll(1)), AttendanceStatus::Present);
    }

    #[test]
    fn test_stale_version_is_concurrency_conflict() {
        let h = harness();
        let r = session_ref(9);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(1)).unwrap();

        let session = h.store.find_session(&r.key()).unwrap().unwrap();
        let record = h.store.record(&session.id, &StudentId::new(roll(1))).unwrap().unwrap();

        let write = RecordWrite::Update {
            record: record.clone(),
            expected_version: record.version,
        };
        h.store.commit(&session.id, false, std::slice::from_ref(&write)).unwrap();

        let second = h.store.commit(&session.id, false, std::slice::from_ref(&write));
        let err = second.unwrap_err();
        assert!(matches!(err, CampusError::ConcurrencyConflict { .. }));
        assert!(err.is_retryable());

        // A writer that read the session before it was locked must re-read.
        let stale_lock = h.store.commit(&session.id, true, &[]);
        assert!(matches!(stale_lock, Err(CampusError::ConcurrencyConflict { .. })));
    }

    /// Concurrent writers on one record never lose an edit_count increment,
    /// each counted edit has exactly one `edited` entry, and the entries in
    /// ledger order chain old → new without a gap.
    #[test]
    fn test_concurrent_edits_are_serialized() {
        let h = harness();
        let r = session_ref(10);
        h.machine.mark_single(&id("teacher-cse"), &r, &present(1)).unwrap();

        let statuses = [
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
            AttendanceStatus::Present,
        ];
        let total_edits: u32 = std::thread::scope(|s| {
            let handles: Vec<_> = ["teacher-cse", "hod-cse", "teacher-cse", "hod-cse"]
                .into_iter()
                .enumerate()
                .map(|(t, actor)| {
                    let h = &h;
                    let r = &r;
                    s.spawn(move || {
                        let mut edits = 0u32;
                        for i in 0..15 {
                            let mark = MarkEntry::new(roll(1), statuses[(t + i) % 3]);
                            loop {
                                match h.machine.mark_single(&id(actor), r, &mark) {
                                    Ok(receipt) => {
                                        if matches!(receipt.outcome, MarkOutcome::Edited { .. }) {
                                            edits += 1;
                                        }
                                        break;
                                    }
                                    Err(e) if e.is_retryable() => continue,
                                    Err(e) => panic!("unexpected error: {e}"),
                                }
                            }
                        }
                        edits
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).sum()
        });

        let session = h.store.find_session(&r.key()).unwrap().unwrap();
        let record = h.store.record(&session.id, &StudentId::new(roll(1))).unwrap().unwrap();
        assert_eq!(record.edit_count, total_edits);

        let edits = entries_of(&h, ActionType::Edited);
        assert_eq!(edits.len() as u32, total_edits);
        let mut previous = json!("present");
        for (n, entry) in edits.iter().enumerate() {
            assert_eq!(entry.detail["old_status"], previous, "edit {n} breaks the chain");
            assert_eq!(entry.detail["edit_count"], json!(n + 1));
            previous = entry.detail["new_status"].clone();
        }
        assert_eq!(previous, json!(record.status));
        assert!(h.ledger.verify_integrity());
    }

    // ── 7. Configuration ──────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = AttendanceConfig::from_toml_str("").unwrap();
        assert_eq!(config, AttendanceConfig::default());
        assert_eq!(config.threshold().tenths, 650);

        let config =
            AttendanceConfig::from_toml_str("minimum_percentage = 75.5\ngrace_lates = 2").unwrap();
        assert_eq!(config.threshold().tenths, 755);
        assert_eq!(config.deduction_policy().unwrap().deductions(5), 1);
    }

    #[test]
    fn test_config_errors() {
        for bad in [
            "lates_per_half_day = 0",
            "minimum_percentage = 120.0",
            "unknown_knob = true",
            "minimum_percentage = \"high\"",
            "minimum_percentage = 65.04",
        ] {
            assert!(
                matches!(
                    AttendanceConfig::from_toml_str(bad),
                    Err(CampusError::ConfigError { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }
}
