//! The attendance state machine.
//!
//! Records move `Unmarked → Marked → Edited*`, gated by their session's
//! `Unlocked → Locked` state. Every operation runs:
//!
//!   Resolve actor → Permission → Validate → Session → Lock rules → Commit → Audit
//!
//! Records and the ledger live in different stores, so a committed batch is
//! audited second. If that audit write fails the caller gets
//! `InconsistentState`, never success. Concurrent writers are serialized by
//! per-record versions: a stale read loses with `ConcurrencyConflict`.
//!
//! Each session has a write gate held from commit through audit, so the
//! ledger sees a session's writes in the order they were committed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use campus_contracts::{
    attendance::{
        AttendanceRecord, AttendanceSession, AttendanceStatus, BulkMarkSummary, MarkEntry,
        MarkOutcome, ProxySignal, RecordId, RecordWrite, SessionId, SessionRef, StudentId,
    },
    audit::{ActionType, AuditLogEntry, NewAuditEntry, TargetType},
    error::{CampusError, CampusResult},
    permission::Permission,
    principal::{DepartmentId, Principal, PrincipalId},
};
use campus_core::traits::{AttendanceStore, AuditLedger, PermissionOracle, PrincipalStore};

use crate::config::AttendanceConfig;
use crate::late_pass::LatePassAggregator;

// ── Receipts ─────────────────────────────────────────────────────────────────

/// The result of a single mark. `entry` is `None` for an unchanged re-mark.
#[derive(Debug, Clone)]
pub struct MarkReceipt {
    pub outcome: MarkOutcome,
    pub entry: Option<AuditLogEntry>,
}

#[derive(Debug, Clone)]
pub struct BulkMarkReceipt {
    pub summary: BulkMarkSummary,
    pub entry: AuditLogEntry,
}

#[derive(Debug, Clone)]
pub struct ProxyFlagReceipt {
    pub record: AttendanceRecord,
    pub entry: AuditLogEntry,
}

#[derive(Debug, Clone)]
pub struct LockReceipt {
    pub session: AttendanceSession,
    pub entry: AuditLogEntry,
}

#[derive(Debug, Clone)]
pub struct UnmarkReceipt {
    pub removed: AttendanceRecord,
    pub entry: AuditLogEntry,
}

/// One planned write and what it means for the audit trail.
struct Planned {
    write: RecordWrite,
    old_status: Option<AttendanceStatus>,
}

// ── State machine ────────────────────────────────────────────────────────────

pub struct AttendanceStateMachine {
    oracle: Arc<dyn PermissionOracle>,
    ledger: Arc<dyn AuditLedger>,
    principals: Arc<dyn PrincipalStore>,
    store: Arc<dyn AttendanceStore>,
    late_pass: Arc<LatePassAggregator>,
    config: AttendanceConfig,
    gates: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl AttendanceStateMachine {
    pub fn new(
        oracle: Arc<dyn PermissionOracle>,
        ledger: Arc<dyn AuditLedger>,
        principals: Arc<dyn PrincipalStore>,
        store: Arc<dyn AttendanceStore>,
        late_pass: Arc<LatePassAggregator>,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            oracle,
            ledger,
            principals,
            store,
            late_pass,
            config,
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn late_pass(&self) -> &LatePassAggregator {
        &self.late_pass
    }

    /// Mark one student, creating the session and record on first use.
    ///
    /// Re-marking with the identical status and late minutes writes nothing.
    pub fn mark_single(
        &self,
        actor_id: &PrincipalId,
        session_ref: &SessionRef,
        mark: &MarkEntry,
    ) -> CampusResult<MarkReceipt> {
        let actor = self.resolve(actor_id)?;
        self.require(&actor, Permission::MARK_ATTENDANCE, &session_ref.scope.department_id)?;

        let late_minutes = self.late_minutes(mark)?;
        self.require_enrolled(session_ref, &mark.student_id)?;

        let session = self.store.open_session(session_ref, &actor.id)?;
        let overridden = self.check_lock(&actor, &session)?;

        let existing = self.store.record(&session.id, &mark.student_id)?;
        let Some(planned) = plan(&actor, &session, existing.as_ref(), mark, late_minutes) else {
            debug!(
                session_id = %session.id,
                student_id = %mark.student_id,
                "identical re-mark ignored"
            );
            let record = existing.ok_or_else(|| {
                CampusError::store("unchanged mark without a stored record")
            })?;
            return Ok(MarkReceipt {
                outcome: MarkOutcome::Unchanged(record),
                entry: None,
            });
        };

        let (record, entry) = self.gated(&session, || {
            let record = self
                .commit(&session, std::slice::from_ref(&planned))?
                .into_iter()
                .next()
                .ok_or_else(|| CampusError::store("commit returned no record"))?;

            // A write into a locked session is always an accountable edit.
            let entry = if planned.old_status.is_none() && !overridden {
                NewAuditEntry::by(
                    &actor,
                    ActionType::Marked,
                    TargetType::AttendanceRecord,
                    record.id.0.to_string(),
                    json!({
                        "student_id": record.student_id,
                        "status": record.status,
                        "late_minutes": record.late_minutes,
                        "session_id": session.id,
                    }),
                )
            } else {
                NewAuditEntry::by(
                    &actor,
                    ActionType::Edited,
                    TargetType::AttendanceRecord,
                    record.id.0.to_string(),
                    edited_detail(&record, planned.old_status, &session, overridden),
                )
            };
            let entry = self.audit(entry, &session)?;
            Ok((record, entry))
        })?;

        let action = entry.action_type;
        let outcome = match planned.old_status {
            None => MarkOutcome::Created(record.clone()),
            Some(old_status) => MarkOutcome::Edited {
                record: record.clone(),
                old_status,
                overridden,
            },
        };

        info!(
            actor_id = %actor.id,
            session_id = %session.id,
            student_id = %record.student_id,
            action = %action,
            overridden,
            "attendance mark committed"
        );

        Ok(MarkReceipt {
            outcome,
            entry: Some(entry),
        })
    }

    /// Apply many marks as one batch with a single `bulk_marked` entry.
    ///
    /// The whole batch is validated before anything is written; one bad
    /// entry rejects all of them. On a locked session every record written
    /// through the override also gets its own `edited` entry, ahead of the
    /// batch entry.
    pub fn mark_bulk(
        &self,
        actor_id: &PrincipalId,
        session_ref: &SessionRef,
        marks: &[MarkEntry],
    ) -> CampusResult<BulkMarkReceipt> {
        let actor = self.resolve(actor_id)?;
        self.require(&actor, Permission::MARK_ATTENDANCE, &session_ref.scope.department_id)?;

        if marks.is_empty() {
            return Err(CampusError::validation("bulk mark needs at least one entry"));
        }

        let mut seen = HashSet::new();
        let mut minutes = Vec::with_capacity(marks.len());
        for mark in marks {
            if !seen.insert(&mark.student_id) {
                return Err(CampusError::validation(format!(
                    "student '{}' appears more than once in the batch",
                    mark.student_id
                )));
            }
            minutes.push(self.late_minutes(mark)?);
            self.require_enrolled(session_ref, &mark.student_id)?;
        }

        let session = self.store.open_session(session_ref, &actor.id)?;
        let overridden = self.check_lock(&actor, &session)?;

        let existing: HashMap<StudentId, AttendanceRecord> = self
            .store
            .records(&session.id)?
            .into_iter()
            .map(|r| (r.student_id.clone(), r))
            .collect();

        let planned: Vec<Planned> = marks
            .iter()
            .zip(minutes)
            .filter_map(|(mark, late_minutes)| {
                plan(&actor, &session, existing.get(&mark.student_id), mark, late_minutes)
            })
            .collect();

        let created = planned.iter().filter(|p| p.old_status.is_none()).count();
        let edited = planned.len() - created;
        let summary = BulkMarkSummary {
            session_id: session.id,
            count: marks.len(),
            created,
            edited,
            unchanged: marks.len() - planned.len(),
            overridden,
        };

        let entry = self.gated(&session, || {
            if !planned.is_empty() {
                let committed = self.commit(&session, &planned)?;
                if overridden {
                    for (record, p) in committed.iter().zip(&planned) {
                        self.audit(
                            NewAuditEntry::by(
                                &actor,
                                ActionType::Edited,
                                TargetType::AttendanceRecord,
                                record.id.0.to_string(),
                                edited_detail(record, p.old_status, &session, true),
                            ),
                            &session,
                        )?;
                    }
                }
            }

            self.audit(
                NewAuditEntry::by(
                    &actor,
                    ActionType::BulkMarked,
                    TargetType::AttendanceSession,
                    session.id.0.to_string(),
                    json!({
                        "count": summary.count,
                        "created": summary.created,
                        "edited": summary.edited,
                        "unchanged": summary.unchanged,
                        "date": session.date,
                        "period": session.period,
                        "override": overridden,
                    }),
                ),
                &session,
            )
        })?;

        info!(
            actor_id = %actor.id,
            session_id = %session.id,
            count = summary.count,
            created,
            edited,
            "bulk mark committed"
        );

        Ok(BulkMarkReceipt { summary, entry })
    }

    /// Quarantine a record for human review on an external proxy signal.
    ///
    /// The record's status and edit count are left alone.
    pub fn flag_proxy(
        &self,
        actor_id: &PrincipalId,
        session_ref: &SessionRef,
        student: &StudentId,
        signal: &ProxySignal,
    ) -> CampusResult<ProxyFlagReceipt> {
        let actor = self.resolve(actor_id)?;
        self.require(&actor, Permission::MARK_ATTENDANCE, &session_ref.scope.department_id)?;

        if !signal.score.is_finite() || !(0.0..=1.0).contains(&signal.score) {
            return Err(CampusError::validation(format!(
                "proxy signal score must be within 0.0..=1.0, got {}",
                signal.score
            )));
        }
        if signal.source.trim().is_empty() {
            return Err(CampusError::validation("proxy signal needs a source"));
        }

        let session = self.existing_session(session_ref)?;
        let record = self.existing_record(&session, student)?;

        let (record, entry) = self.gated(&session, || {
            let record = if record.under_review {
                record
            } else {
                let mut flagged = record.clone();
                flagged.under_review = true;
                let write = Planned {
                    write: RecordWrite::Update {
                        record: flagged,
                        expected_version: record.version,
                    },
                    old_status: Some(record.status),
                };
                self.commit(&session, std::slice::from_ref(&write))?
                    .into_iter()
                    .next()
                    .ok_or_else(|| CampusError::store("commit returned no record"))?
            };

            let entry = self.audit(
                NewAuditEntry::by(
                    &actor,
                    ActionType::ProxyDetected,
                    TargetType::AttendanceRecord,
                    record.id.0.to_string(),
                    json!({
                        "student_id": record.student_id,
                        "status": record.status,
                        "session_id": session.id,
                        "source": signal.source,
                        "score": signal.score,
                        "reason": signal.reason,
                    }),
                ),
                &session,
            )?;
            Ok((record, entry))
        })?;

        warn!(
            session_id = %session.id,
            student_id = %record.student_id,
            source = %signal.source,
            score = signal.score,
            "record quarantined for proxy review"
        );

        Ok(ProxyFlagReceipt { record, entry })
    }

    /// Lock the session. Locking is one-way.
    pub fn lock_session(
        &self,
        actor_id: &PrincipalId,
        session_ref: &SessionRef,
    ) -> CampusResult<LockReceipt> {
        let actor = self.resolve(actor_id)?;
        self.require(&actor, Permission::LOCK_ATTENDANCE, &session_ref.scope.department_id)?;

        let session = self.existing_session(session_ref)?;
        let (session, entry) = self.gated(&session, || {
            let session = self.store.lock_session(&session.id, &actor.id)?;
            let record_count = self.store.records(&session.id)?.len();

            let entry = self.audit(
                NewAuditEntry::by(
                    &actor,
                    ActionType::SessionLocked,
                    TargetType::AttendanceSession,
                    session.id.0.to_string(),
                    json!({
                        "course_id": session.course_id,
                        "date": session.date,
                        "period": session.period,
                        "record_count": record_count,
                    }),
                ),
                &session,
            )?;
            Ok((session, entry))
        })?;

        info!(actor_id = %actor.id, session_id = %session.id, "attendance session locked");
        Ok(LockReceipt { session, entry })
    }

    /// Remove a student's record from the session.
    ///
    /// A removal through a lock is audited as `edited` with a null
    /// `new_status`; otherwise it is `deleted`.
    pub fn unmark(
        &self,
        actor_id: &PrincipalId,
        session_ref: &SessionRef,
        student: &StudentId,
    ) -> CampusResult<UnmarkReceipt> {
        let actor = self.resolve(actor_id)?;
        self.require(&actor, Permission::MARK_ATTENDANCE, &session_ref.scope.department_id)?;

        let session = self.existing_session(session_ref)?;
        let overridden = self.check_lock(&actor, &session)?;
        let record = self.existing_record(&session, student)?;

        let write = Planned {
            write: RecordWrite::Delete {
                student_id: student.clone(),
                expected_version: record.version,
            },
            old_status: Some(record.status),
        };
        let entry = self.gated(&session, || {
            self.commit(&session, std::slice::from_ref(&write))?;

            let entry = if overridden {
                NewAuditEntry::by(
                    &actor,
                    ActionType::Edited,
                    TargetType::AttendanceRecord,
                    record.id.0.to_string(),
                    json!({
                        "student_id": record.student_id,
                        "old_status": record.status,
                        "new_status": Value::Null,
                        "removed": true,
                        "session_id": session.id,
                        "override": true,
                    }),
                )
            } else {
                NewAuditEntry::by(
                    &actor,
                    ActionType::Deleted,
                    TargetType::AttendanceRecord,
                    record.id.0.to_string(),
                    json!({
                        "student_id": record.student_id,
                        "old_status": record.status,
                        "session_id": session.id,
                        "override": false,
                    }),
                )
            };
            self.audit(entry, &session)
        })?;

        info!(
            actor_id = %actor.id,
            session_id = %session.id,
            student_id = %student,
            "attendance record removed"
        );

        Ok(UnmarkReceipt {
            removed: record,
            entry,
        })
    }

    // ── Preconditions ────────────────────────────────────────────────────────

    fn resolve(&self, actor_id: &PrincipalId) -> CampusResult<Principal> {
        self.principals
            .get(actor_id)?
            .ok_or_else(|| CampusError::forbidden(format!("actor '{actor_id}' has no account")))
    }

    fn require(
        &self,
        actor: &Principal,
        permission: &str,
        department: &DepartmentId,
    ) -> CampusResult<()> {
        let decision = self.oracle.check(actor, permission);
        if decision.authorizes(Some(department)) {
            return Ok(());
        }

        warn!(
            actor_id = %actor.id,
            permission = %permission,
            department = %department,
            decision = ?decision,
            "attendance permission check failed"
        );
        Err(CampusError::forbidden(format!(
            "actor '{}' may not use '{}' in department '{}'",
            actor.id, permission, department
        )))
    }

    /// `Ok(true)` when the write goes through a lock override.
    fn check_lock(&self, actor: &Principal, session: &AttendanceSession) -> CampusResult<bool> {
        if !session.is_locked {
            return Ok(false);
        }

        let decision = self.oracle.check(actor, Permission::OVERRIDE_ATTENDANCE_LOCK);
        if decision.authorizes(Some(session.department())) {
            warn!(actor_id = %actor.id, session_id = %session.id, "writing through session lock");
            return Ok(true);
        }

        Err(CampusError::SessionLocked {
            session_id: session.id.to_string(),
        })
    }

    /// Validate and normalise a mark's late minutes.
    fn late_minutes(&self, mark: &MarkEntry) -> CampusResult<u32> {
        match (mark.status, mark.late_minutes) {
            (AttendanceStatus::Late, Some(m)) if m > self.config.max_late_minutes => {
                Err(CampusError::validation(format!(
                    "late_minutes {} for '{}' exceeds the maximum of {}",
                    m, mark.student_id, self.config.max_late_minutes
                )))
            }
            (AttendanceStatus::Late, m) => Ok(m.unwrap_or(0)),
            (_, None) | (_, Some(0)) => Ok(0),
            (status, Some(m)) => Err(CampusError::validation(format!(
                "late_minutes {} given for '{}' marked {}",
                m, mark.student_id, status
            ))),
        }
    }

    fn require_enrolled(&self, session_ref: &SessionRef, student: &StudentId) -> CampusResult<()> {
        if self.store.is_enrolled(&session_ref.scope, student)? {
            Ok(())
        } else {
            Err(CampusError::validation(format!(
                "student '{}' is not enrolled in {}",
                student, session_ref.scope
            )))
        }
    }

    fn existing_session(&self, session_ref: &SessionRef) -> CampusResult<AttendanceSession> {
        let key = session_ref.key();
        let session = self
            .store
            .find_session(&key)?
            .ok_or_else(|| CampusError::not_found(format!("attendance session {key}")))?;

        if session.course_id != session_ref.course_id
            || session.timetable_slot_id != session_ref.timetable_slot_id
        {
            return Err(CampusError::validation(format!(
                "session {key} belongs to course '{}' slot '{}'",
                session.course_id, session.timetable_slot_id
            )));
        }
        Ok(session)
    }

    fn existing_record(
        &self,
        session: &AttendanceSession,
        student: &StudentId,
    ) -> CampusResult<AttendanceRecord> {
        self.store.record(&session.id, student)?.ok_or_else(|| {
            CampusError::not_found(format!(
                "attendance record for '{}' in session '{}'",
                student, session.id
            ))
        })
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Run `write` while holding `session`'s write gate.
    fn gated<T>(
        &self,
        session: &AttendanceSession,
        write: impl FnOnce() -> CampusResult<T>,
    ) -> CampusResult<T> {
        let gate = {
            let mut gates = self
                .gates
                .lock()
                .map_err(|e| CampusError::store(format!("session gate table poisoned: {e}")))?;
            Arc::clone(gates.entry(session.id).or_default())
        };
        let _held = gate
            .lock()
            .map_err(|e| CampusError::store(format!("session gate poisoned: {e}")))?;
        write()
    }

    /// Commit `planned` and feed new late transitions to the aggregator.
    fn commit(
        &self,
        session: &AttendanceSession,
        planned: &[Planned],
    ) -> CampusResult<Vec<AttendanceRecord>> {
        let writes: Vec<RecordWrite> = planned.iter().map(|p| p.write.clone()).collect();
        let committed = self.store.commit(&session.id, session.is_locked, &writes)?;

        let previous: HashMap<&StudentId, Option<AttendanceStatus>> = planned
            .iter()
            .map(|p| (p.write.student_id(), p.old_status))
            .collect();

        for record in committed.iter().filter(|r| r.status == AttendanceStatus::Late) {
            let was_late = previous
                .get(&record.student_id)
                .is_some_and(|old| *old == Some(AttendanceStatus::Late));
            if !was_late {
                self.late_pass.record_late(&record.student_id, session.date)?;
            }
        }

        Ok(committed)
    }

    /// Append `entry`; a failure after a commit is an inconsistent state.
    fn audit(
        &self,
        entry: NewAuditEntry,
        session: &AttendanceSession,
    ) -> CampusResult<AuditLogEntry> {
        let action = entry.action_type;
        let target = entry.target_id.clone();

        self.ledger.append(entry).map_err(|e| {
            error!(
                session_id = %session.id,
                action = %action,
                target_id = %target,
                error = %e,
                "attendance write committed but audit write failed; manual reconciliation required"
            );
            CampusError::InconsistentState {
                mutation: format!("{action} on '{target}' in session '{}'", session.id),
                reason: e.to_string(),
            }
        })
    }
}

fn edited_detail(
    record: &AttendanceRecord,
    old_status: Option<AttendanceStatus>,
    session: &AttendanceSession,
    overridden: bool,
) -> Value {
    json!({
        "student_id": record.student_id,
        "old_status": old_status,
        "new_status": record.status,
        "late_minutes": record.late_minutes,
        "edit_count": record.edit_count,
        "session_id": session.id,
        "override": overridden,
    })
}

/// Decide what writing `mark` over `existing` means. `None` means no change.
fn plan(
    actor: &Principal,
    session: &AttendanceSession,
    existing: Option<&AttendanceRecord>,
    mark: &MarkEntry,
    late_minutes: u32,
) -> Option<Planned> {
    match existing {
        None => Some(Planned {
            write: RecordWrite::Insert(AttendanceRecord {
                id: RecordId::new(),
                session_id: session.id,
                student_id: mark.student_id.clone(),
                status: mark.status,
                late_minutes,
                edit_count: 0,
                marked_by: actor.id.clone(),
                last_edited_by: None,
                under_review: false,
                version: 0,
                updated_at: Utc::now(),
            }),
            old_status: None,
        }),
        Some(current) if current.status == mark.status && current.late_minutes == late_minutes => {
            None
        }
        Some(current) => {
            let mut record = current.clone();
            record.status = mark.status;
            record.late_minutes = late_minutes;
            record.edit_count += 1;
            record.last_edited_by = Some(actor.id.clone());
            Some(Planned {
                write: RecordWrite::Update {
                    record,
                    expected_version: current.version,
                },
                old_status: Some(current.status),
            })
        }
    }
}
