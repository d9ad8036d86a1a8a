//! Late-pass aggregation and attendance percentages.
//!
//! The aggregator keeps one late counter per (student, month, year). Leave
//! deductions are never stored: they are recomputed from the counter by
//! `DeductionPolicy::deductions`, so the same count always yields the same
//! result.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use campus_contracts::{
    attendance::StudentId,
    error::{CampusError, CampusResult},
    late_pass::{
        AttendanceCounts, AttendancePercentage, LatePassAccount, Percentage, StudentStanding,
    },
};

/// Maps a monthly late count to half-day leave deductions.
///
/// `f(n) = (n - grace_lates) / lates_per_half_day`, saturating at zero and
/// rounding down. Monotonic non-decreasing in `n` for every valid policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionPolicy {
    lates_per_half_day: u32,
    grace_lates: u32,
}

impl DeductionPolicy {
    pub fn new(lates_per_half_day: u32, grace_lates: u32) -> CampusResult<Self> {
        if lates_per_half_day == 0 {
            return Err(CampusError::ConfigError {
                reason: "lates_per_half_day must be at least 1".to_string(),
            });
        }
        Ok(Self {
            lates_per_half_day,
            grace_lates,
        })
    }

    pub fn lates_per_half_day(&self) -> u32 {
        self.lates_per_half_day
    }

    pub fn grace_lates(&self) -> u32 {
        self.grace_lates
    }

    pub fn deductions(&self, late_count: u32) -> u32 {
        late_count.saturating_sub(self.grace_lates) / self.lates_per_half_day
    }
}

impl Default for DeductionPolicy {
    fn default() -> Self {
        Self {
            lates_per_half_day: 3,
            grace_lates: 0,
        }
    }
}

/// `(present + late) / total * 100`, rounded half up to one decimal.
///
/// A zero total is `NoData`. Counts that exceed the total are rejected.
pub fn attendance_percentage(
    present: u32,
    late: u32,
    total: u32,
) -> CampusResult<AttendancePercentage> {
    let attended = u64::from(present) + u64::from(late);
    let total = u64::from(total);

    if attended > total {
        return Err(CampusError::validation(format!(
            "present + late ({attended}) exceeds total ({total})"
        )));
    }
    if total == 0 {
        return Ok(AttendancePercentage::NoData);
    }

    // round_half_up(attended * 1000 / total), all in integers.
    let tenths = (attended * 2000 + total) / (2 * total);
    Ok(AttendancePercentage::Measured(Percentage::from_tenths(tenths as u32)))
}

type Bucket = (StudentId, u32, i32);

/// Derives monthly late-pass accounts from committed late transitions.
pub struct LatePassAggregator {
    policy: DeductionPolicy,
    threshold: Percentage,
    buckets: Mutex<HashMap<Bucket, u32>>,
}

impl LatePassAggregator {
    pub fn new(policy: DeductionPolicy, threshold: Percentage) -> Self {
        Self {
            policy,
            threshold,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DeductionPolicy {
        self.policy
    }

    pub fn threshold(&self) -> Percentage {
        self.threshold
    }

    /// Count one late arrival on `date`; returns the bucket's new count.
    pub fn record_late(&self, student: &StudentId, date: NaiveDate) -> CampusResult<u32> {
        let key = (student.clone(), date.month(), date.year());
        let mut buckets = self.lock()?;
        let count = buckets.entry(key).or_insert(0);
        *count = count.saturating_add(1);

        debug!(
            student_id = %student,
            month = date.month(),
            year = date.year(),
            late_count = *count,
            "late recorded"
        );
        Ok(*count)
    }

    pub fn late_count(&self, student: &StudentId, month: u32, year: i32) -> CampusResult<u32> {
        Ok(self
            .lock()?
            .get(&(student.clone(), month, year))
            .copied()
            .unwrap_or(0))
    }

    pub fn deductions_for(&self, student: &StudentId, month: u32, year: i32) -> CampusResult<u32> {
        Ok(self.policy.deductions(self.late_count(student, month, year)?))
    }

    pub fn account(
        &self,
        student: &StudentId,
        month: u32,
        year: i32,
    ) -> CampusResult<LatePassAccount> {
        let late_count = self.late_count(student, month, year)?;
        Ok(LatePassAccount {
            student_id: student.clone(),
            month,
            year,
            late_count,
            half_day_leaves_deducted: self.policy.deductions(late_count),
        })
    }

    /// One eligibility report row for `student`.
    pub fn standing(
        &self,
        student: &StudentId,
        month: u32,
        year: i32,
        counts: AttendanceCounts,
    ) -> CampusResult<StudentStanding> {
        let percentage = attendance_percentage(counts.present, counts.late, counts.total())?;
        let account = self.account(student, month, year)?;

        Ok(StudentStanding {
            student_id: student.clone(),
            month,
            year,
            percentage,
            below_threshold: percentage.measured().is_some_and(|p| p < self.threshold),
            late_count: account.late_count,
            half_day_leaves_deducted: account.half_day_leaves_deducted,
        })
    }

    fn lock(&self) -> CampusResult<MutexGuard<'_, HashMap<Bucket, u32>>> {
        self.buckets
            .lock()
            .map_err(|e| CampusError::store(format!("late-pass lock poisoned: {e}")))
    }
}

impl Default for LatePassAggregator {
    fn default() -> Self {
        Self::new(DeductionPolicy::default(), Percentage::from_tenths(650))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
