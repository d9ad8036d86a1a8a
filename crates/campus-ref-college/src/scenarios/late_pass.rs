//! Scenario 3: Monthly Late Pass and Eligibility
//!
//! Twenty CS201 periods in September are bulk-marked for three students,
//! then the month's eligibility report is built from the committed records.
//!
//! - 24CS005: 13 present, 2 late, 5 absent → 75.0%, no deduction
//! - 24CS009: 10 present, 3 late, 7 absent → 65.0%, exactly at the threshold
//! - 24CS012:  8 present, 4 late, 8 absent → 60.0%, below the threshold
//! - 24CS040: never marked                 → no data
//!
//! A late later corrected to present stays counted: the late pass follows
//! transitions into `late`, not the final state.

use campus_contracts::{
    attendance::{AttendanceStatus, MarkEntry, StudentId},
    error::CampusResult,
    late_pass::{AttendancePercentage, StudentStanding},
    principal::PrincipalId,
};

use crate::mock_data::{data_structures, term_day};
use crate::runtime::College;

const MONTH: u32 = 9;
const YEAR: i32 = 2026;

/// (student, last present day, last late day); later days are absences.
const PATTERNS: &[(&str, u32, u32)] = &[
    ("24CS005", 13, 15),
    ("24CS009", 10, 13),
    ("24CS012", 8, 12),
];

fn mark_for(student: &str, day: u32, last_present: u32, last_late: u32) -> MarkEntry {
    if day <= last_present {
        MarkEntry::new(student, AttendanceStatus::Present)
    } else if day <= last_late {
        MarkEntry::late(student, 5 + day)
    } else {
        MarkEntry::new(student, AttendanceStatus::Absent)
    }
}

/// Bulk-mark days 1..=20 of September for every student in `PATTERNS`.
fn mark_month(college: &College, teacher: &PrincipalId) -> CampusResult<()> {
    for day in 1..=20 {
        let marks: Vec<MarkEntry> = PATTERNS
            .iter()
            .map(|(student, present, late)| mark_for(student, day, *present, *late))
            .collect();
        college
            .attendance()
            .mark_bulk(teacher, &data_structures(term_day(day), 1), &marks)?;
    }
    Ok(())
}

fn standing(college: &College, student: &StudentId) -> CampusResult<StudentStanding> {
    let counts = college.attendance_store.counts_for(student, MONTH, YEAR)?;
    college.late_pass.standing(student, MONTH, YEAR, counts)
}

/// Run Scenario 3: Monthly Late Pass and Eligibility.
pub fn run_scenario() -> CampusResult<()> {
    println!("=== Scenario 3: Monthly Late Pass and Eligibility ===");
    println!();

    let college = College::bootstrap()?;
    let teacher = PrincipalId::new("teacher-cse-1");

    println!(
        "  Policy: {} lates per half-day, threshold {}%",
        college.late_pass.policy().lates_per_half_day(),
        college.late_pass.threshold()
    );
    mark_month(&college, &teacher)?;
    println!("  Marked CS201 period 1 for 1..=20 September");
    println!();

    // ── Correct one late; the counter keeps it ───────────────────────────────

    {
        let student = StudentId::new("24CS009");
        let before = college.late_pass.late_count(&student, MONTH, YEAR)?;
        college.attendance().mark_single(
            &teacher,
            &data_structures(term_day(11), 1),
            &MarkEntry::new("24CS009", AttendanceStatus::Present),
        )?;
        let after = college.late_pass.late_count(&student, MONTH, YEAR)?;
        println!("  24CS009 late on 11 Sep corrected to present");
        println!("  Late count before/after: {before} / {after}");
        println!();
    }

    // ── Eligibility report ───────────────────────────────────────────────────

    println!("  {:<9} {:>7} {:>6} {:>10}  flag", "student", "pct", "lates", "half-days");
    let mut students: Vec<StudentId> = PATTERNS
        .iter()
        .map(|(s, _, _)| StudentId::new(*s))
        .collect();
    students.push(StudentId::new("24CS040"));

    for student in &students {
        let row = standing(&college, student)?;
        let pct = match row.percentage {
            AttendancePercentage::Measured(p) => p.to_string(),
            AttendancePercentage::NoData => "n/a".to_string(),
        };
        println!(
            "  {:<9} {:>7} {:>6} {:>10}  {}",
            student.0,
            pct,
            row.late_count,
            row.half_day_leaves_deducted,
            if row.below_threshold { "BELOW" } else { "-" }
        );
    }
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
