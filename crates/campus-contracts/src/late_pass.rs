//! Late-pass and eligibility report types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attendance::StudentId;

/// Monthly late counter and the deductions it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatePassAccount {
    pub student_id: StudentId,
    pub month: u32,
    pub year: i32,
    pub late_count: u32,
    pub half_day_leaves_deducted: u32,
}

/// A percentage held in tenths so comparisons and rounding stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Percentage {
    pub tenths: u32,
}

impl Percentage {
    pub fn from_tenths(tenths: u32) -> Self {
        Self { tenths }
    }

    pub fn value(&self) -> f64 {
        f64::from(self.tenths) / 10.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tenths / 10, self.tenths % 10)
    }
}

/// The attendance percentage, or the absence of any classes to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "percentage")]
pub enum AttendancePercentage {
    NoData,
    Measured(Percentage),
}

impl AttendancePercentage {
    pub fn measured(&self) -> Option<Percentage> {
        match self {
            AttendancePercentage::NoData => None,
            AttendancePercentage::Measured(p) => Some(*p),
        }
    }
}

/// Per-student class counts over a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceCounts {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
}

impl AttendanceCounts {
    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent
    }
}

/// One row of the eligibility report consumed by export utilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStanding {
    pub student_id: StudentId,
    pub month: u32,
    pub year: i32,
    pub percentage: AttendancePercentage,
    /// False when there is no data to judge.
    pub below_threshold: bool,
    pub late_count: u32,
    pub half_day_leaves_deducted: u32,
}
