//! College reference runtime demo scenarios.
//!
//! Each scenario bootstraps its own `College` from the bundled configuration
//! and mock data, then exercises one slice of the accountability core.

pub mod account_admin;
pub mod attendance_day;
pub mod audit_trail;
pub mod late_pass;
