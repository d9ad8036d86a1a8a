//! # campus-ref-college
//!
//! College reference runtime for the campus accountability core.
//!
//! Wires the TOML permission oracle, the mutation gateway, the attendance
//! state machine, the hash-chained ledger, and the request verifier together
//! over in-memory stores, and demonstrates them in four scenarios:
//!
//! 1. **Account Administration**: self-target rejection, department scoping,
//!    idempotent role assignment, and both ledger-failure contracts.
//! 2. **A Day of Attendance**: bulk mark, edit, lock, HOD override, and a
//!    proxy flag on one class period.
//! 3. **Monthly Late Pass**: late counting, half-day deductions, and the
//!    eligibility report around the 65% threshold.
//! 4. **Audit Trail over JSON**: every surface driven through the
//!    dispatcher, then the ledger paged back with cursors.
//!
//! All data is hardcoded and fictional.

pub mod dispatch;
pub mod mock_data;
pub mod runtime;
pub mod scenarios;

pub use dispatch::Dispatcher;
pub use runtime::College;

// ── Tests ─────────────────────────────────────────────────────────────────────
