//! # campus-verify
//!
//! Validation of inbound requests for the campus accountability core.
//!
//! This crate provides [`RequestVerifier`], which checks raw JSON envelopes
//! for the gateway, attendance, and audit-query surfaces in two phases:
//!
//! 1. **Structural**: JSON Schema validation via the `jsonschema` crate.
//! 2. **Semantic**: per-action rules (`RequiredField`, `ForbiddenField`,
//!    `ItemCount`, `DateRangeOrdered`) evaluated against the payload.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use campus_verify::{RequestVerifier, Surface};
//!
//! let verifier = RequestVerifier::new()?;
//! verifier.check(Surface::Gateway, &raw_request)?;
//! ```

pub mod engine;
pub mod rules;
pub mod schema;

pub use engine::{RequestVerifier, VerificationFailure, VerificationReport};
pub use rules::{RequestRule, RuleKind, Surface};
