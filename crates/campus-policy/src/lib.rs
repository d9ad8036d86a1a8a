//! # campus-policy
//!
//! A TOML-driven permission oracle for the campus accountability core.
//!
//! ## Overview
//!
//! This crate provides [`TomlPermissionOracle`], which implements the
//! [`PermissionOracle`](campus_core::traits::PermissionOracle) trait. The
//! role catalogue is declared in a TOML file: a list of known permissions
//! and a list of roles, each granting permissions globally or scoped to the
//! holder's department.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use campus_policy::TomlPermissionOracle;
//!
//! let oracle = TomlPermissionOracle::from_file(Path::new("config/roles.toml"))?;
//! // Pass `Arc::new(oracle)` to `MutationGateway::new(...)`.
//! ```

pub mod engine;
pub mod rule;

pub use engine::TomlPermissionOracle;
pub use rule::{Grant, PermissionDef, PolicyConfig, RoleDef};

// ── Tests ─────────────────────────────────────────────────────────────────────
