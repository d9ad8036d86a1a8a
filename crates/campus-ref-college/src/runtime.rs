//! Wiring for the college reference runtime.
//!
//! `College` builds every component from the bundled configuration and
//! seeds it with mock data. Scenarios and the demo binary start from here.

use std::sync::Arc;

use tracing::info;

use campus_attendance::{
    AttendanceConfig, AttendanceStateMachine, InMemoryAttendanceStore, LatePassAggregator,
};
use campus_audit::InMemoryAuditLedger;
use campus_contracts::error::CampusResult;
use campus_core::{InMemoryPrincipalStore, MutationGateway};
use campus_policy::TomlPermissionOracle;
use campus_verify::RequestVerifier;

use crate::dispatch::Dispatcher;
use crate::mock_data;

/// The role catalogue shipped with the reference runtime.
pub const ROLES_TOML: &str = include_str!("../config/roles.toml");

/// The attendance policy shipped with the reference runtime.
pub const ATTENDANCE_TOML: &str = include_str!("../config/attendance.toml");

/// A fully wired, mock-seeded college.
///
/// The concrete stores are kept alongside the dispatcher so scenarios can
/// inspect state and inject ledger faults.
pub struct College {
    pub ledger: Arc<InMemoryAuditLedger>,
    pub principals: Arc<InMemoryPrincipalStore>,
    pub attendance_store: Arc<InMemoryAttendanceStore>,
    pub late_pass: Arc<LatePassAggregator>,
    pub dispatcher: Dispatcher,
}

impl College {
    /// A college whose principal store commits mutation and audit together.
    pub fn bootstrap() -> CampusResult<Self> {
        Self::with_principal_store(InMemoryPrincipalStore::new())
    }

    /// A college whose principal store can only mutate, then audit.
    pub fn bootstrap_without_transactions() -> CampusResult<Self> {
        Self::with_principal_store(InMemoryPrincipalStore::without_transactions())
    }

    fn with_principal_store(principals: InMemoryPrincipalStore) -> CampusResult<Self> {
        let oracle = Arc::new(TomlPermissionOracle::from_toml_str(ROLES_TOML)?);
        let config = AttendanceConfig::from_toml_str(ATTENDANCE_TOML)?;

        mock_data::seed_staff(&principals)?;
        let principals = Arc::new(principals);

        let attendance_store = Arc::new(InMemoryAttendanceStore::new());
        mock_data::seed_enrolment(&attendance_store)?;

        let ledger = Arc::new(InMemoryAuditLedger::new());
        let late_pass = Arc::new(LatePassAggregator::new(
            config.deduction_policy()?,
            config.threshold(),
        ));

        let gateway = MutationGateway::new(oracle.clone(), ledger.clone(), principals.clone());
        let attendance = AttendanceStateMachine::new(
            oracle,
            ledger.clone(),
            principals.clone(),
            attendance_store.clone(),
            late_pass.clone(),
            config,
        );
        let dispatcher =
            Dispatcher::new(RequestVerifier::new()?, gateway, attendance, ledger.clone());

        info!("college runtime bootstrapped");

        Ok(Self {
            ledger,
            principals,
            attendance_store,
            late_pass,
            dispatcher,
        })
    }

    pub fn gateway(&self) -> &MutationGateway {
        self.dispatcher.gateway()
    }

    pub fn attendance(&self) -> &AttendanceStateMachine {
        self.dispatcher.attendance()
    }
}
