//! Campus Accountability Core — Demo CLI
//!
//! Runs one or all of the college reference scenarios, or dispatches a single
//! raw JSON request against a freshly seeded college.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- account-admin
//!   cargo run -p demo -- attendance
//!   cargo run -p demo -- late-pass
//!   cargo run -p demo -- audit-trail
//!   cargo run -p demo -- request gateway '{"action":"delete_user","actor_id":"admin-1","target_id":"staff-cse-7"}'

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use campus_contracts::error::{CampusError, CampusResult};
use campus_ref_college::{
    scenarios::{account_admin, attendance_day, audit_trail, late_pass},
    College,
};
use campus_verify::Surface;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Campus accountability core: college reference demo.
///
/// Each subcommand runs one or all of the college scenarios, demonstrating
/// permission checks, audited mutations, attendance locking, and the
/// hash-chained audit ledger.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Campus accountability core reference demo",
    long_about = "Runs college reference scenarios showing permission scoping,\n\
                  audited account mutations, attendance locking, late-pass\n\
                  deductions, and audit chain integrity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four college scenarios in sequence.
    RunAll,
    /// Scenario 1: Account Administration (gateway decisions and ledger faults).
    AccountAdmin,
    /// Scenario 2: A Day of Attendance (mark, edit, lock, override, proxy flag).
    Attendance,
    /// Scenario 3: Monthly Late Pass (deductions and eligibility report).
    LatePass,
    /// Scenario 4: Audit Trail over JSON (dispatcher and cursor paging).
    AuditTrail,
    /// Dispatch one JSON request and print the response envelope.
    Request {
        /// The surface the request arrives on.
        #[arg(value_enum)]
        surface: SurfaceArg,
        /// The raw JSON request body.
        payload: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SurfaceArg {
    Gateway,
    Attendance,
    AuditQuery,
}

impl From<SurfaceArg> for Surface {
    fn from(arg: SurfaceArg) -> Self {
        match arg {
            SurfaceArg::Gateway => Surface::Gateway,
            SurfaceArg::Attendance => Surface::Attendance,
            SurfaceArg::AuditQuery => Surface::AuditQuery,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Request { surface, payload } => run_request(surface.into(), &payload),
        command => {
            print_banner();
            run_scenarios(command)
        }
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_scenarios(command: Command) -> CampusResult<()> {
    match command {
        Command::RunAll => {
            account_admin::run_scenario()?;
            attendance_day::run_scenario()?;
            late_pass::run_scenario()?;
            audit_trail::run_scenario()?;
        }
        Command::AccountAdmin => account_admin::run_scenario()?,
        Command::Attendance => attendance_day::run_scenario()?,
        Command::LatePass => late_pass::run_scenario()?,
        Command::AuditTrail => audit_trail::run_scenario()?,
        Command::Request { .. } => {}
    }
    println!("All selected scenarios completed successfully.");
    Ok(())
}

fn run_request(surface: Surface, payload: &str) -> CampusResult<()> {
    let raw: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| CampusError::validation(format!("request is not valid JSON: {e}")))?;

    let college = College::bootstrap()?;
    let response = college.dispatcher.dispatch(surface, &raw);
    info!(%surface, ok = response.is_ok(), "request dispatched");

    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|e| CampusError::store(format!("failed to render response: {e}")))?;
    println!("{rendered}");
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Campus Accountability Core");
    println!("College Reference Demo");
    println!("==========================");
    println!();
    println!("Enforcement pipeline per privileged request:");
    println!("  [1] Request verified against its surface schema and semantic rules");
    println!("  [2] Target resolved; self-targeted mutations rejected outright");
    println!("  [3] Permission oracle answers global / department / deny for the actor");
    println!("  [4] Lock rules: locked sessions need the override permission");
    println!("  [5] Mutation committed and audit entry appended to the SHA-256 chain");
    println!();
}
