//! Status reconciliation and artifact migration.
//!
//! The reconciler pulls provider status into stored jobs, enforcing the
//! forward-only lifecycle, and hands completed jobs to the migration trigger.

mod migration;
mod runner;
mod types;

pub use migration::{MigrationError, MigrationResult, MigrationTrigger};
pub use runner::StatusReconciler;
pub use types::{JobRefresh, MigrationStatus, ReconcileError, RefreshOutcome, RefreshReport};
