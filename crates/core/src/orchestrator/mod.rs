//! Generation orchestrator.
//!
//! Fans a single prompt out into three variations, each with its own provider
//! and prompt augmentation:
//! - **cinematic** on Luma
//! - **stylized** on Runway (caller style overrides the default suffix)
//! - **wide_angle** on Luma
//!
//! Submissions run concurrently with independent deadlines. The group is
//! recorded only when every variation was accepted.

mod config;
mod dispatcher;
mod strategy;
mod types;

pub use config::OrchestratorConfig;
pub use dispatcher::Orchestrator;
pub use strategy::{build_requests, VariationStrategy};
pub use types::{DispatchParams, OrchestratorError, SubmissionFailure, SubmissionOutcome};
