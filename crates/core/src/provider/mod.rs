//! Video generation provider abstraction.
//!
//! This module provides a `VideoProvider` trait that hides each provider's
//! wire format and status vocabulary (Luma, Runway, Replicate), plus the
//! registry that resolves provider names to adapters.

mod http;
mod luma;
mod registry;
mod replicate;
mod runway;
mod types;

pub use luma::LumaProvider;
pub use registry::{ProviderRegistry, RegistryError, DEFAULT_FALLBACK_ORDER};
pub use replicate::ReplicateProvider;
pub use runway::RunwayProvider;
pub use types::*;
