//! Durable artifact storage.
//!
//! Completed videos are copied out of provider-hosted (often expiring)
//! storage into our own, then served through signed URLs.

mod delivery;
mod local;
mod types;

pub use delivery::{resolve_download, DeliveryError, DownloadLink};
pub use local::LocalArtifactStorage;
pub use types::{ArtifactStorage, DurableRef, SignedUrl, StorageError};
