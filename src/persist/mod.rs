//! Artifact persistence.
//!
//! This module handles storing the synthesized server configuration:
//! - Memory, local filesystem and S3 backends behind one store trait
//! - Owner references tying an artifact to its registry
//! - Conflict-aware upserts with bounded retry

mod artifact;
mod local;
mod lock;
mod memory;
mod persister;
mod retry;
mod s3;
mod store;

pub use artifact::{
    Artifact, ArtifactMeta, CONTENT_CHECKSUM_ANNOTATION, OwnerReference, artifact_key,
    set_owner_reference,
};
pub use local::LocalArtifactStore;
pub use lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
pub use memory::MemoryArtifactStore;
pub use persister::{ChecksumComparator, ConfigPersister, UpsertOutcome};
pub use retry::{RetryPolicy, retry_on_conflict};
pub use s3::S3ArtifactStore;
pub use store::ArtifactStore;
