//! Provider adapters and attachment mirroring for navwarn.
//!
//! This crate provides:
//! - The remote JSON provider and its wire-format mapping
//! - The legacy database provider with cheap change-detection projection
//! - The asynchronous attachment mirror with URL rewriting

pub mod legacy;
pub mod mirror;
pub mod remote;

pub use legacy::{LegacyProvider, LegacySource};
pub use mirror::{AttachmentMirror, MirrorConfig, RemoteAttachment};
pub use remote::{RemoteProvider, RemoteProviderConfig};
