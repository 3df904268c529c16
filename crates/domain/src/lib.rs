//! Domain layer for perch.
//!
//! This crate contains the core data model for the perch subscription
//! monitor: observed records, subscription entities, and the capability
//! model that decides which delivery actions a given source can feed.
//! It is independent of infrastructure concerns like HTTP, scheduling,
//! or file storage.
//!
//! # Module Structure
//!
//! - **record**: the normalized unit of observed content and its payload
//!   variants
//! - **subscription**: one monitoring task binding a source to delivery
//!   actions, a schedule, and keyword filters
//! - **capability**: kind enums and the compatibility table between
//!   sources and actions

pub mod capability;
pub mod error;
pub mod record;
pub mod subscription;

pub use capability::{
    supports_capabilities, ActionKind, Capability, CapabilityRegistry, RecordKind, SpiderKind,
};
pub use error::{DomainError, DomainResult};
pub use record::{CertProbe, DownloadRequest, Record, RecordPayload};
pub use subscription::{ActionConfig, SpiderConfig, Subscription};
