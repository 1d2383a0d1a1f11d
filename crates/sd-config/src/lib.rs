//! Station detection configuration.
//!
//! This crate provides:
//! - The component catalogue and script dialects
//! - Typed `detection_config` settings with partial-update merges
//! - The configuration store with its lazy base-directory default
//! - Settings document load/save and file discovery
//! - Semantic validation of the detection settings

pub mod component;
pub mod detection;
pub mod document;
pub mod error;
pub mod resolve;
pub mod store;
pub mod validate;

pub use component::{ComponentId, Dialect};
pub use detection::{
    DetectionConfig, GroupField, GroupMapping, HostnamePolicy, PartialDetectionConfig,
    PartialGroupMapping, PartialHostnamePolicy,
};
pub use document::PersistedDocument;
pub use error::{ConfigError, Result};
pub use resolve::{resolve_settings, ConfigLocation, ConfigSource};
pub use store::DetectionStore;
pub use validate::{ValidationError, ValidationResult};
