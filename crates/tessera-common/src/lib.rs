//! tessera-common: collaborators shared by tessera content blocks.
//!
//! This crate provides:
//! - `dom` - arena HTML tree with a mutation journal for the browser layer
//! - `block` - key/value block configuration tables
//! - `icons` - icon span decoration and `:icon:` tokens
//! - `sanitize` / `sniff` - URL and text hygiene, embed and media detection
//! - `placeholders` - localised UI strings
//! - `metadata` - linked-page Open Graph metadata
//! - `analytics` - interaction tracking
//! - `config` - block settings with JSON/TOML loaders
//! - `ids`, `perf`, `telemetry`, `error`

pub mod analytics;
pub mod block;
#[cfg(feature = "cache")]
pub mod cache;
pub mod config;
pub mod dom;
pub mod error;
pub mod icons;
pub mod ids;
pub mod metadata;
pub mod perf;
pub mod placeholders;
pub mod sanitize;
pub mod sniff;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::analytics::{InteractionEvent, InteractionTracker, MemoryTracker, NoopTracker};
pub use crate::block::{BlockConfig, ConfigValue, read_block_config, to_class_name};
pub use crate::config::CarouselSettings;
pub use crate::dom::{Dom, NodeId, Patch};
pub use crate::error::{PlayerError, TesseraError};
pub use crate::ids::IdGenerator;
pub use crate::metadata::{PageMetadata, PageMetadataSource};
pub use crate::placeholders::{PlaceholderSource, Placeholders};
