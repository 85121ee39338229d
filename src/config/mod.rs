//! Configuration management
//!
//! The configuration core of the typing-practice feature: the schema (per-
//! deck field mappings, content-processing and input-processing options,
//! interface preferences), JSON persistence with atomic replace, import/
//! export with validation, edit-session mediation across host entry points,
//! and backup archives.

pub mod backup;
pub mod mapping;
pub mod schema;
pub mod session;
pub mod store;

pub use backup::{BackupEntry, BackupManager};
pub use mapping::DeckMapping;
pub use schema::{Config, InputProcessingConfig, InterfaceConfig, ProcessingConfig};
pub use session::ConfigSession;
pub use store::ConfigStore;
