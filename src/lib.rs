#![deny(unsafe_code)]

//! Configuration core for the TypeDeck typing-practice add-on.
//!
//! The host application embeds this crate behind its settings dialogs and
//! session startup/shutdown hooks. [`ConfigStore`] owns the canonical
//! configuration and its persisted JSON file (atomic writes, default repair
//! of partial or legacy blobs, validated import, deterministic export).
//! [`ConfigSession`] serializes editing across the host's independent entry
//! points (one working copy at a time) and notifies registered listeners
//! after every committed change so open views stay in sync.

pub mod config;
pub mod constants;
pub mod error;

pub use config::{
    BackupEntry, BackupManager, Config, ConfigSession, ConfigStore, DeckMapping,
    InputProcessingConfig, InterfaceConfig, ProcessingConfig,
};
pub use error::{ConfigError, Result};
