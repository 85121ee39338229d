//! Edit session mediation
//!
//! Several independent host entry points (the review dialog's embedded
//! settings panel, the standalone settings command, the main session) can
//! open configuration editing within one host process. [`ConfigSession`]
//! serializes them: exactly one working copy may be checked out at a time,
//! and a successful commit notifies every registered listener so other open
//! entry points refresh their displayed values.
//!
//! A second `begin_edit` while one is in flight fails with
//! [`ConfigError::ConcurrentEdit`] rather than handing out a second working
//! copy; two value-typed copies could diverge and silently overwrite each
//! other on commit.

use tracing::{info, warn};

use crate::config::schema::Config;
use crate::config::store::ConfigStore;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditState {
    /// No working copy checked out
    Idle,
    /// Exactly one working copy checked out
    Editing,
}

type ChangeListener = Box<dyn FnMut(&Config)>;

pub struct ConfigSession {
    store: ConfigStore,
    edit_state: EditState,
    listeners: Vec<ChangeListener>,
}

impl ConfigSession {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            edit_state: EditState::Idle,
            listeners: Vec::new(),
        }
    }

    /// Session over the store at the default config path
    pub fn open() -> Self {
        Self::new(ConfigStore::open())
    }

    /// Read access to the canonical configuration for non-editing consumers
    pub fn config(&self) -> &Config {
        self.store.current()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn is_editing(&self) -> bool {
        self.edit_state == EditState::Editing
    }

    /// Check out a working copy for editing. Allowed only while no other
    /// edit is in flight; the returned value is a clone, not a live
    /// reference, and becomes canonical only through [`commit`].
    ///
    /// [`commit`]: ConfigSession::commit
    pub fn begin_edit(&mut self) -> Result<Config> {
        match self.edit_state {
            EditState::Editing => {
                warn!("Edit requested while another edit is in flight");
                Err(ConfigError::ConcurrentEdit)
            }
            EditState::Idle => {
                self.edit_state = EditState::Editing;
                info!("Checked out configuration working copy");
                Ok(self.store.current().clone())
            }
        }
    }

    /// Validate and persist a working copy. On success the canonical
    /// configuration is replaced, all listeners are notified, and the
    /// session returns to idle. On failure the session stays in the editing
    /// state so the caller can fix or retry without losing edits.
    ///
    /// A commit with no working copy checked out is a caller bug (the value
    /// cannot have come from [`begin_edit`]) and is rejected; one-shot
    /// external updates go through [`import`] instead.
    ///
    /// [`begin_edit`]: ConfigSession::begin_edit
    /// [`import`]: ConfigSession::import
    pub fn commit(&mut self, working: Config) -> Result<()> {
        if self.edit_state == EditState::Idle {
            warn!("Commit without a checked-out working copy");
            return Err(ConfigError::NoActiveEdit);
        }

        working.validate()?;
        self.store.save(working)?;
        self.edit_state = EditState::Idle;

        let snapshot = self.store.current().clone();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
        info!(listeners = self.listeners.len(), "Committed configuration change");
        Ok(())
    }

    /// Drop the working copy without persisting
    pub fn discard(&mut self) {
        if self.edit_state == EditState::Editing {
            info!("Discarded configuration working copy");
        }
        self.edit_state = EditState::Idle;
    }

    /// Register a listener run after every successful commit or import.
    /// The host is single-threaded and cooperative, so listeners run to
    /// completion inside the committing call.
    pub fn on_change(&mut self, listener: impl FnMut(&Config) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Apply an externally supplied blob and persist it, notifying
    /// listeners. Rejected in full on any failure: the merge only becomes
    /// canonical through the save, so a validation or persistence error
    /// leaves both memory and disk untouched.
    pub fn import(&mut self, blob: &str) -> Result<Config> {
        if self.edit_state == EditState::Editing {
            return Err(ConfigError::ConcurrentEdit);
        }
        let merged = self.store.import(blob)?;
        self.store.save(merged.clone())?;
        let snapshot = self.store.current().clone();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
        Ok(merged)
    }

    /// Serialized form of the canonical configuration for user-initiated
    /// backup
    pub fn export(&self) -> Result<String> {
        self.store.export()
    }

    /// Re-save the canonical configuration; the host calls this at session
    /// end.
    pub fn persist(&mut self) -> Result<()> {
        let current = self.store.current().clone();
        self.store.save(current)
    }
}
