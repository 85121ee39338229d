//! Canonical configuration storage
//!
//! [`ConfigStore`] is the sole owner of the persisted configuration file and
//! of the canonical in-memory [`Config`]. Loading repairs partial or legacy
//! blobs through the schema's serde defaults; saving is an atomic
//! write-temp-then-rename so an interrupted write can never corrupt the
//! previous good copy.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::schema::{Config, SECTION_KEYS};
use crate::constants::config::{APP_DIR, ENV_CONFIG_DIR, FILENAME, SCHEMA_VERSION, TMP_SUFFIX};
use crate::error::{ConfigError, Result};

pub struct ConfigStore {
    path: PathBuf,
    current: Config,
}

impl ConfigStore {
    /// Default location of the config file:
    /// `$TYPEDECK_CONFIG_DIR/config.json` if the override is set, otherwise
    /// `<platform config dir>/typedeck/config.json`.
    pub fn default_path() -> PathBuf {
        let mut path = match std::env::var_os(ENV_CONFIG_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
                path.push(APP_DIR);
                path
            }
        };
        path.push(FILENAME);
        path
    }

    /// Open the store at the default path
    pub fn open() -> Self {
        Self::open_at(Self::default_path())
    }

    /// Open the store at an explicit path. A missing file yields a default
    /// configuration (written out immediately so first-run state is
    /// durable); an unparseable file is logged and yields defaults without
    /// touching the broken file.
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let existed = path.exists();
        let current = Self::read_or_default(&path);
        let mut store = ConfigStore { path, current };
        if !existed {
            if let Err(e) = store.save(store.current.clone()) {
                warn!(path = %store.path.display(), error = %e, "Could not write initial config file");
            }
        }
        store
    }

    fn read_or_default(path: &Path) -> Config {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                return Config::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, falling back to defaults");
                return Config::default();
            }
        };

        match serde_json::from_str::<Config>(&contents) {
            Ok(mut config) => {
                if config.schema_version < SCHEMA_VERSION {
                    info!(
                        from = config.schema_version,
                        to = SCHEMA_VERSION,
                        "Upgraded configuration schema, missing options filled with defaults"
                    );
                    config.schema_version = SCHEMA_VERSION;
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unparseable config file, falling back to defaults");
                Config::default()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The canonical in-memory configuration
    pub fn current(&self) -> &Config {
        &self.current
    }

    /// Re-read the persisted file, e.g. after a backup restore
    pub fn reload(&mut self) -> &Config {
        self.current = Self::read_or_default(&self.path);
        &self.current
    }

    /// Serialize and persist atomically: write to `<file>.tmp`, then rename
    /// over the previous file in one step. On failure the previous persisted
    /// copy is untouched and the error is returned for user-visible
    /// reporting; the in-memory configuration is only replaced on success.
    pub fn save(&mut self, config: Config) -> Result<()> {
        let json = serde_json::to_string_pretty(&config)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name: OsString = self.path.as_os_str().to_os_string();
        tmp_name.push(TMP_SUFFIX);
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        self.current = config;
        info!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }

    /// Pure serialization of the canonical configuration. Map keys are
    /// ordered, so export -> import -> export is byte-for-byte idempotent.
    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.current)?)
    }

    /// Parse and validate an externally supplied blob, merging it over the
    /// current configuration section by section: a section present in the
    /// blob (the deck-mapping table, each options section, and the
    /// passthrough key set) replaces the current one wholesale; an absent
    /// section keeps the current one. The canonical configuration is not
    /// touched; the caller installs the returned merge via [`Self::save`],
    /// so a failed save leaves memory and disk in agreement.
    pub fn import(&self, blob: &str) -> Result<Config> {
        let value: Value = serde_json::from_str(blob)
            .map_err(|e| ConfigError::validation("document", format!("not valid JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::validation("document", "top level must be a JSON object"))?;

        if !SECTION_KEYS.iter().any(|key| object.contains_key(*key)) {
            return Err(ConfigError::validation(
                "document",
                "no recognized configuration sections",
            ));
        }
        if let Some(version) = object.get("schema_version")
            && !version.is_u64()
        {
            return Err(ConfigError::validation(
                "schema_version",
                "must be an unsigned integer",
            ));
        }

        let mut merged = self.current.clone();
        if let Some(mappings) = section(object, "deck_mappings")? {
            merged.deck_mappings = mappings;
        }
        if let Some(processing) = section(object, "processing")? {
            merged.processing = processing;
        }
        if let Some(input) = section(object, "input")? {
            merged.input = input;
        }
        if let Some(interface) = section(object, "interface")? {
            merged.interface = interface;
        }
        merged.passthrough = object
            .iter()
            .filter(|(key, _)| !is_recognized_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        merged.schema_version = SCHEMA_VERSION;

        merged.validate()?;

        info!(decks = merged.deck_mappings.len(), "Imported configuration");
        Ok(merged)
    }
}

fn is_recognized_key(key: &str) -> bool {
    key == "schema_version" || SECTION_KEYS.contains(&key)
}

/// A recognized section must be a JSON object of the right shape when
/// present; the error names the section so the user can fix the blob.
fn section<T: DeserializeOwned>(object: &Map<String, Value>, key: &'static str) -> Result<Option<T>> {
    match object.get(key) {
        None => Ok(None),
        Some(value) if value.is_object() => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ConfigError::validation(key, e.to_string())),
        Some(_) => Err(ConfigError::validation(key, "must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::mapping::DeckMapping;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open_at(dir.path().join(FILENAME));
        (dir, store)
    }

    #[test]
    fn test_open_missing_file_creates_defaults() {
        let (_dir, store) = temp_store();

        assert_eq!(store.current(), &Config::default());
        // First-run state is durable before the first commit
        assert!(store.path().exists());
    }

    #[test]
    fn test_open_unparseable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        fs::write(&path, "{not json at all").unwrap();

        let store = ConfigStore::open_at(&path);
        assert_eq!(store.current(), &Config::default());

        // The broken file is left for the user to inspect, not overwritten
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json at all");
    }

    #[test]
    fn test_save_then_reopen_roundtrip() {
        let (dir, mut store) = temp_store();

        let mut config = Config::default();
        config.interface.theme = "light".to_string();
        config.set_mapping("Deck A", DeckMapping::default());
        store.save(config.clone()).unwrap();

        let reopened = ConfigStore::open_at(dir.path().join(FILENAME));
        assert_eq!(reopened.current().interface.theme, "light");
        assert!(reopened.current().mapping_for("Deck A").is_some());
    }

    #[test]
    fn test_legacy_blob_loads_with_defaults_and_version_bump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        fs::write(&path, r#"{"interface": {"theme": "light"}}"#).unwrap();

        let store = ConfigStore::open_at(&path);
        assert_eq!(store.current().schema_version, SCHEMA_VERSION);
        assert_eq!(store.current().interface.theme, "light");
        assert_eq!(store.current().interface.font_size, 16);
    }

    #[test]
    fn test_interrupted_save_leaves_previous_copy_loadable() {
        let (dir, mut store) = temp_store();

        let mut config = Config::default();
        config.interface.theme = "light".to_string();
        store.save(config).unwrap();

        // Simulate a crash mid-write: a partial temp file is left behind
        let tmp_path = dir.path().join(format!("{FILENAME}{TMP_SUFFIX}"));
        fs::write(&tmp_path, r#"{"interface": {"th"#).unwrap();

        let reopened = ConfigStore::open_at(dir.path().join(FILENAME));
        assert_eq!(reopened.current().interface.theme, "light");

        // And the next save still replaces cleanly
        let mut store = reopened;
        let mut config = store.current().clone();
        config.interface.theme = "dark".to_string();
        store.save(config).unwrap();
        let reopened = ConfigStore::open_at(dir.path().join(FILENAME));
        assert_eq!(reopened.current().interface.theme, "dark");
    }

    #[test]
    fn test_save_failure_keeps_state_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        let mut store = ConfigStore::open_at(&path);

        // Make the rename target un-writable by replacing the file with a
        // non-empty directory of the same name
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let mut config = store.current().clone();
        config.interface.theme = "light".to_string();
        let err = store.save(config).unwrap_err();
        assert!(matches!(err, ConfigError::Persistence(_)));

        // In-memory configuration unchanged by the failed save
        assert_eq!(store.current().interface.theme, "dark");
    }

    #[test]
    fn test_reload_picks_up_external_change() {
        let (dir, mut store) = temp_store();

        // Another process (e.g. a backup restore) rewrites the file
        fs::write(
            dir.path().join(FILENAME),
            r#"{"schema_version": 2, "interface": {"theme": "light"}}"#,
        )
        .unwrap();

        assert_eq!(store.current().interface.theme, "dark");
        store.reload();
        assert_eq!(store.current().interface.theme, "light");
    }

    #[test]
    fn test_export_import_export_idempotent() {
        let (_dir, mut store) = temp_store();

        let mut config = Config::default();
        config.interface.theme = "light".to_string();
        config.set_mapping("Deck A", DeckMapping::default());
        config.set_mapping("Deck B", DeckMapping::default());
        config
            .passthrough
            .insert("futureFeatureX".to_string(), serde_json::json!({"a": 1}));
        store.save(config.clone()).unwrap();

        let first = store.export().unwrap();
        let imported = store.import(&first).unwrap();
        assert_eq!(imported, config);
        let second = store.export().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_import_unknown_top_level_key_survives_export() {
        let (_dir, mut store) = temp_store();

        let blob = r#"{
            "interface": {"theme": "light"},
            "futureFeatureX": {"enabled": true, "level": 3}
        }"#;
        let merged = store.import(blob).unwrap();
        store.save(merged).unwrap();

        let exported = store.export().unwrap();
        let value: Value = serde_json::from_str(&exported).unwrap();
        assert_eq!(
            value.get("futureFeatureX"),
            Some(&serde_json::json!({"enabled": true, "level": 3}))
        );
    }

    #[test]
    fn test_import_replaces_mapping_table_wholesale() {
        let (_dir, mut store) = temp_store();

        let mut config = Config::default();
        config.set_mapping("Old Deck", DeckMapping::default());
        store.save(config).unwrap();

        let blob = r#"{"deck_mappings": {"New Deck": {"prompt_field": "Q", "target_field": "A"}}}"#;
        let merged = store.import(blob).unwrap();

        assert!(merged.mapping_for("Old Deck").is_none());
        assert_eq!(merged.mapping_for("New Deck").unwrap().prompt_field, "Q");
    }

    #[test]
    fn test_import_absent_section_keeps_current() {
        let (_dir, mut store) = temp_store();

        let mut config = Config::default();
        config.processing.strip_html_tags = false;
        store.save(config).unwrap();

        // Blob only carries the interface section
        let merged = store.import(r#"{"interface": {"theme": "light"}}"#).unwrap();

        assert!(!merged.processing.strip_html_tags);
        assert_eq!(merged.interface.theme, "light");
    }

    #[test]
    fn test_import_rejects_wrong_section_type() {
        let (_dir, store) = temp_store();
        let before = store.current().clone();

        let err = store.import(r#"{"interface": 42}"#).unwrap_err();
        match err {
            ConfigError::Validation { field, .. } => assert_eq!(field, "interface"),
            other => panic!("expected validation error, got {other:?}"),
        }

        // Rejected in full: nothing applied
        assert_eq!(store.current(), &before);
    }

    #[test]
    fn test_import_rejects_wrong_field_type_inside_section() {
        let (_dir, store) = temp_store();

        let err = store
            .import(r#"{"interface": {"font_size": "huge"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "interface"));
    }

    #[test]
    fn test_import_rejects_non_object() {
        let (_dir, store) = temp_store();
        let err = store.import("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "document"));
    }

    #[test]
    fn test_import_rejects_blob_without_recognized_sections() {
        let (_dir, store) = temp_store();
        let err = store.import(r#"{"somethingElse": {}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "document"));
    }

    #[test]
    fn test_import_rejects_semantically_invalid_blob() {
        let (_dir, store) = temp_store();
        let before = store.current().clone();

        let err = store
            .import(r#"{"interface": {"theme": "neon"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "interface.theme"));
        assert_eq!(store.current(), &before);
    }

    #[test]
    fn test_import_accepts_older_schema_blob() {
        let (_dir, store) = temp_store();

        // No schema_version marker at all, partial interface section
        let merged = store
            .import(r#"{"interface": {"theme": "light"}, "processing": {}}"#)
            .unwrap();
        assert_eq!(merged.schema_version, SCHEMA_VERSION);
        assert_eq!(merged.interface.theme, "light");
        assert_eq!(merged.interface.font_size, 16);
    }
}
