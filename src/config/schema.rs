//! Configuration schema
//!
//! The root [`Config`] aggregate and its four sections. Every option carries
//! an explicit serde default so a partial or legacy persisted blob is
//! repaired on load instead of rejected, and every level carries a flattened
//! passthrough map so fields written by a newer schema survive a load/save
//! cycle verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::mapping::DeckMapping;
use crate::error::{ConfigError, Result};

/// Top-level keys recognized by the current schema. Anything else in a
/// persisted or imported blob is carried in the passthrough map.
pub(crate) const SECTION_KEYS: &[&str] = &["deck_mappings", "processing", "input", "interface"];

/// Root configuration aggregate. Exactly one lives per host session,
/// owned by [`ConfigStore`](crate::config::ConfigStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_legacy_schema_version")]
    pub schema_version: u32,

    /// Deck name -> field mapping. Ordered map so serialization is
    /// deterministic; absence of a deck means "use defaults", never an error.
    #[serde(default)]
    pub deck_mappings: BTreeMap<String, DeckMapping>,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub input: InputProcessingConfig,

    #[serde(default)]
    pub interface: InterfaceConfig,

    /// Unrecognized top-level keys, preserved verbatim on re-save
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// Content-field cleanup options applied when card fields are read.
/// Flat set of switches; defaults cover typical HTML-bearing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_true")]
    pub strip_html_tags: bool,
    #[serde(default = "default_true")]
    pub decode_html_entities: bool,
    #[serde(default = "default_true")]
    pub preserve_line_breaks: bool,
    /// Replace `<b>word</b>` and friends with their inner text
    #[serde(default = "default_true")]
    pub unwrap_formatting_tags: bool,
    /// Keep `<b>`, `<i>`, `<u>` markup instead of stripping it
    #[serde(default)]
    pub keep_formatting_tags: bool,
    #[serde(default = "default_true")]
    pub normalize_whitespace: bool,
    #[serde(default = "default_true")]
    pub collapse_spaces: bool,

    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// Typed-input normalization options. Presentation settings never leak in
/// here; only these options may influence how user input is matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputProcessingConfig {
    #[serde(default = "default_true")]
    pub handle_punctuation: bool,
    /// Insert expected punctuation the user skipped
    #[serde(default = "default_true")]
    pub auto_punctuation: bool,
    #[serde(default)]
    pub ignore_punctuation_errors: bool,
    #[serde(default = "default_true")]
    pub handle_whitespace: bool,
    #[serde(default = "default_true")]
    pub ignore_extra_spaces: bool,
    /// Insert the space expected after sentence punctuation
    #[serde(default = "default_true")]
    pub auto_correct_spaces: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub auto_correct_case: bool,
    #[serde(default = "default_true")]
    pub handle_diacritics: bool,
    #[serde(default)]
    pub ignore_diacritic_errors: bool,
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

/// Presentation-only options: theme, font, window geometry, behavior flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// "light" or "dark"
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
    #[serde(default = "default_window_width")]
    pub window_width: u16,
    #[serde(default = "default_window_height")]
    pub window_height: u16,
    #[serde(default)]
    pub always_on_top: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_play_audio: bool,
    #[serde(default = "default_true")]
    pub show_timer: bool,
    #[serde(default = "default_true")]
    pub show_errors: bool,
    #[serde(default = "default_true")]
    pub auto_focus: bool,
    #[serde(default)]
    pub show_completion_popup: bool,
    /// "sentence" or "word": how much typed input a mistake resets
    #[serde(default = "default_reset_mode")]
    pub reset_mode: String,
    /// "progressive" or "accompanying": how typed input is revealed
    #[serde(default = "default_input_mode")]
    pub input_mode: String,

    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

// Default value functions

fn default_true() -> bool {
    true
}

/// Blobs written before the version marker existed are schema 1
fn default_legacy_schema_version() -> u32 {
    1
}

fn default_theme() -> String {
    crate::constants::defaults::interface::THEME.to_string()
}

fn default_font_family() -> String {
    crate::constants::defaults::interface::FONT_FAMILY.to_string()
}

fn default_font_size() -> u16 {
    crate::constants::defaults::interface::FONT_SIZE
}

fn default_window_width() -> u16 {
    crate::constants::defaults::interface::WINDOW_WIDTH
}

fn default_window_height() -> u16 {
    crate::constants::defaults::interface::WINDOW_HEIGHT
}

fn default_reset_mode() -> String {
    crate::constants::defaults::interface::RESET_MODE.to_string()
}

fn default_input_mode() -> String {
    crate::constants::defaults::interface::INPUT_MODE.to_string()
}

fn default_language() -> String {
    crate::constants::defaults::input::LANGUAGE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: crate::constants::config::SCHEMA_VERSION,
            deck_mappings: BTreeMap::new(),
            processing: ProcessingConfig::default(),
            input: InputProcessingConfig::default(),
            interface: InterfaceConfig::default(),
            passthrough: Map::new(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            strip_html_tags: true,
            decode_html_entities: true,
            preserve_line_breaks: true,
            unwrap_formatting_tags: true,
            keep_formatting_tags: false,
            normalize_whitespace: true,
            collapse_spaces: true,
            passthrough: Map::new(),
        }
    }
}

impl Default for InputProcessingConfig {
    fn default() -> Self {
        Self {
            handle_punctuation: true,
            auto_punctuation: true,
            ignore_punctuation_errors: false,
            handle_whitespace: true,
            ignore_extra_spaces: true,
            auto_correct_spaces: true,
            case_sensitive: true,
            auto_correct_case: false,
            handle_diacritics: true,
            ignore_diacritic_errors: false,
            language: default_language(),
            passthrough: Map::new(),
        }
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            always_on_top: false,
            sound_enabled: true,
            auto_play_audio: true,
            show_timer: true,
            show_errors: true,
            auto_focus: true,
            show_completion_popup: false,
            reset_mode: default_reset_mode(),
            input_mode: default_input_mode(),
            passthrough: Map::new(),
        }
    }
}

impl Config {
    /// Semantic validation, run on commit and on import. Returns the first
    /// offending field; an import or working copy is rejected in full.
    pub fn validate(&self) -> Result<()> {
        match self.interface.theme.as_str() {
            "light" | "dark" => {}
            other => {
                return Err(ConfigError::validation(
                    "interface.theme",
                    format!("expected \"light\" or \"dark\", got \"{other}\""),
                ));
            }
        }
        match self.interface.reset_mode.as_str() {
            "sentence" | "word" => {}
            other => {
                return Err(ConfigError::validation(
                    "interface.reset_mode",
                    format!("expected \"sentence\" or \"word\", got \"{other}\""),
                ));
            }
        }
        match self.interface.input_mode.as_str() {
            "progressive" | "accompanying" => {}
            other => {
                return Err(ConfigError::validation(
                    "interface.input_mode",
                    format!("expected \"progressive\" or \"accompanying\", got \"{other}\""),
                ));
            }
        }
        if self.interface.font_size == 0 {
            return Err(ConfigError::validation("interface.font_size", "must be non-zero"));
        }
        if self.interface.window_width == 0 {
            return Err(ConfigError::validation("interface.window_width", "must be non-zero"));
        }
        if self.interface.window_height == 0 {
            return Err(ConfigError::validation("interface.window_height", "must be non-zero"));
        }
        if self.input.language.trim().is_empty() {
            return Err(ConfigError::validation("input.language", "must not be empty"));
        }
        for (deck, mapping) in &self.deck_mappings {
            if mapping.prompt_field.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("deck_mappings.{deck}.prompt_field"),
                    "must not be empty",
                ));
            }
            if mapping.target_field.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("deck_mappings.{deck}.target_field"),
                    "must not be empty",
                ));
            }
            if mapping.prompt_field == mapping.target_field {
                return Err(ConfigError::validation(
                    format!("deck_mappings.{deck}.target_field"),
                    "prompt and target fields must differ",
                ));
            }
        }
        Ok(())
    }
}
