//! Application-wide constants
//!
//! This module contains the file-system names, schema markers, and default
//! option values used throughout the crate, providing a single source of
//! truth for constant values.

/// Configuration file locations and markers
pub mod config {
    /// Directory under the platform config dir holding all TypeDeck state
    pub const APP_DIR: &str = "typedeck";

    /// Configuration file name
    pub const FILENAME: &str = "config.json";

    /// Suffix for the scratch file used during atomic replace
    pub const TMP_SUFFIX: &str = ".tmp";

    /// Environment variable overriding the config directory (tests, portable installs)
    pub const ENV_CONFIG_DIR: &str = "TYPEDECK_CONFIG_DIR";

    /// Current schema version written on every save
    pub const SCHEMA_VERSION: u32 = 2;

    /// Backup archive constants
    pub mod backup {
        /// Subdirectory of the config dir holding backup archives
        pub const SUBDIR: &str = "backups";

        /// Default number of automatic backups kept by pruning
        pub const RETENTION: u32 = 5;
    }
}

/// Default option values, referenced by the serde default functions in the schema
pub mod defaults {
    /// Per-deck field mapping defaults
    pub mod mapping {
        /// Field read for the prompt shown to the user
        pub const PROMPT_FIELD: &str = "Front";

        /// Field holding the text the user must type
        pub const TARGET_FIELD: &str = "Back";

        /// Optional field holding dictation audio
        pub const AUDIO_FIELD: &str = "Audio";
    }

    /// Interface (presentation-only) defaults
    pub mod interface {
        pub const THEME: &str = "dark";
        pub const FONT_FAMILY: &str = "monospace";
        pub const FONT_SIZE: u16 = 16;
        pub const WINDOW_WIDTH: u16 = 600;
        pub const WINDOW_HEIGHT: u16 = 400;

        /// Granularity at which a mistyped answer resets ("sentence" or "word")
        pub const RESET_MODE: &str = "sentence";

        /// How typed input is revealed ("progressive" or "accompanying")
        pub const INPUT_MODE: &str = "progressive";
    }

    /// Input-processing defaults
    pub mod input {
        /// Language tag used to pick input normalization rules
        pub const LANGUAGE: &str = "en";
    }
}
