//! Per-deck field mappings
//!
//! Binds a deck name to the note fields the typing feature reads and writes
//! for that deck. Replacement is always wholesale per deck; there is no
//! partial merge of an individual mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::config::schema::Config;

/// Field mapping for one deck. A deck with no stored mapping uses
/// `DeckMapping::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckMapping {
    /// Field shown as the prompt
    #[serde(default = "default_prompt_field")]
    pub prompt_field: String,
    /// Field the user must type
    #[serde(default = "default_target_field")]
    pub target_field: String,
    /// Optional field holding dictation audio
    #[serde(default = "default_audio_field")]
    pub audio_field: Option<String>,
    /// Note fields known to exist in this deck, for the mapping editor
    #[serde(default)]
    pub note_fields: Vec<String>,
    #[serde(default)]
    pub card_count: u32,
    /// ISO-8601 timestamp of the last time this deck was practiced
    #[serde(default)]
    pub last_used: Option<String>,

    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

fn default_prompt_field() -> String {
    crate::constants::defaults::mapping::PROMPT_FIELD.to_string()
}

fn default_target_field() -> String {
    crate::constants::defaults::mapping::TARGET_FIELD.to_string()
}

fn default_audio_field() -> Option<String> {
    Some(crate::constants::defaults::mapping::AUDIO_FIELD.to_string())
}

impl Default for DeckMapping {
    fn default() -> Self {
        Self {
            prompt_field: default_prompt_field(),
            target_field: default_target_field(),
            audio_field: default_audio_field(),
            note_fields: Vec::new(),
            card_count: 0,
            last_used: None,
            passthrough: Map::new(),
        }
    }
}

impl DeckMapping {
    /// Refresh `last_used` to the current local time
    pub fn touch(&mut self) {
        self.last_used = Some(chrono::Local::now().to_rfc3339());
    }
}

impl Config {
    /// Mapping for a deck, if one is stored. Callers fall back to
    /// `DeckMapping::default()` for unconfigured decks.
    pub fn mapping_for(&self, deck: &str) -> Option<&DeckMapping> {
        self.deck_mappings.get(deck)
    }

    /// Store a mapping for a deck, replacing any existing one wholesale
    /// and stamping its `last_used` timestamp.
    pub fn set_mapping(&mut self, deck: impl Into<String>, mut mapping: DeckMapping) {
        let deck = deck.into();
        mapping.touch();
        info!(deck = %deck, prompt = %mapping.prompt_field, target = %mapping.target_field, "Updated deck mapping");
        self.deck_mappings.insert(deck, mapping);
    }

    pub fn remove_mapping(&mut self, deck: &str) -> Option<DeckMapping> {
        let removed = self.deck_mappings.remove(deck);
        if removed.is_some() {
            info!(deck = %deck, "Removed deck mapping");
        }
        removed
    }

    /// The most recently practiced deck's mapping, if any deck has been
    /// used. RFC 3339 strings compare correctly as plain strings.
    pub fn most_recent_mapping(&self) -> Option<(&str, &DeckMapping)> {
        self.deck_mappings
            .iter()
            .filter(|(_, m)| m.last_used.is_some())
            .max_by(|(_, a), (_, b)| a.last_used.cmp(&b.last_used))
            .map(|(name, mapping)| (name.as_str(), mapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let mapping = DeckMapping::default();
        assert_eq!(mapping.prompt_field, "Front");
        assert_eq!(mapping.target_field, "Back");
        assert_eq!(mapping.audio_field.as_deref(), Some("Audio"));
        assert!(mapping.note_fields.is_empty());
        assert!(mapping.last_used.is_none());
    }

    #[test]
    fn test_set_mapping_replaces_wholesale() {
        let mut config = Config::default();

        let mut first = DeckMapping::default();
        first.note_fields = vec!["Front".to_string(), "Back".to_string(), "Audio".to_string()];
        first.card_count = 120;
        config.set_mapping("Deck A", first);

        // New mapping for the same deck: no field survives from the old one
        let mut second = DeckMapping::default();
        second.prompt_field = "Expression".to_string();
        second.target_field = "Reading".to_string();
        second.audio_field = None;
        config.set_mapping("Deck A", second.clone());

        let stored = config.mapping_for("Deck A").unwrap();
        assert_eq!(stored.prompt_field, "Expression");
        assert_eq!(stored.target_field, "Reading");
        assert_eq!(stored.audio_field, None);
        assert!(stored.note_fields.is_empty());
        assert_eq!(stored.card_count, 0);
    }

    #[test]
    fn test_set_mapping_leaves_other_decks_untouched() {
        let mut config = Config::default();
        let mut other = DeckMapping::default();
        other.prompt_field = "Question".to_string();
        config.set_mapping("Deck B", other);
        let deck_b_before = config.mapping_for("Deck B").unwrap().clone();

        config.set_mapping("Deck A", DeckMapping::default());

        assert_eq!(config.mapping_for("Deck B"), Some(&deck_b_before));
    }

    #[test]
    fn test_mapping_for_unconfigured_deck_is_none() {
        let config = Config::default();
        assert!(config.mapping_for("Never Seen").is_none());
    }

    #[test]
    fn test_most_recent_mapping() {
        let mut config = Config::default();

        let mut old = DeckMapping::default();
        old.last_used = Some("2025-01-01T10:00:00+00:00".to_string());
        config.deck_mappings.insert("Old Deck".to_string(), old);

        let mut newer = DeckMapping::default();
        newer.last_used = Some("2025-06-15T09:30:00+00:00".to_string());
        config.deck_mappings.insert("New Deck".to_string(), newer);

        let mut never_used = DeckMapping::default();
        never_used.last_used = None;
        config
            .deck_mappings
            .insert("Unused Deck".to_string(), never_used);

        let (name, _) = config.most_recent_mapping().unwrap();
        assert_eq!(name, "New Deck");
    }

    #[test]
    fn test_most_recent_mapping_empty_config() {
        let config = Config::default();
        assert!(config.most_recent_mapping().is_none());
    }

    #[test]
    fn test_touch_sets_parseable_timestamp() {
        let mut mapping = DeckMapping::default();
        mapping.touch();

        let stamp = mapping.last_used.expect("touch must set last_used");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn test_remove_mapping() {
        let mut config = Config::default();
        config.set_mapping("Deck A", DeckMapping::default());

        assert!(config.remove_mapping("Deck A").is_some());
        assert!(config.mapping_for("Deck A").is_none());
        assert!(config.remove_mapping("Deck A").is_none());
    }
}
