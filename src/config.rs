//! User configuration stored as `config.json` in the data directory.
//!
//! Keys are camelCase (`selectedDict`, `aporaApiToken`, ...) so the file can be
//! edited by hand; missing keys fall back to their defaults.

use crate::models::PronunciationVariant;
use crate::notes::{CardField, FieldGroup};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

const MASK: &str = "*******";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config key: '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Platform a stored credential belongs to (serialized as its integer code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CredentialPlatform {
    None,
    Youdao,
    Eudic,
}

impl From<CredentialPlatform> for u8 {
    fn from(p: CredentialPlatform) -> u8 {
        match p {
            CredentialPlatform::None => 0,
            CredentialPlatform::Youdao => 1,
            CredentialPlatform::Eudic => 2,
        }
    }
}

impl TryFrom<u8> for CredentialPlatform {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CredentialPlatform::None),
            1 => Ok(CredentialPlatform::Youdao),
            2 => Ok(CredentialPlatform::Eudic),
            other => Err(format!("unknown credential platform {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    French,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextDifficulty {
    Easy,
    #[default]
    Normal,
    Professional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub platform: CredentialPlatform,
    pub username: String,
    pub password: String,
    /// Session cookie as a JSON object string
    pub cookie: String,
}

impl Credential {
    pub fn empty(platform: CredentialPlatform) -> Self {
        Self {
            platform,
            username: String::new(),
            password: String::new(),
            cookie: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub deck: String,
    pub selected_dict: usize,
    pub selected_api: usize,
    /// Selected word-book group names, one list per dictionary
    pub selected_group: Option<Vec<Vec<String>>>,
    pub credential: Vec<Credential>,
    pub enable_add_part_of_speech_to_tag: bool,
    pub enable_chinese_definition: bool,
    pub enable_term_highlight: bool,
    pub sync_templates: bool,
    pub term_speaking: bool,
    pub context_speaking: bool,
    pub context_difficulty: ContextDifficulty,
    pub enable_context: bool,
    pub disable_speaking: bool,
    #[serde(rename = "GreatBritainSpeaking")]
    pub great_britain_speaking: bool,
    #[serde(rename = "USSpeaking")]
    pub us_speaking: bool,
    pub apora_api_token: String,
    pub language: Language,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deck: String::new(),
            selected_dict: 0,
            selected_api: 0,
            selected_group: None,
            credential: Vec::new(),
            enable_add_part_of_speech_to_tag: false,
            enable_chinese_definition: false,
            enable_term_highlight: true,
            sync_templates: false,
            term_speaking: false,
            context_speaking: false,
            context_difficulty: ContextDifficulty::Normal,
            enable_context: false,
            disable_speaking: true,
            great_britain_speaking: false,
            us_speaking: true,
            apora_api_token: String::new(),
            language: Language::English,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load the config; a missing file yields the default config
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_json()? + "\n").map_err(io_err)
    }

    /// Save only when different from the stored config.
    ///
    /// Returns `(config_changed, card_settings_changed)`.
    pub fn save_if_changed(&self, path: &Path) -> Result<(bool, bool), ConfigError> {
        let stored = Self::load(path)?;
        if *self == stored && path.exists() {
            log::info!("Config has no changes.");
            return Ok((false, false));
        }

        let card_settings_changed = self.field_group() != stored.field_group();
        log::info!("Saving config: {:?}", self.masked());
        self.save(path)?;
        Ok((true, card_settings_changed))
    }

    /// Copy with secrets replaced, for logging
    pub fn masked(&self) -> Self {
        let mask = |s: &str| if s.is_empty() { String::new() } else { MASK.to_string() };
        let mut masked = self.clone();
        for cred in &mut masked.credential {
            cred.password = mask(&cred.password);
            cred.cookie = mask(&cred.cookie);
        }
        masked.apora_api_token = mask(&masked.apora_api_token);
        masked
    }

    /// Set one key (camelCase, as in the file) from its string form
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let mut value = serde_json::to_value(&*self)?;
        let obj = value
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let current = obj
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let new_value = if current.is_string() {
            Value::String(raw.to_string())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        obj.insert(key.to_string(), new_value);

        *self = serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn credential_for(&self, dict_index: usize) -> Option<&Credential> {
        self.credential.get(dict_index)
    }

    /// Store a cookie for a dictionary, growing the credential list as needed
    pub fn set_cookie(&mut self, dict_index: usize, platform: CredentialPlatform, cookie: String) {
        while self.credential.len() <= dict_index {
            self.credential.push(Credential::empty(CredentialPlatform::None));
        }
        let cred = &mut self.credential[dict_index];
        cred.platform = platform;
        cred.cookie = cookie;
    }

    /// Group names last selected for a dictionary
    pub fn groups_for(&self, dict_index: usize) -> Vec<String> {
        self.selected_group
            .as_ref()
            .and_then(|groups| groups.get(dict_index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_groups_for(&mut self, dict_index: usize, names: Vec<String>, dict_count: usize) {
        let groups = self.selected_group.get_or_insert_with(Vec::new);
        while groups.len() < dict_count.max(dict_index + 1) {
            groups.push(Vec::new());
        }
        groups[dict_index] = names;
    }

    pub fn preferred_pronunciation(&self) -> PronunciationVariant {
        if self.disable_speaking {
            PronunciationVariant::None
        } else if self.us_speaking {
            PronunciationVariant::Us
        } else {
            PronunciationVariant::Uk
        }
    }

    /// Card template fields switched off by the current settings
    pub fn field_group(&self) -> FieldGroup {
        let mut fg = FieldGroup::default();
        if !self.enable_chinese_definition {
            fg.toggle_off(CardField::DefinitionCn);
        }
        if self.disable_speaking {
            fg.toggle_off(CardField::Pronunciation);
        }
        if !self.enable_context {
            fg.toggle_off(CardField::Context);
        }
        // Images are not provided by any query API
        fg.toggle_off(CardField::Image);
        fg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> AppConfig {
        let mut config = AppConfig {
            deck: "English".to_string(),
            selected_dict: 1,
            apora_api_token: "secret-token".to_string(),
            enable_context: true,
            language: Language::French,
            context_difficulty: ContextDifficulty::Professional,
            ..Default::default()
        };
        config.set_cookie(1, CredentialPlatform::Eudic, r#"{"EudicWebSession":"abc"}"#.to_string());
        config.set_groups_for(1, vec!["GRE".to_string()], 2);
        config
    }

    #[test]
    fn test_round_trip() {
        let config = sample();
        let json = config.to_json().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
        assert_eq!(AppConfig::from_json(&AppConfig::default().to_json().unwrap()).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_json_key_names() {
        let json = sample().to_json().unwrap();
        for key in ["\"selectedDict\"", "\"aporaApiToken\"", "\"GreatBritainSpeaking\"", "\"USSpeaking\"", "\"enableAddPartOfSpeechToTag\""] {
            assert!(json.contains(key), "missing {}", key);
        }
        assert!(json.contains("\"platform\": 2"));
        assert!(json.contains("\"language\": \"french\""));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = AppConfig::from_json(r#"{"deck":"Vocab"}"#).unwrap();
        assert_eq!(config.deck, "Vocab");
        assert!(config.disable_speaking);
        assert!(config.us_speaking);
        assert!(AppConfig::from_json(r#"{"credential":[{"platform":7,"username":"","password":"","cookie":""}]}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_if_changed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let mut config = sample();
        assert_eq!(config.save_if_changed(&path).unwrap().0, true);
        assert_eq!(config.save_if_changed(&path).unwrap(), (false, false));

        config.deck = "Other".to_string();
        assert_eq!(config.save_if_changed(&path).unwrap(), (true, false));

        config.enable_chinese_definition = true;
        assert_eq!(config.save_if_changed(&path).unwrap(), (true, true));
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_masked() {
        let masked = sample().masked();
        assert_eq!(masked.apora_api_token, MASK);
        assert_eq!(masked.credential[1].cookie, MASK);
        assert_eq!(masked.credential[0].cookie, "");
        assert_eq!(masked.deck, "English");
    }

    #[test]
    fn test_set_value() {
        let mut config = AppConfig::default();
        config.set_value("deck", "123").unwrap();
        assert_eq!(config.deck, "123");
        config.set_value("selectedDict", "1").unwrap();
        assert_eq!(config.selected_dict, 1);
        config.set_value("enableContext", "true").unwrap();
        assert!(config.enable_context);
        config.set_value("language", "french").unwrap();
        assert_eq!(config.language, Language::French);

        assert!(matches!(config.set_value("nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(config.set_value("selectedDict", "abc"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_preferred_pronunciation() {
        let mut config = AppConfig::default();
        assert_eq!(config.preferred_pronunciation(), PronunciationVariant::None);
        config.disable_speaking = false;
        assert_eq!(config.preferred_pronunciation(), PronunciationVariant::Us);
        config.us_speaking = false;
        config.great_britain_speaking = true;
        assert_eq!(config.preferred_pronunciation(), PronunciationVariant::Uk);
    }

    #[test]
    fn test_groups_for() {
        let config = sample();
        assert_eq!(config.groups_for(1), vec!["GRE"]);
        assert!(config.groups_for(0).is_empty());
        assert!(config.groups_for(5).is_empty());
    }
}
