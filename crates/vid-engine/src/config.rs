//! # Engine Configuration
//!
//! Process-level settings, loaded from YAML. Every field has a default, so an
//! empty document is a valid configuration. Unknown keys are rejected.
//!
//! ```yaml
//! did_method: vid
//! scrypt:
//!   log_n: 7
//!   r: 8
//!   p: 1
//! mnemonic_words: 12
//! max_sessions: 1024
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use vid_core::identity::validate_method;
use vid_crypto::{ScryptParams, WordCount};

use crate::error::EngineError;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Method component of minted DIDs (`did:<method>:…`).
    pub did_method: String,
    /// Key-derivation cost for `encrypt`/`decrypt`.
    pub scrypt: ScryptParams,
    /// Words per generated mnemonic.
    pub mnemonic_words: WordCount,
    /// Maximum concurrently open sessions.
    pub max_sessions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            did_method: "vid".to_string(),
            scrypt: ScryptParams::default(),
            mnemonic_words: WordCount::default(),
            max_sessions: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EngineError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Config(format!("invalid engine configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_method(&self.did_method).map_err(|e| EngineError::Config(e.to_string()))?;
        self.scrypt
            .validate()
            .map_err(|e| EngineError::Config(format!("scrypt: {e}")))?;
        if self.max_sessions == 0 {
            return Err(EngineError::Config("max_sessions must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_yaml_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_yaml_str("did_method: unid\nmnemonic_words: 24\n").unwrap();
        assert_eq!(config.did_method, "unid");
        assert_eq!(config.mnemonic_words.get(), 24);
        assert_eq!(config.max_sessions, 1024);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_yaml_str("did_methd: vid\n").unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(EngineConfig::from_yaml_str("did_method: Bad-Method\n").is_err());
        assert!(EngineConfig::from_yaml_str("mnemonic_words: 13\n").is_err());
        assert!(EngineConfig::from_yaml_str("max_sessions: 0\n").is_err());
        assert!(EngineConfig::from_yaml_str("scrypt: {log_n: 7, r: 0, p: 1}\n").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_sessions: 4").unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.max_sessions, 4);
        assert!(EngineConfig::from_path(Path::new("/nonexistent/vid.yaml")).is_err());
    }
}
