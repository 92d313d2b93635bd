use std::env::VarError;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Environment variable holding a JSON [`BridgeConfig`] for native hosts.
pub const CONFIG_ENV_VAR: &str = "LILYPAD_BRIDGE_CONFIG";

/// How handlers report a missing argument.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(not(target_arch = "wasm32"), derive(clap::ValueEnum))]
pub enum ErrorMode {
    /// Return `"Error: No input provided"` as a regular value, as existing callers expect.
    #[default]
    Legacy,
    /// Signal every error through the host's error channel.
    Structured,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub error_mode: ErrorMode,
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::default(),
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BridgeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read [`CONFIG_ENV_VAR`], falling back to defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_env_value(std::env::var(CONFIG_ENV_VAR))
    }

    fn from_env_value(value: std::result::Result<String, VarError>) -> Result<Self> {
        match value {
            Ok(json) => Self::from_json(&json),
            Err(VarError::NotPresent) => Ok(Self::default()),
            Err(VarError::NotUnicode(_)) => Err(BridgeError::InvalidConfig(format!(
                "{CONFIG_ENV_VAR} is not valid UTF-8"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level().map(|_| ())
    }

    pub fn level(&self) -> Result<log::Level> {
        self.log_level
            .parse()
            .map_err(|_| BridgeError::InvalidConfig(format!("unknown log level `{}`", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.error_mode, ErrorMode::Legacy);
        assert_eq!(config.level().unwrap(), log::Level::Info);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json(r#"{"errorMode": "structured"}"#).unwrap();
        assert_eq!(config.error_mode, ErrorMode::Structured);
        assert_eq!(config.log_level, "info");

        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            BridgeConfig::from_json(r#"{"errorMode": "loud"}"#),
            Err(BridgeError::InvalidConfig(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{"logLevel": "chatty"}"#),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_env_value() {
        assert_eq!(
            BridgeConfig::from_env_value(Err(VarError::NotPresent)).unwrap(),
            BridgeConfig::default()
        );
        assert_eq!(
            BridgeConfig::from_env_value(Ok(r#"{"errorMode": "structured"}"#.to_string()))
                .unwrap()
                .error_mode,
            ErrorMode::Structured
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env_value_is_rejected() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b'{', 0xff, b'}']);
        assert!(matches!(
            BridgeConfig::from_env_value(Err(VarError::NotUnicode(raw))),
            Err(BridgeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let config = BridgeConfig::from_json(r#"{"logLevel": "DEBUG"}"#).unwrap();
        assert_eq!(config.level().unwrap(), log::Level::Debug);
    }
}
