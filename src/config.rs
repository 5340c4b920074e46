//! Configuration file parser for ~/.config/forumtree/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored, though a warning is logged for each one since
//! they are usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `api_token`.
pub const TOKEN_ENV_VAR: &str = "FORUMTREE_API_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// Every key is optional. Debug output masks `api_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the forum server API, e.g. `https://forum.example.com/api/`.
    pub api_base_url: Option<String>,

    /// Bearer token sent with every request. `FORUMTREE_API_TOKEN` takes precedence.
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Levels expanded below the root after the first load. 0 shows only the root's row.
    pub initial_expand_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            request_timeout_secs: 30,
            initial_expand_depth: 1,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("initial_expand_depth", &self.initial_expand_depth)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "api_base_url",
        "api_token",
        "request_timeout_secs",
        "initial_expand_depth",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check the size before reading so a huge file is never pulled into memory.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = config.api_base_url.as_deref().unwrap_or("<unset>"),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The token to send, preferring `env_token` (the value of
    /// [`TOKEN_ENV_VAR`]) over the file. Blank values count as unset.
    pub fn resolve_token(&self, env_token: Option<String>) -> Option<SecretString> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api_token.clone().filter(|t| !t.trim().is_empty()))
            .map(SecretString::from)
    }

    /// Request timeout, never less than one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("forumtree_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_have_no_server() {
        let config = Config::default();
        assert!(config.api_base_url.is_none());
        assert!(config.api_token.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.initial_expand_depth, 1);
    }

    #[test]
    fn test_absent_config_file_is_fine() {
        let path = Path::new("/tmp/forumtree_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_blank_config_file_is_fine() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.initial_expand_depth, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_only_timeout_set() {
        let (dir, path) = write_config("partial", "request_timeout_secs = 5\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.initial_expand_depth, 1);
        assert!(config.api_base_url.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_every_key_set() {
        let content = r#"
api_base_url = "https://forum.example.com/api/"
api_token = "abc123"
request_timeout_secs = 10
initial_expand_depth = 3
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://forum.example.com/api/")
        );
        assert_eq!(config.api_token.as_deref(), Some("abc123"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.initial_expand_depth, 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_broken_toml_is_parse_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_key_warned_not_fatal() {
        let (dir, path) = write_config("unknown", "request_timeout_secs = 7\ntheme = \"dark\"\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 7);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_depth_as_string_is_parse_error() {
        let (dir, path) = write_config("wrongtype", "initial_expand_depth = \"deep\"\n");

        assert!(Config::load(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_oversized_config_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_token_wins_over_file() {
        let config = Config {
            api_token: Some("from-file".to_string()),
            ..Config::default()
        };

        let token = config.resolve_token(Some("from-env".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "from-env");

        let token = config.resolve_token(Some("  ".to_string())).unwrap();
        assert_eq!(token.expose_secret(), "from-file");

        assert!(Config::default().resolve_token(None).is_none());
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_debug_masks_api_token() {
        let config = Config {
            api_token: Some("super-secret-token-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-token-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_debug_shows_none_when_no_token() {
        let debug_output = format!("{:?}", Config::default());
        assert!(!debug_output.contains("[REDACTED]"));
    }
}
