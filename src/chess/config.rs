//! Runtime settings for the import pipeline.

use thiserror::Error;

/// Environment fallbacks for the `--study-host` / `--user-agent` flags.
pub const STUDY_HOST_ENV: &str = "PGN_IMPORT_STUDY_HOST";
pub const USER_AGENT_ENV: &str = "PGN_IMPORT_USER_AGENT";

pub const DEFAULT_STUDY_HOST: &str = "https://lichess.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration error: study host `{0}` must start with http:// or https://")]
    InvalidStudyHost(String),

    #[error("Configuration error: {0} must not be empty")]
    Empty(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportConfig {
    /// Scheme and host study URLs must live under, without trailing slash.
    pub study_host: String,
    pub user_agent: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            study_host: DEFAULT_STUDY_HOST.to_string(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl ImportConfig {
    pub fn new(study_host: &str, user_agent: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            study_host: normalize_study_host(study_host)?,
            user_agent: normalize_user_agent(user_agent)?,
        })
    }
}

fn normalize_study_host(raw: &str) -> Result<String, ConfigError> {
    let host = raw.trim();
    if host.is_empty() {
        return Err(ConfigError::Empty("study host"));
    }
    if !host.starts_with("https://") && !host.starts_with("http://") {
        return Err(ConfigError::InvalidStudyHost(host.to_string()));
    }
    Ok(host.trim_end_matches('/').to_string())
}

fn normalize_user_agent(raw: &str) -> Result<String, ConfigError> {
    let user_agent = raw.trim();
    if user_agent.is_empty() {
        return Err(ConfigError::Empty("user agent"));
    }
    Ok(user_agent.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_lichess() {
        let config = ImportConfig::default();
        assert_eq!(config.study_host, "https://lichess.org");
        assert!(config.user_agent.starts_with("pgn-import/"));
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = ImportConfig::new("http://localhost:8080/", "tests").unwrap();
        assert_eq!(config.study_host, "http://localhost:8080");
        assert_eq!(config.user_agent, "tests");
    }

    #[test]
    fn test_new_rejects_host_without_scheme() {
        let err = ImportConfig::new("lichess.org", "tests").unwrap_err();
        assert_eq!(err, ConfigError::InvalidStudyHost("lichess.org".to_string()));
    }

    #[test]
    fn test_new_rejects_empty_values() {
        assert_eq!(
            ImportConfig::new("  ", "tests").unwrap_err(),
            ConfigError::Empty("study host")
        );
        assert_eq!(
            ImportConfig::new("https://lichess.org", "").unwrap_err(),
            ConfigError::Empty("user agent")
        );
    }
}
