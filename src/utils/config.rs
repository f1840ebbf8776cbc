//! Application configuration

use crate::utils::error::SocialFetchError;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Address the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Root of the download tree (`{root}/{platform}/{job_id}/`)
    pub downloads_root: PathBuf,

    /// Explicit yt-dlp binary; discovered on PATH when unset
    pub ytdlp_path: Option<PathBuf>,

    /// Attempts per job, including the first one
    pub max_attempts: u32,

    /// Fixed delay between attempts (seconds)
    pub retry_delay_secs: u64,

    /// Fail fast on engine errors that look permanent (unsupported URL, 404, private)
    pub classify_permanent_failures: bool,

    /// Default tracing filter when RUST_LOG is not set
    pub log_filter: String,

    /// Browser origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            downloads_root: PathBuf::from("downloads"),
            ytdlp_path: None,
            max_attempts: 3,
            retry_delay_secs: 2,
            classify_permanent_failures: false,
            log_filter: "socialfetch=info".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self, SocialFetchError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            SocialFetchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Enforce sane minimums and resolve the downloads root to an absolute path
    pub fn validate(mut self) -> Result<Self, SocialFetchError> {
        if self.max_attempts == 0 {
            self.max_attempts = 1;
        }

        self.downloads_root = self
            .downloads_root
            .absolutize()
            .map_err(|e| SocialFetchError::Config(format!("bad downloads root: {}", e)))?
            .into_owned();

        Ok(self)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppSettings::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(2));
        assert!(!config.classify_permanent_failures);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(
            config.cors_origins,
            ["http://localhost:3000", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_validate_enforces_minimums() {
        let config = AppSettings {
            max_attempts: 0,
            ..Default::default()
        };
        let config = config.validate().unwrap();

        assert_eq!(config.max_attempts, 1);
        assert!(config.downloads_root.is_absolute());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let body = r#"{ "port": 9100, "classify_permanent_failures": true, "cors_origins": [] }"#;
        std::fs::write(&path, body).unwrap();

        let config = AppSettings::load(Some(&path)).unwrap();
        assert_eq!(config.port, 9100);
        assert!(config.classify_permanent_failures);
        assert_eq!(config.max_attempts, 3);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = AppSettings::load(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, SocialFetchError::Config(_)));
    }
}
