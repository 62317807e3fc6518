use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::youtube;

pub(crate) const CONFIG_FILE: &str = "config.json";

/// Get the config directory using platform-appropriate location.
///
/// - macOS: `~/Library/Application Support/skp-dashboard/`
/// - Linux: `~/.config/skp-dashboard/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/skp-dashboard/`
///
/// Falls back to `~/.skp-dashboard/` if the platform dir is unavailable.
pub(crate) fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("skp-dashboard"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".skp-dashboard")
        })
}

/// Load a JSON file, returning Default if missing or corrupt.
/// A file that exists but cannot be read or parsed is logged, so a reset to
/// defaults is visible instead of silent.
pub(crate) fn load_json_from<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not read config: {e}");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(path = %path.display(), "corrupt config, using defaults: {e}");
            T::default()
        }
    }
}

/// Save a JSON file atomically (temp file + rename).
/// Sets 0600 permissions on Unix; the file may hold an API key.
pub(crate) fn save_json_to<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<(), String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let target = dir.join(filename);
    let temp = dir.join(format!("{}.tmp.{}", filename, std::process::id()));

    std::fs::write(&temp, &json).map_err(|e| format!("Failed to write temp config: {e}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp, perms)
            .map_err(|e| format!("Failed to set config permissions: {e}"))?;
    }

    std::fs::rename(&temp, &target).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        format!("Failed to commit config: {e}")
    })?;

    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Scheme for the navigation fallback (`skp:method@args`)
    #[serde(default = "default_uri_scheme")]
    pub uri_scheme: String,
    /// How long a correlated request waits for the host
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Block browsers answer with canned lists when SketchUp is absent
    #[serde(default = "default_true")]
    pub mock_host_when_absent: bool,
    #[serde(default = "default_mock_host_delay_ms")]
    pub mock_host_delay_ms: u64,
    #[serde(default = "default_toast_capacity")]
    pub toast_capacity: usize,
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_api_key: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3790
}

fn default_uri_scheme() -> String {
    crate::bridge::transport::DEFAULT_URI_SCHEME.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_mock_host_delay_ms() -> u64 {
    400
}

fn default_toast_capacity() -> usize {
    crate::notify::DEFAULT_TOAST_CAPACITY
}

fn default_youtube_base_url() -> String {
    youtube::DEFAULT_BASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            uri_scheme: default_uri_scheme(),
            request_timeout_secs: default_request_timeout_secs(),
            mock_host_when_absent: true,
            mock_host_delay_ms: default_mock_host_delay_ms(),
            toast_capacity: default_toast_capacity(),
            youtube_base_url: default_youtube_base_url(),
            youtube_api_key: None,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn mock_host_delay(&self) -> Duration {
        Duration::from_millis(self.mock_host_delay_ms)
    }

    /// Configured key, else `YOUTUBE_API_KEY`. Blank values count as unset.
    pub fn resolved_youtube_api_key(&self) -> Option<String> {
        self.youtube_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(youtube::API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

pub fn load_app_config() -> AppConfig {
    load_json_from(&config_dir().join(CONFIG_FILE))
}

pub fn save_app_config(config: &AppConfig) -> Result<(), String> {
    save_json_to(&config_dir(), CONFIG_FILE, config)
}

/// Save to an explicit file path (the `--config` flag).
pub(crate) fn save_app_config_at(path: &Path, config: &AppConfig) -> Result<(), String> {
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| format!("Invalid config path: {}", path.display()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    save_json_to(dir, filename, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_address, "127.0.0.1");
        assert_eq!(cfg.port, 3790);
        assert_eq!(cfg.uri_scheme, "skp");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert!(cfg.mock_host_when_absent);
        assert_eq!(cfg.mock_host_delay(), Duration::from_millis(400));
        assert_eq!(cfg.toast_capacity, 200);
        assert_eq!(cfg.youtube_base_url, "https://www.googleapis.com/youtube/v3");
    }

    #[test]
    fn serde_default_for_missing_fields() {
        let cfg: AppConfig = serde_json::from_str(r#"{"port": 4000}"#).unwrap();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.uri_scheme, "skp");
        assert!(cfg.mock_host_when_absent);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig {
            port: 4010,
            uri_scheme: "sketchup".into(),
            youtube_api_key: Some("abc".into()),
            ..AppConfig::default()
        };
        save_json_to(dir.path(), CONFIG_FILE, &cfg).unwrap();

        let loaded: AppConfig = load_json_from(&dir.path().join(CONFIG_FILE));
        assert_eq!(loaded, cfg);
        assert!(!dir.path().join(format!("{CONFIG_FILE}.tmp.{}", std::process::id())).exists());
    }

    #[test]
    fn save_at_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("dashboard.json");
        save_app_config_at(&path, &AppConfig::default()).unwrap();
        let loaded: AppConfig = load_json_from(&path);
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let loaded: AppConfig = load_json_from(&dir.path().join("nope.json"));
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn corrupt_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();
        let loaded: AppConfig = load_json_from(&path);
        assert_eq!(loaded, AppConfig::default());
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        save_json_to(dir.path(), CONFIG_FILE, &AppConfig::default()).unwrap();
        let mode = fs::metadata(dir.path().join(CONFIG_FILE)).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    #[serial]
    fn api_key_prefers_config_then_env() {
        unsafe { std::env::set_var(youtube::API_KEY_ENV, "from-env") };

        let mut cfg = AppConfig::default();
        assert_eq!(cfg.resolved_youtube_api_key().as_deref(), Some("from-env"));

        cfg.youtube_api_key = Some("from-config".into());
        assert_eq!(cfg.resolved_youtube_api_key().as_deref(), Some("from-config"));

        cfg.youtube_api_key = Some("  ".into());
        assert_eq!(cfg.resolved_youtube_api_key().as_deref(), Some("from-env"));

        unsafe { std::env::remove_var(youtube::API_KEY_ENV) };
        assert_eq!(cfg.resolved_youtube_api_key(), None);
    }
}
