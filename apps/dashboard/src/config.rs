use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::DEFAULT_BASE_URL;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn base_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .with_context(|| format!("invalid backend url '{}'", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "backend url '{}' must use http or https, not '{}'",
                self.base_url,
                url.scheme()
            );
        }
        Ok(url)
    }

    /// Zero or unset means no timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DASHBOARD_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.request_timeout_secs = Some(parsed);
            }
        }
    }
}

/// Defaults, then the config file, then environment, then `base_url_override`.
///
/// An explicit `config_path` must exist and parse. The implicit
/// `dashboard.toml` is skipped when absent.
pub fn load_settings(
    config_path: Option<&Path>,
    base_url_override: Option<&str>,
) -> anyhow::Result<Settings> {
    load_settings_with(config_path, base_url_override, |key| std::env::var(key).ok())
}

fn load_settings_with(
    config_path: Option<&Path>,
    base_url_override: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = match config_path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                read_settings_file(&default_path)?
            } else {
                Settings::default()
            }
        }
    };

    settings.apply_env(lookup);

    if let Some(base_url) = base_url_override {
        settings.base_url = base_url.to_string();
    }

    Ok(settings)
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_config(contents: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("dashboard_config_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write config");
        path
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let settings = Settings::default();
        assert_eq!(
            settings.base_url().expect("url").as_str(),
            "http://localhost:8080/"
        );
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn file_values_are_read() {
        let path =
            temp_config("base_url = \"http://push.internal:9000\"\nrequest_timeout_secs = 5\n");

        let settings = load_settings_with(Some(&path), None, no_env).expect("load");

        assert_eq!(settings.base_url, "http://push.internal:9000");
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(5)));
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn env_overrides_file_and_flag_overrides_env() {
        let path = temp_config("base_url = \"http://from-file:1\"\n");
        let env: HashMap<&str, &str> = [
            ("DASHBOARD_BASE_URL", "http://from-env:2"),
            ("APP__REQUEST_TIMEOUT_SECS", "30"),
        ]
        .into();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let from_env = load_settings_with(Some(&path), None, lookup).expect("load");
        assert_eq!(from_env.base_url, "http://from-env:2");
        assert_eq!(from_env.request_timeout_secs, Some(30));

        let from_flag =
            load_settings_with(Some(&path), Some("http://from-flag:3"), lookup).expect("load");
        assert_eq!(from_flag.base_url, "http://from-flag:3");
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn unparsable_timeout_env_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|key| (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(settings.request_timeout_secs, None);
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let settings = Settings {
            request_timeout_secs: Some(0),
            ..Settings::default()
        };
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let path = env::temp_dir().join("dashboard_config_test_missing.toml");
        assert!(load_settings_with(Some(&path), None, no_env).is_err());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let settings = Settings {
            base_url: "ftp://files.example".into(),
            ..Settings::default()
        };
        assert!(settings.base_url().is_err());

        let settings = Settings {
            base_url: "not a url".into(),
            ..Settings::default()
        };
        assert!(settings.base_url().is_err());
    }
}
