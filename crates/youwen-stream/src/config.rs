//! Settings from the process environment and an optional `.env` file.
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://b.aigy.de";

const KEY_API_URL: &str = "YOUWEN_API_URL";
const KEY_TOKEN: &str = "YOUWEN_TOKEN";
const KEY_MGREP: &str = "YOUWEN_MGREP_API_KEY";
const KEY_MODE: &str = "YOUWEN_ENHANCE_MODE";
const KEY_SEARCH: &str = "YOUWEN_ENABLE_SEARCH";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnhanceMode {
    /// Run the multi-agent pipeline.
    #[default]
    Agent,
    /// Echo prompts unchanged unless forced.
    Disabled,
}

impl EnhanceMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" => EnhanceMode::Disabled,
            _ => EnhanceMode::Agent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub mgrep_api_key: Option<String>,
    pub enhance_mode: EnhanceMode,
    pub enable_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            mgrep_api_key: None,
            enhance_mode: EnhanceMode::Agent,
            enable_search: true,
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, then lets `env_file` override.
    pub fn load(env_file: Option<&Path>) -> Self {
        let mut settings = Self::from_lookup(|key| std::env::var(key).ok());
        if let Some(path) = env_file {
            settings.apply_env_file(path);
        }
        settings
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        for key in [KEY_API_URL, KEY_TOKEN, KEY_MGREP, KEY_MODE, KEY_SEARCH] {
            if let Some(value) = lookup(key) {
                settings.set(key, &value);
            }
        }
        settings
    }

    /// Overrides settings with the values of a dotenv file. A missing file is not an error.
    pub fn apply_env_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read env file");
                return;
            }
        };
        let mut values = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    values.insert(key, value);
                }
                Err(e) => debug!(path = %path.display(), error = %e, "skipping env line"),
            }
        }
        for key in [KEY_API_URL, KEY_TOKEN, KEY_MGREP, KEY_MODE, KEY_SEARCH] {
            if let Some(value) = values.get(key) {
                // Search toggle applies even when blank; other keys need a value.
                if key == KEY_SEARCH || !value.trim().is_empty() {
                    self.set(key, value);
                }
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            KEY_API_URL => {
                let url = value.trim().trim_end_matches('/');
                if !url.is_empty() {
                    self.api_url = url.to_string();
                }
            }
            KEY_TOKEN => self.token = non_blank(value),
            KEY_MGREP => self.mgrep_api_key = non_blank(value),
            KEY_MODE => {
                if !value.trim().is_empty() {
                    self.enhance_mode = EnhanceMode::parse(value);
                }
            }
            KEY_SEARCH => self.enable_search = value.trim() != "false",
            _ => {}
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_url, "https://b.aigy.de");
        assert!(settings.enable_search);
    }

    #[test]
    fn environment_values_are_applied() {
        let settings = Settings::from_lookup(lookup(&[
            ("YOUWEN_API_URL", "http://localhost:8080//"),
            ("YOUWEN_TOKEN", "CODE-1"),
            ("YOUWEN_ENHANCE_MODE", "disabled"),
            ("YOUWEN_ENABLE_SEARCH", "false"),
        ]));
        assert_eq!(settings.api_url, "http://localhost:8080");
        assert_eq!(settings.token.as_deref(), Some("CODE-1"));
        assert_eq!(settings.enhance_mode, EnhanceMode::Disabled);
        assert!(!settings.enable_search);
    }

    #[test]
    fn search_is_enabled_unless_exactly_false() {
        for value in ["true", "0", "no", ""] {
            let settings = Settings::from_lookup(lookup(&[("YOUWEN_ENABLE_SEARCH", value)]));
            assert!(settings.enable_search, "{value}");
        }
    }

    #[test]
    fn env_file_overrides_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "YOUWEN_API_URL=\"http://file-host\"").expect("write");
        writeln!(file, "YOUWEN_TOKEN=").expect("write");
        writeln!(file, "YOUWEN_ENABLE_SEARCH=false").expect("write");

        let mut settings = Settings::from_lookup(lookup(&[
            ("YOUWEN_API_URL", "http://env-host"),
            ("YOUWEN_TOKEN", "ENV-TOKEN"),
        ]));
        settings.apply_env_file(&path);
        assert_eq!(settings.api_url, "http://file-host");
        assert_eq!(settings.token.as_deref(), Some("ENV-TOKEN"));
        assert!(!settings.enable_search);
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env_file(Path::new("/definitely/not/here/.env"));
        assert_eq!(settings, Settings::default());
    }
}
