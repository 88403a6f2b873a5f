use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use g2log_ai::{ProviderId, ProviderKind, ProviderProfile};
use serde::{Deserialize, Serialize};

use crate::gitlog::Repository;

pub const CONFIG_DIR_NAME: &str = ".g2log";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_PROFILE: &str = "deepseek";

pub const ENV_API_KEY: &str = "G2LOG_API_KEY";

/// Load `.env` from the working directory, if any.
pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Resolves the config file path, defaulting to `~/.g2log/config.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(path.to_path_buf());
    }
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Settings of one named provider profile as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub enable_thinking: bool,
    /// Wire variant; derived from the profile name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
}

impl ProfileConfig {
    fn builtin(kind: ProviderKind, temperature: f64, max_tokens: u32) -> Self {
        Self {
            api_key: String::new(),
            api_base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            enable_thinking: false,
            provider: None,
        }
    }

    /// Builds the runtime profile. Blank URL or model fall back to the kind's
    /// defaults.
    pub fn to_profile(&self, name: &str) -> ProviderProfile {
        let kind = self
            .provider
            .unwrap_or_else(|| ProviderKind::from_profile_name(name));
        let base_url = if self.api_base_url.trim().is_empty() {
            kind.default_base_url().to_string()
        } else {
            self.api_base_url.trim().to_string()
        };
        let model = if self.model.trim().is_empty() {
            kind.default_model().to_string()
        } else {
            self.model.trim().to_string()
        };
        ProviderProfile {
            name: ProviderId::new(name),
            kind,
            api_key: self.api_key.trim().to_string(),
            base_url,
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            enable_thinking: self.enable_thinking,
        }
    }
}

/// Persistent user configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_author: String,
    pub default_since: String,
    pub default_until: String,
    pub current_profile: String,
    pub profiles: BTreeMap<String, ProfileConfig>,
    /// Repository alias to local path.
    pub repositories: BTreeMap<String, String>,
    /// Custom prompt template; empty uses the built-in one.
    pub prompt_template: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let profiles = BTreeMap::from([
            (
                "deepseek".to_string(),
                ProfileConfig::builtin(ProviderKind::DeepSeek, 0.5, 20480),
            ),
            (
                "openai".to_string(),
                ProfileConfig::builtin(ProviderKind::OpenAi, 0.5, 2048),
            ),
            (
                "zhipu".to_string(),
                ProfileConfig::builtin(ProviderKind::Zhipu, 0.7, 2048),
            ),
        ]);
        Self {
            default_author: String::new(),
            default_since: "today".to_string(),
            default_until: "today".to_string(),
            current_profile: DEFAULT_PROFILE.to_string(),
            profiles,
            repositories: BTreeMap::new(),
            prompt_template: String::new(),
        }
    }
}

impl AppConfig {
    /// Reads the config file. A missing or blank file yields the defaults;
    /// built-in profiles absent from the file are filled in.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        for (name, profile) in Self::default().profiles {
            config.profiles.entry(name).or_insert(profile);
        }
        Ok(config)
    }

    /// Writes pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Name of the profile to use. A requested name must exist; the stored
    /// current profile falls back to `deepseek` when it is missing.
    pub fn select_profile_name(&self, requested: Option<&str>) -> Result<String> {
        if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
            if !self.profiles.contains_key(name) {
                bail!(
                    "unknown profile \"{name}\" (available: {})",
                    self.profile_names().join(", ")
                );
            }
            return Ok(name.to_string());
        }
        if self.profiles.contains_key(&self.current_profile) {
            Ok(self.current_profile.clone())
        } else {
            Ok(DEFAULT_PROFILE.to_string())
        }
    }

    /// Resolves the runtime profile, applying an API key override.
    pub fn resolve_profile(
        &self,
        requested: Option<&str>,
        api_key_override: Option<&str>,
    ) -> Result<ProviderProfile> {
        let name = self.select_profile_name(requested)?;
        let stored = self.profiles.get(&name).cloned().unwrap_or_default();
        let mut profile = stored.to_profile(&name);
        if let Some(key) = api_key_override.map(str::trim).filter(|k| !k.is_empty()) {
            profile.api_key = key.to_string();
        }
        Ok(profile)
    }

    /// Resolves the runtime profile, letting `G2LOG_API_KEY` override the
    /// stored key.
    pub fn resolve_profile_from_env(&self, requested: Option<&str>) -> Result<ProviderProfile> {
        let env_key = std::env::var(ENV_API_KEY).ok();
        self.resolve_profile(requested, env_key.as_deref())
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Switches the current profile. The profile must exist.
    pub fn set_current_profile(&mut self, name: &str) -> Result<()> {
        if !self.profiles.contains_key(name) {
            bail!(
                "profile \"{name}\" does not exist (available: {})",
                self.profile_names().join(", ")
            );
        }
        self.current_profile = name.to_string();
        Ok(())
    }

    /// Mutable access to the current profile's stored settings.
    pub fn current_profile_mut(&mut self) -> Result<&mut ProfileConfig> {
        let name = self.select_profile_name(None)?;
        self.profiles
            .get_mut(&name)
            .with_context(|| format!("profile \"{name}\" does not exist"))
    }

    pub fn set_time_range(&mut self, since: Option<&str>, until: Option<&str>) {
        if let Some(since) = since.filter(|s| !s.trim().is_empty()) {
            self.default_since = since.to_string();
        }
        if let Some(until) = until.filter(|u| !u.trim().is_empty()) {
            self.default_until = until.to_string();
        }
    }

    pub fn add_repository(&mut self, alias: &str, path: &str) {
        self.repositories
            .insert(alias.to_string(), path.to_string());
    }

    /// Returns false when the alias was not configured.
    pub fn remove_repository(&mut self, alias: &str) -> bool {
        self.repositories.remove(alias).is_some()
    }

    /// `base`, or `base-1`, `base-2`, ... when `base` is taken.
    pub fn unique_alias(&self, base: &str) -> String {
        if !self.repositories.contains_key(base) {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{base}-{n}"))
            .find(|alias| !self.repositories.contains_key(alias))
            .unwrap_or_else(|| base.to_string())
    }

    /// Adds found repositories whose path is not configured yet and returns
    /// the aliases they got.
    pub fn add_discovered(&mut self, repos: &[Repository]) -> Vec<String> {
        let mut added = Vec::new();
        for repo in repos {
            let path = repo.path.display().to_string();
            if self.repositories.values().any(|known| *known == path) {
                continue;
            }
            let alias = self.unique_alias(&repo.alias);
            self.repositories.insert(alias.clone(), path);
            added.push(alias);
        }
        added
    }
}

/// Deletes the configuration and returns what was removed.
///
/// A config file inside a `.g2log` directory takes the whole directory with
/// it (saved summaries included); any other file is removed alone.
pub fn remove_config(config_path: &Path) -> Result<Option<PathBuf>> {
    let dir = config_path
        .parent()
        .filter(|dir| dir.file_name().is_some_and(|name| name == CONFIG_DIR_NAME));
    if let Some(dir) = dir.filter(|dir| dir.is_dir()) {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("failed to remove {}", dir.display()))?;
        return Ok(Some(dir.to_path_buf()));
    }
    if config_path.is_file() {
        std::fs::remove_file(config_path)
            .with_context(|| format!("failed to remove {}", config_path.display()))?;
        return Ok(Some(config_path.to_path_buf()));
    }
    Ok(None)
}

/// Masks an API key for display.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_builtin_profiles() {
        let config = AppConfig::default();
        assert_eq!(config.current_profile, "deepseek");
        assert_eq!(config.profile_names(), vec!["deepseek", "openai", "zhipu"]);
        let deepseek = &config.profiles["deepseek"];
        assert_eq!(deepseek.api_base_url, "https://api.deepseek.com");
        assert_eq!(deepseek.max_tokens, Some(20480));
        assert_eq!(config.profiles["zhipu"].temperature, Some(0.7));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(&dir.path().join("nope.json")).expect("load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.default_author = "alice".into();
        config.add_repository("api", "/src/api");
        config.set_current_profile("zhipu").expect("exists");
        config.current_profile_mut().expect("profile").enable_thinking = true;
        config.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_missing_fields_and_profiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{"current_profile":"proxy","profiles":{"proxy":{"api_key":"k","api_base_url":"http://localhost:9000/v1","provider":"zhipu"}}}"#,
        )
        .expect("write");
        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.default_since, "today");
        assert!(config.profiles.contains_key("deepseek"));

        let profile = config.resolve_profile(None, None).expect("profile");
        assert_eq!(profile.name.as_str(), "proxy");
        assert_eq!(profile.kind, ProviderKind::Zhipu);
        assert_eq!(profile.model, "glm-4");
        assert_eq!(profile.base_url, "http://localhost:9000/v1");
        assert_eq!(profile.temperature, None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");
        let err = AppConfig::load(&path).expect_err("parse error");
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn stale_current_profile_falls_back_to_deepseek() {
        let mut config = AppConfig::default();
        config.current_profile = "removed".into();
        assert_eq!(config.select_profile_name(None).expect("name"), "deepseek");
    }

    #[test]
    fn requested_profile_must_exist() {
        let config = AppConfig::default();
        let err = config
            .select_profile_name(Some("missing"))
            .expect_err("unknown");
        assert!(err.to_string().contains("missing"));
        assert_eq!(config.select_profile_name(Some("openai")).expect("ok"), "openai");
    }

    #[test]
    fn api_key_override_wins() {
        let mut config = AppConfig::default();
        config.current_profile_mut().expect("profile").api_key = "stored".into();
        let profile = config.resolve_profile(None, Some("env-key")).expect("profile");
        assert_eq!(profile.api_key, "env-key");
        let profile = config.resolve_profile(None, Some("  ")).expect("profile");
        assert_eq!(profile.api_key, "stored");
    }

    #[test]
    fn time_range_updates_only_given_bounds() {
        let mut config = AppConfig::default();
        config.set_time_range(Some("7 days ago"), None);
        assert_eq!(config.default_since, "7 days ago");
        assert_eq!(config.default_until, "today");
    }

    #[test]
    fn remove_repository_reports_missing_alias() {
        let mut config = AppConfig::default();
        config.add_repository("web", "/src/web");
        assert!(config.remove_repository("web"));
        assert!(!config.remove_repository("web"));
    }

    fn repo(alias: &str, path: &str) -> Repository {
        Repository {
            alias: alias.into(),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn taken_aliases_get_numbered_suffixes() {
        let mut config = AppConfig::default();
        assert_eq!(config.unique_alias("api"), "api");
        config.add_repository("api", "/work/api");
        config.add_repository("api-1", "/old/api");
        assert_eq!(config.unique_alias("api"), "api-2");
    }

    #[test]
    fn discovered_repositories_skip_known_paths() {
        let mut config = AppConfig::default();
        config.add_repository("api", "/work/api");
        let added = config.add_discovered(&[
            repo("api", "/work/api"),
            repo("api", "/home/alice/api"),
            repo("web", "/home/alice/web"),
            repo("api", "/src/api"),
        ]);
        assert_eq!(added, vec!["api-1", "web", "api-2"]);
        assert_eq!(config.repositories["api"], "/work/api");
        assert_eq!(config.repositories["api-1"], "/home/alice/api");
        assert_eq!(config.repositories["api-2"], "/src/api");
        assert_eq!(config.repositories.len(), 4);
    }

    #[test]
    fn remove_config_deletes_the_g2log_directory() {
        let home = tempfile::tempdir().expect("tempdir");
        let path = home.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        AppConfig::default().save(&path).expect("save");
        std::fs::write(path.with_file_name("work-summary.md"), "x").expect("summary");

        let removed = remove_config(&path).expect("remove");
        assert_eq!(removed, Some(home.path().join(CONFIG_DIR_NAME)));
        assert!(!home.path().join(CONFIG_DIR_NAME).exists());
        assert_eq!(remove_config(&path).expect("again"), None);
    }

    #[test]
    fn remove_config_leaves_other_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.json");
        let neighbour = dir.path().join("keep.txt");
        AppConfig::default().save(&path).expect("save");
        std::fs::write(&neighbour, "keep").expect("neighbour");

        assert_eq!(remove_config(&path).expect("remove"), Some(path.clone()));
        assert!(!path.exists());
        assert!(neighbour.exists());
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("sk-1234567890"), "sk-1...7890");
    }
}
