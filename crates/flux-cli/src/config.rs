use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use flux_core::collaboration::{CollaborationConfig, MentionGrowth};
use flux_core::documents::DEFAULT_PREVIEW_CHARS;
use flux_core::providers::groq::DEFAULT_BASE_URL;
use flux_core::ChatMode;

pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FluxConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub collaboration: CollaborationSection,
    #[serde(default)]
    pub agents: AgentsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationSection {
    #[serde(default = "default_team_rounds")]
    pub team_rounds_with_documents: u32,
    #[serde(default = "default_preview_chars")]
    pub file_preview_chars: usize,
    #[serde(default)]
    pub mention_growth: MentionGrowth,
    #[serde(default)]
    pub default_mode: ChatMode,
}

impl Default for CollaborationSection {
    fn default() -> Self {
        Self {
            team_rounds_with_documents: default_team_rounds(),
            file_preview_chars: default_preview_chars(),
            mention_growth: MentionGrowth::default(),
            default_mode: ChatMode::default(),
        }
    }
}

fn default_team_rounds() -> u32 {
    3
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Agent id -> model identifier
    #[serde(default)]
    pub models: HashMap<String, String>,
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flux")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl FluxConfig {
    /// Load from `custom_path`, or from `~/.flux/config.toml`. Without a
    /// custom path and without a file on disk, the embedded default is used.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = match custom_path {
            Some(p) => p.clone(),
            None => {
                let path = default_config_path();
                if !path.exists() {
                    debug!("No config at {}, using built-in defaults", path.display());
                    return Self::parse(DEFAULT_CONFIG);
                }
                path
            }
        };
        Self::load_file(&path)
    }

    fn load_file(path: &Path) -> Result<Self> {
        // Refuse group/world-readable files, they may hold the api key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `flux init` first.",
                path.display()
            )
        })?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Expand allowlisted environment variables, then parse TOML
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;

        if config.provider.api_key.starts_with("gsk_") {
            warn!(
                "API key is hardcoded in config file. Use an environment variable instead: \
                 api_key = \"${{GROQ_API_KEY}}\""
            );
        }
        if config.collaboration.team_rounds_with_documents == 0 {
            warn!("team_rounds_with_documents is 0, treating it as 1");
        }

        Ok(config)
    }

    pub fn is_provider_configured(&self) -> bool {
        !self.provider.api_key.trim().is_empty()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.gateway
            .bind
            .parse()
            .with_context(|| format!("Invalid gateway bind address '{}'", self.gateway.bind))
    }

    pub fn collaboration_config(&self) -> CollaborationConfig {
        CollaborationConfig {
            team_rounds_with_documents: self.collaboration.team_rounds_with_documents,
            file_preview_chars: self.collaboration.file_preview_chars,
            mention_growth: self.collaboration.mention_growth,
            max_tokens: self.provider.max_tokens,
            temperature: self.provider.temperature,
            default_mode: self.collaboration.default_mode,
        }
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.provider.api_key = mask_secret(&self.provider.api_key);
        copy
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &["GROQ_API_KEY", "FLUX_GATEWAY_BIND", "HOME", "USER"];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();
        }
        file
    }

    #[test]
    fn test_embedded_default_parses() {
        let config = FluxConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.gateway.bind, "127.0.0.1:8000");
        assert_eq!(config.collaboration.team_rounds_with_documents, 3);
        assert_eq!(config.collaboration.mention_growth, MentionGrowth::TeamOnly);
        assert_eq!(config.collaboration.default_mode, ChatMode::Team);
        assert!(config.agents.models.is_empty());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FluxConfig::parse("").unwrap();
        assert!(!config.is_provider_configured());
        assert_eq!(config.collaboration_config(), CollaborationConfig::default());
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
[provider]
api_key = "test-key-123456"
max_tokens = 256

[collaboration]
file_preview_chars = 5000
mention_growth = "always"
default_mode = "single"

[agents.models]
ramos = "llama-3.3-70b-versatile"
"#,
        );
        let config = FluxConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert!(config.is_provider_configured());

        let collab = config.collaboration_config();
        assert_eq!(collab.max_tokens, 256);
        assert_eq!(collab.file_preview_chars, 5000);
        assert_eq!(collab.mention_growth, MentionGrowth::Always);
        assert_eq!(collab.default_mode, ChatMode::Single);
        assert_eq!(
            config.agents.models.get("ramos").map(String::as_str),
            Some("llama-3.3-70b-versatile")
        );
    }

    #[test]
    fn test_missing_custom_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = FluxConfig::load(&Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("flux init"));
    }

    #[test]
    fn test_invalid_mention_growth_rejected() {
        assert!(FluxConfig::parse("[collaboration]\nmention_growth = \"sometimes\"").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissive_file_rejected() {
        use std::os::unix::fs::PermissionsExt;
        let file = write_config("[provider]\napi_key = \"x\"");
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = FluxConfig::load(&Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("permissive"));
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_env_vars("dir = \"${HOME}/x\""), format!("dir = \"{}/x\"", home));
        assert_eq!(expand_env_vars("k = \"${SECRET_THING}\""), "k = \"${SECRET_THING}\"");
        assert_eq!(expand_env_vars("no vars here"), "no vars here");
        assert_eq!(expand_env_vars("broken ${HOME"), "broken ${HOME");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("gsk_abcdefgh1234"), "gsk...1234");
    }

    #[test]
    fn test_debug_and_redacted_hide_key() {
        let config = FluxConfig::parse("[provider]\napi_key = \"gsk_supersecretvalue\"").unwrap();
        assert!(!format!("{:?}", config).contains("supersecret"));
        let shown = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!shown.contains("supersecret"));
        assert!(shown.contains("gsk...alue"));
    }
}
