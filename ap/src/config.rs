//! agentpen configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tools::{SandboxSettings, ScriptSettings};

/// Main agentpen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Where tools may act and how scripts run
    pub sandbox: SandboxConfig,

    /// Agent loop limits and prompt
    pub agent: AgentConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.agent.max_turns == 0 {
            return Err(eyre::eyre!("agent.max-turns must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .agentpen.yml
        let local_config = PathBuf::from(".agentpen.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/agentpen/agentpen.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("agentpen").join("agentpen.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let mut config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        // Relative project roots are anchored at the config file's directory
        let base = std::path::absolute(path)
            .context("Failed to resolve config file path")?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.sandbox.project_root = Some(match config.sandbox.project_root.take() {
            Some(root) if root.is_relative() => base.join(root),
            Some(root) => root,
            None => base,
        });

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Working root for tool calls that don't name one
    pub root: PathBuf,

    /// Base for relative roots; filled with the config file's directory on load
    #[serde(rename = "project-root")]
    pub project_root: Option<PathBuf>,

    /// Read cap in characters
    #[serde(rename = "max-chars")]
    pub max_chars: usize,

    pub script: ScriptConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("calculator"),
            project_root: None,
            max_chars: 10_000,
            script: ScriptConfig::default(),
        }
    }
}

impl SandboxConfig {
    /// Settings handed to the tool dispatcher
    pub fn to_settings(&self) -> SandboxSettings {
        let mut settings = SandboxSettings::new(&self.root)
            .with_max_chars(self.max_chars)
            .with_script(self.script.to_settings());
        if let Some(project_root) = &self.project_root {
            settings = settings.with_project_root(project_root);
        }
        settings
    }
}

/// Script runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Interpreter executable, looked up on PATH
    pub interpreter: String,

    /// Required script extension, without the dot
    pub extension: String,

    /// Script type named in messages
    pub label: String,

    /// Kill the script after this many milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            label: "Python".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ScriptConfig {
    pub fn to_settings(&self) -> ScriptSettings {
        ScriptSettings {
            interpreter: self.interpreter.clone(),
            extension: self.extension.trim_start_matches('.').to_string(),
            label: self.label.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model turns before the run is abandoned
    #[serde(rename = "max-turns")]
    pub max_turns: u32,

    /// Replaces the built-in system prompt when set
    #[serde(rename = "system-prompt")]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.sandbox.root, PathBuf::from("calculator"));
        assert_eq!(config.sandbox.max_chars, 10_000);
        assert_eq!(config.sandbox.script.timeout_ms, 30_000);
        assert_eq!(config.agent.max_turns, 20);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  model: claude-opus-4
  api-key-env: MY_API_KEY
  max-tokens: 4096

sandbox:
  root: workspace
  max-chars: 500
  script:
    interpreter: sh
    extension: .sh
    label: shell
    timeout-ms: 1500

agent:
  max-turns: 5
  system-prompt: "Be brief."

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-opus-4");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.agent.system_prompt.as_deref(), Some("Be brief."));
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        let settings = config.sandbox.to_settings();
        assert_eq!(settings.default_root, PathBuf::from("workspace"));
        assert_eq!(settings.max_chars, 500);
        assert_eq!(settings.script.interpreter, "sh");
        assert_eq!(settings.script.extension, "sh");
        assert_eq!(settings.script.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
sandbox:
  root: other
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.sandbox.root, PathBuf::from("other"));
        assert_eq!(config.sandbox.max_chars, 10_000);
        assert_eq!(config.sandbox.script.interpreter, "python3");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_load_anchors_project_root_at_config_dir() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("agentpen.yml");
        fs::write(&path, "sandbox:\n  root: calculator\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        let project_root = config.sandbox.project_root.unwrap();
        assert_eq!(
            fs::canonicalize(project_root).unwrap(),
            fs::canonicalize(temp.path()).unwrap()
        );
    }

    #[test]
    fn test_load_relative_project_root() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("agentpen.yml");
        fs::write(&path, "sandbox:\n  project-root: projects\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.sandbox.project_root.unwrap().ends_with("projects"));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nope.yml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to load config from"));
    }

    #[test]
    fn test_validate_rejects_zero_turns() {
        let mut config = Config::default();
        // PATH is always set, so only the turn limit can fail here
        config.llm.api_key_env = "PATH".to_string();
        config.agent.max_turns = 0;

        assert!(config.validate().is_err());
        config.agent.max_turns = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "AGENTPEN_TEST_KEY_THAT_IS_NEVER_SET".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("AGENTPEN_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
