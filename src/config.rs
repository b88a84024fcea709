use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub pipeline: PipelineConfig,

    pub tools: ToolsConfig,

    pub services: ServicesConfig,

    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            pipeline: PipelineConfig::default(),
            tools: ToolsConfig::default(),
            services: ServicesConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/genevision.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    pub secure_cookies: bool,

    /// Session lifetime after the last request, in minutes.
    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8501,
            cors_allowed_origins: vec![
                "http://localhost:8501".to_string(),
                "http://127.0.0.1:8501".to_string(),
            ],
            secure_cookies: false,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "genevision".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub password_policy: PasswordPolicy,

    /// Upper bound for a base64 encoded profile photo, in bytes.
    pub max_profile_photo_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            password_policy: PasswordPolicy::default(),
            max_profile_photo_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,

    pub min_digits: usize,

    pub min_special: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            min_digits: 2,
            min_special: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory for per-run artifacts (`<data_dir>/<sequence id>/...`).
    pub data_dir: String,

    /// Proteins longer than this are not sent to the structure predictor.
    pub max_sequence_length: usize,

    /// Model copied in place of a prediction for oversized proteins.
    pub placeholder_model_path: String,

    /// Organism label written into predicted gene headers.
    pub organism: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/runs".to_string(),
            max_sequence_length: 400,
            placeholder_model_path: "data/pdb_models/placeholder.pdb".to_string(),
            organism: "Homo sapiens".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub augustus: AugustusConfig,

    pub deepgoplus: DeepGoPlusConfig,

    pub summarizer: SummarizerConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            augustus: AugustusConfig::default(),
            deepgoplus: DeepGoPlusConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AugustusConfig {
    pub program: String,

    pub species: String,

    /// No timeout when unset.
    pub timeout_seconds: Option<u64>,
}

impl Default for AugustusConfig {
    fn default() -> Self {
        Self {
            program: "augustus".to_string(),
            species: "human".to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepGoPlusConfig {
    pub program: String,

    pub data_root: String,

    pub timeout_seconds: Option<u64>,
}

impl Default for DeepGoPlusConfig {
    fn default() -> Self {
        Self {
            program: "deepgoplus".to_string(),
            data_root: "data/deepgoplus".to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,

    pub program: String,

    /// Arguments placed before the description, which is always passed last.
    pub args: Vec<String>,

    pub timeout_seconds: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "python3".to_string(),
            args: vec!["scripts/llm_resume_core.py".to_string()],
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub quickgo: QuickGoConfig,

    pub esmfold: EsmFoldConfig,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            quickgo: QuickGoConfig::default(),
            esmfold: EsmFoldConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickGoConfig {
    pub base_url: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
}

impl Default for QuickGoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ebi.ac.uk/QuickGO/services".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EsmFoldConfig {
    pub url: String,

    pub request_timeout_seconds: u64,

    pub max_attempts: u32,

    /// First wait between attempts; doubles after every failure.
    pub initial_backoff_seconds: u64,
}

impl Default for EsmFoldConfig {
    fn default() -> Self {
        Self {
            url: "https://api.esmatlas.com/foldSequence/v1/pdb/".to_string(),
            request_timeout_seconds: 300,
            max_attempts: 3,
            initial_backoff_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub prune_enabled: bool,

    /// Activity entries older than this are deleted by the prune job.
    pub retention_days: i64,

    /// Six-field cron expression (seconds first).
    pub prune_cron: String,

    pub default_limit: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            prune_enabled: true,
            retention_days: 90,
            prune_cron: "0 0 3 * * *".to_string(),
            default_limit: 20,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("genevision").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".genevision").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.pipeline.data_dir.is_empty() {
            anyhow::bail!("Pipeline data directory cannot be empty");
        }

        if self.pipeline.max_sequence_length == 0 {
            anyhow::bail!("max_sequence_length must be > 0");
        }

        if self.services.esmfold.max_attempts == 0 {
            anyhow::bail!("ESMFold max_attempts must be at least 1");
        }

        if self.history.prune_enabled && self.history.retention_days <= 0 {
            anyhow::bail!("History retention must be > 0 days when pruning is enabled");
        }

        if self.server.session_inactivity_minutes <= 0 {
            anyhow::bail!("Session inactivity window must be > 0 minutes");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.max_sequence_length, 400);
        assert_eq!(config.services.esmfold.max_attempts, 3);
        assert_eq!(config.services.esmfold.initial_backoff_seconds, 5);
        assert_eq!(config.services.esmfold.request_timeout_seconds, 300);
        assert_eq!(config.history.retention_days, 90);
        assert_eq!(config.security.password_policy.min_digits, 2);
        assert!(config.tools.augustus.timeout_seconds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[pipeline]"));
        assert!(toml_str.contains("[services.esmfold]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [pipeline]
            max_sequence_length = 250

            [tools.augustus]
            species = "arabidopsis"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.pipeline.max_sequence_length, 250);
        assert_eq!(config.tools.augustus.species, "arabidopsis");

        assert_eq!(config.tools.augustus.program, "augustus");
        assert_eq!(config.services.esmfold.max_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.services.esmfold.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
