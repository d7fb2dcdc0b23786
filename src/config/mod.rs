use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".hubaudit.toml";

/// Top-level configuration from `.hubaudit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub controls: ControlSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Named profile from the shared config files; `None` uses the default chain.
    #[serde(default)]
    pub profile: Option<String>,
    /// Per-operation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_region() -> String {
    "ap-northeast-2".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            profile: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Where the compliance catalog lives and how a load failure is treated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// When true, a control whose catalog cannot be loaded returns NA
    /// without evaluating anything.
    #[serde(default = "default_true")]
    pub strict: bool,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("compliance/aws_security_hub.json")
}

fn default_true() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            strict: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

/// Tunable thresholds handed to the controls that take one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Minimum DocumentDB backup retention, in days.
    #[serde(default = "default_docdb_min_retention_days")]
    pub docdb_min_retention_days: i32,
}

fn default_docdb_min_retention_days() -> i32 {
    7
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            docdb_min_retention_days: default_docdb_min_retention_days(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            return Err(AuditError::Config("aws.region must not be empty".into()));
        }
        if self.aws.timeout_secs == 0 {
            return Err(AuditError::Config("aws.timeout_secs must be positive".into()));
        }
        if self.aws.connect_timeout_secs == 0 {
            return Err(AuditError::Config("aws.connect_timeout_secs must be positive".into()));
        }
        if self.controls.docdb_min_retention_days < 1 {
            return Err(AuditError::Config(
                "controls.docdb_min_retention_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Command-line and environment overrides win over the file.
    pub fn with_overrides(mut self, region: Option<String>, profile: Option<String>) -> Self {
        if let Some(region) = region.filter(|r| !r.trim().is_empty()) {
            self.aws.region = region;
        }
        if let Some(profile) = profile.filter(|p| !p.trim().is_empty()) {
            self.aws.profile = Some(profile);
        }
        self
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# hubaudit configuration

[aws]
# Region for regional services. CloudFront is always queried in us-east-1.
region = "ap-northeast-2"
# profile = "audit"
timeout_secs = 30
connect_timeout_secs = 5

[catalog]
path = "compliance/aws_security_hub.json"
# Return NA when the catalog cannot be loaded.
strict = true

[server]
bind = "127.0.0.1:8080"

[logging]
# Overridden by RUST_LOG.
filter = "info"
json = false

[controls]
docdb_min_retention_days = 7
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.aws.region, "ap-northeast-2");
        assert!(config.catalog.strict);
    }

    #[test]
    fn starter_toml_parses_to_defaults() {
        let parsed: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "[aws]\nregion = \"eu-west-1\"\n\n[catalog]\nstrict = false\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.aws.region, "eu-west-1");
        assert_eq!(config.aws.timeout_secs, 30);
        assert!(!config.catalog.strict);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn empty_region_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[aws]\nregion = \"\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        std::fs::write(&path, "[aws]\nconnect_timeout_secs = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("aws.connect_timeout_secs"));

        std::fs::write(&path, "[aws]\ntimeout_secs = 0\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("aws.timeout_secs"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[aws\nregion=").unwrap();
        assert!(matches!(Config::load(&path), Err(AuditError::Toml(_))));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config =
            Config::default().with_overrides(Some("us-west-2".into()), Some("ops".into()));
        assert_eq!(config.aws.region, "us-west-2");
        assert_eq!(config.aws.profile.as_deref(), Some("ops"));

        let config = Config::default().with_overrides(Some(" ".into()), None);
        assert_eq!(config.aws.region, "ap-northeast-2");
    }
}
