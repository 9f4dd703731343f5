use serde::Deserialize;
use std::{env, fs, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
    /// When false, `POST /api/v1/auth/register` answers 403.
    #[serde(default = "default_allow_registration")]
    pub allow_registration: bool,
    /// IANA zone used to decide which calendar day "today" is.
    pub timezone: Option<String>,
}

fn default_allow_registration() -> bool {
    true
}

impl AppConfig {
    /// The configured zone, falling back to UTC when unset or unknown.
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.as_deref() {
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(timezone = name, "config: unknown timezone, using UTC");
                chrono_tz::UTC
            }),
            None => chrono_tz::UTC,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConfigError::Invalid(m) => write!(f, "invalid config: {}", m),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        if let Some(name) = self.timezone.as_deref()
            && name.parse::<chrono_tz::Tz>().is_err()
        {
            return Err(ConfigError::Invalid(format!("unknown timezone: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = AppConfig::from_yaml("jwt_secret: 0123456789abcdef0123\n").unwrap();
        assert!(cfg.allow_registration);
        assert_eq!(cfg.listen_port, None);
        assert_eq!(cfg.tz(), chrono_tz::UTC);
    }

    #[test]
    fn parses_full_config() {
        let text = r#"
jwt_secret: "a-long-enough-secret"
listen_port: 8080
dev_cors_origin: "http://localhost:5173"
allow_registration: false
timezone: "Europe/Warsaw"
"#;
        let cfg = AppConfig::from_yaml(text).unwrap();
        assert_eq!(cfg.listen_port, Some(8080));
        assert!(!cfg.allow_registration);
        assert_eq!(cfg.tz(), chrono_tz::Europe::Warsaw);
    }

    #[test]
    fn rejects_blank_secret_and_bad_zone() {
        assert!(matches!(
            AppConfig::from_yaml("jwt_secret: \"  \"\n"),
            Err(ConfigError::Invalid(_))
        ));
        let err = AppConfig::from_yaml("jwt_secret: 0123456789abcdef\ntimezone: Mars/Base\n")
            .unwrap_err();
        assert!(err.to_string().contains("Mars/Base"));
    }

    #[test]
    fn missing_secret_is_yaml_error() {
        assert!(matches!(
            AppConfig::from_yaml("listen_port: 1\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
