use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
}

/// PAN-at-rest encryption settings. The salt is hex-encoded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncryptionConfig {
    pub secret_key: String,
    pub salt_hex: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            secret_key: "myDefaultEncryptionKey123".to_string(),
            salt_hex: "deadbeef".to_string(),
        }
    }
}

/// Token signing settings. The secret is base64-encoded HS256 key material.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            // Dev-only key, overridden per environment
            secret: "c2VjcmV0LWtleS1mb3ItbG9jYWwtZGV2LW9ubHktMDE=".to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        serde_yaml::from_str(&content).context("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: card-core.log
use_json: false
rotation: daily
encryption:
  secret_key: test-secret
  salt_hex: a1b2c3d4
jwt:
  secret: dGVzdC1zaWduaW5nLWtleQ==
  access_ttl_minutes: 15
  refresh_ttl_days: 30
"#;
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.encryption.salt_hex, "a1b2c3d4");
        assert_eq!(cfg.jwt.access_ttl_minutes, 15);
        assert_eq!(cfg.jwt.refresh_ttl_days, 30);
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let yaml = r#"
log_level: debug
log_dir: ./logs
log_file: card-core.log
use_json: true
rotation: never
"#;
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.encryption.secret_key, "myDefaultEncryptionKey123");
        assert_eq!(cfg.jwt.access_ttl_minutes, 30);
    }
}
