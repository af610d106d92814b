use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const ENV_DATABASE_PATH: &str = "NOTEOCR_DATABASE_PATH";
pub const ENV_WORKER_COUNT: &str = "NOTEOCR_WORKER_COUNT";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let mut config: Config = serde_json::from_value(json_value)?;

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Applies `NOTEOCR_*` environment variables on top of the file values.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
        if !path.trim().is_empty() {
            config.database_path = Some(path);
        }
    }

    if let Ok(raw) = std::env::var(ENV_WORKER_COUNT) {
        config.worker_count = raw.trim().parse().map_err(|e| ConfigError::InvalidEnv {
            name: ENV_WORKER_COUNT.to_string(),
            reason: format!("'{}' is not a worker count: {}", raw, e),
        })?;
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    if config.queue_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "queue_capacity must be at least 1".to_string(),
        });
    }

    if config.tracker.capacity == 0 || config.tracker.broadcast_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "tracker capacities must be at least 1".to_string(),
        });
    }

    let pre = &config.preprocessing;
    if !(0.0..100.0).contains(&pre.low_percentile)
        || !(0.0..=100.0).contains(&pre.high_percentile)
        || pre.low_percentile >= pre.high_percentile
    {
        return Err(ConfigError::Validation {
            message: format!(
                "Percentile cut-offs must satisfy 0 <= low < high <= 100 (got {} / {})",
                pre.low_percentile, pre.high_percentile
            ),
        });
    }

    if pre.sharpen_sigma <= 0.0 {
        return Err(ConfigError::Validation {
            message: format!("sharpen_sigma must be positive (got {})", pre.sharpen_sigma),
        });
    }

    if config.ocr.command.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "ocr.command must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Resolves the configured database file, falling back to the home directory default.
pub fn resolve_database_path(config: &Config) -> Result<PathBuf, ConfigError> {
    match config.database_path {
        Some(ref path) => Ok(PathBuf::from(path)),
        None => crate::db::default_database_path().ok_or_else(|| ConfigError::Validation {
            message: "Cannot determine home directory for the default database path".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::OcrBackend;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_DATABASE_PATH);
        std::env::remove_var(ENV_WORKER_COUNT);
    }

    #[test]
    #[serial]
    fn test_load_valid_config() {
        clear_env();
        let config_json = r#"
        {
            "version": "1.0",
            "database_path": "/var/lib/noteocr/noteocr.db",
            "worker_count": 4,
            "queue_capacity": 32,
            "ocr": { "backend": "cli", "languages": ["eng", "deu"] },
            "preprocessing": { "sharpen_sigma": 1.5, "low_percentile": 2, "high_percentile": 98 },
            "tracker": { "capacity": 500, "ttl_seconds": 60 },
            "logging": { "level": "debug", "format": "json" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.ocr.backend, OcrBackend::Cli);
        assert_eq!(config.ocr.languages.len(), 2);
        assert_eq!(config.preprocessing.sharpen_sigma, 1.5);
        assert_eq!(config.tracker.capacity, 500);
        assert_eq!(
            resolve_database_path(&config).unwrap(),
            PathBuf::from("/var/lib/noteocr/noteocr.db")
        );
    }

    #[test]
    #[serial]
    fn test_minimal_config() {
        clear_env();
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert!(config.worker_count >= 1);
        assert!(resolve_database_path(&config)
            .map(|p| p.ends_with("noteocr.db"))
            .unwrap_or(true));
    }

    #[test]
    #[serial]
    fn test_invalid_version() {
        clear_env();
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_schema_rejects_unknown_backend() {
        clear_env();
        let result = load_config_from_str(r#"{ "version": "1.0", "ocr": { "backend": "cloud" } }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    #[serial]
    fn test_schema_rejects_zero_workers() {
        clear_env();
        let result = load_config_from_str(r#"{ "version": "1.0", "worker_count": 0 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    #[serial]
    fn test_inverted_percentiles_rejected() {
        clear_env();
        let result = load_config_from_str(
            r#"{
                "version": "1.0",
                "preprocessing": { "low_percentile": 90, "high_percentile": 10 }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    #[serial]
    fn test_malformed_json() {
        clear_env();
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var(ENV_DATABASE_PATH, "/tmp/override.db");
        std::env::set_var(ENV_WORKER_COUNT, "3");

        let config = load_config_from_str(r#"{ "version": "1.0", "worker_count": 8 }"#).unwrap();
        clear_env();

        assert_eq!(config.worker_count, 3);
        assert_eq!(config.database_path.as_deref(), Some("/tmp/override.db"));
    }

    #[test]
    #[serial]
    fn test_invalid_env_worker_count() {
        clear_env();
        std::env::set_var(ENV_WORKER_COUNT, "many");

        let result = load_config_from_str(r#"{ "version": "1.0" }"#);
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    #[serial]
    fn test_env_worker_count_zero_rejected() {
        clear_env();
        std::env::set_var(ENV_WORKER_COUNT, "0");

        let result = load_config_from_str(r#"{ "version": "1.0" }"#);
        clear_env();

        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/noteocr.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
