//! Service configuration read from the environment once at startup.

use crate::error::StoreError;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub data_dir: PathBuf,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// Base URL of an OpenAI-compatible embedding server. Unset means the
    /// offline hashing embedder is used.
    pub embedder_url: Option<String>,
    pub embedder_api_key: Option<String>,
    pub default_top_k: usize,
    /// When set, products come from this REST endpoint instead of the database.
    pub product_service_url: Option<String>,
    pub database_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_name: "rag-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            data_dir: PathBuf::from("./data"),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
            embedder_url: None,
            embedder_api_key: None,
            default_top_k: 5,
            product_service_url: None,
            database_url: "./products.db".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or empty keys keep their
    /// defaults; malformed numbers are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let config = Config {
            service_name: get("SERVICE_NAME").unwrap_or(defaults.service_name),
            host: get("SERVICE_HOST").unwrap_or(defaults.host),
            port: parse_or(get("SERVICE_PORT"), "SERVICE_PORT", defaults.port)?,
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or(
                get("EMBEDDING_DIMENSION"),
                "EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            )?,
            embedder_url: get("EMBEDDER_URL"),
            embedder_api_key: get("EMBEDDER_API_KEY"),
            default_top_k: parse_or(get("DEFAULT_TOP_K"), "DEFAULT_TOP_K", defaults.default_top_k)?,
            product_service_url: get("PRODUCT_SERVICE_URL"),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
        };

        if config.embedding_dimension == 0 {
            return Err(StoreError::Config("EMBEDDING_DIMENSION must be positive".to_string()));
        }
        if config.default_top_k == 0 {
            return Err(StoreError::Config("DEFAULT_TOP_K must be positive".to_string()));
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, StoreError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StoreError::Config(format!("Invalid value for {}: '{}'", key, raw))),
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, StoreError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();

        assert_eq!(config.service_name, "rag-service");
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(config.product_service_url.is_none());
        assert!(config.embedder_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("SERVICE_PORT", "9001"),
            ("DATA_DIR", "/var/lib/rag"),
            ("DEFAULT_TOP_K", " 10 "),
            ("PRODUCT_SERVICE_URL", "http://products:8080/api/v1/products"),
            ("EMBEDDING_DIMENSION", "768"),
        ])
        .unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/rag"));
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(
            config.product_service_url.as_deref(),
            Some("http://products:8080/api/v1/products")
        );
    }

    #[test]
    fn test_empty_value_keeps_default() {
        let config = from_pairs(&[("PRODUCT_SERVICE_URL", ""), ("SERVICE_NAME", "  ")]).unwrap();

        assert!(config.product_service_url.is_none());
        assert_eq!(config.service_name, "rag-service");
    }

    #[test]
    fn test_malformed_number_rejected() {
        let result = from_pairs(&[("SERVICE_PORT", "eighty")]);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(from_pairs(&[("DEFAULT_TOP_K", "0")]).is_err());
        assert!(from_pairs(&[("EMBEDDING_DIMENSION", "0")]).is_err());
    }
}
