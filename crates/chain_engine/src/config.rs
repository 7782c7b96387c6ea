use std::path::Path;

use serde::Deserialize;

use chain_base::http::HttpServerConfig;
use chain_base::{ChainError, ChainResult, ErrorKind, ResultExt};

use crate::link::{Curie, CurieRegistry, LinkBuilder};

/// Configuration of a Chain API deployment, usually read from `chain.toml`.
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Title shown on the API root.
    pub title: String,
    /// Absolute origin all generated links start with.
    pub base_url: String,
    /// Number of members per collection page.
    pub page_size: usize,
    pub curie: CurieConfig,
    pub server: ServerConfig,
}

/// The compact relation prefix and the documentation URL template it expands to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurieConfig {
    pub name: String,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "Chain API".to_string(),
            base_url: "http://localhost:8000".to_string(),
            page_size: 30,
            curie: CurieConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for CurieConfig {
    fn default() -> Self {
        Self {
            name: "ch".to_string(),
            template: "http://localhost:8000/rels/{rel}".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> ChainResult<Self> {
        let config: ApiConfig = toml::from_str(text).map_err(|e| {
            Box::new(ChainError::message(format!("Invalid configuration: {}", e)))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ChainResult<()> {
        if self.page_size == 0 {
            return Err(Box::new(ChainError::validation("page_size must be at least 1")));
        }
        if self.curie.name.is_empty() || self.curie.name.contains(':') {
            return Err(Box::new(ChainError::validation(
                "curie.name must be a non-empty prefix without ':'",
            )));
        }
        if !self.curie.template.contains("{rel}") {
            return Err(Box::new(ChainError::validation(
                "curie.template must contain '{rel}'",
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Box::new(ChainError::validation(
                "base_url must be an absolute http(s) URL",
            )));
        }
        Ok(())
    }

    /// The link builder described by `base_url` and `curie`.
    pub fn link_builder(&self) -> LinkBuilder {
        LinkBuilder::new(
            self.base_url.clone(),
            CurieRegistry::new(Curie {
                name: self.curie.name.clone(),
                template: self.curie.template.clone(),
            }),
        )
    }

    pub fn server_config(&self) -> HttpServerConfig {
        HttpServerConfig::new(self.server.host.clone()).with_port(self.server.port)
    }
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> ChainResult<ApiConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        Box::new(ChainError::new(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    ApiConfig::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ApiConfig::from_toml_str("").unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.page_size, 30);
        assert_eq!(config.curie.name, "ch");
        assert_eq!(config.link_builder().root_href(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = ApiConfig::from_toml_str(
            r#"
title = "Tidmarsh"
page_size = 5

[curie]
name = "td"
template = "https://tidmarsh.example/rels/{rel}"

[server]
port = 9000
"#,
        )
        .unwrap();
        assert_eq!(config.title, "Tidmarsh");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.link_builder().resolve("td:sites"),
            Some("https://tidmarsh.example/rels/sites".to_string())
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ApiConfig::from_toml_str("page_size = 0").is_err());
        assert!(ApiConfig::from_toml_str("base_url = \"localhost\"").is_err());
        assert!(ApiConfig::from_toml_str("[curie]\ntemplate = \"http://x/rels\"").is_err());
        assert!(ApiConfig::from_toml_str("unknown = 1").is_err());
        assert!(ApiConfig::from_toml_str("page_size = \"many\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title = \"From file\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.title, "From file");
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FileError { .. }));
    }

    #[test]
    fn test_load_config_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size = [").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("loading "));
    }
}
