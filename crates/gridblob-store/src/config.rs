use std::path::Path;

use gridblob_engine::Namespace;
use serde::{Deserialize, Serialize};

use crate::error::{BlobError, BlobResult};

/// Where a [`BlobStore`](crate::BlobStore) connects and which bucket it
/// binds to.
///
/// ```toml
/// host = "db.internal:27017"
/// database = "media"
/// bucket = "uploads"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_database() -> String {
    "test".into()
}

fn default_bucket() -> String {
    "fs".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            database: default_database(),
            bucket: default_bucket(),
        }
    }
}

impl StoreConfig {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            bucket: bucket.into(),
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> BlobResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| BlobError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> BlobResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Reject blank fields.
    pub fn validate(&self) -> BlobResult<()> {
        for (field, value) in [
            ("host", &self.host),
            ("database", &self.database),
            ("bucket", &self.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(BlobError::invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.database.clone(), self.bucket.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.database, "test");
        assert_eq!(c.bucket, "fs");
        assert_eq!(c.namespace(), Namespace::new("test", "fs"));
    }

    #[test]
    fn parse_full_document() {
        let c = StoreConfig::from_toml_str(
            r#"
            host = "db.internal:27017"
            database = "media"
            bucket = "uploads"
            "#,
        )
        .unwrap();
        assert_eq!(c, StoreConfig::new("db.internal:27017", "media", "uploads"));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let c = StoreConfig::from_toml_str("database = \"media\"").unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.database, "media");
        assert_eq!(c.bucket, "fs");
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = StoreConfig::from_toml_str("host = ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn blank_bucket_is_invalid() {
        let err = StoreConfig::from_toml_str("bucket = \"  \"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridblob.toml");
        std::fs::write(&path, "bucket = \"photos\"\n").unwrap();
        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.bucket, "photos");
    }

    #[test]
    fn load_missing_file_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
