//! Configuration loading and management.
//!
//! Configuration can come from a TOML file, from `ANY2MD_*` environment
//! variables, or be built programmatically. Defaults match the production
//! deployment profile.

use crate::{Any2mdError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration for the conversion pipeline.
///
/// # Example
///
/// ```rust
/// use any2md::Config;
///
/// let config = Config::default();
/// assert_eq!(config.max_concurrent_jobs, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum concurrent conversions in batch operations (0 = num_cpus * 2).
    pub max_concurrent_jobs: usize,

    /// Maximum decoded input size in bytes.
    pub max_file_size: u64,

    /// Directory where extracted images are written. Created on demand.
    pub temp_image_dir: PathBuf,

    /// Maximum rows rendered per spreadsheet sheet; excess rows are truncated
    /// with a note.
    pub excel_max_rows: usize,

    /// Allowed file extensions (lowercase, no dot).
    pub allowed_file_types: Vec<String>,

    /// Minimum page count before the repetition-based header/footer
    /// heuristic engages.
    pub header_footer_min_pages: usize,

    /// Optional URL prefix for embedded image links. `None` embeds bare
    /// filenames.
    pub static_base_url: Option<String>,

    /// Include error source chains in error response details.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            max_file_size: 100 * 1024 * 1024,
            temp_image_dir: std::env::temp_dir().join("any2md-images"),
            excel_max_rows: 10_000,
            allowed_file_types: vec![
                "pdf".to_string(),
                "docx".to_string(),
                "doc".to_string(),
                "xlsx".to_string(),
                "xls".to_string(),
            ],
            header_footer_min_pages: 3,
            static_base_url: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Validation` if the TOML is
    /// malformed or the resulting config is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Any2mdError::Io)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            Any2mdError::validation_with_source(
                format!("Invalid config file: {}", path.as_ref().display()),
                e,
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ANY2MD_*` environment variable overrides on top of `self`.
    ///
    /// Recognized: `ANY2MD_MAX_CONCURRENT_JOBS`, `ANY2MD_MAX_FILE_SIZE`,
    /// `ANY2MD_TEMP_IMAGE_DIR`, `ANY2MD_EXCEL_MAX_ROWS`,
    /// `ANY2MD_STATIC_BASE_URL`, `ANY2MD_DEBUG`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("ANY2MD_MAX_CONCURRENT_JOBS") {
            match v.parse() {
                Ok(n) => self.max_concurrent_jobs = n,
                Err(_) => tracing::warn!("Ignoring unparseable ANY2MD_MAX_CONCURRENT_JOBS={}", v),
            }
        }
        if let Ok(v) = std::env::var("ANY2MD_MAX_FILE_SIZE") {
            match v.parse() {
                Ok(n) => self.max_file_size = n,
                Err(_) => tracing::warn!("Ignoring unparseable ANY2MD_MAX_FILE_SIZE={}", v),
            }
        }
        if let Ok(v) = std::env::var("ANY2MD_TEMP_IMAGE_DIR") {
            self.temp_image_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ANY2MD_EXCEL_MAX_ROWS") {
            match v.parse() {
                Ok(n) => self.excel_max_rows = n,
                Err(_) => tracing::warn!("Ignoring unparseable ANY2MD_EXCEL_MAX_ROWS={}", v),
            }
        }
        if let Ok(v) = std::env::var("ANY2MD_STATIC_BASE_URL") {
            self.static_base_url = Some(v);
        }
        if let Ok(v) = std::env::var("ANY2MD_DEBUG") {
            self.debug = matches!(v.as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Validate invariants that defaults guarantee but files and env vars can
    /// break.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero `max_file_size` or an empty
    /// `allowed_file_types` list.
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(Any2mdError::validation("max_file_size must be greater than zero"));
        }
        if self.allowed_file_types.is_empty() {
            return Err(Any2mdError::validation("allowed_file_types must not be empty"));
        }
        Ok(())
    }

    /// Effective batch concurrency limit.
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrent_jobs == 0 {
            num_cpus::get() * 2
        } else {
            self.max_concurrent_jobs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.excel_max_rows, 10_000);
        assert_eq!(config.header_footer_min_pages, 3);
        assert!(config.allowed_file_types.contains(&"pdf".to_string()));
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("any2md.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_concurrent_jobs = 2\nexcel_max_rows = 50").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.excel_max_rows, 50);
        // untouched keys keep their defaults
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/any2md.toml");
        assert!(matches!(result, Err(Any2mdError::Io(_))));
    }

    #[test]
    fn test_from_file_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_file_size = \"lots\"").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(Any2mdError::Validation { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_file_size() {
        let config = Config {
            max_file_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_allowed_types() {
        let config = Config {
            allowed_file_types: vec![],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_concurrency_zero_means_cpu_scaled() {
        let config = Config {
            max_concurrent_jobs: 0,
            ..Config::default()
        };
        assert_eq!(config.effective_concurrency(), num_cpus::get() * 2);

        let config = Config {
            max_concurrent_jobs: 3,
            ..Config::default()
        };
        assert_eq!(config.effective_concurrency(), 3);
    }
}
