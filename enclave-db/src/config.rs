//! Database configuration, read from the `[database]` table of `enclave.toml`.

use crate::error::{DbError, DbResult};
use enclave_types::NamespaceName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// SQLite journal mode applied to every database file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Write-ahead logging: readers never block the single writer.
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding `main.<ext>` and one file per namespace.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// File extension for database files.
    #[serde(default = "default_extension")]
    pub namespace_extension: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("enclave-data")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_extension() -> String {
    "db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            namespace_extension: default_extension(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<DatabaseConfig>,
}

impl DatabaseConfig {
    /// Default settings rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Loads the `[database]` table from a TOML file.
    ///
    /// A missing file (or a file without a `[database]` table) yields the
    /// defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            info!("No config file found at {:?}, using database defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses the `[database]` table from TOML text.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))?;
        let config = file.database.unwrap_or_default();
        if config.namespace_extension.is_empty()
            || !config
                .namespace_extension
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DbError::Config(format!(
                "namespace_extension must be alphanumeric, got '{}'",
                config.namespace_extension
            )));
        }
        Ok(config)
    }

    /// Writes these settings as the `[database]` table of a TOML file,
    /// creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> DbResult<()> {
        let file = ConfigFile {
            database: Some(self.clone()),
        };
        let contents =
            toml::to_string_pretty(&file).map_err(|e| DbError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Path of the host database file.
    pub fn main_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("main.{}", self.namespace_extension))
    }

    /// Path of a namespace's database file.
    pub fn namespace_path(&self, namespace: &NamespaceName) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", namespace, self.namespace_extension))
    }
}
