use rusqlite::Connection;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::db::migrations::MigrationManager;

/// Database file name inside the data directory
const DB_FILE: &str = "collection.db";
/// Config file name inside the data directory
const CONFIG_FILE: &str = "config.json";
/// Media directory name inside the data directory
const MEDIA_DIR: &str = "media";

/// Database connection manager
///
/// All state lives in one data directory (default `~/.dict2deck`):
/// the collection database, `config.json` and the `media/` directory.
/// The location can be overridden with `data.location=<dir>` in `~/.dict2deck/rc`.
pub struct DbConnection;

impl DbConnection {
    fn home_dir() -> Result<PathBuf> {
        dirs::home_dir().context("Failed to determine home directory")
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(".dict2deck"))
    }

    /// Get the rc file path
    pub fn rc_path() -> Result<PathBuf> {
        Ok(Self::default_data_dir()?.join("rc"))
    }

    /// Parse `data.location=` out of rc content; relative paths resolve against `rc_dir`
    pub fn parse_data_location(rc_content: &str, rc_dir: &Path) -> Option<PathBuf> {
        rc_content
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("data.location="))
            .map(|value| {
                let path = PathBuf::from(value.trim());
                if path.is_relative() {
                    rc_dir.join(path)
                } else {
                    path
                }
            })
    }

    /// Get the data directory from the rc file or the default
    pub fn resolve_data_dir() -> Result<PathBuf> {
        let rc_path = Self::rc_path()?;

        if let Ok(content) = std::fs::read_to_string(&rc_path) {
            let rc_dir = rc_path.parent().map(Path::to_path_buf).unwrap_or_default();
            if let Some(dir) = Self::parse_data_location(&content, &rc_dir) {
                return Ok(dir);
            }
        }

        Self::default_data_dir()
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::resolve_data_dir()?.join(DB_FILE))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::resolve_data_dir()?.join(CONFIG_FILE))
    }

    pub fn media_dir() -> Result<PathBuf> {
        Ok(Self::resolve_data_dir()?.join(MEDIA_DIR))
    }

    /// Connect to the collection database, creating it and parent directories if needed
    pub fn connect() -> Result<Connection> {
        Self::connect_at(&Self::db_path()?)
    }

    /// Connect to a database file at an explicit path
    pub fn connect_at(db_path: &Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}
