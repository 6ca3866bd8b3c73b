// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "pgnav";
pub const API_BASE_KEY: &str = "pgnav.apiBase";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

const REQUIRED_COLUMNS: [&str; 3] = ["key", "value", "updated_at"];

/// Small key/value settings table that survives restarts.
pub struct PrefStore {
    conn: Connection,
}

impl PrefStore {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open prefs database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory prefs database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("create settings table")?;
        validate_schema(&self.conn)
    }

    /// The stored API base, or `None` when unset or blank.
    pub fn get_api_base(&self) -> Result<Option<String>> {
        let value = self.get_setting(API_BASE_KEY)?;
        Ok(value
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty()))
    }

    pub fn put_api_base(&self, value: &str) -> Result<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            bail!("API base must not be empty; pass a URL like http://localhost:8080");
        }
        self.put_setting(API_BASE_KEY, trimmed)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    pub fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }

    pub fn setting_updated_at(&self, key: &str) -> Result<Option<OffsetDateTime>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read timestamp for setting {key}"))?;
        raw.map(|value| {
            OffsetDateTime::parse(&value, &Rfc3339)
                .with_context(|| format!("setting {key} has invalid timestamp {value:?}"))
        })
        .transpose()
    }
}

pub fn default_prefs_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("PGNAV_PREFS_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set PGNAV_PREFS_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("prefs.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("prefs path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "prefs path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("prefs path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!("prefs path {path:?} contains '?'; remove query parameters and use a plain file path");
    }

    Ok(())
}

fn validate_schema(conn: &Connection) -> Result<()> {
    let mut stmt = conn
        .prepare("PRAGMA table_info(settings)")
        .context("inspect settings columns")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .context("query settings column info")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("collect settings columns")?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !columns.iter().any(|name| name == column))
        .collect();
    if !missing.is_empty() {
        bail!(
            "table `settings` is missing required columns: {}; delete the prefs database to recreate it",
            missing.join(", ")
        );
    }
    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
