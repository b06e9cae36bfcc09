use crate::session::Solve;
use crate::util::format_time;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Durable home of the solve history
pub trait SolveStore {
    /// Oldest first; empty when nothing was saved yet
    fn load(&self) -> Result<Vec<Solve>, StoreError>;
    /// Replaces the stored history with `solves`
    fn save(&mut self, solves: &[Solve]) -> Result<(), StoreError>;
}

impl<T: SolveStore + ?Sized> SolveStore for Box<T> {
    fn load(&self) -> Result<Vec<Solve>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, solves: &[Solve]) -> Result<(), StoreError> {
        (**self).save(solves)
    }
}

/// History kept as one JSON array in a file
#[derive(Debug, Clone)]
pub struct JsonSolveStore {
    path: PathBuf,
}

impl JsonSolveStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl SolveStore for JsonSolveStore {
    fn load(&self) -> Result<Vec<Solve>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        match serde_json::from_slice::<Vec<Solve>>(&bytes) {
            Ok(solves) => Ok(solves),
            Err(err) => {
                // keep the unreadable file around; the next save overwrites the original
                let backup = self.backup_path();
                match fs::copy(&self.path, &backup) {
                    Ok(_) => warn!(path = %backup.display(), "backed up unreadable history"),
                    Err(copy_err) => warn!(%copy_err, "could not back up unreadable history"),
                }
                Err(err.into())
            }
        }
    }

    fn save(&mut self, solves: &[Solve]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(solves)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// History kept in a SQLite table, one row per solve
#[derive(Debug)]
pub struct SqliteSolveStore {
    conn: Connection,
}

impl SqliteSolveStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS solves (
                position INTEGER PRIMARY KEY,
                duration_ms INTEGER NOT NULL,
                scramble TEXT NOT NULL,
                created_at TEXT NOT NULL,
                not_finished BOOLEAN NOT NULL DEFAULT 0
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl SolveStore for SqliteSolveStore {
    fn load(&self) -> Result<Vec<Solve>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT duration_ms, scramble, created_at, not_finished FROM solves ORDER BY position",
        )?;

        let rows = stmt.query_map([], |row| {
            let created_str: String = row.get(2)?;
            let created_at = DateTime::parse_from_rfc3339(&created_str)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Utc);

            Ok(Solve {
                duration_ms: row.get(0)?,
                scramble: row.get(1)?,
                created_at,
                not_finished: row.get(3)?,
            })
        })?;

        let mut solves = Vec::new();
        for solve in rows {
            solves.push(solve?);
        }
        Ok(solves)
    }

    fn save(&mut self, solves: &[Solve]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM solves", [])?;
        for (position, solve) in solves.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO solves (position, duration_ms, scramble, created_at, not_finished)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    position as i64,
                    solve.duration_ms as i64,
                    &solve.scramble,
                    solve.created_at.to_rfc3339(),
                    solve.not_finished,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Keeps everything in memory; counts saves so tests can observe them
#[derive(Debug, Default, Clone)]
pub struct MemorySolveStore {
    pub solves: Vec<Solve>,
    pub saves: usize,
}

impl MemorySolveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solves(solves: Vec<Solve>) -> Self {
        Self { solves, saves: 0 }
    }
}

impl SolveStore for MemorySolveStore {
    fn load(&self) -> Result<Vec<Solve>, StoreError> {
        Ok(self.solves.clone())
    }

    fn save(&mut self, solves: &[Solve]) -> Result<(), StoreError> {
        self.solves = solves.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    solve: usize,
    duration_ms: u64,
    time: String,
    scramble: String,
    created_at: &'a DateTime<Utc>,
    not_finished: bool,
}

/// Writes `solves` as CSV with a header row
pub fn export_csv<P: AsRef<Path>>(path: P, solves: &[Solve]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for (idx, solve) in solves.iter().enumerate() {
        writer.serialize(CsvRow {
            solve: idx + 1,
            duration_ms: solve.duration_ms,
            time: format_time(solve.duration_ms),
            scramble: solve.scramble.clone(),
            created_at: &solve.created_at,
            not_finished: solve.not_finished,
        })?;
    }
    writer.flush()?;
    info!(count = solves.len(), path = %path.as_ref().display(), "exported history");
    Ok(())
}
