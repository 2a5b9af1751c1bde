use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::jobs::{JobKind, JobRecord, JobStore};

pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

const JOB_COLUMNS: &str =
    "id, kind, status, progress, message, logs_json, output_file, failure_stage, created_at, updated_at";

impl Database {
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL,
                message TEXT NOT NULL,
                logs_json TEXT NOT NULL,
                output_file TEXT,
                failure_stage TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at)",
            [],
        )?;
        Ok(())
    }

    fn row_to_job(row: &Row) -> rusqlite::Result<JobRecord> {
        fn bad_column(index: usize) -> rusqlite::Error {
            rusqlite::Error::InvalidColumnType(index, "TEXT".to_string(), rusqlite::types::Type::Text)
        }
        fn timestamp(raw: String, index: usize) -> rusqlite::Result<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| bad_column(index))
        }

        let kind_str: String = row.get(1)?;
        let status_str: String = row.get(2)?;
        let logs_str: String = row.get(5)?;
        let stage_str: Option<String> = row.get(7)?;

        Ok(JobRecord {
            id: row.get(0)?,
            kind: serde_json::from_str(&kind_str).map_err(|_| bad_column(1))?,
            status: serde_json::from_str(&status_str).map_err(|_| bad_column(2))?,
            progress: row.get(3)?,
            message: row.get(4)?,
            logs: serde_json::from_str(&logs_str).map_err(|_| bad_column(5))?,
            output_file: row.get::<_, Option<String>>(6)?.map(PathBuf::from),
            failure_stage: stage_str
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|_| bad_column(7))?,
            created_at: timestamp(row.get(8)?, 8)?,
            updated_at: timestamp(row.get(9)?, 9)?,
        })
    }

    fn write_job(conn: &Connection, job: &JobRecord) -> Result<()> {
        let stage = job
            .failure_stage
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            "INSERT OR REPLACE INTO jobs (id, kind, status, progress, message, logs_json, output_file, failure_stage, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                serde_json::to_string(&job.kind)?,
                serde_json::to_string(&job.status)?,
                job.progress,
                job.message,
                serde_json::to_string(&job.logs)?,
                job.output_file.as_ref().map(|p| p.to_string_lossy().to_string()),
                stage,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn select_job(conn: &Connection, id: &str) -> Result<Option<JobRecord>> {
        let job = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }
}

impl JobStore for Database {
    fn create(&self, kind: JobKind) -> Result<JobRecord> {
        let job = JobRecord::new(kind);
        let conn = self.lock()?;
        Self::write_job(&conn, &job)?;
        Ok(job)
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        let conn = self.lock()?;
        Self::select_job(&conn, id)
    }

    fn update(&self, id: &str, change: &mut dyn FnMut(&mut JobRecord)) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let Some(mut job) = Self::select_job(&tx, id)? else {
            return Ok(false);
        };
        change(&mut job);
        job.updated_at = Utc::now();
        Self::write_job(&tx, &job)?;
        tx.commit()?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<JobRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
