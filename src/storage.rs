use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, Connection, Row};

use crate::error::StorageError;
use crate::legacy::{format_tasks, parse_tasks};
use crate::model::{BacklogItem, Priority, Sprint, TaskStatus};

pub type StorageResult<T> = Result<T, StorageError>;

pub const BACKLOG_TABLE: &str = "Backlog";
pub const SPRINTS_TABLE: &str = "Sprints";

/// Columns of the Backlog sheet, in order.
pub const BACKLOG_COLUMNS: [&str; 5] = ["Task", "Priority", "Story Points", "Assigned To", "Status"];

/// Columns of the Sprints sheet, in order.
pub const SPRINT_COLUMNS: [&str; 5] = [
    "Sprint Name",
    "Start Date",
    "End Date",
    "Tasks",
    "Actual Close Date",
];

/// The durable copy of the backlog and the sprints.
///
/// There is no update-by-key: a field-level change is persisted by
/// rewriting the whole table.
pub trait StorageClient {
    /// Fail with `SchemaMismatch` if a table lacks an expected column.
    fn verify_schema(&self) -> StorageResult<()>;
    fn load_backlog(&self) -> StorageResult<Vec<BacklogItem>>;
    fn load_sprints(&self) -> StorageResult<Vec<Sprint>>;
    fn append_backlog_row(&mut self, item: &BacklogItem) -> StorageResult<()>;
    fn append_sprint_row(&mut self, sprint: &Sprint) -> StorageResult<()>;
    fn rewrite_backlog(&mut self, items: &[BacklogItem]) -> StorageResult<()>;
    fn rewrite_sprints(&mut self, sprints: &[Sprint]) -> StorageResult<()>;
}

/// A sheet kept in a SQLite file, one table per worksheet. Row order is
/// insertion order.
pub struct SheetStore {
    db: Connection,
}

impl SheetStore {
    /// Open the sheet at `path`, creating the file if needed. Tables are
    /// not created; call `init` for that.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = Connection::open(path.as_ref())?;
        Ok(SheetStore { db })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Connection::open_in_memory()?;
        Ok(SheetStore { db })
    }

    /// Create both worksheets if they do not exist yet.
    pub fn init(&self) -> StorageResult<()> {
        self.db.execute(
            "CREATE TABLE if not exists \"Backlog\" (
                  \"Task\"          TEXT NOT NULL,
                  \"Priority\"      TEXT NOT NULL,
                  \"Story Points\"  INTEGER NOT NULL,
                  \"Assigned To\"   TEXT NOT NULL DEFAULT '',
                  \"Status\"        TEXT NOT NULL
                  )",
            [],
        )?;

        self.db.execute(
            "CREATE TABLE if not exists \"Sprints\" (
                  \"Sprint Name\"        TEXT NOT NULL,
                  \"Start Date\"         TEXT NOT NULL,
                  \"End Date\"           TEXT NOT NULL,
                  \"Tasks\"              TEXT NOT NULL DEFAULT '',
                  \"Actual Close Date\"  TEXT
                  )",
            [],
        )?;
        Ok(())
    }

    fn table_columns(&self, table: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .db
            .prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;

        let mut columns = Vec::new();
        for name in names {
            columns.push(name?);
        }
        Ok(columns)
    }

    fn check_columns(&self, table: &str, expected: &[&str]) -> StorageResult<()> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            return Err(StorageError::SchemaMismatch {
                table: table.to_string(),
                detail: "table does not exist".to_string(),
            });
        }
        for column in expected {
            if !columns.iter().any(|c| c == column) {
                return Err(StorageError::SchemaMismatch {
                    table: table.to_string(),
                    detail: format!("missing column '{}'", column),
                });
            }
        }
        Ok(())
    }

    fn insert_backlog(db: &Connection, item: &BacklogItem) -> StorageResult<()> {
        db.execute(
            "INSERT INTO \"Backlog\" (\"Task\", \"Priority\", \"Story Points\", \"Assigned To\", \"Status\") VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                item.task_name,
                item.priority.as_str(),
                item.story_points,
                item.assigned_to,
                item.status.as_str()
            ],
        )?;
        Ok(())
    }

    fn insert_sprint(db: &Connection, sprint: &Sprint) -> StorageResult<()> {
        db.execute(
            "INSERT INTO \"Sprints\" (\"Sprint Name\", \"Start Date\", \"End Date\", \"Tasks\", \"Actual Close Date\") VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                sprint.sprint_name,
                sprint.start_date,
                sprint.end_date,
                format_tasks(&sprint.assigned_tasks),
                sprint.actual_close_date
            ],
        )?;
        Ok(())
    }
}

/// Map a rusqlite read failure. Bad cell types are a schema problem, the
/// rest means the database itself failed.
fn read_error(table: &str, err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => {
            StorageError::SchemaMismatch {
                table: table.to_string(),
                detail: err.to_string(),
            }
        }
        other => StorageError::Unavailable(other.to_string()),
    }
}

/// Return a raw backlog row and its row number from a row in this order:
/// [Task, Priority, Story Points, Assigned To, Status, rowid]
fn backlog_row_from_row(row: &Row) -> rusqlite::Result<(BacklogRow, usize)> {
    let raw = BacklogRow {
        task_name: row.get(0)?,
        priority: row.get(1)?,
        story_points: row.get(2)?,
        assigned_to: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        status: row.get(4)?,
    };
    Ok((raw, row.get::<_, i64>(5)? as usize))
}

/// A backlog row before its text cells are checked.
struct BacklogRow {
    task_name: String,
    priority: String,
    story_points: u32,
    assigned_to: String,
    status: String,
}

impl BacklogRow {
    fn into_item(self, row_number: usize) -> StorageResult<BacklogItem> {
        let mismatch = |detail: String| StorageError::SchemaMismatch {
            table: BACKLOG_TABLE.to_string(),
            detail: format!("row {}: {}", row_number, detail),
        };
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|_| mismatch(format!("unknown priority '{}'", self.priority)))?;
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| mismatch(format!("unknown status '{}'", self.status)))?;
        Ok(BacklogItem {
            task_name: self.task_name,
            priority,
            story_points: self.story_points,
            assigned_to: self.assigned_to,
            status,
        })
    }
}

/// Return a sprint from a row in this order: [Sprint Name, Start Date,
/// End Date, Tasks, Actual Close Date]
fn sprint_from_row(row: &Row) -> rusqlite::Result<Sprint> {
    let tasks = row.get::<_, Option<String>>(3)?.unwrap_or_default();
    let close_date = match row.get::<_, Option<String>>(4)? {
        Some(text) if !text.trim().is_empty() => Some(row.get::<_, NaiveDate>(4)?),
        _ => None,
    };
    Ok(Sprint {
        sprint_name: row.get(0)?,
        start_date: row.get(1)?,
        end_date: row.get(2)?,
        assigned_tasks: parse_tasks(&tasks),
        actual_close_date: close_date,
    })
}

impl StorageClient for SheetStore {
    fn verify_schema(&self) -> StorageResult<()> {
        self.check_columns(BACKLOG_TABLE, &BACKLOG_COLUMNS)?;
        self.check_columns(SPRINTS_TABLE, &SPRINT_COLUMNS)
    }

    fn load_backlog(&self) -> StorageResult<Vec<BacklogItem>> {
        let mut stmt = self.db.prepare(
            "SELECT \"Task\", \"Priority\", \"Story Points\", \"Assigned To\", \"Status\", rowid FROM \"Backlog\" ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| backlog_row_from_row(row))
            .map_err(|e| read_error(BACKLOG_TABLE, e))?;

        let mut items = Vec::new();
        for row in rows {
            let (raw, row_number) = row.map_err(|e| read_error(BACKLOG_TABLE, e))?;
            items.push(raw.into_item(row_number)?);
        }
        debug!("loaded {} backlog rows", items.len());
        Ok(items)
    }

    fn load_sprints(&self) -> StorageResult<Vec<Sprint>> {
        let mut stmt = self.db.prepare(
            "SELECT \"Sprint Name\", \"Start Date\", \"End Date\", \"Tasks\", \"Actual Close Date\" FROM \"Sprints\" ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| sprint_from_row(row))
            .map_err(|e| read_error(SPRINTS_TABLE, e))?;

        let mut sprints = Vec::new();
        for sprint in rows {
            sprints.push(sprint.map_err(|e| read_error(SPRINTS_TABLE, e))?);
        }
        debug!("loaded {} sprint rows", sprints.len());
        Ok(sprints)
    }

    fn append_backlog_row(&mut self, item: &BacklogItem) -> StorageResult<()> {
        debug!("appending backlog row '{}'", item.task_name);
        SheetStore::insert_backlog(&self.db, item)
    }

    fn append_sprint_row(&mut self, sprint: &Sprint) -> StorageResult<()> {
        debug!("appending sprint row '{}'", sprint.sprint_name);
        SheetStore::insert_sprint(&self.db, sprint)
    }

    fn rewrite_backlog(&mut self, items: &[BacklogItem]) -> StorageResult<()> {
        debug!("rewriting backlog with {} rows", items.len());
        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM \"Backlog\"", [])?;
        for item in items {
            SheetStore::insert_backlog(&tx, item)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn rewrite_sprints(&mut self, sprints: &[Sprint]) -> StorageResult<()> {
        debug!("rewriting sprints with {} rows", sprints.len());
        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM \"Sprints\"", [])?;
        for sprint in sprints {
            SheetStore::insert_sprint(&tx, sprint)?;
        }
        tx.commit()?;
        Ok(())
    }
}
