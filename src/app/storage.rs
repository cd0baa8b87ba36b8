// Communication with SQLite
// Philosophy of CRUD lives here
// Failures never cross this boundary: they are logged and reported through
// Option/bool/empty-vec return values, so the screens stay usable.
use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result, Row};
use tracing::{error, warn};

use crate::app::models::{Task, TaskView};

// Stored in PRAGMA user_version. Version 1 lacked the created_at column.
const SCHEMA_VERSION: i64 = 2;
const KNOWN_PRIOR_VERSION: i64 = 1;

pub struct Storage {
    pub db_con: Connection,
}

impl Storage {
    // Open (or create) the database file and bring the schema up to date.
    // This is the one place a storage error is allowed to escape: a database
    // that cannot be opened or migrated is fatal at startup.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Storage> {
        let db_con = Connection::open(path)?;
        migrate(&db_con)?;
        Ok(Storage { db_con })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Storage> {
        let db_con = Connection::open_in_memory()?;
        migrate(&db_con)?;
        Ok(Storage { db_con })
    }

    // CREATE
    // Returns the assigned row id, or None when the insert fails.
    // created_at is the caller's value when positive, otherwise now.
    pub fn add_task(&self, task: &Task) -> Option<i64> {
        let created_at = task
            .created_at
            .filter(|&secs| secs > 0)
            .unwrap_or_else(|| Utc::now().timestamp());

        let result = self.db_con.execute(
            "INSERT INTO tasks (title, description, done, created_at) VALUES (?1, ?2, ?3, ?4);",
            (&task.title, &task.description, task.done, created_at),
        );

        match result {
            Ok(_) => Some(self.db_con.last_insert_rowid()),
            Err(err) => {
                error!("add_task failed: {err}");
                None
            }
        }
    }

    // READ
    // All tasks, filtered and ordered per the view state. Search matches a
    // case-insensitive substring of title or description; blank search means
    // no filter. Errors are logged and yield an empty list.
    pub fn get_tasks(&self, view: &TaskView) -> Vec<Task> {
        let order_by = format!(
            "ORDER BY done {}, created_at {}",
            if view.completed_first { "DESC" } else { "ASC" },
            if view.newest_first { "DESC" } else { "ASC" },
        );

        let search = view
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let result = match search {
            Some(text) => {
                let sql = format!(
                    "SELECT id, title, description, done, created_at FROM tasks \
                     WHERE title LIKE ?1 OR description LIKE ?1 {order_by};"
                );
                let pattern = format!("%{text}%");
                self.collect_tasks(&sql, [&pattern])
            }
            None => {
                let sql = format!(
                    "SELECT id, title, description, done, created_at FROM tasks {order_by};"
                );
                self.collect_tasks(&sql, [])
            }
        };

        match result {
            Ok(tasks) => tasks,
            Err(err) => {
                error!("get_tasks failed: {err}");
                Vec::new()
            }
        }
    }

    fn collect_tasks<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Task>> {
        let mut stmt = self.db_con.prepare(sql)?;
        let rows = stmt.query_map(params, task_from_row)?;
        rows.collect()
    }

    // Single task by id; None when it does not exist or the read fails.
    pub fn get_task_by_id(&self, id: i64) -> Option<Task> {
        let result = self
            .db_con
            .query_row(
                "SELECT id, title, description, done, created_at FROM tasks WHERE id = ?1;",
                [id],
                task_from_row,
            )
            .optional();

        match result {
            Ok(task) => task,
            Err(err) => {
                error!("get_task_by_id({id}) failed: {err}");
                None
            }
        }
    }

    // UPDATE
    // Overwrites title, description and done; created_at is never touched
    // here. True iff exactly one row was affected.
    pub fn update_task(&self, task: &Task) -> bool {
        let Some(id) = task.id else {
            warn!("update_task called with an unpersisted task");
            return false;
        };

        let result = self.db_con.execute(
            "UPDATE tasks SET title = ?1, description = ?2, done = ?3 WHERE id = ?4;",
            (&task.title, &task.description, task.done, id),
        );

        match result {
            Ok(rows) => rows == 1,
            Err(err) => {
                error!("update_task({id}) failed: {err}");
                false
            }
        }
    }

    // Narrow update for the frequent done-toggle interaction.
    pub fn update_task_status(&self, id: i64, done: bool) -> bool {
        let result = self.db_con.execute(
            "UPDATE tasks SET done = ?1 WHERE id = ?2;",
            (done, id),
        );

        match result {
            Ok(rows) => rows == 1,
            Err(err) => {
                error!("update_task_status({id}) failed: {err}");
                false
            }
        }
    }

    // DELETE
    pub fn delete_task(&self, id: i64) -> bool {
        let result = self
            .db_con
            .execute("DELETE FROM tasks WHERE id = ?1;", [id]);

        match result {
            Ok(rows) => rows == 1,
            Err(err) => {
                error!("delete_task({id}) failed: {err}");
                false
            }
        }
    }
}

fn task_from_row(row: &Row) -> Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        done: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn create_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            done INTEGER DEFAULT 0,
            created_at INTEGER
        );",
    )
}

// Bring the schema from whatever version is recorded up to SCHEMA_VERSION.
// Version 0 is a fresh database. Version 1 gains the created_at column,
// backfilled with the current time for existing rows. Any other version is
// unrecognized and the table is dropped and recreated empty; this data-loss
// branch is intentional.
pub fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if version == SCHEMA_VERSION {
        return Ok(());
    }

    if version == 0 {
        create_table(conn)?;
    } else if version == KNOWN_PRIOR_VERSION {
        conn.execute_batch(
            "ALTER TABLE tasks ADD COLUMN created_at INTEGER;
             UPDATE tasks SET created_at = strftime('%s','now') WHERE created_at IS NULL;",
        )?;
    } else {
        warn!("unrecognized schema version {version}, recreating the tasks table");
        conn.execute_batch("DROP TABLE IF EXISTS tasks;")?;
        create_table(conn)?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
}
