use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, TaskdeckError};
use crate::model::*;

/// SQLite-backed repository for Taskdeck records.
///
/// Uses a single `Connection` behind `Arc<Mutex<>>` so it can be shared
/// across async tasks. All blocking SQLite calls go through
/// [`with_conn`](Self::with_conn) which runs them on the Tokio blocking
/// thread-pool.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStorage {
    /// Open (or create) a file-backed SQLite database at `path`.
    ///
    /// Sets WAL journal mode and enables foreign keys, then creates all
    /// tables and indexes if they don't already exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .map_err(|e| TaskdeckError::Storage(format!("failed to open SQLite database: {e}")))?;

        Self::configure_and_init(conn, path)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            TaskdeckError::Storage(format!("failed to open in-memory SQLite database: {e}"))
        })?;

        Self::configure_and_init(conn, PathBuf::from(":memory:"))
    }

    /// Return the path this database was opened with (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── helpers ────────────────────────────────────────────────────────

    fn configure_and_init(conn: Connection, path: PathBuf) -> Result<Self> {
        // WAL mode for better concurrent-read performance.
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| TaskdeckError::Storage(format!("failed to set WAL mode: {e}")))?;

        // Enforce foreign-key constraints (needed for chat message cascade).
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| TaskdeckError::Storage(format!("failed to enable foreign keys: {e}")))?;

        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        storage.create_tables()?;
        Ok(storage)
    }

    /// Create all tables and indexes (idempotent).
    fn create_tables(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| TaskdeckError::Storage(format!("failed to acquire database lock: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                owner INTEGER NOT NULL REFERENCES users(id),
                project_id INTEGER REFERENCES projects(id),
                creation_date TEXT NOT NULL,
                due_date TEXT,
                duration_secs INTEGER,
                priority INTEGER NOT NULL DEFAULT 3
            );

            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                message TEXT NOT NULL,
                is_bot INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_chats_created_at ON chats(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_chat_messages_chat ON chat_messages(chat_id);
            ",
        )
        .map_err(|e| TaskdeckError::Storage(format!("failed to create tables: {e}")))?;

        Ok(())
    }

    /// Run a blocking closure against the SQLite connection on the Tokio
    /// blocking thread-pool. This is the primary way the async methods
    /// below interact with the database.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                TaskdeckError::Storage(format!("failed to acquire database lock: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| TaskdeckError::Storage(format!("task join error: {e}")))?
    }

    // ── users ──────────────────────────────────────────────────────────

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, username, email FROM users ORDER BY id")
                .map_err(storage_err)?;
            let users = stmt
                .query_map([], row_to_user)
                .map_err(storage_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(users)
        })
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, username, email FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(storage_err)?
            .ok_or_else(|| TaskdeckError::NotFound(format!("user {id}")))
        })
        .await
    }

    pub async fn create_user(&self, input: &UserInput) -> Result<User> {
        let input = input.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (username, email) VALUES (?1, ?2)",
                params![input.username, input.email],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    TaskdeckError::InvalidInput(format!(
                        "username '{}' is already taken",
                        input.username
                    ))
                }
                other => storage_err(other),
            })?;
            let id = conn.last_insert_rowid();
            Ok(User {
                id,
                username: input.username,
                email: input.email,
            })
        })
        .await
    }

    // ── projects ───────────────────────────────────────────────────────

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, description FROM projects ORDER BY id")
                .map_err(storage_err)?;
            let projects = stmt
                .query_map([], row_to_project)
                .map_err(storage_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(projects)
        })
        .await
    }

    pub async fn get_project(&self, id: i64) -> Result<Project> {
        self.with_conn(move |conn| get_project_row(conn, id)).await
    }

    pub async fn create_project(&self, input: &ProjectInput) -> Result<Project> {
        let input = input.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO projects (name, description) VALUES (?1, ?2)",
                params![input.name, input.description],
            )
            .map_err(storage_err)?;
            let id = conn.last_insert_rowid();
            Ok(Project {
                id,
                name: input.name,
                description: input.description,
            })
        })
        .await
    }

    /// Full replace of a project's fields.
    pub async fn update_project(&self, id: i64, input: &ProjectInput) -> Result<Project> {
        let input = input.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE projects SET name = ?1, description = ?2 WHERE id = ?3",
                    params![input.name, input.description, id],
                )
                .map_err(storage_err)?;
            if changed == 0 {
                return Err(TaskdeckError::NotFound(format!("project {id}")));
            }
            Ok(Project {
                id,
                name: input.name,
                description: input.description,
            })
        })
        .await
    }

    /// Delete a project. Refused with [`TaskdeckError::Conflict`] while
    /// any task still references it; the row is left untouched.
    pub async fn delete_project(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let referencing: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(storage_err)?;
            if referencing > 0 {
                return Err(TaskdeckError::Conflict(format!(
                    "project {id} is referenced by {referencing} task(s)"
                )));
            }
            let changed = conn
                .execute("DELETE FROM projects WHERE id = ?1", params![id])
                .map_err(storage_err)?;
            if changed == 0 {
                return Err(TaskdeckError::NotFound(format!("project {id}")));
            }
            Ok(())
        })
        .await
    }

    // ── tasks ──────────────────────────────────────────────────────────

    pub async fn list_tasks(&self) -> Result<Vec<TaskDetail>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{TASK_DETAIL_SELECT} ORDER BY t.id"))
                .map_err(storage_err)?;
            let tasks = stmt
                .query_map([], row_to_task_detail)
                .map_err(storage_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(tasks)
        })
        .await
    }

    pub async fn get_task(&self, id: i64) -> Result<TaskDetail> {
        self.with_conn(move |conn| get_task_row(conn, id)).await
    }

    /// Insert a new task. The owner (and project, when given) must
    /// already exist; dangling references are rejected before anything
    /// is written.
    pub async fn create_task(&self, input: &TaskInput) -> Result<TaskDetail> {
        let input = input.clone();
        self.with_conn(move |conn| {
            check_task_references(conn, &input)?;
            let now = Utc::now();
            conn.execute(
                "INSERT INTO tasks (title, description, owner, project_id,
                                    creation_date, due_date, duration_secs, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    input.title,
                    input.description,
                    input.owner,
                    input.project_id,
                    now.to_rfc3339(),
                    input.due_date.map(|d| d.to_rfc3339()),
                    input.duration.map(IsoDuration::num_seconds),
                    input.priority.as_i64(),
                ],
            )
            .map_err(storage_err)?;
            let id = conn.last_insert_rowid();
            get_task_row(conn, id)
        })
        .await
    }

    /// Full replace of a task's fields. `creation_date` is preserved.
    pub async fn update_task(&self, id: i64, input: &TaskInput) -> Result<TaskDetail> {
        let input = input.clone();
        self.with_conn(move |conn| {
            // 404 before 400: a replace against a missing row is NotFound
            // regardless of payload problems.
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(storage_err)?;
            if !exists {
                return Err(TaskdeckError::NotFound(format!("task {id}")));
            }

            check_task_references(conn, &input)?;
            conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, owner = ?3,
                                  project_id = ?4, due_date = ?5,
                                  duration_secs = ?6, priority = ?7
                 WHERE id = ?8",
                params![
                    input.title,
                    input.description,
                    input.owner,
                    input.project_id,
                    input.due_date.map(|d| d.to_rfc3339()),
                    input.duration.map(IsoDuration::num_seconds),
                    input.priority.as_i64(),
                    id,
                ],
            )
            .map_err(storage_err)?;
            get_task_row(conn, id)
        })
        .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM tasks WHERE id = ?1", params![id])
                .map_err(storage_err)?;
            if changed == 0 {
                return Err(TaskdeckError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
        .await
    }

    // ── chats ──────────────────────────────────────────────────────────

    /// List chats, newest first.
    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, created_at FROM chats ORDER BY created_at DESC, id DESC")
                .map_err(storage_err)?;
            let chats = stmt
                .query_map([], row_to_chat)
                .map_err(storage_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err)?;
            Ok(chats)
        })
        .await
    }

    pub async fn create_chat(&self, input: &ChatInput) -> Result<Chat> {
        let input = input.clone();
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO chats (title, created_at) VALUES (?1, ?2)",
                params![input.title, now.to_rfc3339()],
            )
            .map_err(storage_err)?;
            Ok(Chat {
                id: conn.last_insert_rowid(),
                title: input.title,
                created_at: now,
            })
        })
        .await
    }

    /// A chat with its messages in creation order.
    pub async fn get_chat(&self, id: i64) -> Result<ChatDetail> {
        self.with_conn(move |conn| {
            let chat = conn
                .query_row(
                    "SELECT id, title, created_at FROM chats WHERE id = ?1",
                    params![id],
                    row_to_chat,
                )
                .optional()
                .map_err(storage_err)?
                .ok_or_else(|| TaskdeckError::NotFound(format!("chat {id}")))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, chat_id, message, is_bot, created_at
                     FROM chat_messages WHERE chat_id = ?1 ORDER BY id",
                )
                .map_err(storage_err)?;
            let messages = stmt
                .query_map(params![id], row_to_message)
                .map_err(storage_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_err)?;

            Ok(ChatDetail { chat, messages })
        })
        .await
    }

    /// Delete a chat; its messages go with it (FK cascade).
    pub async fn delete_chat(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM chats WHERE id = ?1", params![id])
                .map_err(storage_err)?;
            if changed == 0 {
                return Err(TaskdeckError::NotFound(format!("chat {id}")));
            }
            Ok(())
        })
        .await
    }

    /// Append a message to an existing chat.
    pub async fn append_message(&self, chat_id: i64, text: &str, is_bot: bool) -> Result<ChatMessage> {
        let text = text.to_string();
        self.with_conn(move |conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?1)",
                    params![chat_id],
                    |row| row.get(0),
                )
                .map_err(storage_err)?;
            if !exists {
                return Err(TaskdeckError::NotFound(format!("chat {chat_id}")));
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO chat_messages (chat_id, message, is_bot, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chat_id, text, is_bot, now.to_rfc3339()],
            )
            .map_err(storage_err)?;
            Ok(ChatMessage {
                id: conn.last_insert_rowid(),
                chat_id,
                message: text,
                is_bot,
                created_at: now,
            })
        })
        .await
    }
}

// ── row mapping ────────────────────────────────────────────────────────

const TASK_DETAIL_SELECT: &str = "
    SELECT t.id, t.title, t.description, t.owner, t.project_id,
           t.creation_date, t.due_date, t.duration_secs, t.priority,
           u.username, u.email,
           p.name, p.description
    FROM tasks t
    JOIN users u ON u.id = t.owner
    LEFT JOIN projects p ON p.id = t.project_id";

fn storage_err(e: rusqlite::Error) -> TaskdeckError {
    TaskdeckError::Storage(e.to_string())
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<Chat> {
    let created_at: String = row.get(2)?;
    Ok(Chat {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: parse_ts(&created_at)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let created_at: String = row.get(4)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        message: row.get(2)?,
        is_bot: row.get(3)?,
        created_at: parse_ts(&created_at)?,
    })
}

fn row_to_task_detail(row: &Row<'_>) -> rusqlite::Result<TaskDetail> {
    let creation_date: String = row.get(5)?;
    let due_date: Option<String> = row.get(6)?;
    let duration_secs: Option<i64> = row.get(7)?;
    let priority: i64 = row.get(8)?;
    let project_id: Option<i64> = row.get(4)?;
    let project_name: Option<String> = row.get(11)?;

    let task = Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        project_id,
        creation_date: parse_ts(&creation_date)?,
        due_date: match due_date {
            Some(ref s) => Some(parse_ts(s)?),
            None => None,
        },
        duration: duration_secs.map(IsoDuration::from_seconds),
        priority: Priority::try_from(priority).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Integer,
                e.into(),
            )
        })?,
    };
    let owner_detail = User {
        id: task.owner,
        username: row.get(9)?,
        email: row.get(10)?,
    };
    let project = match (project_id, project_name) {
        (Some(id), Some(name)) => Some(Project {
            id,
            name,
            description: row.get(12)?,
        }),
        _ => None,
    };

    Ok(TaskDetail {
        task,
        owner_detail,
        project,
    })
}

fn get_task_row(conn: &Connection, id: i64) -> Result<TaskDetail> {
    let mut stmt = conn
        .prepare(&format!("{TASK_DETAIL_SELECT} WHERE t.id = ?1"))
        .map_err(storage_err)?;
    stmt.query_row(params![id], row_to_task_detail)
        .optional()
        .map_err(storage_err)?
        .ok_or_else(|| TaskdeckError::NotFound(format!("task {id}")))
}

fn get_project_row(conn: &Connection, id: i64) -> Result<Project> {
    conn.query_row(
        "SELECT id, name, description FROM projects WHERE id = ?1",
        params![id],
        row_to_project,
    )
    .optional()
    .map_err(storage_err)?
    .ok_or_else(|| TaskdeckError::NotFound(format!("project {id}")))
}

fn check_task_references(conn: &Connection, input: &TaskInput) -> Result<()> {
    let owner_exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![input.owner],
            |row| row.get(0),
        )
        .map_err(storage_err)?;
    if !owner_exists {
        return Err(TaskdeckError::InvalidInput(format!(
            "owner {} does not reference an existing user",
            input.owner
        )));
    }
    if let Some(project_id) = input.project_id {
        let project_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
                params![project_id],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        if !project_exists {
            return Err(TaskdeckError::InvalidInput(format!(
                "project_id {project_id} does not reference an existing project"
            )));
        }
    }
    Ok(())
}
