pub mod migrations;
pub mod queries;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the registry store from a connection string.
    ///
    /// Accepts `sqlite::memory:`, `sqlite://<path>` or a bare file path.
    pub fn connect(url: &str) -> Result<Self> {
        match url.trim() {
            "sqlite::memory:" | ":memory:" => Self::open_in_memory(),
            other => {
                let path = other.strip_prefix("sqlite://").unwrap_or(other);
                if path.is_empty() {
                    anyhow::bail!("Empty database path in connection string");
                }
                Self::open(Path::new(path))
            }
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the connection. Writes for the same
    /// identity serialize here.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}
