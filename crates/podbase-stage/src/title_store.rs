//! SQLite-backed episode title table.

use anyhow::{anyhow, Context};
use podbase_core::traits::TitleStore;
use podbase_core::types::EpisodeTitleRow;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS episode_titles (
    podcast_id    INTEGER NOT NULL,
    episode_id    INTEGER NOT NULL,
    episode_title TEXT NOT NULL,
    PRIMARY KEY (podcast_id, episode_id)
);
"#;

/// Relational representation of episode titles, one row per
/// (podcast_id, episode_id). The connection sits behind a mutex so the
/// store can be shared across the pipeline's seams.
pub struct SqliteTitleStore {
    conn: Mutex<Connection>,
}

impl SqliteTitleStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open title db {}", path.display()))?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to initialize episode_titles schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory db")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to initialize episode_titles schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("title store lock poisoned"))
    }
}

impl TitleStore for SqliteTitleStore {
    fn upsert_episode(&self, podcast_id: i64, episode_id: i64, title: &str) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO episode_titles (podcast_id, episode_id, episode_title)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(podcast_id, episode_id)
             DO UPDATE SET episode_title = excluded.episode_title",
            params![podcast_id, episode_id, title],
        )
        .context("failed to upsert episode title")?;
        Ok(())
    }

    fn list_episodes(&self) -> anyhow::Result<Vec<EpisodeTitleRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT podcast_id, episode_id, episode_title
             FROM episode_titles
             ORDER BY podcast_id, episode_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EpisodeTitleRow {
                podcast_id: row.get(0)?,
                episode_id: row.get(1)?,
                episode_title: row.get(2)?,
            })
        })?;
        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(row.context("failed to read episode_titles row")?);
        }
        Ok(episodes)
    }

    fn update_title(&self, podcast_id: i64, episode_id: i64, title: &str) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE episode_titles
             SET episode_title = ?3
             WHERE podcast_id = ?1 AND episode_id = ?2",
            params![podcast_id, episode_id, title],
        )
        .context("failed to update episode title")?;
        Ok(())
    }
}
