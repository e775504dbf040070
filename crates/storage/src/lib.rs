use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// A durable store of named text slots.
///
/// Writes replace the whole value; there is no merging.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn read_slot(&self, name: &str) -> Result<Option<String>>;
    async fn write_slot(&self, name: &str, value: &str) -> Result<()>;
    /// Returns whether a slot was removed.
    async fn clear_slot(&self, name: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to `sqlite::memory:` opens a separate database.
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_slots(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM slots ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get::<String, _>(0)).collect())
    }
}

#[async_trait]
impl SlotStore for Storage {
    async fn read_slot(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM slots WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read slot '{name}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn write_slot(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO slots (name, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write slot '{name}'"))?;
        debug!(slot = name, bytes = value.len(), "slot written");
        Ok(())
    }

    async fn clear_slot(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM slots WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to clear slot '{name}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
