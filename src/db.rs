use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS used_identities (
    identity   TEXT PRIMARY KEY NOT NULL,
    used_at    TEXT NOT NULL,
    user_agent TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pick_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    identity    TEXT NOT NULL,
    participant TEXT NOT NULL,
    picked_at   TEXT NOT NULL,
    user_agent  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rooms (
    id           TEXT PRIMARY KEY NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    participants TEXT NOT NULL,
    status       TEXT NOT NULL,
    winner       TEXT,
    picked_at    TEXT,
    created_at   TEXT NOT NULL
);
"#;

/// Opens the pool and makes sure the tables exist.
///
/// An in-memory database lives and dies with its connection, so those get a
/// single connection that is never recycled. File databases share up to 16
/// connections; writers queue on the busy timeout.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?
    };

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory() -> SqlitePool {
    connect("sqlite::memory:").await.unwrap()
}

/// A fresh database file under the temp dir, behind the full multi-connection pool.
#[cfg(test)]
pub(crate) async fn temp_file() -> (SqlitePool, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("onepick-{}.db", uuid::Uuid::now_v7()));
    let pool = connect(&format!("sqlite://{}", path.display())).await.unwrap();
    (pool, path)
}

#[cfg(test)]
pub(crate) async fn remove_temp_file(pool: SqlitePool, path: std::path::PathBuf) {
    pool.close().await;
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = memory().await;
        init_schema(&pool).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' \
             AND name IN ('used_identities','pick_records','rooms')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn file_database_gets_a_shared_pool() {
        let (pool, path) = temp_file().await;
        assert!(path.exists());

        let conns: Vec<_> = futures_util::future::join_all((0..4).map(|_| pool.acquire()))
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(conns.len(), 4);
        drop(conns);

        remove_temp_file(pool, path).await;
    }
}
