//! Settings database operations
//!
//! Key/value accessors over the `settings` table. Values are stored as text
//! and parsed on read.

use horus_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Generic setting getter
///
/// **Returns:** Some(value) if the key exists, None otherwise
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (insert or replace)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Read a setting, writing `default` back when the key is missing
pub async fn get_or_init_setting<T>(db: &Pool<Sqlite>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match get_setting::<T>(db, key).await? {
        Some(value) => Ok(value),
        None => {
            set_setting(db, key, &default).await?;
            tracing::debug!(key, value = %default, "Initialized missing setting with default");
            Ok(default)
        }
    }
}
