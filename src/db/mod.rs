//! Database helpers: migrations, path handling, alias lookup, delivery log.
//!
//! The relational store is shared with the account-service bot that
//! registers users and aliases; this service only reads aliases and
//! appends to `email_logs`.

use crate::models::alias::alias_owner::AliasOwner;
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::Path;

/// Run SQLite migrations to create tables if absent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS users (
            telegram_id INTEGER PRIMARY KEY,
            username TEXT NULL,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NULL,
            credits INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS domains (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            domain_name TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS user_emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(telegram_id),
            email_address TEXT NOT NULL UNIQUE,
            domain_id INTEGER NULL REFERENCES domains(id),
            created_at TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;

  sqlx::query(
    r#"CREATE TABLE IF NOT EXISTS email_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(telegram_id),
            sender TEXT NOT NULL,
            receiver TEXT NOT NULL,
            subject TEXT NULL,
            body TEXT NULL,
            timestamp TEXT NOT NULL
        )"#,
  )
  .execute(pool)
  .await?;
  Ok(())
}

/// Point lookup of a registered alias, joined to its owning identity.
///
/// `address` must already be lowercased and trimmed; aliases are stored
/// in that normal form by the registration flow, so this is an exact
/// match against a strongly consistent store. No retry logic.
pub async fn find_alias(
  pool: &SqlitePool,
  address: &str,
) -> Result<Option<AliasOwner>, sqlx::Error> {
  sqlx::query_as(
    "SELECT e.user_id AS user_id, u.telegram_id AS chat_id \
     FROM user_emails e JOIN users u ON u.telegram_id = e.user_id \
     WHERE e.email_address = ?",
  )
  .bind(address)
  .fetch_optional(pool)
  .await
}

/// Append one delivery record; returns the new row id. Append-only:
/// nothing in this service updates or deletes `email_logs`.
pub async fn append_log(
  pool: &SqlitePool,
  user_id: i64,
  sender: &str,
  receiver: &str,
  subject: &str,
  body: &str,
) -> Result<i64, sqlx::Error> {
  let result = sqlx::query(
    "INSERT INTO email_logs (user_id, sender, receiver, subject, body, timestamp) \
     VALUES (?, ?, ?, ?, ?, ?)",
  )
  .bind(user_id)
  .bind(sender)
  .bind(receiver)
  .bind(subject)
  .bind(body)
  .bind(Utc::now())
  .execute(pool)
  .await?;
  Ok(result.last_insert_rowid())
}

/// Ensure SQLite file and parent folder exist for a given sqlx URL.
pub fn ensure_sqlite_path(db_url: &str) -> String {
  if !db_url.starts_with("sqlite:") {
    return db_url.to_string();
  }
  let path_part = db_url.trim_start_matches("sqlite://");
  if path_part == ":memory:" {
    return db_url.to_string();
  }
  let path_only = path_part
    .split_once('?')
    .map_or(path_part, |(path, _)| path);
  if !path_only.is_empty() {
    let p = Path::new(path_only);
    if let Some(parent) = p.parent() {
      if !parent.as_os_str().is_empty() {
        let _ = std::fs::create_dir_all(parent);
      }
    }
    let _ = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(p);
  }
  db_url.to_string()
}
