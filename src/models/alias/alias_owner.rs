//! Owner of a registered email alias.

use sqlx::FromRow;

/// Result of an alias lookup: the owning identity and where to deliver.
/// In this deployment the owner's Telegram id doubles as the DM chat id,
/// but the two are resolved separately so that stays an implementation
/// detail of the store.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct AliasOwner {
  pub user_id: i64,
  pub chat_id: i64,
}
