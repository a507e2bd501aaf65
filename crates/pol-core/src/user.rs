//! POL auth-realm users.
//!
//! This realm is independent of any other login surface: plain usernames,
//! argon2 password hashes, and an email address used only as the destination
//! for password-reset codes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A persisted POL user. The password hash is an argon2 PHC string; plaintext
/// passwords never reach the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolUser {
  pub user_id:       Uuid,
  pub username:      String,
  pub email:         String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::PolStore::create_user`].
/// `user_id` and `created_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewPolUser {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
}
