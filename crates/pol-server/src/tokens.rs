//! TTL-backed key-value store for session tokens and password-reset codes.
//!
//! The store is owned by the binary and handed to the auth layer through
//! [`crate::AppState`], so a deployment can swap in an external cache service
//! without touching auth logic. Entries expire passively: whichever access
//! observes an expired entry drops it.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

#[derive(Debug)]
struct Entry {
  value:      String,
  expires_at: Instant,
}

/// A process-local TTL key-value map. Cloning is cheap; clones share the
/// underlying map.
#[derive(Clone, Default)]
pub struct TokenStore {
  entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl TokenStore {
  pub fn new() -> Self { Self::default() }

  /// Insert `value` under `key` with a lifetime of `ttl`, replacing any
  /// previous entry.
  pub fn put(
    &self,
    key: impl Into<String>,
    value: impl Into<String>,
    ttl: Duration,
  ) {
    let entry = Entry {
      value:      value.into(),
      expires_at: Instant::now() + ttl,
    };
    self
      .entries
      .lock()
      .expect("token store lock poisoned")
      .insert(key.into(), entry);
  }

  /// Look up a live entry. An expired entry is removed and reported absent.
  pub fn get(&self, key: &str) -> Option<String> {
    let mut entries =
      self.entries.lock().expect("token store lock poisoned");
    match entries.get(key) {
      Some(entry) if entry.expires_at > Instant::now() => {
        Some(entry.value.clone())
      }
      Some(_) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  /// Remove an entry, returning its value if it was still live.
  pub fn take(&self, key: &str) -> Option<String> {
    let entry = self
      .entries
      .lock()
      .expect("token store lock poisoned")
      .remove(key)?;
    (entry.expires_at > Instant::now()).then_some(entry.value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINUTE: Duration = Duration::from_secs(60);

  #[test]
  fn put_then_get_returns_value() {
    let store = TokenStore::new();
    store.put("session:abc", "clerk", MINUTE);
    assert_eq!(store.get("session:abc").as_deref(), Some("clerk"));
  }

  #[test]
  fn expired_entry_is_absent_and_dropped() {
    let store = TokenStore::new();
    store.put("otp:clerk", "123456", Duration::ZERO);
    assert_eq!(store.get("otp:clerk"), None);
    // The expired entry was removed by the failed lookup.
    assert!(store.entries.lock().unwrap().is_empty());
  }

  #[test]
  fn take_consumes_the_entry() {
    let store = TokenStore::new();
    store.put("otp:clerk", "123456", MINUTE);
    assert_eq!(store.take("otp:clerk").as_deref(), Some("123456"));
    assert_eq!(store.get("otp:clerk"), None);
    assert_eq!(store.take("otp:clerk"), None);
  }

  #[test]
  fn take_of_expired_entry_returns_none() {
    let store = TokenStore::new();
    store.put("otp:clerk", "123456", Duration::ZERO);
    assert_eq!(store.take("otp:clerk"), None);
  }

  #[test]
  fn put_replaces_previous_value() {
    let store = TokenStore::new();
    store.put("otp:clerk", "111111", MINUTE);
    store.put("otp:clerk", "222222", MINUTE);
    assert_eq!(store.get("otp:clerk").as_deref(), Some("222222"));
  }
}
