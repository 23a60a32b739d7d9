//! Browser persistence for the session slots.
use crate::session::SessionStore;
use tracing::warn;

/// `SessionStore` over `window.localStorage`. A missing or blocked storage
/// behaves as an empty store.
#[derive(Clone, Debug, Default)]
pub struct BrowserStore;

impl BrowserStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }
}

impl SessionStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) {
        match Self::storage() {
            Some(s) => {
                if s.set_item(key, value).is_err() {
                    warn!(key, "localStorage write rejected");
                }
            }
            None => warn!(key, "localStorage unavailable"),
        }
    }

    fn remove(&self, key: &str) -> Result<(), &'static str> {
        let s = Self::storage().ok_or("localStorage unavailable")?;
        s.remove_item(key).map_err(|_| "localStorage remove rejected")
    }
}
