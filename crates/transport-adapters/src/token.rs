//! In-process implementation of [`TokenStore`]. The bearer token lives
//! behind the port so transports never reach into globals or ambient
//! storage.

use std::sync::RwLock;

use secrecy::SecretString;

use domains::TokenStore;

#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: SecretString) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<SecretString> {
        self.token.read().expect("token lock poisoned").clone()
    }

    fn set(&self, token: SecretString) {
        *self.token.write().expect("token lock poisoned") = Some(token);
    }

    fn clear(&self) {
        *self.token.write().expect("token lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn set_get_clear_round_trip() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        store.set(SecretString::from("tok-123"));
        assert_eq!(store.get().unwrap().expose_secret(), "tok-123");

        store.clear();
        assert!(store.get().is_none());
    }
}
