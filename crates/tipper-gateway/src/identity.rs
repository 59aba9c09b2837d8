use std::sync::{PoisonError, RwLock};

use tracing::info;

/// The bot's own platform identity.
///
/// Unset at startup, set on every `Connected`, cleared on `Disconnected`.
/// While unset, no message is considered addressed to the bot.
#[derive(Default)]
pub struct SelfIdentity {
    inner: RwLock<Option<String>>,
}

impl SelfIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, identity: String) {
        info!("Connected as {}", identity);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
