//! Storage backends for the checkout session.
//!
//! The checkout session is stored as one JSON value. In the running service
//! that value lives in the signed-cookie `tower-sessions` session; tests use
//! [`MemoryPersistence`].

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tower_sessions::Session;

use crate::models::session_keys;

/// Errors reading or writing the stored checkout session.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("Failed to encode checkout session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Where the checkout session blob is kept between requests.
pub trait CheckoutPersistence: Send + Sync {
    /// Read the stored blob, if any.
    fn load(
        &self,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, PersistenceError>> + Send;

    /// Replace the stored blob.
    fn save(
        &self,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Remove the stored blob. Succeeds if there is none.
    fn clear(&self) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Checkout persistence in the request's `tower-sessions` session.
#[derive(Clone)]
pub struct SessionPersistence {
    session: Session,
}

impl SessionPersistence {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CheckoutPersistence for SessionPersistence {
    async fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.session.get(session_keys::CHECKOUT_SESSION).await?)
    }

    async fn save(&self, value: serde_json::Value) -> Result<(), PersistenceError> {
        self.session
            .insert(session_keys::CHECKOUT_SESSION, value)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.session
            .remove::<serde_json::Value>(session_keys::CHECKOUT_SESSION)
            .await?;
        Ok(())
    }
}

/// In-process persistence. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    slot: Arc<Mutex<Option<serde_json::Value>>>,
}

impl MemoryPersistence {
    /// Persistence that starts out holding `value`.
    #[must_use]
    pub fn with_value(value: serde_json::Value) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// The currently stored blob.
    #[must_use]
    pub fn stored(&self) -> Option<serde_json::Value> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CheckoutPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Option<serde_json::Value>, PersistenceError> {
        Ok(self.stored())
    }

    async fn save(&self, value: serde_json::Value) -> Result<(), PersistenceError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_session_persistence_round_trip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let persistence = SessionPersistence::new(session);

        assert_eq!(persistence.load().await.unwrap(), None);

        persistence
            .save(json!({ "currentStep": "payment" }))
            .await
            .unwrap();
        assert_eq!(
            persistence.load().await.unwrap(),
            Some(json!({ "currentStep": "payment" }))
        );

        persistence.clear().await.unwrap();
        assert_eq!(persistence.load().await.unwrap(), None);
        persistence.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_persistence_clones_share_state() {
        let persistence = MemoryPersistence::default();
        let other = persistence.clone();

        persistence.save(json!({ "sessionId": "a" })).await.unwrap();
        assert_eq!(other.stored(), Some(json!({ "sessionId": "a" })));
    }
}
