//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::checkout::SESSION_TTL_MINUTES;
use crate::config::StorefrontConfig;
use crate::shipping::{HttpRateQuoter, QuoteError, ShippingMethodLoader};
use crate::translations::{CatalogError, MessageCatalog};

/// The loader type used by the running service.
pub type SessionLoader = ShippingMethodLoader<HttpRateQuoter, MessageCatalog>;

/// Upper bound on checkout sessions with a live loader.
const MAX_LIVE_LOADERS: u64 = 10_000;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("rate service client: {0}")]
    RateClient(#[from] QuoteError),
    #[error("message catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and shipping loaders.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    quoter: Arc<HttpRateQuoter>,
    catalog: Arc<MessageCatalog>,
    /// Shipping loaders keyed by checkout session id. Idle entries expire
    /// with the checkout session.
    loaders: Cache<String, Arc<SessionLoader>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the rate service client cannot be built or the
    /// configured message catalog cannot be read.
    pub fn new(config: &StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let quoter = Arc::new(HttpRateQuoter::new(&config.shipping_rates)?);
        let catalog = match &config.messages_path {
            Some(path) => MessageCatalog::from_path(path)?,
            None => MessageCatalog::empty(),
        };
        tracing::info!(messages = catalog.len(), "Message catalog loaded");

        let loaders = Cache::builder()
            .max_capacity(MAX_LIVE_LOADERS)
            .time_to_idle(Duration::from_secs(SESSION_TTL_MINUTES.unsigned_abs() * 60))
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pool,
                quoter,
                catalog: Arc::new(catalog),
                loaders,
            }),
        })
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The shipping loader for a checkout session, created on first use.
    pub async fn loader_for(&self, session_id: &str) -> Arc<SessionLoader> {
        self.inner
            .loaders
            .get_with(session_id.to_string(), async {
                Arc::new(ShippingMethodLoader::new(
                    Arc::clone(&self.inner.quoter),
                    Arc::clone(&self.inner.catalog),
                ))
            })
            .await
    }

    /// Drop the loader of a checkout session that was reset.
    pub async fn forget_loader(&self, session_id: &str) {
        self.inner.loaders.invalidate(session_id).await;
    }
}
