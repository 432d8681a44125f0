//! Per-session shipping method loader.
//!
//! [`ShippingMethodLoader`] resolves the shipping methods for the address a
//! customer is typing, and keeps the result observable through
//! [`ShippingMethodLoader::snapshot`]:
//!
//! - incomplete addresses are ignored without touching the cache;
//! - results are cached per [`QuoteFingerprint`] for the loader's lifetime;
//! - concurrent loads of the same fingerprint share one fetch;
//! - a failed fetch records its message and offers the fallback method.
//!
//! A result is only shown if its fingerprint is still the latest one
//! requested. Slower answers for an address the customer has since changed
//! are cached and otherwise ignored. A method can only be selected for the
//! fingerprint whose quote is currently shown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;
use vinoteca_core::{Address, ShippingMethod, is_address_complete_for_quoting};

use super::cache::{CachedQuote, QuoteFingerprint};
use super::client::{QuoteError, QuoteRequest, RateQuoter};
use crate::translations::{Translate, localize_method};

/// Distinct fingerprints remembered per loader.
const QUOTE_CACHE_CAPACITY: u64 = 256;

/// Observable loader state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderSnapshot {
    pub available_methods: Vec<ShippingMethod>,
    pub selected_method: Option<ShippingMethod>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct LoaderState {
    available_methods: Vec<ShippingMethod>,
    selected_method: Option<ShippingMethod>,
    error: Option<String>,
    /// Loads currently waiting on a fetch.
    pending: usize,
    /// Bumped by `reset` so loads started before it stop counting.
    generation: u64,
    latest: Option<QuoteFingerprint>,
    /// Fingerprint of the quote in `available_methods`.
    shown: Option<QuoteFingerprint>,
    last_request: Option<(Address, Option<Decimal>)>,
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps `loading` true while alive, including when the awaiting load is
/// dropped part way through.
struct PendingGuard<'a> {
    state: &'a Mutex<LoaderState>,
    generation: u64,
}

impl<'a> PendingGuard<'a> {
    fn enter(state: &'a Mutex<LoaderState>) -> Self {
        let mut guard = lock(state);
        guard.pending += 1;
        Self {
            state,
            generation: guard.generation,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if state.generation == self.generation {
            state.pending = state.pending.saturating_sub(1);
        }
    }
}

/// Shipping method resolution for one checkout session.
pub struct ShippingMethodLoader<Q, T> {
    quoter: Arc<Q>,
    translator: Arc<T>,
    cache: Cache<QuoteFingerprint, CachedQuote>,
    state: Mutex<LoaderState>,
}

impl<Q: RateQuoter, T: Translate> ShippingMethodLoader<Q, T> {
    #[must_use]
    pub fn new(quoter: Arc<Q>, translator: Arc<T>) -> Self {
        Self {
            quoter,
            translator,
            cache: Cache::builder().max_capacity(QUOTE_CACHE_CAPACITY).build(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Load the shipping methods for `address`.
    ///
    /// Never fails: a rate service failure is recorded in the snapshot's
    /// `error` and the fallback method is offered instead.
    #[instrument(
        skip(self, address),
        fields(country = %address.country, postal_code = %address.postal_code)
    )]
    pub async fn load(&self, address: &Address, order_total: Option<Decimal>) {
        if !is_address_complete_for_quoting(address) {
            tracing::debug!("Address incomplete, skipping quote");
            return;
        }

        let fingerprint = QuoteFingerprint::new(address, order_total);
        {
            let mut state = lock(&self.state);
            state.latest = Some(fingerprint.clone());
            state.last_request = Some((address.clone(), order_total));
        }

        if let Some(quote) = self.cache.get(&fingerprint).await {
            tracing::debug!("Cache hit for shipping quote");
            self.apply(&fingerprint, quote);
            return;
        }

        let _pending = PendingGuard::enter(&self.state);
        let init = fetch_quote(
            Arc::clone(&self.quoter),
            Arc::clone(&self.translator),
            QuoteRequest::from(&fingerprint),
        );
        // Driven by its own task so the fetch still completes for the other
        // waiters and the cache when this load is dropped.
        let cache = self.cache.clone();
        let key = fingerprint.clone();
        let shared = tokio::spawn(async move { cache.get_with(key, init).await });
        let quote = shared.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Shared shipping quote task failed");
            failed_quote(self.translator.as_ref(), &QuoteError::Unspecified)
        });
        self.apply(&fingerprint, quote);
    }

    /// Fetch the last requested address again, bypassing the cache.
    ///
    /// Does nothing if no complete address was ever loaded.
    pub async fn retry(&self) {
        let last_request = lock(&self.state).last_request.clone();
        let Some((address, order_total)) = last_request else {
            return;
        };

        self.cache
            .invalidate(&QuoteFingerprint::new(&address, order_total))
            .await;
        self.load(&address, order_total).await;
    }

    /// Forget all methods, errors and cached quotes.
    pub async fn reset(&self) {
        {
            let mut state = lock(&self.state);
            let generation = state.generation.wrapping_add(1);
            *state = LoaderState {
                generation,
                ..LoaderState::default()
            };
        }
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Choose one of the methods quoted for `fingerprint`.
    ///
    /// Returns `None` if the shown quote is for another fingerprint or does
    /// not offer `method_id`.
    pub fn select(
        &self,
        fingerprint: &QuoteFingerprint,
        method_id: &str,
    ) -> Option<ShippingMethod> {
        let mut state = lock(&self.state);
        if state.shown.as_ref() != Some(fingerprint) {
            tracing::debug!(method_id, "Selection refused, address was not quoted");
            return None;
        }
        let method = state
            .available_methods
            .iter()
            .find(|method| method.id == method_id)
            .cloned()?;
        state.selected_method = Some(method.clone());
        Some(method)
    }

    #[must_use]
    pub fn snapshot(&self) -> LoaderSnapshot {
        let state = lock(&self.state);
        LoaderSnapshot {
            available_methods: state.available_methods.clone(),
            selected_method: state.selected_method.clone(),
            loading: state.pending > 0,
            error: state.error.clone(),
        }
    }

    fn apply(&self, fingerprint: &QuoteFingerprint, quote: CachedQuote) {
        let mut state = lock(&self.state);
        if state.latest.as_ref() != Some(fingerprint) {
            tracing::debug!("Discarding quote for a superseded address");
            return;
        }

        // Keep the selection only if the new quote still offers it
        state.selected_method = state.selected_method.take().and_then(|selected| {
            quote
                .methods
                .iter()
                .find(|method| method.id == selected.id)
                .cloned()
        });
        state.available_methods = quote.methods;
        state.error = quote.error;
        state.shown = Some(fingerprint.clone());
    }
}

/// Call the rate service and turn the outcome into a cacheable quote.
///
/// The call runs on its own task so a panicking quoter is recorded as a
/// failed fetch.
async fn fetch_quote<Q: RateQuoter, T: Translate>(
    quoter: Arc<Q>,
    translator: Arc<T>,
    request: QuoteRequest,
) -> CachedQuote {
    let task = tokio::spawn(async move { quoter.fetch_shipping_methods(&request).await });
    let outcome = task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Shipping quote task failed");
        Err(QuoteError::Unspecified)
    });

    match outcome {
        Ok(methods) => CachedQuote {
            methods: methods
                .into_iter()
                .map(|method| localize_method(translator.as_ref(), method))
                .collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch shipping methods, offering fallback");
            failed_quote(translator.as_ref(), &e)
        }
    }
}

fn failed_quote<T: Translate>(translator: &T, error: &QuoteError) -> CachedQuote {
    CachedQuote {
        methods: vec![localize_method(translator, ShippingMethod::fallback())],
        error: Some(error.to_string()),
    }
}
