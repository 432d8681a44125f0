//! Checkout step store.
//!
//! [`CheckoutStore`] holds one customer's [`CheckoutSession`] for the
//! duration of a request. It is restored from persistence at the start of
//! the request and written back after every mutation.
//!
//! The store does not police navigation: [`CheckoutStore::set_current_step`]
//! accepts any step. The guarded transitions are
//! [`CheckoutStore::proceed_to_next_step`] and the step routes, which consult
//! [`vinoteca_core::check_step_access`].

pub mod persistence;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;
use vinoteca_core::validation::{validate_payment_method, validate_shipping_info};
use vinoteca_core::{
    Address, CheckoutSession, CheckoutStep, Email, ErrorCode, FieldError, GuestInfo, OrderData,
    PaymentMethod, RedirectTarget, ShippingInfo, ShippingMethod, StepAccess, check_step_access,
};

pub use persistence::{CheckoutPersistence, MemoryPersistence, PersistenceError, SessionPersistence};

/// How long a checkout session lives without activity.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Errors from checkout store operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("An order has already been placed for this checkout")]
    OrderAlreadyPlaced,

    #[error("The {0} step is incomplete")]
    Incomplete(CheckoutStep, Vec<FieldError>),

    #[error("The {step} step is not available yet")]
    StepLocked {
        step: CheckoutStep,
        redirect: RedirectTarget,
    },

    #[error("Checkout is already at the last step")]
    NoNextStep,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One customer's checkout wizard, bound to its persistence.
pub struct CheckoutStore<P> {
    persistence: P,
    session: CheckoutSession,
}

fn new_session(now: DateTime<Utc>) -> CheckoutSession {
    CheckoutSession::new(
        Uuid::new_v4().to_string(),
        Some(now + Duration::minutes(SESSION_TTL_MINUTES)),
    )
}

impl<P: CheckoutPersistence> CheckoutStore<P> {
    /// Rebuild the store from persistence.
    ///
    /// A missing, unreadable or expired session is replaced by a fresh one
    /// on the shipping step. An unknown stored step restores as shipping.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read or written.
    #[instrument(skip(persistence))]
    pub async fn restore(persistence: P) -> Result<Self, CheckoutError> {
        let now = Utc::now();
        let restored = match persistence.load().await? {
            None => None,
            Some(value) => match CheckoutSession::from_persisted(value) {
                Ok(session) if session.is_expired_at(now) => {
                    tracing::info!(session_id = %session.session_id, "Checkout session expired");
                    persistence.clear().await?;
                    None
                }
                Ok(session) if session.session_id.is_empty() => {
                    tracing::warn!("Stored checkout session has no id, starting over");
                    persistence.clear().await?;
                    None
                }
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable checkout session, starting over");
                    persistence.clear().await?;
                    None
                }
            },
        };

        let mut store = Self {
            persistence,
            session: restored.unwrap_or_else(|| new_session(now)),
        };
        store.persist().await?;
        Ok(store)
    }

    #[must_use]
    pub const fn session(&self) -> &CheckoutSession {
        &self.session
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    #[must_use]
    pub const fn current_step(&self) -> CheckoutStep {
        self.session.current_step
    }

    #[must_use]
    pub const fn current_step_index(&self) -> usize {
        self.session.current_step.index()
    }

    /// Write the session back and extend its expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be encoded or stored.
    pub async fn persist(&mut self) -> Result<(), CheckoutError> {
        self.session.expires_at = Some(Utc::now() + Duration::minutes(SESSION_TTL_MINUTES));
        let value = serde_json::to_value(&self.session).map_err(PersistenceError::from)?;
        self.persistence.save(value).await?;
        Ok(())
    }

    /// Move to `step` without checking access.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub async fn set_current_step(&mut self, step: CheckoutStep) -> Result<(), CheckoutError> {
        self.session.current_step = step;
        self.persist().await
    }

    /// Record the shipping address and chosen method.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub async fn set_shipping_info(
        &mut self,
        address: Address,
        method: ShippingMethod,
    ) -> Result<(), CheckoutError> {
        self.session.shipping_info = Some(ShippingInfo { address, method });
        self.persist().await
    }

    /// Record the payment selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub async fn set_payment_method_state(
        &mut self,
        method: PaymentMethod,
    ) -> Result<(), CheckoutError> {
        self.session.payment_method = Some(method);
        self.persist().await
    }

    /// Record the guest's contact email.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub async fn set_guest_info(
        &mut self,
        email: Email,
        email_updates: bool,
    ) -> Result<(), CheckoutError> {
        self.session.guest_info = Some(GuestInfo {
            email,
            email_updates,
        });
        self.persist().await
    }

    /// Record the placed order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::OrderAlreadyPlaced`] if an order was already
    /// recorded, or an error if the session cannot be persisted.
    pub async fn set_order_data(&mut self, order: OrderData) -> Result<(), CheckoutError> {
        if self.session.order_data.is_some() {
            return Err(CheckoutError::OrderAlreadyPlaced);
        }
        tracing::info!(
            session_id = %self.session.session_id,
            order_number = %order.order_number,
            "Order recorded"
        );
        self.session.order_data = Some(order);
        self.persist().await
    }

    /// Start over with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored session cannot be cleared or the new
    /// one persisted.
    pub async fn reset(&mut self) -> Result<(), CheckoutError> {
        self.persistence.clear().await?;
        self.session = new_session(Utc::now());
        self.persist().await
    }

    /// Problems preventing the customer from leaving the current step.
    #[must_use]
    pub fn validate_current_step(&self) -> Vec<FieldError> {
        match self.session.current_step {
            CheckoutStep::Shipping => match &self.session.shipping_info {
                Some(info) => validate_shipping_info(&info.address, &info.method),
                None => vec![FieldError::new(
                    "shipping",
                    ErrorCode::Required,
                    "Shipping information is required",
                )],
            },
            CheckoutStep::Payment => match &self.session.payment_method {
                Some(method) => validate_payment_method(method),
                None => vec![FieldError::new(
                    "payment",
                    ErrorCode::Required,
                    "Payment method is required",
                )],
            },
            CheckoutStep::Review if !self.session.has_order_id() => vec![FieldError::new(
                "order",
                ErrorCode::Required,
                "The order has not been placed",
            )],
            CheckoutStep::Review | CheckoutStep::Confirmation => Vec::new(),
        }
    }

    /// Validate the current step and move to the next one if it is open.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::NoNextStep`] on the confirmation step
    /// - [`CheckoutError::Incomplete`] if the current step has problems
    /// - [`CheckoutError::StepLocked`] if the next step's guard refuses
    pub async fn proceed_to_next_step(
        &mut self,
        cart_is_empty: bool,
    ) -> Result<CheckoutStep, CheckoutError> {
        let current = self.session.current_step;
        let next = current.next().ok_or(CheckoutError::NoNextStep)?;

        let problems = self.validate_current_step();
        if !problems.is_empty() {
            return Err(CheckoutError::Incomplete(current, problems));
        }

        if let StepAccess::Redirect(redirect) =
            check_step_access(next, &self.session, cart_is_empty)
        {
            return Err(CheckoutError::StepLocked {
                step: next,
                redirect,
            });
        }

        self.set_current_step(next).await?;
        Ok(next)
    }

    /// Move back one step. Returns `None` on the first step.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub async fn go_to_previous_step(&mut self) -> Result<Option<CheckoutStep>, CheckoutError> {
        let Some(previous) = self.session.current_step.previous() else {
            return Ok(None);
        };
        self.set_current_step(previous).await?;
        Ok(Some(previous))
    }

    #[must_use]
    pub fn can_proceed_to_payment(&self) -> bool {
        self.session
            .shipping_info
            .as_ref()
            .is_some_and(|info| validate_shipping_info(&info.address, &info.method).is_empty())
    }

    #[must_use]
    pub fn can_proceed_to_review(&self) -> bool {
        self.can_proceed_to_payment()
            && self
                .session
                .payment_method
                .as_ref()
                .is_some_and(|method| validate_payment_method(method).is_empty())
    }

    #[must_use]
    pub fn can_complete_order(&self) -> bool {
        self.can_proceed_to_review() && self.session.order_data.is_some()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.session.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use vinoteca_core::{OrderItem, PaymentKind};

    fn address() -> Address {
        Address {
            first_name: "Ion".to_string(),
            last_name: "Popescu".to_string(),
            street: "Strada Lipscani 5".to_string(),
            city: "Bucuresti".to_string(),
            postal_code: "030031".to_string(),
            country: "RO".to_string(),
            ..Address::default()
        }
    }

    fn order() -> OrderData {
        OrderData::new(
            "order-123".to_string(),
            "ORD-20261016-ABC123".to_string(),
            vec![OrderItem::new(
                "feteasca".to_string(),
                "Feteasca Neagra".to_string(),
                1,
                Decimal::new(2400, 2),
            )],
            Decimal::new(599, 2),
            None,
        )
    }

    async fn fresh() -> (CheckoutStore<MemoryPersistence>, MemoryPersistence) {
        let persistence = MemoryPersistence::default();
        let store = CheckoutStore::restore(persistence.clone()).await.unwrap();
        (store, persistence)
    }

    #[tokio::test]
    async fn test_restore_without_stored_session() {
        let (store, persistence) = fresh().await;
        assert_eq!(store.current_step(), CheckoutStep::Shipping);
        assert!(!store.session_id().is_empty());
        assert!(!store.is_expired());
        assert_eq!(
            persistence.stored().unwrap()["sessionId"],
            json!(store.session_id())
        );
    }

    #[tokio::test]
    async fn test_restore_existing_session() {
        let persistence = MemoryPersistence::with_value(json!({
            "sessionId": "session-123",
            "currentStep": "payment",
            "paymentMethod": { "type": "cash" }
        }));
        let store = CheckoutStore::restore(persistence).await.unwrap();
        assert_eq!(store.session_id(), "session-123");
        assert_eq!(store.current_step(), CheckoutStep::Payment);
        assert_eq!(store.session().payment_method, Some(PaymentMethod::cash()));
    }

    #[tokio::test]
    async fn test_restore_invalid_step_defaults_to_shipping() {
        let persistence = MemoryPersistence::with_value(json!({
            "sessionId": "corrupted",
            "currentStep": "invalid-step"
        }));
        let store = CheckoutStore::restore(persistence).await.unwrap();
        assert_eq!(store.session_id(), "corrupted");
        assert_eq!(store.current_step(), CheckoutStep::Shipping);
    }

    #[tokio::test]
    async fn test_restore_expired_session_starts_over() {
        let persistence = MemoryPersistence::with_value(json!({
            "sessionId": "stale",
            "currentStep": "review",
            "expiresAt": "2020-01-01T00:00:00Z"
        }));
        let store = CheckoutStore::restore(persistence).await.unwrap();
        assert_ne!(store.session_id(), "stale");
        assert_eq!(store.current_step(), CheckoutStep::Shipping);
    }

    #[tokio::test]
    async fn test_restore_unreadable_session_starts_over() {
        let persistence = MemoryPersistence::with_value(json!("not a session"));
        let store = CheckoutStore::restore(persistence.clone()).await.unwrap();
        assert_eq!(store.current_step(), CheckoutStep::Shipping);
        assert!(persistence.stored().unwrap().is_object());
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let (mut store, persistence) = fresh().await;

        store
            .set_shipping_info(address(), ShippingMethod::fallback())
            .await
            .unwrap();
        store
            .set_guest_info(Email::parse("ana@example.com").unwrap(), true)
            .await
            .unwrap();
        store.set_current_step(CheckoutStep::Review).await.unwrap();

        let restored = CheckoutStore::restore(persistence).await.unwrap();
        assert_eq!(restored.current_step(), CheckoutStep::Review);
        assert_eq!(
            restored.session().shipping_info.as_ref().unwrap().address,
            address()
        );
        assert!(restored.session().guest_info.as_ref().unwrap().email_updates);
    }

    #[tokio::test]
    async fn test_order_data_is_set_once() {
        let (mut store, _) = fresh().await;
        store.set_order_data(order()).await.unwrap();

        let err = store.set_order_data(order()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderAlreadyPlaced));
        assert_eq!(store.session().order_data, Some(order()));
    }

    #[tokio::test]
    async fn test_reset_starts_a_new_session() {
        let (mut store, persistence) = fresh().await;
        let old_id = store.session_id().to_string();
        store.set_payment_method_state(PaymentMethod::cash()).await.unwrap();

        store.reset().await.unwrap();

        assert_ne!(store.session_id(), old_id);
        assert_eq!(store.session().payment_method, None);
        assert_eq!(
            persistence.stored().unwrap()["paymentMethod"],
            serde_json::Value::Null
        );
    }

    #[tokio::test]
    async fn test_proceed_requires_valid_step() {
        let (mut store, _) = fresh().await;

        let err = store.proceed_to_next_step(false).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Incomplete(CheckoutStep::Shipping, _)));

        let mut incomplete = address();
        incomplete.postal_code = "12".to_string();
        store
            .set_shipping_info(incomplete, ShippingMethod::fallback())
            .await
            .unwrap();
        let CheckoutError::Incomplete(_, problems) =
            store.proceed_to_next_step(false).await.unwrap_err()
        else {
            panic!("expected incomplete step");
        };
        assert_eq!(problems[0].field, "postalCode");
        assert_eq!(store.current_step(), CheckoutStep::Shipping);
    }

    #[tokio::test]
    async fn test_walk_through_the_wizard() {
        let (mut store, _) = fresh().await;
        store
            .set_shipping_info(address(), ShippingMethod::fallback())
            .await
            .unwrap();
        assert!(store.can_proceed_to_payment());
        assert_eq!(
            store.proceed_to_next_step(false).await.unwrap(),
            CheckoutStep::Payment
        );

        store
            .set_payment_method_state(PaymentMethod {
                kind: PaymentKind::CreditCard,
                holder_name: Some("Ion Popescu".to_string()),
            })
            .await
            .unwrap();
        assert!(store.can_proceed_to_review());
        assert_eq!(
            store.proceed_to_next_step(false).await.unwrap(),
            CheckoutStep::Review
        );
        assert_eq!(store.current_step_index(), 2);

        assert!(matches!(
            store.proceed_to_next_step(false).await.unwrap_err(),
            CheckoutError::Incomplete(CheckoutStep::Review, _)
        ));
        store.set_order_data(order()).await.unwrap();
        assert!(store.can_complete_order());
        assert_eq!(
            store.proceed_to_next_step(true).await.unwrap(),
            CheckoutStep::Confirmation
        );
        assert!(matches!(
            store.proceed_to_next_step(true).await.unwrap_err(),
            CheckoutError::NoNextStep
        ));
    }

    #[tokio::test]
    async fn test_proceed_respects_next_step_guard() {
        let persistence = MemoryPersistence::with_value(json!({
            "sessionId": "s",
            "currentStep": "payment",
            "paymentMethod": { "type": "cash" }
        }));
        let mut store = CheckoutStore::restore(persistence).await.unwrap();

        let err = store.proceed_to_next_step(false).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::StepLocked {
                step: CheckoutStep::Review,
                redirect: RedirectTarget::Shipping
            }
        ));
    }

    #[tokio::test]
    async fn test_go_to_previous_step() {
        let (mut store, _) = fresh().await;
        assert_eq!(store.go_to_previous_step().await.unwrap(), None);

        store.set_current_step(CheckoutStep::Review).await.unwrap();
        assert_eq!(
            store.go_to_previous_step().await.unwrap(),
            Some(CheckoutStep::Payment)
        );
        assert_eq!(store.current_step(), CheckoutStep::Payment);
    }
}
