//! The order-form controller: field state, inline validation, payment-path
//! dispatch and the asynchronous submission state machine.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::SessionContext,
    clients::CommerceApi,
    config::CheckoutConfig,
    errors::ServiceError,
    events::{Event, EventSender, Route},
    models::{
        OnlinePaymentKind, OrderForm, OrderPayload, PaymentMethodChoice, PaymentSelection,
        PaymentStatus, SubmissionState, TransactionRecord,
    },
    validation,
};

pub const MSG_ORDER_FAILED: &str = "Order failed. Please try again.";

struct CheckoutState {
    form: OrderForm,
    total: Decimal,
    state: SubmissionState,
    /// Optimistic QR confirmation indicator; rolled back on remote failure
    payment_success: bool,
    transaction: Option<TransactionRecord>,
    loading: bool,
    error_message: Option<String>,
    pending_confirmation: Option<JoinHandle<()>>,
}

impl Drop for CheckoutState {
    // Last controller clone gone: no timer callback may fire afterwards
    fn drop(&mut self) {
        if let Some(handle) = self.pending_confirmation.take() {
            handle.abort();
        }
    }
}

/// Owns the checkout form, derives the payment path and drives submission.
///
/// Clones share the same state; the embedding shell keeps one clone for
/// rendering reads while submission tasks hold another.
#[derive(Clone)]
pub struct OrderFormController {
    inner: Arc<Mutex<CheckoutState>>,
    session: Arc<SessionContext>,
    client: Arc<dyn CommerceApi>,
    event_sender: EventSender,
    config: Arc<CheckoutConfig>,
}

impl OrderFormController {
    pub fn new(
        config: Arc<CheckoutConfig>,
        session: Arc<SessionContext>,
        client: Arc<dyn CommerceApi>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CheckoutState {
                form: OrderForm::new(config.country_code.clone()),
                total: Decimal::ZERO,
                state: SubmissionState::Idle,
                payment_success: false,
                transaction: None,
                loading: false,
                error_message: None,
                pending_confirmation: None,
            })),
            session,
            client,
            event_sender,
            config,
        }
    }

    // State transitions are serialized through this lock; it is never held
    // across an await point.
    fn state(&self) -> MutexGuard<'_, CheckoutState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -----------------------------------------------------------------------
    // Form load
    // -----------------------------------------------------------------------

    /// Prefills contact fields from the profile and computes the order total
    /// from the cart snapshot. Without a session token both fetches are
    /// silently skipped; individual fetch failures are logged and non-fatal.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), ServiceError> {
        let Some(token) = self.session.current_token() else {
            debug!("no session token; skipping profile and cart prefetch");
            return Ok(());
        };

        match self.client.fetch_profile(&token).await {
            Ok(profile) => {
                let mut st = self.state();
                st.form.email = profile.email;
                st.form.phone = validation::sanitize_phone(&profile.phone);
                st.form.phone_error = validation::phone_inline_error(&st.form.phone);
            }
            Err(err) => warn!(error = %err, "profile prefetch failed"),
        }

        match self.client.fetch_cart(&token).await {
            Ok(snapshot) => {
                let total = snapshot.total();
                self.state().total = total;
                info!(%total, "cart snapshot loaded");
                if let Err(err) = self.event_sender.send(Event::CheckoutLoaded { total }).await {
                    warn!(error = %err, "failed to publish checkout-loaded event");
                }
            }
            Err(err) => warn!(error = %err, "cart prefetch failed"),
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Field mutation + inline validation (never blocks input)
    // -----------------------------------------------------------------------

    pub fn set_address(&self, address: impl Into<String>) {
        self.state().form.address = address.into();
    }

    pub fn set_phone(&self, raw: &str) {
        let mut st = self.state();
        st.form.phone = validation::sanitize_phone(raw);
        st.form.phone_error = validation::phone_inline_error(&st.form.phone);
    }

    pub fn set_card_number(&self, raw: &str) {
        self.state().form.card.number = validation::format_card_number(raw);
    }

    pub fn set_expiry(&self, raw: &str) {
        self.state().form.card.expiry = validation::sanitize_expiry(raw);
    }

    pub fn set_cvv(&self, raw: &str) {
        self.state().form.card.cvv = validation::sanitize_cvv(raw);
    }

    /// Changing the payment method always resets the online kind to Card.
    pub fn set_payment_method(&self, method: PaymentMethodChoice) {
        let mut st = self.state();
        st.form.payment = match method {
            PaymentMethodChoice::CashOnDelivery => PaymentSelection::CashOnDelivery,
            PaymentMethodChoice::Online => PaymentSelection::Online(OnlinePaymentKind::default()),
        };
    }

    /// Selecting an online kind is only meaningful while Online is active.
    pub fn set_online_payment_kind(&self, kind: OnlinePaymentKind) -> Result<(), ServiceError> {
        let mut st = self.state();
        match st.form.payment {
            PaymentSelection::Online(_) => {
                st.form.payment = PaymentSelection::Online(kind);
                Ok(())
            }
            PaymentSelection::CashOnDelivery => Err(ServiceError::InvalidOperation(
                "payment type requires an online payment method".to_string(),
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Read accessors for the rendering layer
    // -----------------------------------------------------------------------

    pub fn form(&self) -> OrderForm {
        self.state().form.clone()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.state().state.clone()
    }

    pub fn order_total(&self) -> Decimal {
        self.state().total
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn payment_success(&self) -> bool {
        self.state().payment_success
    }

    pub fn transaction_id(&self) -> Option<String> {
        self.state().transaction.as_ref().map(|t| t.id.clone())
    }

    pub fn error_message(&self) -> Option<String> {
        self.state().error_message.clone()
    }

    /// The UPI payment-request string backing the scannable code. Display
    /// only; never transmitted.
    pub fn upi_payment_string(&self) -> String {
        format!(
            "upi://pay?pa={}&am={}&cu={}&tn={}",
            self.config.upi_payee_id,
            self.state().total,
            self.config.currency,
            self.config.payment_note
        )
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Single submit entry point: validates, then dispatches to the QR
    /// confirmation path or the direct (COD/card) submission path.
    ///
    /// Re-entrant submits are rejected while a submission is in flight.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<(), ServiceError> {
        enum Path {
            Qr(TransactionRecord),
            Direct(OrderPayload),
        }

        // The guard check and the state transition for the chosen path happen
        // under one lock acquisition, so a concurrent submit can never slip
        // between them.
        let path = {
            let mut st = self.state();
            if !st.state.accepts_submit() {
                return Err(ServiceError::InvalidOperation(
                    "a submission is already in progress".to_string(),
                ));
            }

            if st.form.address.trim().is_empty() {
                let message = validation::MSG_ADDRESS_REQUIRED.to_string();
                st.state = SubmissionState::Failed(message.clone());
                return Err(ServiceError::ValidationError(message));
            }

            match st.form.payment {
                PaymentSelection::Online(OnlinePaymentKind::QrCode) => {
                    let record = TransactionRecord::generate();
                    st.transaction = Some(record.clone());
                    st.payment_success = true;
                    st.loading = true;
                    st.error_message = None;
                    st.state = SubmissionState::AwaitingPaymentConfirmation;
                    Path::Qr(record)
                }
                selection => {
                    st.state = SubmissionState::Validating;
                    let card_number = validation::strip_card_whitespace(&st.form.card.number);

                    if selection == PaymentSelection::Online(OnlinePaymentKind::Card) {
                        let input = validation::CardInput {
                            number: &card_number,
                            expiry: &st.form.card.expiry,
                            cvv: &st.form.card.cvv,
                        };
                        if let Err(message) =
                            validation::validate_card(&input, &validation::ExpiryReference::now())
                        {
                            debug!(%message, "submit-time card validation failed");
                            st.state = SubmissionState::Failed(message.clone());
                            return Err(ServiceError::ValidationError(message));
                        }
                    }

                    let payload = direct_payload(&st.form, card_number);
                    st.state = SubmissionState::Submitting;
                    st.loading = true;
                    st.error_message = None;
                    Path::Direct(payload)
                }
            }
        };

        match path {
            Path::Qr(record) => self.begin_qr_confirmation(record).await,
            Path::Direct(payload) => self.submit_direct(payload).await,
        }
    }

    /// Cancels any pending confirmation/navigation task. Call on teardown so
    /// no timer callback fires after the view is gone.
    pub fn close(&self) {
        if let Some(handle) = self.state().pending_confirmation.take() {
            handle.abort();
            debug!("cancelled pending payment-confirmation task");
        }
    }

    async fn submit_direct(&self, payload: OrderPayload) -> Result<(), ServiceError> {
        let token = self.session.current_token();
        match self.client.submit_order(token.as_ref(), &payload).await {
            Ok(()) => {
                {
                    let mut st = self.state();
                    st.state = SubmissionState::Success;
                    st.loading = false;
                }
                info!(method = %payload.payment_method, "order submitted");
                let _ = self
                    .event_sender
                    .send(Event::OrderSubmitted {
                        transaction_id: None,
                    })
                    .await;
                let _ = self
                    .event_sender
                    .send(Event::NavigationRequested(Route::OrderConfirmation))
                    .await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "order submission failed");
                {
                    let mut st = self.state();
                    st.state = SubmissionState::Failed(MSG_ORDER_FAILED.to_string());
                    st.error_message = Some(MSG_ORDER_FAILED.to_string());
                    st.loading = false;
                }
                let _ = self
                    .event_sender
                    .send(Event::OrderFailed {
                        message: MSG_ORDER_FAILED.to_string(),
                    })
                    .await;
                Err(err)
            }
        }
    }

    /// QR path follow-up: the transaction was already minted and the
    /// simulated confirmation shown under the submit guard; here the delayed
    /// order placement is scheduled.
    async fn begin_qr_confirmation(&self, record: TransactionRecord) -> Result<(), ServiceError> {
        info!(
            transaction_id = %record.id,
            "simulated QR payment confirmed; order placement scheduled"
        );
        let _ = self
            .event_sender
            .send(Event::PaymentConfirmed {
                transaction_id: record.id.clone(),
                timestamp: record.created_at,
            })
            .await;

        // The task only holds a weak handle while it sleeps, so dropping the
        // last controller clone tears the state down mid-timer.
        let weak = self.downgrade();
        let handle = tokio::spawn(async move {
            Self::run_qr_submission(weak, record).await;
        });
        self.state().pending_confirmation = Some(handle);
        Ok(())
    }

    fn downgrade(&self) -> WeakController {
        WeakController {
            inner: Arc::downgrade(&self.inner),
            session: self.session.clone(),
            client: self.client.clone(),
            event_sender: self.event_sender.clone(),
            config: self.config.clone(),
        }
    }

    async fn run_qr_submission(weak: WeakController, record: TransactionRecord) {
        tokio::time::sleep(Duration::from_millis(weak.config.confirmation_delay_ms)).await;

        let Some(this) = weak.upgrade() else {
            return;
        };
        let payload = {
            let mut st = this.state();
            st.state = SubmissionState::Submitting;
            qr_payload(&st.form, record.id.clone())
        };

        let token = this.session.current_token();
        let outcome = this.client.submit_order(token.as_ref(), &payload).await;
        match outcome {
            Ok(()) => {
                info!(transaction_id = %record.id, "QR order submitted");
                let _ = this
                    .event_sender
                    .send(Event::OrderSubmitted {
                        transaction_id: Some(record.id.clone()),
                    })
                    .await;

                // Let the confirmation stay on screen before navigating away;
                // release the strong handle for the duration of the wait
                drop(this);
                tokio::time::sleep(Duration::from_millis(weak.config.navigation_delay_ms)).await;
                let Some(this) = weak.upgrade() else {
                    return;
                };
                {
                    let mut st = this.state();
                    st.state = SubmissionState::Success;
                    st.loading = false;
                    st.pending_confirmation = None;
                }
                let _ = this
                    .event_sender
                    .send(Event::NavigationRequested(Route::OrdersList))
                    .await;
            }
            Err(err) => {
                error!(error = %err, transaction_id = %record.id, "QR order submission failed");
                {
                    let mut st = this.state();
                    st.payment_success = false;
                    st.transaction = None;
                    st.loading = false;
                    st.state = SubmissionState::Failed(MSG_ORDER_FAILED.to_string());
                    st.error_message = Some(MSG_ORDER_FAILED.to_string());
                    st.pending_confirmation = None;
                }
                let _ = this
                    .event_sender
                    .send(Event::OrderFailed {
                        message: MSG_ORDER_FAILED.to_string(),
                    })
                    .await;
            }
        }
    }
}

/// Weak counterpart of [`OrderFormController`] held by scheduled tasks:
/// shared collaborators stay strongly referenced, the mutable checkout state
/// does not.
struct WeakController {
    inner: Weak<Mutex<CheckoutState>>,
    session: Arc<SessionContext>,
    client: Arc<dyn CommerceApi>,
    event_sender: EventSender,
    config: Arc<CheckoutConfig>,
}

impl WeakController {
    fn upgrade(&self) -> Option<OrderFormController> {
        self.inner.upgrade().map(|inner| OrderFormController {
            inner,
            session: self.session.clone(),
            client: self.client.clone(),
            event_sender: self.event_sender.clone(),
            config: self.config.clone(),
        })
    }
}

/// Payload for the COD and card paths: sanitized card number, "Pending" for
/// COD, "Paid" for any validated online card submission.
fn direct_payload(form: &OrderForm, card_number: String) -> OrderPayload {
    let payment_status = match form.payment {
        PaymentSelection::CashOnDelivery => PaymentStatus::Pending,
        PaymentSelection::Online(_) => PaymentStatus::Paid,
    };
    OrderPayload {
        email: form.email.clone(),
        phone: form.phone.clone(),
        country_code: form.country_code.clone(),
        address: form.address.clone(),
        payment_method: form.payment.method_label().to_string(),
        payment_type: form.payment.kind_label().to_string(),
        card_number,
        expiry: form.card.expiry.clone(),
        cvv: form.card.cvv.clone(),
        payment_status,
        transaction_id: None,
    }
}

/// Payload for the QR path: method forced to "Online Payment", the minted
/// transaction id attached and payment asserted as "Paid".
fn qr_payload(form: &OrderForm, transaction_id: String) -> OrderPayload {
    OrderPayload {
        email: form.email.clone(),
        phone: form.phone.clone(),
        country_code: form.country_code.clone(),
        address: form.address.clone(),
        payment_method: "Online Payment".to_string(),
        payment_type: "QRCode".to_string(),
        card_number: form.card.number.clone(),
        expiry: form.card.expiry.clone(),
        cvv: form.card.cvv.clone(),
        payment_status: PaymentStatus::Paid,
        transaction_id: Some(transaction_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardDetails;

    fn form_with(payment: PaymentSelection) -> OrderForm {
        OrderForm {
            email: "casey@example.com".to_string(),
            phone: "9876543210".to_string(),
            country_code: "+91".to_string(),
            address: "12 Brew Lane".to_string(),
            payment,
            card: CardDetails {
                number: "4539 1488 0343 6467".to_string(),
                expiry: "12/30".to_string(),
                cvv: "123".to_string(),
            },
            phone_error: None,
        }
    }

    #[test]
    fn test_direct_payload_cod_is_pending() {
        let form = form_with(PaymentSelection::CashOnDelivery);
        let payload = direct_payload(&form, String::new());
        assert_eq!(payload.payment_status, PaymentStatus::Pending);
        assert_eq!(payload.payment_method, "Cash On Delivery");
        assert_eq!(payload.payment_type, "Card");
        assert!(payload.transaction_id.is_none());
    }

    #[test]
    fn test_direct_payload_card_is_paid_and_stripped() {
        let form = form_with(PaymentSelection::Online(OnlinePaymentKind::Card));
        let card_number = validation::strip_card_whitespace(&form.card.number);
        let payload = direct_payload(&form, card_number);
        assert_eq!(payload.payment_status, PaymentStatus::Paid);
        assert_eq!(payload.card_number, "4539148803436467");
        assert_eq!(payload.payment_type, "Card");
    }

    #[test]
    fn test_qr_payload_forces_online_and_paid() {
        let form = form_with(PaymentSelection::Online(OnlinePaymentKind::QrCode));
        let payload = qr_payload(&form, "TXN17000000000001234".to_string());
        assert_eq!(payload.payment_method, "Online Payment");
        assert_eq!(payload.payment_type, "QRCode");
        assert_eq!(payload.payment_status, PaymentStatus::Paid);
        assert_eq!(
            payload.transaction_id.as_deref(),
            Some("TXN17000000000001234")
        );
    }
}
