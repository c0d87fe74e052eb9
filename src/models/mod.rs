use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the payment-method radio buttons offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethodChoice {
    CashOnDelivery,
    Online,
}

/// Online payment kinds available once Online is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnlinePaymentKind {
    #[default]
    Card,
    QrCode,
}

/// Active payment selection. The online kind exists only under `Online`, so
/// Cash-on-Delivery combined with QRCode is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSelection {
    CashOnDelivery,
    Online(OnlinePaymentKind),
}

impl PaymentSelection {
    pub fn method(&self) -> PaymentMethodChoice {
        match self {
            PaymentSelection::CashOnDelivery => PaymentMethodChoice::CashOnDelivery,
            PaymentSelection::Online(_) => PaymentMethodChoice::Online,
        }
    }

    /// Wire label for the payment method.
    pub fn method_label(&self) -> &'static str {
        match self {
            PaymentSelection::CashOnDelivery => "Cash On Delivery",
            PaymentSelection::Online(_) => "Online Payment",
        }
    }

    /// Wire label for the payment type. Cash-on-Delivery keeps the dormant
    /// default of "Card", matching what the upstream service expects.
    pub fn kind_label(&self) -> &'static str {
        match self {
            PaymentSelection::Online(OnlinePaymentKind::QrCode) => "QRCode",
            _ => "Card",
        }
    }
}

/// Card detail fields in their display form (number grouped in 4s).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
}

/// Mutable checkout form state, owned exclusively by the controller.
#[derive(Debug, Clone)]
pub struct OrderForm {
    /// Read-only, sourced from the user profile
    pub email: String,
    /// Read-only, sourced from the user profile
    pub phone: String,
    /// Fixed dialing prefix
    pub country_code: String,
    /// Free-text shipping address; non-empty enforced at submit
    pub address: String,
    pub payment: PaymentSelection,
    pub card: CardDetails,
    /// Inline annotation for the phone field; never blocks input
    pub phone_error: Option<String>,
}

impl OrderForm {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            email: String::new(),
            phone: String::new(),
            country_code: country_code.into(),
            address: String::new(),
            payment: PaymentSelection::CashOnDelivery,
            card: CardDetails::default(),
            phone_error: None,
        }
    }
}

/// Payment status asserted in the order payload. No real authorization
/// occurs; "Paid" is asserted once local validation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    AwaitingPaymentConfirmation,
    Submitting,
    Success,
    /// Idle-equivalent: the form stays editable and resubmission is allowed
    Failed(String),
}

impl SubmissionState {
    /// Whether a new submit attempt may start from this state.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, SubmissionState::Idle | SubmissionState::Failed(_))
    }
}

const TRANSACTION_ID_PREFIX: &str = "TXN";

/// Ephemeral record of a simulated QR payment confirmation. Never persisted;
/// discarded when the follow-up order placement fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Mints a transaction id: prefix, millisecond timestamp, then a bounded
    /// random suffix.
    pub fn generate() -> Self {
        let created_at = Utc::now();
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        Self {
            id: format!(
                "{}{}{}",
                TRANSACTION_ID_PREFIX,
                created_at.timestamp_millis(),
                suffix
            ),
            created_at,
        }
    }
}

/// Wire payload for order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub email: String,
    pub phone: String,
    pub country_code: String,
    pub address: String,
    pub payment_method: String,
    pub payment_type: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Profile response consumed for contact-field prefill.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// One cart line as returned by the cart endpoint; only the line total
/// matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
    pub total: Decimal,
}

/// Cart snapshot fetched once at form load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub cart: Vec<CartLine>,
}

impl CartSnapshot {
    /// Order total: sum of line totals.
    pub fn total(&self) -> Decimal {
        self.cart.iter().map(|line| line.total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_method_change_cannot_keep_qr_kind() {
        // Selecting COD leaves no slot for an online kind at all.
        let selection = PaymentSelection::CashOnDelivery;
        assert_eq!(selection.kind_label(), "Card");
        assert_eq!(selection.method_label(), "Cash On Delivery");
    }

    #[test]
    fn test_transaction_id_format() {
        let record = TransactionRecord::generate();
        assert!(record.id.starts_with("TXN"));
        let digits = &record.id["TXN".len()..];
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        // 13 millisecond digits plus a suffix of 1 to 4 digits
        assert!(digits.len() >= 14 && digits.len() <= 17);
    }

    #[test]
    fn test_cart_total_sums_lines() {
        let snapshot = CartSnapshot {
            cart: vec![
                CartLine { total: dec!(120.50) },
                CartLine { total: dec!(79.50) },
            ],
        };
        assert_eq!(snapshot.total(), dec!(200.00));
    }

    #[test]
    fn test_order_payload_wire_shape() {
        let payload = OrderPayload {
            email: "a@b.com".to_string(),
            phone: "9876543210".to_string(),
            country_code: "+91".to_string(),
            address: "12 Brew Lane".to_string(),
            payment_method: "Cash On Delivery".to_string(),
            payment_type: "Card".to_string(),
            card_number: String::new(),
            expiry: String::new(),
            cvv: String::new(),
            payment_status: PaymentStatus::Pending,
            transaction_id: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["countryCode"], "+91");
        assert_eq!(json["paymentStatus"], "Pending");
        assert_eq!(json["paymentMethod"], "Cash On Delivery");
        // Absent transaction ids are omitted entirely
        assert!(json.get("transactionId").is_none());
    }

    #[test]
    fn test_failed_state_is_resubmittable() {
        assert!(SubmissionState::Idle.accepts_submit());
        assert!(SubmissionState::Failed("nope".to_string()).accepts_submit());
        assert!(!SubmissionState::Submitting.accepts_submit());
        assert!(!SubmissionState::AwaitingPaymentConfirmation.accepts_submit());
        assert!(!SubmissionState::Success.accepts_submit());
    }
}
