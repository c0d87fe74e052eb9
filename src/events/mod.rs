use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Navigation targets owned by the embedding router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    OrderConfirmation,
    OrdersList,
}

// Events emitted by the checkout workflow towards the embedding shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Profile/cart prefetch finished; carries the computed order total
    CheckoutLoaded { total: Decimal },

    /// Simulated QR payment confirmed locally, before any remote call
    PaymentConfirmed {
        transaction_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Remote order submission accepted
    OrderSubmitted { transaction_id: Option<String> },

    /// Remote order submission rejected; carries the user-facing message
    OrderFailed { message: String },

    /// The workflow requests navigation to another view
    NavigationRequested(Route),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a bounded event channel and its sending half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sender, mut rx) = EventSender::channel(8);

        sender
            .send(Event::PaymentConfirmed {
                transaction_id: "TXN1".to_string(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        sender
            .send(Event::NavigationRequested(Route::OrdersList))
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::PaymentConfirmed { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::NavigationRequested(Route::OrdersList)
        ));
    }
}
