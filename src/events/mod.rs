use crate::entities::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted by the cart and order services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CartLineAdded {
        customer_id: String,
        cart_line_id: i32,
        product_sku: String,
        quantity: i32,
    },
    CartLineUpdated {
        customer_id: String,
        cart_line_id: i32,
        quantity: i32,
    },
    CartLineRemoved {
        customer_id: String,
        cart_line_id: i32,
    },
    OrderCreated {
        order_id: String,
        customer_id: String,
        grand_total: Decimal,
    },
    OrderStatusChanged {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderDeleted(String),
    /// A payment proof was removed because its checkout rolled back.
    AttachmentCompensated(String),
}

/// Background consumer for domain events.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::CartLineAdded {
                customer_id,
                cart_line_id,
                product_sku,
                quantity,
            } => {
                info!(%customer_id, cart_line_id, %product_sku, quantity, "cart line added");
            }
            Event::CartLineUpdated {
                customer_id,
                cart_line_id,
                quantity,
            } => {
                info!(%customer_id, cart_line_id, quantity, "cart line updated");
            }
            Event::CartLineRemoved {
                customer_id,
                cart_line_id,
            } => {
                info!(%customer_id, cart_line_id, "cart line removed");
            }
            Event::OrderCreated {
                order_id,
                customer_id,
                grand_total,
            } => {
                info!(%order_id, %customer_id, %grand_total, "order created");
            }
            Event::OrderStatusChanged { order_id, from, to } => {
                info!(%order_id, %from, %to, "order status changed");
            }
            Event::OrderDeleted(order_id) => {
                info!(%order_id, "order deleted");
            }
            Event::AttachmentCompensated(path) => {
                warn!(%path, "payment proof removed after failed checkout");
            }
        }
    }

    warn!("Event processing loop has ended");
}
