pub mod addresses;
pub mod admin_orders;
pub mod admin_products;
pub mod carts;
pub mod common;
pub mod orders;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        attachments::{AttachmentWriter, LocalAttachmentStore},
        catalog::{CatalogReader, CatalogService, SeaOrmCatalog},
        commerce::{CartService, CheckoutService},
        customers::CustomerService,
        order_status::OrderStatusService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub customers: Arc<CustomerService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub order_status: Arc<OrderStatusService>,
}

impl AppServices {
    /// Wires the services over one pool, the local upload store and the event channel.
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig, event_sender: Arc<EventSender>) -> Self {
        let catalog_reader: Arc<dyn CatalogReader> = Arc::new(SeaOrmCatalog);
        let attachments: Arc<dyn AttachmentWriter> = Arc::new(LocalAttachmentStore::new(
            config.upload_dir.clone(),
            config.max_upload_bytes,
        ));

        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone())),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(
                db_pool.clone(),
                catalog_reader.clone(),
                event_sender.clone(),
            )),
            checkout: Arc::new(CheckoutService::new(
                db_pool.clone(),
                catalog_reader,
                attachments.clone(),
                event_sender.clone(),
            )),
            order_status: Arc::new(OrderStatusService::new(db_pool, attachments, event_sender)),
        }
    }
}
