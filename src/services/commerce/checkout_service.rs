use crate::{
    entities::{
        cart_line, order, order_item, product, CartLine, Customer, Order, OrderItem,
        OrderItemModel, OrderModel, OrderStatus, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        attachments::{compensate, AttachmentWriter, UploadedFile},
        catalog::CatalogReader,
        commerce::cart_service::{lines_for, CartService},
        customers::{AddressSnapshot, CustomerService},
        sequencer::{IdSequencer, SequenceKind},
    },
    tracing::with_metrics,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Label used in stored payment-proof file names.
const PROOF_LABEL: &str = "proof";

/// How the customer intends to pay.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum PaymentMethod {
    #[serde(rename = "Manual Transfer BCA", alias = "bank-transfer")]
    #[strum(to_string = "Manual Transfer BCA", serialize = "bank-transfer")]
    ManualTransferBca,
    #[serde(rename = "Cash on Delivery", alias = "cod")]
    #[strum(to_string = "Cash on Delivery", serialize = "cod")]
    CashOnDelivery,
}

impl PaymentMethod {
    /// Whether checkout must carry a proof-of-payment attachment.
    pub fn requires_proof(self) -> bool {
        matches!(self, PaymentMethod::ManualTransferBca)
    }

    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        raw.trim()
            .parse()
            .map_err(|_| ServiceError::InvalidArgument(format!("Unknown payment method: {}", raw)))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub shipping_address_id: i32,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItemModel,
    pub subtotal: Decimal,
}

impl From<OrderItemModel> for OrderItemView {
    fn from(item: OrderItemModel) -> Self {
        Self {
            subtotal: item.subtotal(),
            item,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemView>,
}

impl OrderWithItems {
    fn new(order: OrderModel, items: Vec<OrderItemModel>) -> Self {
        Self {
            order,
            items: items.into_iter().map(OrderItemView::from).collect(),
        }
    }
}

/// Turns a customer's cart into an order.
///
/// Stock decrement, order insert and cart clearing share one database
/// transaction. The payment proof is written before that transaction and
/// deleted again if it does not commit.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn CatalogReader>,
    attachments: Arc<dyn AttachmentWriter>,
    customers: CustomerService,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<dyn CatalogReader>,
        attachments: Arc<dyn AttachmentWriter>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            customers: CustomerService::new(db.clone()),
            db,
            catalog,
            attachments,
            event_sender,
        }
    }

    /// Places an order from the customer's cart.
    ///
    /// Preconditions are checked in this order: `EmptyCart`, `InvalidAddress`,
    /// `AttachmentRequired`. Inside the transaction every line is re-checked
    /// against the catalog (`ProductUnavailable`, `InsufficientStock`) and stock
    /// is taken with a conditional decrement.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderWithItems)` - The `Pending` order and its item snapshots
    /// * `Err(ServiceError)` - Nothing was persisted; a stored proof is compensated
    #[instrument(skip(self, request, attachment), fields(customer_id = %customer_id))]
    pub async fn create_order(
        &self,
        customer_id: &str,
        request: CheckoutRequest,
        attachment: Option<UploadedFile>,
    ) -> Result<OrderWithItems, ServiceError> {
        with_metrics("checkout", || self.checkout(customer_id, request, attachment)).await
    }

    async fn checkout(
        &self,
        customer_id: &str,
        request: CheckoutRequest,
        attachment: Option<UploadedFile>,
    ) -> Result<OrderWithItems, ServiceError> {
        request.validate()?;

        let in_cart = CartLine::find()
            .filter(cart_line::Column::CustomerId.eq(customer_id))
            .count(&*self.db)
            .await?;
        if in_cart == 0 {
            return Err(ServiceError::EmptyCart);
        }

        if self
            .customers
            .find_owned_address(&*self.db, customer_id, request.shipping_address_id)
            .await?
            .is_none()
        {
            return Err(invalid_address(request.shipping_address_id));
        }

        if request.payment_method.requires_proof() && attachment.is_none() {
            return Err(ServiceError::AttachmentRequired(
                request.payment_method.to_string(),
            ));
        }

        // A failed write leaves nothing behind to compensate.
        let proof_path = match attachment {
            Some(file) => Some(self.attachments.store(customer_id, PROOF_LABEL, file).await?),
            None => None,
        };

        match self.place_order(customer_id, &request, proof_path.clone()).await {
            Ok(placed) => {
                info!(
                    order_id = %placed.order.order_id,
                    grand_total = %placed.order.grand_total,
                    items = placed.items.len(),
                    "order placed"
                );
                self.event_sender
                    .send_or_log(Event::OrderCreated {
                        order_id: placed.order.order_id.clone(),
                        customer_id: customer_id.to_string(),
                        grand_total: placed.order.grand_total,
                    })
                    .await;
                Ok(placed)
            }
            Err(e) => {
                if let Some(path) = proof_path {
                    warn!(%path, error = %e, "checkout rolled back; removing payment proof");
                    compensate(self.attachments.clone(), path, self.event_sender.clone());
                }
                Err(e)
            }
        }
    }

    /// The transactional part of checkout. Dropping `txn` on any early
    /// return rolls everything back.
    async fn place_order(
        &self,
        customer_id: &str,
        request: &CheckoutRequest,
        proof_path: Option<String>,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let customer = Customer::find_by_id(customer_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        let address = self
            .customers
            .find_owned_address(&txn, customer_id, request.shipping_address_id)
            .await?
            .ok_or_else(|| invalid_address(request.shipping_address_id))?;
        let snapshot = AddressSnapshot::render(&address);

        let lines = lines_for(&txn, customer_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        for line in &lines {
            let entry = self
                .catalog
                .lookup(&txn, &line.product_sku)
                .await?
                .filter(|entry| entry.sellable)
                .ok_or_else(|| {
                    ServiceError::ProductUnavailable(format!(
                        "{} is no longer available",
                        line.product_sku
                    ))
                })?;
            if entry.stock < line.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} has {} in stock, {} in cart",
                    line.product_sku, entry.stock, line.quantity
                )));
            }
        }

        let grand_total: Decimal = lines.iter().map(|line| line.subtotal()).sum();

        // Conditional decrement: a concurrent checkout that got there first
        // leaves zero matching rows.
        for line in &lines {
            let taken = Product::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(line.quantity),
                )
                .filter(product::Column::Sku.eq(line.product_sku.as_str()))
                .filter(product::Column::Stock.gte(line.quantity))
                .exec(&txn)
                .await?;
            if taken.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} sold out during checkout",
                    line.product_sku
                )));
            }
        }

        let order_id = IdSequencer::next(&txn, SequenceKind::Order).await?;
        let now = Utc::now();

        let order = order::ActiveModel {
            order_id: Set(order_id.clone()),
            customer_id: Set(customer.customer_id.clone()),
            customer_fullname: Set(customer.full_name()),
            customer_email: Set(customer.email.clone()),
            customer_phone: Set(customer.phone.clone()),
            shipping_address_id: Set(address.address_id),
            shipping_address_snapshot: Set(snapshot.into_inner()),
            order_date_time: Set(now),
            payment_method: Set(request.payment_method.to_string()),
            order_status: Set(OrderStatus::Pending),
            grand_total: Set(grand_total),
            notes: Set(request
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)),
            proof_of_payment: Set(proof_path),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = order_item::ActiveModel {
                order_id: Set(order_id.clone()),
                product_sku: Set(line.product_sku.clone()),
                quantity: Set(line.quantity),
                price_at_order: Set(line.unit_price),
                product_title_snapshot: Set(line.title.clone()),
                product_image_snapshot: Set(line.image.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        CartService::clear(&txn, customer_id).await?;

        txn.commit().await?;
        Ok(OrderWithItems::new(order, items))
    }

    /// Orders of one customer, newest first.
    pub async fn list_customer_orders(
        &self,
        customer_id: &str,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::OrderDateTime)
            .order_by_desc(order::Column::OrderId)
            .all(&*self.db)
            .await?;
        let items = orders.load_many(OrderItem, &*self.db).await?;

        Ok(orders
            .into_iter()
            .zip(items)
            .map(|(order, items)| OrderWithItems::new(order, items))
            .collect())
    }

    pub async fn get_order(&self, order_id: &str) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::OrderItemId)
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems::new(order, items))
    }
}

fn invalid_address(address_id: i32) -> ServiceError {
    ServiceError::InvalidAddress(format!(
        "Address {} does not belong to this customer",
        address_id
    ))
}
