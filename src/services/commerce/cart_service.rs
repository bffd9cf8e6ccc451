use crate::{
    entities::{cart_line, CartLine, CartLineModel, Customer},
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::{CatalogEntry, CatalogReader},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Shopping cart service: one line per (customer, SKU).
///
/// Each line carries a copy of the catalog title, price and image taken at
/// the last mutation. Checkout builds order items from that copy, so the
/// order reflects what the customer saw.
///
/// # Examples
///
/// ```ignore
/// let line = cart_service
///     .add_item("CST0000000001", AddToCartInput { product_sku: "SKU001".into(), quantity: 2 })
///     .await?;
/// ```
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn CatalogReader>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartInput {
    pub product_sku: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuantityInput {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLineModel,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total_quantity: i64,
    pub grand_total: Decimal,
}

impl CartService {
    /// Creates a new `CartService` instance.
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    /// * `catalog` - Source of current price, title, image and stock
    /// * `event_sender` - Event sender for publishing cart events
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<dyn CatalogReader>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            catalog,
            event_sender,
        }
    }

    /// Adds a SKU to the caller's cart or merges into the existing line.
    ///
    /// Non-positive quantities are treated as 1. The line is written with a
    /// single upsert keyed on (customer, SKU), so concurrent adds accumulate.
    /// The stored quantity is then checked against current stock and the
    /// line's catalog copy is refreshed.
    ///
    /// # Returns
    ///
    /// * `Ok(CartLineModel)` - The created or merged line
    /// * `Err(ServiceError::NotFound)` - Customer unknown, or SKU missing or not sellable
    /// * `Err(ServiceError::InsufficientStock)` - Stock below the resulting quantity
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: &str,
        input: AddToCartInput,
    ) -> Result<CartLineModel, ServiceError> {
        let quantity = input.quantity.max(1);
        let txn = self.db.begin().await?;

        if Customer::find_by_id(customer_id.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Customer {} not found",
                customer_id
            )));
        }

        let entry = self.sellable_entry(&txn, &input.product_sku).await?;

        ensure_stock(&entry, quantity)?;

        // Insert or bump in one statement; the conflict update adds to the
        // stored quantity under the row lock.
        let now = Utc::now();
        CartLine::insert(cart_line::ActiveModel {
            customer_id: Set(customer_id.to_string()),
            product_sku: Set(entry.sku.clone()),
            title: Set(entry.title.clone()),
            unit_price: Set(entry.unit_price),
            image: Set(entry.image.clone()),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([cart_line::Column::CustomerId, cart_line::Column::ProductSku])
                .value(
                    cart_line::Column::Quantity,
                    Expr::col((CartLine, cart_line::Column::Quantity)).add(quantity),
                )
                .update_columns([
                    cart_line::Column::Title,
                    cart_line::Column::UnitPrice,
                    cart_line::Column::Image,
                    cart_line::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        let line = CartLine::find()
            .filter(cart_line::Column::CustomerId.eq(customer_id))
            .filter(cart_line::Column::ProductSku.eq(entry.sku.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("cart line for {} vanished", entry.sku))
            })?;

        // Dropping the transaction rolls the bump back.
        ensure_stock(&entry, line.quantity)?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartLineAdded {
                customer_id: customer_id.to_string(),
                cart_line_id: line.cart_line_id,
                product_sku: line.product_sku.clone(),
                quantity: line.quantity,
            })
            .await;

        info!(
            cart_line_id = line.cart_line_id,
            quantity = line.quantity,
            "cart line saved"
        );
        Ok(line)
    }

    /// Sets the quantity of one of the caller's lines.
    ///
    /// # Returns
    ///
    /// * `Err(ServiceError::InvalidArgument)` - `quantity < 1`
    /// * `Err(ServiceError::NotFound)` - No such line for this customer, or SKU withdrawn
    /// * `Err(ServiceError::InsufficientStock)` - Stock below `quantity`
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        customer_id: &str,
        cart_line_id: i32,
        quantity: i32,
    ) -> Result<CartLineModel, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::InvalidArgument(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let line = owned_line(&txn, customer_id, cart_line_id).await?;
        let entry = self.sellable_entry(&txn, &line.product_sku).await?;
        ensure_stock(&entry, quantity)?;

        let mut line: cart_line::ActiveModel = line.into();
        line.quantity = Set(quantity);
        line.title = Set(entry.title);
        line.unit_price = Set(entry.unit_price);
        line.image = Set(entry.image);
        line.updated_at = Set(Utc::now());
        let line = line.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartLineUpdated {
                customer_id: customer_id.to_string(),
                cart_line_id,
                quantity,
            })
            .await;

        Ok(line)
    }

    /// Deletes one of the caller's lines.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, customer_id: &str, cart_line_id: i32) -> Result<(), ServiceError> {
        let result = CartLine::delete_many()
            .filter(cart_line::Column::CartLineId.eq(cart_line_id))
            .filter(cart_line::Column::CustomerId.eq(customer_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Cart line {} not found",
                cart_line_id
            )));
        }

        self.event_sender
            .send_or_log(Event::CartLineRemoved {
                customer_id: customer_id.to_string(),
                cart_line_id,
            })
            .await;

        Ok(())
    }

    /// Lines in the order they were added, with totals.
    pub async fn list_cart(&self, customer_id: &str) -> Result<CartView, ServiceError> {
        let lines = lines_for(&*self.db, customer_id).await?;

        let total_quantity = lines.iter().map(|l| i64::from(l.quantity)).sum();
        let grand_total = lines.iter().map(CartLineModel::subtotal).sum();
        let lines = lines
            .into_iter()
            .map(|line| CartLineView {
                subtotal: line.subtotal(),
                line,
            })
            .collect();

        Ok(CartView {
            lines,
            total_quantity,
            grand_total,
        })
    }

    /// Deletes every line of the customer; used by checkout inside its transaction.
    pub(crate) async fn clear<C>(conn: &C, customer_id: &str) -> Result<u64, ServiceError>
    where
        C: ConnectionTrait,
    {
        let result = CartLine::delete_many()
            .filter(cart_line::Column::CustomerId.eq(customer_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn sellable_entry(
        &self,
        txn: &DatabaseTransaction,
        sku: &str,
    ) -> Result<CatalogEntry, ServiceError> {
        self.catalog
            .lookup(txn, sku)
            .await?
            .filter(|entry| entry.sellable)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", sku)))
    }
}

/// Cart lines of a customer, oldest first.
pub(crate) async fn lines_for<C>(conn: &C, customer_id: &str) -> Result<Vec<CartLineModel>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(CartLine::find()
        .filter(cart_line::Column::CustomerId.eq(customer_id))
        .order_by_asc(cart_line::Column::CreatedAt)
        .order_by_asc(cart_line::Column::CartLineId)
        .all(conn)
        .await?)
}

async fn owned_line<C>(conn: &C, customer_id: &str, cart_line_id: i32) -> Result<CartLineModel, ServiceError>
where
    C: ConnectionTrait,
{
    CartLine::find_by_id(cart_line_id)
        .filter(cart_line::Column::CustomerId.eq(customer_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cart line {} not found", cart_line_id)))
}

fn ensure_stock(entry: &CatalogEntry, quantity: i32) -> Result<(), ServiceError> {
    if entry.stock < quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "{} has {} in stock, {} requested",
            entry.sku, entry.stock, quantity
        )));
    }
    Ok(())
}
