use crate::{
    entities::{product, product_image, Product, ProductImage, ProductModel, ProductStatus},
    errors::ServiceError,
    services::sequencer::{IdSequencer, SequenceKind},
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

/// Current catalog view of a SKU, as the cart and checkout see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub title: String,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub stock: i32,
    pub sellable: bool,
}

/// Read-only access to the product catalog.
///
/// Lookups run on the caller's transaction so that a stock read and the
/// writes that depend on it share one unit of work.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn lookup(
        &self,
        txn: &DatabaseTransaction,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, ServiceError>;
}

/// `CatalogReader` backed by the `products` and `product_images` tables.
#[derive(Debug, Clone, Default)]
pub struct SeaOrmCatalog;

#[async_trait]
impl CatalogReader for SeaOrmCatalog {
    async fn lookup(
        &self,
        txn: &DatabaseTransaction,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, ServiceError> {
        let Some(product) = Product::find_by_id(sku.to_string()).one(txn).await? else {
            return Ok(None);
        };

        let image = ProductImage::find()
            .filter(product_image::Column::ProductSku.eq(sku))
            .order_by_asc(product_image::Column::Position)
            .order_by_asc(product_image::Column::Id)
            .one(txn)
            .await?
            .map(|img| img.image);

        Ok(Some(CatalogEntry {
            sellable: product.status.is_sellable(),
            sku: product.sku,
            title: product.title,
            unit_price: product.regular_price,
            image,
            stock: product.stock,
        }))
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("regular_price");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(custom = "validate_price")]
    pub regular_price: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
    pub image: Option<String>,
}

fn default_status() -> ProductStatus {
    ProductStatus::Published
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(custom = "validate_price")]
    pub regular_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub status: Option<ProductStatus>,
    pub image: Option<String>,
}

/// Administrative catalog writes.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a product with a sequencer-issued SKU.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, input: NewProduct) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let sku = IdSequencer::next(&txn, SequenceKind::Product).await?;
        let now = Utc::now();

        let product = product::ActiveModel {
            sku: Set(sku.clone()),
            title: Set(input.title),
            regular_price: Set(input.regular_price),
            stock: Set(input.stock),
            status: Set(input.status),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        if let Some(image) = input.image {
            product_image::ActiveModel {
                product_sku: Set(sku.clone()),
                image: Set(image),
                position: Set(0),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        info!(%sku, "product created");
        Ok(product)
    }

    /// Updates catalog fields of `sku`. Orders keep their own snapshots.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        sku: &str,
        input: ProductUpdate,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let existing = Product::find_by_id(sku.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", sku)))?;

        let mut product: product::ActiveModel = existing.into();
        if let Some(title) = input.title {
            product.title = Set(title);
        }
        if let Some(price) = input.regular_price {
            product.regular_price = Set(price);
        }
        if let Some(stock) = input.stock {
            product.stock = Set(stock);
        }
        if let Some(status) = input.status {
            product.status = Set(status);
        }
        product.updated_at = Set(Utc::now());
        let updated = product.update(&txn).await?;

        if let Some(image) = input.image {
            let primary = ProductImage::find()
                .filter(product_image::Column::ProductSku.eq(sku))
                .order_by_asc(product_image::Column::Position)
                .order_by_asc(product_image::Column::Id)
                .one(&txn)
                .await?;
            match primary {
                Some(current) => {
                    let mut current: product_image::ActiveModel = current.into();
                    current.image = Set(image);
                    current.update(&txn).await?;
                }
                None => {
                    product_image::ActiveModel {
                        product_sku: Set(sku.to_string()),
                        image: Set(image),
                        position: Set(0),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                }
            }
        }

        txn.commit().await?;
        info!(%sku, "product updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_price_is_rejected() {
        let input = NewProduct {
            title: "Kopi".into(),
            regular_price: dec!(-1.00),
            stock: 1,
            status: ProductStatus::Published,
            image: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(ProductUpdate::default().validate().is_ok());
    }

    #[test]
    fn negative_stock_update_is_rejected() {
        let update = ProductUpdate {
            stock: Some(-3),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
