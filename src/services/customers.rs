use crate::{
    entities::{customer, customer_address, Customer, CustomerAddress, CustomerAddressModel, CustomerModel},
    errors::ServiceError,
    services::sequencer::{IdSequencer, SequenceKind},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAddress {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub street: String,
    #[validate(length(max = 100))]
    pub additional: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district_city: String,
    #[validate(length(min = 1, max = 100))]
    pub province: String,
    #[validate(length(min = 1, max = 100))]
    pub post_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Text copy of a shipping address, frozen into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressSnapshot(String);

impl AddressSnapshot {
    pub fn render(address: &CustomerAddressModel) -> Self {
        let mut text = format!("{}: {}", address.title.trim(), address.street.trim());
        if let Some(additional) = address
            .additional
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            text.push_str(", ");
            text.push_str(additional);
        }
        text.push_str(&format!(
            ", {}, {} {}",
            address.district_city.trim(),
            address.province.trim(),
            address.post_code.trim()
        ));
        AddressSnapshot(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AddressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer profiles and their address book.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Registers a customer under a sequencer-issued id.
    ///
    /// # Errors
    ///
    /// * `ServiceError::InvalidArgument` - invalid input or the email is taken
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: NewCustomer) -> Result<CustomerModel, ServiceError> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let txn = self.db.begin().await?;
        let taken = Customer::find()
            .filter(customer::Column::Email.eq(email.as_str()))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(ServiceError::InvalidArgument(format!(
                "Email {} is already registered",
                email
            )));
        }

        let customer_id = IdSequencer::next(&txn, SequenceKind::Customer).await?;
        let now = Utc::now();
        let created = customer::ActiveModel {
            customer_id: Set(customer_id.clone()),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            email: Set(email),
            phone: Set(input.phone),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(%customer_id, "customer registered");
        Ok(created)
    }

    pub async fn get_profile(&self, customer_id: &str) -> Result<CustomerModel, ServiceError> {
        Customer::find_by_id(customer_id.to_string())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    /// Adds an address. The first address, or one flagged `is_default`,
    /// becomes the only default.
    #[instrument(skip(self, input))]
    pub async fn add_address(
        &self,
        customer_id: &str,
        input: NewAddress,
    ) -> Result<CustomerAddressModel, ServiceError> {
        input.validate()?;

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

        let existing = CustomerAddress::find()
            .filter(customer_address::Column::CustomerId.eq(customer_id))
            .count(&txn)
            .await?;
        let is_default = input.is_default || existing == 0;

        if is_default && existing > 0 {
            CustomerAddress::update_many()
                .col_expr(customer_address::Column::IsDefault, Expr::value(false))
                .filter(customer_address::Column::CustomerId.eq(customer_id))
                .exec(&txn)
                .await?;
        }

        let now = Utc::now();
        let address = customer_address::ActiveModel {
            customer_id: Set(customer_id.to_string()),
            title: Set(input.title),
            street: Set(input.street),
            additional: Set(input.additional.filter(|a| !a.trim().is_empty())),
            district_city: Set(input.district_city),
            province: Set(input.province),
            post_code: Set(input.post_code),
            is_default: Set(is_default),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(address_id = address.address_id, is_default, "address added");
        Ok(address)
    }

    /// Default address first, then newest.
    pub async fn list_addresses(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CustomerAddressModel>, ServiceError> {
        Ok(CustomerAddress::find()
            .filter(customer_address::Column::CustomerId.eq(customer_id))
            .order_by_desc(customer_address::Column::IsDefault)
            .order_by_desc(customer_address::Column::CreatedAt)
            .order_by_desc(customer_address::Column::AddressId)
            .all(&*self.db)
            .await?)
    }

    /// Resolves an address only if `customer_id` owns it.
    pub async fn find_owned_address<C>(
        &self,
        conn: &C,
        customer_id: &str,
        address_id: i32,
    ) -> Result<Option<CustomerAddressModel>, ServiceError>
    where
        C: ConnectionTrait,
    {
        Ok(CustomerAddress::find_by_id(address_id)
            .filter(customer_address::Column::CustomerId.eq(customer_id))
            .one(conn)
            .await?)
    }
}
