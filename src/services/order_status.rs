use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use sea_orm::{
	ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
	QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument, warn};

use crate::{
	entities::{
		order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
		order_item::{self, Entity as OrderItemEntity},
		OrderStatus,
	},
	errors::ServiceError,
	events::{Event, EventSender},
	services::attachments::AttachmentWriter,
};

/// Administrative order lifecycle: status changes, listing and deletion.
#[derive(Clone)]
pub struct OrderStatusService {
	db: Arc<DatabaseConnection>,
	attachments: Arc<dyn AttachmentWriter>,
	event_sender: Arc<EventSender>,
}

impl OrderStatusService {
	pub fn new(
		db: Arc<DatabaseConnection>,
		attachments: Arc<dyn AttachmentWriter>,
		event_sender: Arc<EventSender>,
	) -> Self {
		Self {
			db,
			attachments,
			event_sender,
		}
	}

	/// Moves an order along `Pending -> Processed -> Shipped -> Completed`,
	/// with cancellation allowed before shipping.
	#[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
	pub async fn update_status(&self, order_id: &str, new_status: &str) -> Result<OrderModel, ServiceError> {
		let next = OrderStatus::from_str(new_status.trim()).map_err(|_| {
			error!("Invalid order status: {}", new_status);
			ServiceError::InvalidArgument(format!(
				"Invalid status: {}. Valid statuses are: Pending, Processed, Shipped, Completed, Canceled",
				new_status
			))
		})?;

		let txn = self.db.begin().await.map_err(|e| {
			error!("Failed to begin transaction: {}", e);
			ServiceError::DatabaseError(e)
		})?;

		let order = OrderEntity::find_by_id(order_id.to_string())
			.one(&txn)
			.await
			.map_err(|e| {
				error!("Failed to fetch order {}: {}", order_id, e);
				ServiceError::DatabaseError(e)
			})?
			.ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

		let current = order.order_status;
		if !current.can_transition_to(next) {
			warn!("Rejected status transition from {} to {}", current, next);
			return Err(ServiceError::InvalidTransition(format!(
				"Cannot transition order {} from {} to {}",
				order_id, current, next
			)));
		}

		let mut active: OrderActiveModel = order.into();
		active.order_status = Set(next);
		active.updated_at = Set(Utc::now());

		let updated = active.update(&txn).await.map_err(|e| {
			error!("Failed to update order {} status: {}", order_id, e);
			ServiceError::DatabaseError(e)
		})?;

		txn.commit().await.map_err(|e| {
			error!("Failed to commit transaction for order {}: {}", order_id, e);
			ServiceError::DatabaseError(e)
		})?;

		info!("Order {} status updated from {} to {}", order_id, current, next);

		self.event_sender
			.send_or_log(Event::OrderStatusChanged {
				order_id: order_id.to_string(),
				from: current,
				to: next,
			})
			.await;

		Ok(updated)
	}

	/// Admin listing, newest first.
	pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderModel>, ServiceError> {
		let mut query = OrderEntity::find();
		if let Some(status) = status {
			query = query.filter(order::Column::OrderStatus.eq(status));
		}
		Ok(query
			.order_by_desc(order::Column::OrderDateTime)
			.order_by_desc(order::Column::OrderId)
			.all(&*self.db)
			.await?)
	}

	/// Deletes an order in any state together with its items and payment proof.
	#[instrument(skip(self), fields(order_id = %order_id))]
	pub async fn delete_order(&self, order_id: &str) -> Result<(), ServiceError> {
		let txn = self.db.begin().await?;

		let order = OrderEntity::find_by_id(order_id.to_string())
			.one(&txn)
			.await?
			.ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

		OrderItemEntity::delete_many()
			.filter(order_item::Column::OrderId.eq(order_id))
			.exec(&txn)
			.await?;
		OrderEntity::delete_by_id(order_id.to_string())
			.exec(&txn)
			.await?;

		txn.commit().await.map_err(|e| {
			error!("Failed to commit deletion of order {}: {}", order_id, e);
			ServiceError::DatabaseError(e)
		})?;

		if let Some(path) = order.proof_of_payment {
			if let Err(e) = self.attachments.delete(&path).await {
				warn!("Order {} deleted but its payment proof {} was not: {}", order_id, path, e);
			}
		}

		info!("Order {} deleted", order_id);
		self.event_sender
			.send_or_log(Event::OrderDeleted(order_id.to_string()))
			.await;

		Ok(())
	}

	/// Parses an optional status filter from a query string.
	pub fn parse_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, ServiceError> {
		match raw.map(str::trim).filter(|s| !s.is_empty()) {
			None => Ok(None),
			Some(s) => OrderStatus::from_str(s)
				.map(Some)
				.map_err(|_| ServiceError::InvalidArgument(format!("Invalid status filter: {}", s))),
		}
	}
}
