use crate::{
    entities::{id_sequence, IdSequence},
    errors::ServiceError,
};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, instrument};

/// Entity kinds that draw human-readable identifiers from `id_sequences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    Order,
    Customer,
    Product,
    Employee,
    Department,
    Category,
}

impl SequenceKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SequenceKind::Order => "ORD",
            SequenceKind::Customer => "CST",
            SequenceKind::Product => "SKU",
            SequenceKind::Employee => "EMP",
            SequenceKind::Department => "DEP",
            SequenceKind::Category => "CAT",
        }
    }

    /// Zero-padded width of the numeric part.
    pub fn width(self) -> usize {
        match self {
            SequenceKind::Order => 5,
            SequenceKind::Department | SequenceKind::Category => 4,
            SequenceKind::Customer | SequenceKind::Product | SequenceKind::Employee => 10,
        }
    }

    /// Primary key of the counter row.
    pub fn key(self) -> &'static str {
        match self {
            SequenceKind::Order => "order",
            SequenceKind::Customer => "customer",
            SequenceKind::Product => "product",
            SequenceKind::Employee => "employee",
            SequenceKind::Department => "department",
            SequenceKind::Category => "category",
        }
    }
}

/// Renders `value` as `<PREFIX><zero-padded value>`. Values wider than the
/// kind's width are rendered in full.
pub fn format(kind: SequenceKind, value: i64) -> String {
    format!(
        "{}{:0width$}",
        kind.prefix(),
        value,
        width = kind.width()
    )
}

/// Issues identifiers from a durable per-kind counter.
pub struct IdSequencer;

impl IdSequencer {
    /// Claims the next value for `kind` and returns it formatted.
    ///
    /// The increment and read-back run in one transaction opened on `conn`, so
    /// this nests as a savepoint when called inside a checkout transaction and
    /// commits on its own when handed the pool. The row lock taken by the
    /// `UPDATE` serializes concurrent callers.
    #[instrument(skip(conn))]
    pub async fn next<C>(conn: &C, kind: SequenceKind) -> Result<String, ServiceError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = conn.begin().await?;

        if bump(&txn, kind).await? == 0 {
            // Counter row missing: create it at zero, tolerating a racing
            // creator, then claim through the same conditional update.
            IdSequence::insert(id_sequence::ActiveModel {
                kind: Set(kind.key().to_string()),
                next_value: Set(0),
            })
            .on_conflict(
                OnConflict::column(id_sequence::Column::Kind)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

            if bump(&txn, kind).await? == 0 {
                return Err(ServiceError::InternalError(format!(
                    "sequence row for {} could not be created",
                    kind.key()
                )));
            }
        }

        let value = IdSequence::find_by_id(kind.key().to_string())
            .one(&txn)
            .await?
            .map(|row| row.next_value)
            .ok_or_else(|| {
                ServiceError::InternalError(format!("sequence row for {} vanished", kind.key()))
            })?;

        txn.commit().await?;

        let id = format(kind, value);
        debug!(%id, "issued identifier");
        Ok(id)
    }
}

async fn bump<C>(conn: &C, kind: SequenceKind) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let result = IdSequence::update_many()
        .col_expr(
            id_sequence::Column::NextValue,
            Expr::col(id_sequence::Column::NextValue).add(1),
        )
        .filter(id_sequence::Column::Kind.eq(kind.key()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
