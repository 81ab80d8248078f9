//! Seat ledger for tour options.
//!
//! `reserve` and `release` are single conditional UPDATEs, so the database
//! arbitrates concurrent callers. Any capacity check made before calling them
//! is advisory.

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::{
    entity::tour_options::{Column as OptionCol, Entity as TourOptions, OptionStatus},
    error::{AppError, AppResult},
};

/// Adds `quantity` to `capacity_sold` when the option is open and has room.
///
/// Returns `false` when the option is not open or the seats are gone. Callers
/// treat that as sold out and must not retry.
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    option_id: Uuid,
    quantity: i32,
) -> AppResult<bool> {
    ensure_positive(quantity)?;
    let result = TourOptions::update_many()
        .col_expr(
            OptionCol::CapacitySold,
            Expr::col(OptionCol::CapacitySold).add(quantity),
        )
        .col_expr(OptionCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(OptionCol::Id.eq(option_id))
        .filter(OptionCol::Status.eq(OptionStatus::Open))
        .filter(
            Expr::col(OptionCol::CapacitySold)
                .lte(Expr::col(OptionCol::CapacityTotal).sub(quantity)),
        )
        .exec(conn)
        .await?;

    let reserved = result.rows_affected == 1;
    tracing::debug!(%option_id, quantity, reserved, "seat reservation");
    Ok(reserved)
}

/// Gives `quantity` seats back. Returns `false` if fewer than `quantity` are sold.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    option_id: Uuid,
    quantity: i32,
) -> AppResult<bool> {
    ensure_positive(quantity)?;
    let result = TourOptions::update_many()
        .col_expr(
            OptionCol::CapacitySold,
            Expr::col(OptionCol::CapacitySold).sub(quantity),
        )
        .col_expr(OptionCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(OptionCol::Id.eq(option_id))
        .filter(OptionCol::CapacitySold.gte(quantity))
        .exec(conn)
        .await?;

    let released = result.rows_affected == 1;
    tracing::debug!(%option_id, quantity, released, "seat release");
    Ok(released)
}

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }
    Ok(())
}
