use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    dto::payments::PaymentList,
    entity::payments::{Column as PaymentCol, Entity as Payments},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_my_payments(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PaymentList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Payments::find()
        .filter(PaymentCol::UserId.eq(user.user_id))
        .order_by_desc(PaymentCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();

    Ok(ApiResponse::paged("OK", PaymentList { items }, page, limit, total))
}

pub async fn get_my_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find_by_id(id)
        .filter(PaymentCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;
    Ok(ApiResponse::ok(Payment::from(payment)))
}
