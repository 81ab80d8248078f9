use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddCartItemRequest, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel,
        },
        tour_options::{Column as OptionCol, Entity as TourOptions, OptionStatus},
        tours::{Column as TourCol, Entity as Tours},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartLine,
    response::ApiResponse,
    state::AppState,
};

pub const TOUR_ITEM: &str = "tour";

/// The user's cart lines in the order they were added.
pub async fn cart_lines(state: &AppState, user_id: Uuid) -> AppResult<Vec<CartModel>> {
    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;
    Ok(lines)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = load_cart_view(state, user.user_id).await?;
    Ok(ApiResponse::ok(cart))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.item_type != TOUR_ITEM {
        return Err(AppError::BadRequest("Unsupported item type".into()));
    }
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }

    let tour = Tours::find_by_id(payload.tour_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Tour"))?;

    let option = TourOptions::find_by_id(payload.option_id)
        .one(&state.orm)
        .await?
        .filter(|opt| opt.tour_id == tour.id)
        .ok_or_else(|| AppError::not_found("Tour option"))?;

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::TourId.eq(tour.id))
        .filter(CartCol::OptionId.eq(option.id))
        .one(&state.orm)
        .await?;
    let wanted = payload
        .quantity
        .checked_add(existing.as_ref().map_or(0, |line| line.quantity))
        .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;

    let remaining = option.remaining();
    if option.status != OptionStatus::Open {
        return Err(AppError::BadRequest("This option is not open for booking".into()));
    }
    if option.is_past_cut_off(Utc::now()) {
        return Err(AppError::BadRequest("This option has passed the cut-off time".into()));
    }
    if remaining <= 0 {
        return Err(AppError::BadRequest("This option is fully booked".into()));
    }
    if wanted > remaining {
        return Err(AppError::BadRequest(format!(
            "Only {remaining} seats left for this option"
        )));
    }

    match existing {
        Some(line) => {
            CartItems::update_many()
                .col_expr(CartCol::Quantity, Expr::col(CartCol::Quantity).add(payload.quantity))
                .filter(CartCol::Id.eq(line.id))
                .exec(&state.orm)
                .await?;
        }
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                item_type: Set(TOUR_ITEM.to_string()),
                tour_id: Set(tour.id),
                option_id: Set(option.id),
                quantity: Set(payload.quantity),
                unit_price: Set(tour.price),
                created_at: Set(Utc::now().fixed_offset()),
            }
            .insert(&state.orm)
            .await?;
        }
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "option_id": option.id, "quantity": payload.quantity }),
    )
    .await;

    let cart = load_cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", cart, None))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }

    let result = CartItems::update_many()
        .col_expr(CartCol::Quantity, Expr::value(payload.quantity))
        .filter(CartCol::Id.eq(item_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Cart item"));
    }

    let cart = load_cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let result = CartItems::delete_many()
        .filter(CartCol::Id.eq(item_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Cart item"));
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": item_id }),
    )
    .await;

    let cart = load_cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", cart, None))
}

async fn load_cart_view(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let lines = cart_lines(state, user_id).await?;

    let tour_ids: Vec<Uuid> = lines.iter().map(|l| l.tour_id).collect();
    let option_ids: Vec<Uuid> = lines.iter().map(|l| l.option_id).collect();

    let tours: HashMap<Uuid, String> = Tours::find()
        .filter(TourCol::Id.is_in(tour_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|t| (t.id, t.title))
        .collect();
    let options: HashMap<_, _> = TourOptions::find()
        .filter(OptionCol::Id.is_in(option_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|o| (o.id, o))
        .collect();

    let items: Vec<CartLine> = lines
        .into_iter()
        .map(|line| {
            let option = options.get(&line.option_id);
            CartLine {
                id: line.id,
                item_type: line.item_type,
                tour_id: line.tour_id,
                tour_title: tours.get(&line.tour_id).cloned(),
                option_id: line.option_id,
                start_date: option.map(|o| o.start_date),
                start_time: option.and_then(|o| o.start_time.clone()),
                option_status: option.map(|o| o.status),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: i64::from(line.quantity) * line.unit_price,
            }
        })
        .collect();
    let total = items.iter().map(|i| i.line_total).sum();

    Ok(CartView {
        user_id,
        items,
        total,
    })
}
