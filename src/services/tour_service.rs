use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::tours::{TourOptionList, TourOptionQuery},
    entity::{
        tour_options::{Column as OptionCol, Entity as TourOptions},
        tours::Entity as Tours,
    },
    error::{AppError, AppResult},
    models::TourOption,
    response::ApiResponse,
    state::AppState,
};

/// Options of one tour with live `remaining` and `is_disabled`.
pub async fn list_options_for_tour(
    state: &AppState,
    tour_id: Uuid,
    query: TourOptionQuery,
) -> AppResult<ApiResponse<TourOptionList>> {
    Tours::find_by_id(tour_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Tour"))?;

    let items = TourOptions::find()
        .filter(OptionCol::TourId.eq(tour_id))
        .order_by_asc(OptionCol::StartDate)
        .order_by_asc(OptionCol::StartTime)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(TourOption::from)
        .filter(|opt| !query.only_open || !opt.is_disabled)
        .collect();

    Ok(ApiResponse::ok(TourOptionList { items }))
}
