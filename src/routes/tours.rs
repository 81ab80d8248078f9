use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::tours::{TourOptionList, TourOptionQuery},
    error::AppResult,
    response::ApiResponse,
    services::tour_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{tour_id}/options", get(list_tour_options))
}

#[utoipa::path(
    get,
    path = "/api/tours/{tour_id}/options",
    params(
        ("tour_id" = Uuid, Path, description = "Tour ID"),
        ("only_open" = Option<bool>, Query, description = "Hide options that cannot be booked now")
    ),
    responses(
        (status = 200, description = "Bookable slots with remaining seats", body = ApiResponse<TourOptionList>),
        (status = 404, description = "Tour not found"),
    ),
    tag = "Tours"
)]
pub async fn list_tour_options(
    State(state): State<AppState>,
    Path(tour_id): Path<Uuid>,
    Query(query): Query<TourOptionQuery>,
) -> AppResult<Json<ApiResponse<TourOptionList>>> {
    let resp = tour_service::list_options_for_tour(&state, tour_id, query).await?;
    Ok(Json(resp))
}
