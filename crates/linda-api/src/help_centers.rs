use axum::{
    Json,
    extract::{Query, State},
};

use linda_types::api::{NearestHelpCenter, NearestQuery};
use linda_types::geo::{self, valid_coordinates};
use linda_types::models::HelpCenter;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, read_or_empty};

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<HelpCenter>>> {
    let centers = read_or_empty(&state, |db| db.get_all_help_centers()).await?;
    Ok(Json(centers))
}

/// Closest center by great-circle distance, or `null` when none has usable coordinates.
pub async fn nearest(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> ApiResult<Json<Option<NearestHelpCenter>>> {
    let origin = (query.latitude, query.longitude);
    if !valid_coordinates(query.latitude, query.longitude) {
        return Err(ApiError::bad_request("Coordinates out of range"));
    }

    let centers: Vec<HelpCenter> = read_or_empty(&state, |db| db.get_all_help_centers()).await?;
    let found = geo::nearest(origin, &centers).map(|(center, distance_km)| NearestHelpCenter {
        center: center.clone(),
        distance_km,
    });

    Ok(Json(found))
}
