use axum::{Json, extract::State};

use linda_types::models::PrivacyTip;

use crate::error::ApiResult;
use crate::state::{AppState, read_or_empty};

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<PrivacyTip>>> {
    let tips = read_or_empty(&state, |db| db.get_all_privacy_tips()).await?;
    Ok(Json(tips))
}
