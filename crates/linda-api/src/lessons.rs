use axum::{
    Extension, Json,
    extract::{Query, State},
};

use linda_types::api::{LessonQuery, MarkCompleteRequest, SuccessResponse};
use linda_types::models::{LearningProgress, Lesson};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, read_or_empty, with_db};

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Lesson>>> {
    let lessons = read_or_empty(&state, |db| db.get_all_lessons()).await?;
    Ok(Json(lessons))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Query(query): Query<LessonQuery>,
) -> ApiResult<Json<Option<Lesson>>> {
    let lesson = read_or_empty(&state, move |db| db.get_lesson_by_id(query.id)).await?;
    Ok(Json(lesson))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<LearningProgress>>> {
    let progress = with_db(&state, move |db| db.get_user_progress(user.id)).await?;
    Ok(Json(progress))
}

pub async fn mark_complete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<MarkCompleteRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    with_db(&state, move |db| db.mark_lesson_complete(user.id, req.lesson_id))
        .await?
        .ok_or(ApiError::NotFound("Lesson"))?;
    Ok(Json(SuccessResponse::ok()))
}
