use axum::{Extension, Json, extract::State};
use tracing::info;

use linda_db::models::NewStory;
use linda_types::api::{AddReactionRequest, AddReactionResponse, CreateStoryRequest, SuccessResponse};
use linda_types::models::Story;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, read_or_empty, with_db};

/// Long enough for multi-codepoint emoji (ZWJ sequences, skin tones).
const MAX_EMOJI_BYTES: usize = 32;

pub async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Story>>> {
    let stories = read_or_empty(&state, |db| db.get_all_stories()).await?;
    Ok(Json(stories))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateStoryRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Story content cannot be empty"));
    }

    let user_id = (!req.is_anonymous).then_some(user.id);
    let id = with_db(&state, move |db| {
        db.create_story(&NewStory {
            user_id,
            content: &req.content,
            audio_url: req.audio_url.as_deref(),
            language: req.language,
            is_anonymous: req.is_anonymous,
        })
    })
    .await?;

    info!("Story {} shared", id);
    Ok(Json(SuccessResponse::ok()))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(req): Json<AddReactionRequest>,
) -> ApiResult<Json<AddReactionResponse>> {
    let emoji = req.emoji.trim().to_string();
    if emoji.is_empty() || emoji.len() > MAX_EMOJI_BYTES {
        return Err(ApiError::bad_request("Invalid reaction"));
    }

    let reactions = with_db(&state, move |db| db.add_story_reaction(req.story_id, &emoji))
        .await?
        .ok_or(ApiError::NotFound("Story"))?;

    Ok(Json(AddReactionResponse {
        success: true,
        reactions,
    }))
}
