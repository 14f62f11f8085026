use axum::{Extension, Json, extract::State};
use tracing::{error, warn};

use linda_db::models::NewChatMessage;
use linda_types::api::{
    SendMessageRequest, SendMessageResponse, TranscribeAudioRequest, TranscribeAudioResponse,
};
use linda_types::models::{ChatMessage, Language, MessageRole};

use crate::error::{ApiError, ApiResult};
use crate::llm::PromptMessage;
use crate::middleware::CurrentUser;
use crate::state::{AppState, with_db};
use crate::transcribe::TranscriptionError;

const SYSTEM_PROMPT_EN: &str = "You are Linda, a helpful digital safety assistant for women and girls in Kenya. Provide clear, supportive advice on digital safety, online privacy, and cybersecurity. Keep responses concise and actionable. If someone reports abuse or danger, encourage them to use the Report Abuse feature or contact local authorities.";

const SYSTEM_PROMPT_SW: &str = "Wewe ni Linda, msaidizi wa usalama wa kidijitali kwa wanawake na wasichana nchini Kenya. Toa ushauri wazi na wa kusaidia kuhusu usalama wa kidijitali, faragha mtandaoni, na usalama wa mtandao. Weka majibu kuwa mafupi na ya vitendo. Ikiwa mtu anaripoti unyanyasaji au hatari, wahimize kutumia kipengele cha Ripoti Unyanyasaji au kuwasiliana na mamlaka za ndani.";

pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that.";

pub fn system_prompt(language: Language) -> &'static str {
    language.pick(SYSTEM_PROMPT_EN, SYSTEM_PROMPT_SW)
}

pub async fn get_history(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let history = with_db(&state, move |db| db.get_chat_history(user.id)).await?;
    Ok(Json(history))
}

/// Store the user's turn, ask the model, store its answer. The user turn stays stored even if
/// the model call fails.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Message content cannot be empty"));
    }

    let user_id = user.id;
    let language = req.language;

    let content = req.content.clone();
    let audio_url = req.audio_url.clone();
    with_db(&state, move |db| {
        db.add_chat_message(&NewChatMessage {
            user_id,
            role: MessageRole::User,
            content: &content,
            language,
            audio_url: audio_url.as_deref(),
        })
    })
    .await?;

    let prompt = [
        PromptMessage::system(system_prompt(language)),
        PromptMessage::user(req.content),
    ];
    let reply = match state.chat_model.complete(&prompt).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!("LLM returned no text content for user {}", user_id);
            FALLBACK_REPLY.to_string()
        }
        Err(e) => {
            error!("LLM call failed for user {}: {:#}", user_id, e);
            return Err(ApiError::Upstream("Failed to get a response from the assistant".to_string()));
        }
    };

    let stored = reply.clone();
    with_db(&state, move |db| {
        db.add_chat_message(&NewChatMessage {
            user_id,
            role: MessageRole::Assistant,
            content: &stored,
            language,
            audio_url: None,
        })
    })
    .await?;

    Ok(Json(SendMessageResponse { message: reply }))
}

pub async fn transcribe_audio(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<TranscribeAudioRequest>,
) -> ApiResult<Json<TranscribeAudioResponse>> {
    let text = state
        .transcriber
        .transcribe(&req.audio_url, req.language)
        .await
        .map_err(|e| {
            warn!("Transcription failed for user {}: {}", user.id, e);
            match e {
                TranscriptionError::InvalidUrl(_) | TranscriptionError::FileTooLarge { .. } => {
                    ApiError::BadRequest(e.to_string())
                }
                _ => ApiError::Upstream(e.to_string()),
            }
        })?;

    Ok(Json(TranscribeAudioResponse { text }))
}
