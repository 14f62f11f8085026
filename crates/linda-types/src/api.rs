use serde::{Deserialize, Serialize};

use crate::models::{HelpCenter, Language, ReactionCounts, User};

// -- JWT Claims --

/// Session token claims. `sub` is the numeric user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub open_id: String,
    pub exp: usize,
}

// -- Common --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLanguageRequest {
    pub language: Language,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub language: Language,
    pub audio_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TranscribeAudioRequest {
    pub audio_url: String,
    pub language: Language,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeAudioResponse {
    pub text: String,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub abuse_type: String,
    pub description: String,
    pub audio_url: Option<String>,
    pub photo_url: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

// -- Lessons --

#[derive(Debug, Deserialize)]
pub struct LessonQuery {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MarkCompleteRequest {
    pub lesson_id: i64,
}

// -- Stories --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateStoryRequest {
    pub content: String,
    pub audio_url: Option<String>,
    pub language: Language,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AddReactionRequest {
    pub story_id: i64,
    pub emoji: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddReactionResponse {
    pub success: bool,
    pub reactions: ReactionCounts,
}

// -- Help centers --

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestHelpCenter {
    pub center: HelpCenter,
    pub distance_km: f64,
}

// -- Upload --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub file_name: String,
    /// Base64-encoded file contents.
    pub file_data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadFileResponse {
    pub url: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
