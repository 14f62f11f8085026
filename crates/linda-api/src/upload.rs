use axum::{Extension, Json, extract::State};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{error, info};
use uuid::Uuid;

use linda_types::api::{UploadFileRequest, UploadFileResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
const MAX_FILE_NAME_CHARS: usize = 128;

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Storage key for an upload. The random part comes first so the extension survives.
pub fn object_key(user_id: i64, file_name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-uploads/{}-{}", user_id, &suffix[..8], sanitize_file_name(file_name))
}

/// Decode a base64 payload, tolerating a `data:<mime>;base64,` prefix.
fn decode_payload(data: &str) -> ApiResult<Vec<u8>> {
    let raw = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let raw = raw.trim();

    // Cheap upper bound before allocating.
    if raw.len() / 4 * 3 > MAX_FILE_SIZE + 3 {
        return Err(ApiError::PayloadTooLarge {
            limit_mb: MAX_FILE_SIZE / (1024 * 1024),
        });
    }

    let bytes = STANDARD
        .decode(raw)
        .map_err(|_| ApiError::bad_request("File data is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("File is empty"));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge {
            limit_mb: MAX_FILE_SIZE / (1024 * 1024),
        });
    }
    Ok(bytes)
}

pub async fn upload_file(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UploadFileRequest>,
) -> ApiResult<Json<UploadFileResponse>> {
    let bytes = decode_payload(&req.file_data)?;
    let size = bytes.len();
    let key = object_key(user.id, &req.file_name);

    let url = state
        .store
        .put(&key, bytes, &req.mime_type)
        .await
        .map_err(|e| {
            error!("Failed to store upload {}: {:#}", key, e);
            ApiError::Upstream("Failed to store file".to_string())
        })?;

    info!("User {} uploaded {} ({} bytes)", user.id, key, size);
    Ok(Json(UploadFileResponse { url }))
}
