use axum::{Extension, Json, extract::State};
use tracing::info;

use linda_db::models::NewReport;
use linda_types::api::{CreateReportRequest, SuccessResponse};
use linda_types::models::Report;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, with_db};

const MAX_ABUSE_TYPE_CHARS: usize = 100;
const MAX_COORDINATE_CHARS: usize = 50;

fn validate(req: &CreateReportRequest) -> ApiResult<()> {
    if req.abuse_type.trim().is_empty() {
        return Err(ApiError::bad_request("Abuse type is required"));
    }
    if req.abuse_type.chars().count() > MAX_ABUSE_TYPE_CHARS {
        return Err(ApiError::bad_request("Abuse type is too long"));
    }
    if req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }
    for coord in [&req.latitude, &req.longitude].into_iter().flatten() {
        if coord.chars().count() > MAX_COORDINATE_CHARS {
            return Err(ApiError::bad_request("Coordinate is too long"));
        }
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateReportRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    validate(&req)?;

    // Anonymous reports keep no link back to the reporter.
    let user_id = (!req.is_anonymous).then_some(user.id);
    let id = with_db(&state, move |db| {
        db.create_report(&NewReport {
            user_id,
            abuse_type: req.abuse_type.trim(),
            description: &req.description,
            audio_url: req.audio_url.as_deref(),
            photo_url: req.photo_url.as_deref(),
            latitude: req.latitude.as_deref(),
            longitude: req.longitude.as_deref(),
            is_anonymous: req.is_anonymous,
        })
    })
    .await?;

    info!("Report {} filed (anonymous: {})", id, user_id.is_none());
    Ok(Json(SuccessResponse::ok()))
}

pub async fn get_my_reports(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = with_db(&state, move |db| db.get_user_reports(user.id)).await?;
    Ok(Json(reports))
}

/// Admins see every report; everyone else gets their own.
pub async fn get_all(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = with_db(&state, move |db| {
        if user.is_admin() {
            db.get_all_reports()
        } else {
            db.get_user_reports(user.id)
        }
    })
    .await?;
    Ok(Json(reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(abuse_type: &str, description: &str) -> CreateReportRequest {
        CreateReportRequest {
            abuse_type: abuse_type.to_string(),
            description: description.to_string(),
            audio_url: None,
            photo_url: None,
            latitude: None,
            longitude: None,
            is_anonymous: false,
        }
    }

    #[test]
    fn validation() {
        assert!(validate(&request("cyberstalking", "someone keeps messaging me")).is_ok());
        assert!(validate(&request("  ", "x")).is_err());
        assert!(validate(&request("harassment", "")).is_err());
        assert!(validate(&request(&"a".repeat(101), "x")).is_err());

        let mut long_coord = request("doxxing", "address posted");
        long_coord.latitude = Some("1".repeat(51));
        assert!(validate(&long_coord).is_err());
    }
}
