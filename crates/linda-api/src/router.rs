use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, chat, help_centers, lessons, reports, stories, tips, upload};

/// Base64 inflates uploads by a third, plus JSON framing.
const BODY_LIMIT: usize = upload::MAX_FILE_SIZE / 3 * 4 + 64 * 1024;

fn rpc(procedure: &str) -> String {
    format!("/api/trpc/{}", procedure)
}

/// The full API: every RPC procedure plus `/health`. Transport layers (CORS, tracing) are added
/// by the server binary.
pub fn app(state: AppState) -> Router {
    let public = Router::new()
        .route(&rpc("auth.register"), post(auth::register))
        .route(&rpc("auth.login"), post(auth::login))
        .route(&rpc("auth.me"), get(auth::me))
        .route(&rpc("auth.logout"), post(auth::logout))
        .route(&rpc("lessons.getAll"), get(lessons::get_all))
        .route(&rpc("lessons.getById"), get(lessons::get_by_id))
        .route(&rpc("tips.getAll"), get(tips::get_all))
        .route(&rpc("stories.getAll"), get(stories::get_all))
        .route(&rpc("helpCenters.getAll"), get(help_centers::get_all))
        .route(&rpc("helpCenters.nearest"), get(help_centers::nearest))
        .route("/health", get(health));

    let protected = Router::new()
        .route(&rpc("auth.updateLanguage"), post(auth::update_language))
        .route(&rpc("chat.getHistory"), get(chat::get_history))
        .route(&rpc("chat.sendMessage"), post(chat::send_message))
        .route(&rpc("chat.transcribeAudio"), post(chat::transcribe_audio))
        .route(&rpc("reports.create"), post(reports::create))
        .route(&rpc("reports.getMyReports"), get(reports::get_my_reports))
        .route(&rpc("reports.getAll"), get(reports::get_all))
        .route(&rpc("lessons.getProgress"), get(lessons::get_progress))
        .route(&rpc("lessons.markComplete"), post(lessons::mark_complete))
        .route(&rpc("stories.create"), post(stories::create))
        .route(&rpc("stories.addReaction"), post(stories::add_reaction))
        .route(&rpc("upload.uploadFile"), post(upload::upload_file))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Serves stored uploads under `/files`. Uploads are user-supplied, so they are always sent as
/// attachments and never content-sniffed into HTML.
pub fn uploads(dir: PathBuf) -> Router {
    let files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .service(ServeDir::new(dir));

    Router::new().nest_service("/files", files)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "database": state.db.is_some(),
    }))
}
