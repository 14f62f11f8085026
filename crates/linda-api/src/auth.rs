use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use axum::{Extension, Json, extract::State, http::HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use linda_db::models::UpsertUser;
use linda_types::api::{
    Claims, LoginRequest, RegisterRequest, SessionResponse, SuccessResponse, UpdateLanguageRequest,
};
use linda_types::models::{Role, User};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{CurrentUser, SESSION_COOKIE, resolve_user};
use crate::state::{AppState, with_db};

const LOGIN_METHOD: &str = "password";
const SESSION_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let username = req.username.trim().to_string();
    let username_len = username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::bad_request("Username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let new_user = UpsertUser {
        role: owner_role(&state, &username),
        open_id: username,
        name: req.name,
        email: req.email,
        login_method: Some(LOGIN_METHOD.to_string()),
        password_hash: Some(password_hash),
        preferred_language: None,
    };
    // The UNIQUE open_id index decides concurrent registrations.
    let user = with_db(&state, move |db| db.create_user(&new_user))
        .await?
        .ok_or_else(|| ApiError::Conflict("Username is already taken".to_string()))?;
    info!("Registered user {} ({})", user.id, user.open_id);

    start_session(&state, jar, user)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let open_id = req.username.trim().to_string();
    let lookup = open_id.clone();
    let row = with_db(&state, move |db| db.get_user_by_open_id(&lookup))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Accounts without a local password can't sign in here.
    let stored = row.password_hash.as_deref().ok_or(ApiError::Unauthorized)?;
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("stored password hash for user {} is invalid: {}", row.id, e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthorized)?;

    let upsert = UpsertUser {
        role: owner_role(&state, &open_id),
        open_id,
        login_method: Some(LOGIN_METHOD.to_string()),
        ..Default::default()
    };
    let user = with_db(&state, move |db| db.upsert_user(&upsert)).await?;

    start_session(&state, jar, user)
}

/// The caller, or `null` for anonymous visitors. Never fails on a missing database.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Option<User>>> {
    match resolve_user(&state, &headers).await {
        Ok(user) => Ok(Json(user)),
        Err(ApiError::DatabaseUnavailable) => Ok(Json(None)),
        Err(e) => Err(e),
    }
}

/// Always emits an expiring cookie, whether or not the request carried one.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    (jar.add(cookie), Json(SuccessResponse::ok()))
}

pub async fn update_language(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateLanguageRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    with_db(&state, move |db| db.update_user_language(user.id, req.language)).await?;
    Ok(Json(SuccessResponse::ok()))
}

fn owner_role(state: &AppState, open_id: &str) -> Option<Role> {
    state.is_owner(open_id.trim()).then_some(Role::Admin)
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> ApiResult<(CookieJar, Json<SessionResponse>)> {
    let token = create_token(&state.jwt_secret, &user)?;
    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Json(SessionResponse { user, token })))
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        open_id: user.open_id.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
