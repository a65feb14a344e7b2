use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::user::Model as User;

use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(serde::Serialize, Default)]
pub struct Empty;

type GuardRejection = (StatusCode, Json<ApiResponse<Empty>>);

/// Verifies the bearer token and stores the `AuthUser` in request extensions for handlers.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), GuardRejection> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|(_, msg)| (StatusCode::UNAUTHORIZED, Json(ApiResponse::error(msg))))?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Any caller with a valid token.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, _user) = extract_and_insert_authuser(req).await?;
    Ok(next.run(req).await)
}

/// Instructors and admins. The caller must have a user record; a token with
/// `admin = true` is then enough, otherwise the stored role decides.
pub async fn allow_staff(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GuardRejection> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    let stored = match User::find_by_id(app_state.db(), user.user_id()).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(error = %e, user_id = user.user_id(), "DB error while checking role; denying access");
            return Err((
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("Staff access required")),
            ));
        }
    };

    match stored {
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Unknown user")),
        )),
        Some(stored) if user.0.admin || stored.role.is_staff() => Ok(next.run(req).await),
        Some(_) => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Staff access required")),
        )),
    }
}
