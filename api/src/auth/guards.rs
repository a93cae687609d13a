use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use common::state::AppState;
use db::models::user::{Model as User, Role};
use sea_orm::DatabaseConnection;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract, validate user from request extensions and insert them back into the request
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Role lookup that denies on database errors (fail-safe).
async fn user_holds_role(db: &DatabaseConnection, user_id: i64, role: Role) -> bool {
    match User::role_of(db, user_id).await {
        Ok(Some(found)) => found == role,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id,
                "DB error while checking role; denying access"
            );
            false
        }
    }
}

/// Guard for teacher-facing routes. Admin token or admin role passes too.
pub async fn require_teacher(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    let db = app_state.db();
    if user_holds_role(db, user.0.sub, Role::Teacher).await
        || user_holds_role(db, user.0.sub, Role::Admin).await
    {
        Ok(next.run(req).await)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Teacher access required")),
        ))
    }
}

/// Guard for the verify endpoint. Marking attendance is a student act:
/// teachers and admins are refused rather than bypassed.
pub async fn require_student(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    let db = app_state.db();
    if user_holds_role(db, user.0.sub, Role::Student).await {
        Ok(next.run(req).await)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only students are allowed to mark attendance",
            )),
        ))
    }
}
