use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest};
use crate::auth::jwt::AuthUser;
use crate::auth::repo::{Role, User};
use crate::auth::service;
use crate::error::AppError;
use crate::state::AppState;

/// One router per role, so the role is carried by the path rather than by
/// route-registration order or a caller-supplied field.
fn role_routes(role: Role) -> Router<AppState> {
    Router::new()
        .route(
            "/signup",
            post(move |state: State<AppState>, payload: Json<SignupRequest>| {
                signup(state, role, payload)
            }),
        )
        .route(
            "/login",
            post(move |state: State<AppState>, payload: Json<LoginRequest>| {
                login(state, role, payload)
            }),
        )
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .nest("/admin", role_routes(Role::Admin))
        .nest("/customer", role_routes(Role::Customer))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    role: Role,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let resp = service::signup(&state, role, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    role: Role,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let resp = service::login(&state, role, payload).await?;
    Ok(Json(resp))
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    Ok(Json(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn me_response_serialization() {
        let response = PublicUser {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "test@example.com".to_string(),
            role: Role::Admin,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"admin\""));
        assert!(json.contains("id"));
    }
}
