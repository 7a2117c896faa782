use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::Role;

/// Request body for signup. The role comes from the route, not the body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub user_id: Uuid,
    pub email: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}
