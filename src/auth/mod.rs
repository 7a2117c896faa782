use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
