use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::{AuthResponse, LoginRequest, SignupRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{Role, User};
use crate::error::AppError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(req: &SignupRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Valid email is required".into()));
    }
    if req.password.len() < 6 {
        return Err(AppError::Validation("Password min length 6".into()));
    }
    Ok(())
}

fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Valid email is required".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    Ok(())
}

/// Signup: validate, reject duplicate emails regardless of role, hash the
/// password, persist, issue a token.
pub async fn signup(
    state: &AppState,
    role: Role,
    mut req: SignupRequest,
) -> Result<AuthResponse, AppError> {
    req.email = req.email.trim().to_lowercase();
    validate_signup(&req)?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "signup duplicate email");
        return Err(AppError::Conflict("User already exists"));
    }

    let hash = hash_password(&req.password)?;
    let user = User::create(
        &state.db,
        req.name.trim(),
        &req.email,
        &hash,
        role,
        req.phone.as_deref(),
    )
    .await?;

    let token = JwtKeys::from_ref(state).sign(user.id, user.role)?;
    info!(user_id = %user.id, email = %user.email, %role, "user signed up");
    Ok(AuthResponse {
        token,
        role: user.role,
        user_id: user.id,
        email: user.email,
    })
}

/// Login: lookup is by email AND role; an unknown account and a wrong
/// password produce the same outcome so callers cannot probe for accounts.
pub async fn login(
    state: &AppState,
    role: Role,
    mut req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    req.email = req.email.trim().to_lowercase();
    validate_login(&req)?;

    let user = User::find_by_email_and_role(&state.db, &req.email, role)
        .await?
        .ok_or_else(|| {
            warn!(email = %req.email, %role, "login unknown account");
            AppError::InvalidCredentials
        })?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %req.email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(state).sign(user.id, user.role)?;
    info!(user_id = %user.id, email = %user.email, %role, "user logged in");
    Ok(AuthResponse {
        token,
        role: user.role,
        user_id: user.id,
        email: user.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email(""));
    }

    fn signup_req(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            phone: None,
        }
    }

    // Validation failures return before any query runs, so the fake state's
    // lazy pool is never exercised.

    #[tokio::test]
    async fn signup_rejects_empty_name() {
        let state = AppState::fake();
        let err = signup(&state, Role::Customer, signup_req("", "a@x.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Name"));
    }

    #[tokio::test]
    async fn signup_rejects_malformed_email() {
        let state = AppState::fake();
        let err = signup(
            &state,
            Role::Customer,
            signup_req("Alice", "not-an-email", "secret1"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("email"));
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let state = AppState::fake();
        let err = signup(&state, Role::Admin, signup_req("Alice", "a@x.com", "12345"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Password"));
    }

    #[tokio::test]
    async fn login_rejects_malformed_email() {
        let state = AppState::fake();
        let err = login(
            &state,
            Role::Customer,
            LoginRequest {
                email: "nope".into(),
                password: "secret1".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("email"));
    }

    #[tokio::test]
    async fn login_rejects_empty_password() {
        let state = AppState::fake();
        let err = login(
            &state,
            Role::Customer,
            LoginRequest {
                email: "a@x.com".into(),
                password: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Password"));
    }

    #[tokio::test]
    async fn signup_normalizes_email_before_validation() {
        // "  NOT-AN-EMAIL  " trims and lowercases to an invalid address, so
        // the validation message must mention email, not name.
        let state = AppState::fake();
        let err = signup(
            &state,
            Role::Customer,
            signup_req("Alice", "  NOT-AN-EMAIL  ", "secret1"),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("email"));
    }
}
