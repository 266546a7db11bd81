//! Request authentication.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};

use crate::auth;
use crate::error::AppError;

use super::AppState;

/// The authenticated practitioner, extracted from a `Bearer` token.
///
/// All patient and prescription routes take this; the store queries they
/// issue are scoped to this id, so authorization is ownership.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub user_id: i64,
}

impl FromRequest for AuthedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

fn extract(req: &HttpRequest) -> Result<AuthedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or(AppError::Unauthorized)?;

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

    let claims = auth::verify_token(token, &state.jwt_secret).map_err(|_| AppError::Unauthorized)?;
    Ok(AuthedUser {
        user_id: claims.sub,
    })
}
