use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::domain::policy::Principal;
use crate::ShopError;
use super::AppState;

/// The principal behind a request: `Authorization: Token <key>` (or `Bearer <key>`),
/// anonymous when the header is absent.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

fn token_from_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => {
                let value = value.to_str().map_err(|_| ShopError::Unauthenticated)?;
                Some(token_from_header(value).ok_or(ShopError::Unauthenticated)?)
            }
        };
        state.shop.authenticate(token).await.map(Caller)
    }
}
