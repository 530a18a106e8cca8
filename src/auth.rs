use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::{
    config::{AppConfig, Env},
    identity::Role,
    repository::RepositoryState,
};

/// Claims
///
/// The payload expected inside an incoming JSON Web Token. Tokens are issued by the
/// external identity provider; this service only verifies and decodes them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the numeric id of the user in the `users` table.
    pub sub: i64,
    /// Expiration Time (exp): tokens past this timestamp are treated as absent.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Principal
///
/// A caller whose credentials were verified and whose current role was loaded from the
/// repository. Attached to the request by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

/// RequestContext
///
/// Request-scoped data established before dispatch. `principal` is `None` for anonymous
/// callers and for any credential that failed verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Option<Principal>,
}

/// RequestContext Extractor Implementation
///
/// Resolving the context never rejects: a missing or bad credential yields an anonymous
/// context and the route's access requirement decides what that means.
///
/// The process is:
/// 1. Local Bypass: in `Env::Local`, a numeric `x-user-id` header naming an existing user.
/// 2. Token Validation: `Authorization: Bearer <jwt>`, signature and expiry checked.
/// 3. DB Lookup: the user must still exist and hold a known role.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let principal = resolve_principal(&parts.headers, &repo, &config).await;
        Ok(RequestContext { principal })
    }
}

/// resolve_principal
///
/// Verifies whichever credential the request carries and loads the caller's current role.
pub async fn resolve_principal(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Option<Principal> {
    if config.env == Env::Local {
        if let Some(user_id) = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id| id.trim().parse::<i64>().ok())
        {
            if let Some(principal) = load_principal(repo, user_id).await {
                return Some(principal);
            }
        }
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("bearer token expired"),
                other => tracing::debug!(error = ?other, "bearer token rejected"),
            }
            return None;
        }
    };

    load_principal(repo, claims.sub).await
}

async fn load_principal(repo: &RepositoryState, user_id: i64) -> Option<Principal> {
    let user = match repo.find_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(user_id, "credential names an unknown user");
            return None;
        }
        Err(e) => {
            tracing::error!(user_id, error = %e, "user lookup failed during authentication");
            return None;
        }
    };

    match user.role.parse::<Role>() {
        Ok(role) => Some(Principal { id: user.id, role }),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "user holds an unrecognised role");
            None
        }
    }
}

/// authenticate
///
/// Middleware that resolves the [`RequestContext`] once and stores it in the request
/// extensions, where the dispatcher's identity resolver reads it.
pub async fn authenticate(context: RequestContext, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(context);
    next.run(request).await
}
