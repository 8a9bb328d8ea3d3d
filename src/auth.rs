use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// The payload structure expected inside a JSON Web Token issued by the login
/// endpoint. Signed with the server secret and validated on every
/// authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id, used to resolve the current role and
    /// existence from the `users` table.
    pub sub: i32,
    /// Expiration Time (exp): timestamp after which the token is rejected.
    pub exp: usize,
    /// Issued At (iat): timestamp when the token was created.
    pub iat: usize,
}

/// Token lifetime: one day, matching the login session policy.
const TOKEN_LIFETIME_SECS: i64 = 60 * 60 * 24;

/// issue_token
///
/// Signs a bearer token for the given user. Used by the login handler; the
/// role is deliberately not embedded; it is re-read from the store on every
/// request so role changes take effect immediately.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        iat: now as usize,
        exp: (now + TOKEN_LIFETIME_SECS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the actor every policy
/// decision is made against. Produced by the extractor below; handlers take
/// it as an argument to receive a verified id and role.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler and keeping authentication
/// separate from the business logic behind it.
///
/// The flow:
/// 1. Dependency resolution: Repository and AppConfig from the app state.
/// 2. Local bypass: in `Env::Local`, the 'x-user-id' header may name a user
///    directly (the user must still exist so the role is loaded correctly).
/// 3. Token validation: Bearer extraction and JWT decoding.
/// 4. Store lookup: the user's current existence and role.
///
/// Rejection: 401 Unauthorized on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Development bypass, guarded by the environment check.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = id_str.parse::<i32>() {
                        if let Some(user) = repo.get_user(user_id).await {
                            return Ok(AuthUser {
                                id: user.id,
                                role: user.role,
                            });
                        }
                    }
                }
            }
        }
        // In Production, or when the bypass did not resolve, fall through to
        // the standard JWT validation flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                return match e.kind() {
                    // The most common failure for a valid-but-old token.
                    ErrorKind::ExpiredSignature => Err(StatusCode::UNAUTHORIZED),
                    // Bad signature, malformed token, etc.
                    _ => Err(StatusCode::UNAUTHORIZED),
                };
            }
        };

        // The token may outlive the account; verify the user still exists and
        // pick up their current role.
        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
