/*!
 * # Session authentication
 *
 * Users log in with email and password (argon2 PHC hashes). A successful
 * login creates a server-side session identified by a random alphanumeric
 * token; only the sha-256 of that token is persisted. Requests present the
 * token either in the session cookie or as `Authorization: Bearer <token>`.
 *
 * [`SessionUser`] is the axum extractor every business route takes. It
 * rejects missing, unknown and expired sessions with 401 and exposes the
 * caller's store and role gates.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        session,
        user::{self, Role},
    },
    errors::ServiceError,
    AppState,
};

pub const SESSION_TOKEN_LEN: usize = 32;
const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    if password.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::InternalError(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hex sha-256 of a session token, the form stored in `sessions.token_hash`.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Pulls the session token out of the cookie header, falling back to a
/// bearer token.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub store_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&user::Model> for UserProfile {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            store_id: user.store_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Input for provisioning a user from the admin CLI
#[derive(Debug, Clone)]
pub struct NewUser {
    pub store_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: user::Model,
    pub session_id: Uuid,
}

impl SessionUser {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Store every business query is scoped to.
    pub fn store_id(&self) -> Result<Uuid, ServiceError> {
        self.user.store_id.ok_or_else(|| {
            ServiceError::BadRequest("no store associated with session".to_string())
        })
    }

    pub fn require_manager(&self) -> Result<(), ServiceError> {
        if self.user.role.can_manage() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {} may not perform this action",
                self.user.role.as_str()
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, &state.config.session_cookie_name)
            .ok_or_else(|| ServiceError::Unauthorized("authentication required".to_string()))?;
        state.services.auth.authenticate(&token).await
    }
}

/// Login, logout and session resolution
#[derive(Clone)]
pub struct AuthService {
    db_pool: Arc<DbPool>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(db_pool: Arc<DbPool>, session_ttl_secs: u64) -> Self {
        let secs = i64::try_from(session_ttl_secs).unwrap_or(i64::MAX / 1_000);
        Self {
            db_pool,
            session_ttl: Duration::seconds(secs),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_ascii_lowercase();

        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?;
        let user = match user {
            Some(user) if user.active && verify_password(&request.password, &user.password_hash) => {
                user
            }
            _ => {
                counter!("pos_auth.login", 1, "outcome" => "rejected");
                warn!("Login rejected");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            token_hash: Set(token_digest(&token)),
            created_at: Set(now),
            expires_at: Set(expires_at),
            last_seen_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        counter!("pos_auth.login", 1, "outcome" => "accepted");
        info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            token,
            expires_at,
            user: UserProfile::from(&user),
        })
    }

    /// Deletes the session behind `token`; unknown tokens are ignored.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), ServiceError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::TokenHash.eq(token_digest(token)))
            .exec(&*self.db_pool)
            .await?;
        debug!(removed = result.rows_affected, "Session closed");
        Ok(())
    }

    /// Resolves a token to its user, deleting the session when it has expired.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<SessionUser, ServiceError> {
        let unauthorized = || ServiceError::Unauthorized("invalid or expired session".to_string());

        let found = session::Entity::find()
            .filter(session::Column::TokenHash.eq(token_digest(token)))
            .find_also_related(user::Entity)
            .one(&*self.db_pool)
            .await?;
        let (session, user) = match found {
            Some((session, Some(user))) => (session, user),
            _ => return Err(unauthorized()),
        };

        let now = Utc::now();
        if session.expires_at <= now {
            session::Entity::delete_by_id(session.id)
                .exec(&*self.db_pool)
                .await?;
            debug!(session_id = %session.id, "Expired session removed");
            return Err(unauthorized());
        }
        if !user.active {
            return Err(unauthorized());
        }

        session::Entity::update_many()
            .col_expr(session::Column::LastSeenAt, Expr::value(now))
            .filter(session::Column::Id.eq(session.id))
            .exec(&*self.db_pool)
            .await?;

        Ok(SessionUser {
            user,
            session_id: session.id,
        })
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model, ServiceError> {
        let email = new_user.email.trim().to_ascii_lowercase();
        if !validator::validate_email(&email) {
            return Err(ServiceError::InvalidInput(format!("invalid email: {}", email)));
        }
        if new_user.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("name must not be empty".to_string()));
        }

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db_pool)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!("user {} already exists", email)));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(new_user.store_id),
            email: Set(email),
            name: Set(new_user.name.trim().to_string()),
            password_hash: Set(hash_password(&new_user.password)?),
            role: Set(new_user.role),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(user_id = %created.id, role = created.role.as_str(), "User created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), SESSION_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
        assert_eq!(token_digest(&a).len(), 64);
    }

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; pos_session=abc123"),
        );
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers, "pos_session").as_deref(), Some("abc123"));

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers, "pos_session").as_deref(), Some("xyz"));

        headers.remove(header::AUTHORIZATION);
        assert_eq!(extract_token(&headers, "pos_session"), None);
    }
}
