/*!
 * # Authentication and Authorization Module
 *
 * Session-token authentication backed by the `user_sessions` table.
 *
 * - Passwords are hashed with Argon2.
 * - Login issues an opaque 48 character token; only its SHA-256 digest is stored.
 * - The token is accepted from `Authorization: Bearer <token>` or the `session_token` cookie.
 * - Role checks are router layers (`with_auth`, `with_staff`, `with_roles`).
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{customer, user_account, user_session, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub mod password_policy;
mod types;

pub use password_policy::{PasswordPolicy, PasswordPolicyError};
pub use types::*;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";
/// Length of generated session tokens
pub const SESSION_TOKEN_LENGTH: usize = 48;

/// Authenticated caller, resolved from a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub customer_id: Option<Uuid>,
    pub session_id: Uuid,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// Customer profile of the caller; staff accounts have none
    pub fn require_customer(&self) -> Result<Uuid, ServiceError> {
        self.customer_id
            .ok_or_else(|| ServiceError::Forbidden("a customer profile is required".to_string()))
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<DbErr> for AuthError {
    fn from(err: DbErr) -> Self {
        AuthError::Service(ServiceError::db_error(err))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid session token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Session has expired".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => {
                tracing::error!(error = %msg, "authentication failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            Self::Service(err) => return err.into_response(),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Hashes a password with Argon2 and a random salt
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Verifies a password against a stored Argon2 hash
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Generates a new opaque session token
pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest stored in place of the token
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Reads the session token from the bearer header, falling back to the cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Account, session and customer-profile operations
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    session_ttl: ChronoDuration,
    cookie_secure: bool,
    password_policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        session_ttl_secs: u64,
        cookie_secure: bool,
    ) -> Self {
        Self {
            db,
            event_sender,
            session_ttl: ChronoDuration::seconds(session_ttl_secs as i64),
            cookie_secure,
            password_policy: PasswordPolicy::default(),
        }
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl.num_seconds()
    }

    /// `Set-Cookie` value carrying a fresh session token
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.session_ttl_secs()
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_session_cookie(&self) -> String {
        let mut cookie = format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    fn check_password(&self, password: &str, email: &str) -> Result<(), ServiceError> {
        self.password_policy
            .validate(password, Some(email))
            .map_err(|e| ServiceError::ValidationError(e.to_string()))
    }

    async fn ensure_email_available(&self, email: &str) -> Result<(), ServiceError> {
        let existing = user_account::Entity::find()
            .filter(user_account::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an account with email {} already exists",
                email
            )));
        }
        Ok(())
    }

    async fn create_session<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<(String, user_session::Model), DbErr> {
        let token = generate_session_token();
        let now = Utc::now();
        let session = user_session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(hash_session_token(&token)),
            created_at: Set(now),
            expires_at: Set(now + self.session_ttl),
        }
        .insert(conn)
        .await?;
        Ok((token, session))
    }

    async fn customer_id_for<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, DbErr> {
        Ok(customer::Entity::find()
            .filter(customer::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .map(|c| c.id))
    }

    /// Creates a customer account plus its profile and signs it in
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<SessionResponse, ServiceError> {
        request.validate()?;
        let email = Self::normalize_email(&request.email);
        self.check_password(&request.password, &email)?;
        self.ensure_email_available(&email).await?;

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let account = user_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            role: Set(UserRole::Customer),
            is_active: Set(true),
            last_login_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let profile = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            email: Set(email),
            phone: Set(request.phone),
            address: Set(request.address),
            date_of_birth: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let (token, session) = self
            .create_session(&txn, account.id)
            .await
            .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::UserRegistered {
                user_id: account.id,
                role: UserRole::Customer,
            })
            .await;
        info!(user_id = %account.id, "customer registered");

        Ok(SessionResponse {
            token,
            expires_at: session.expires_at,
            user: AccountResponse::from_model(account, Some(profile.id)),
        })
    }

    /// Verifies credentials and opens a session.
    /// Unknown email, wrong password and disabled accounts are indistinguishable.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<SessionResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Service(e.into()))?;
        let email = Self::normalize_email(&request.email);

        let account = user_account::Entity::find()
            .filter(user_account::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.is_active || !verify_password(&request.password, &account.password_hash) {
            warn!(user_id = %account.id, "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let mut active: user_account::ActiveModel = account.into();
        active.last_login_at = Set(Some(now));
        active.updated_at = Set(now);
        let account = active.update(&*self.db).await?;

        let (token, session) = self.create_session(&*self.db, account.id).await?;
        let customer_id = Self::customer_id_for(&*self.db, account.id).await?;

        self.event_sender
            .send_or_log(Event::UserLoggedIn(account.id))
            .await;

        Ok(SessionResponse {
            token,
            expires_at: session.expires_at,
            user: AccountResponse::from_model(account, customer_id),
        })
    }

    /// Resolves a presented token to the caller; expired sessions are deleted
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let session = user_session::Entity::find()
            .filter(user_session::Column::TokenHash.eq(hash_session_token(token)))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired(Utc::now()) {
            debug!(session_id = %session.id, "removing expired session");
            user_session::Entity::delete_by_id(session.id)
                .exec(&*self.db)
                .await?;
            return Err(AuthError::TokenExpired);
        }

        let account = user_account::Entity::find_by_id(session.user_id)
            .one(&*self.db)
            .await?
            .filter(|account| account.is_active)
            .ok_or(AuthError::InvalidToken)?;

        let customer_id = Self::customer_id_for(&*self.db, account.id).await?;

        Ok(AuthUser {
            user_id: account.id,
            email: account.email,
            role: account.role,
            customer_id,
            session_id: session.id,
        })
    }

    /// Ends the caller's current session
    #[instrument(skip(self))]
    pub async fn logout(&self, session_id: Uuid) -> Result<(), ServiceError> {
        user_session::Entity::delete_by_id(session_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Account of the authenticated caller
    pub async fn account(&self, user: &AuthUser) -> Result<AccountResponse, ServiceError> {
        let account = user_account::Entity::find_by_id(user.user_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound("Account not found".to_string()))?;
        Ok(AccountResponse::from_model(account, user.customer_id))
    }

    /// Creates a pharmacist or admin account
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn create_staff(
        &self,
        request: CreateStaffRequest,
    ) -> Result<AccountResponse, ServiceError> {
        request.validate()?;
        if !request.role.is_staff() {
            return Err(ServiceError::ValidationError(
                "role must be pharmacist or admin".to_string(),
            ));
        }
        let email = Self::normalize_email(&request.email);
        self.check_password(&request.password, &email)?;
        self.ensure_email_available(&email).await?;

        let now = Utc::now();
        let account = user_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(request.role),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::UserRegistered {
                user_id: account.id,
                role: account.role,
            })
            .await;

        Ok(AccountResponse::from_model(account, None))
    }

    /// Deletes every expired session; returns how many were removed
    pub async fn purge_expired_sessions(&self) -> Result<u64, ServiceError> {
        let result = user_session::Entity::delete_many()
            .filter(user_session::Column::ExpiresAt.lte(Utc::now()))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected > 0 {
            info!(count = result.rows_affected, "purged expired sessions");
        }
        Ok(result.rows_affected)
    }
}

fn auth_service_from(request: &Request) -> Result<Arc<AuthService>, AuthError> {
    request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("Authentication service not available".to_string()))
}

/// Authentication middleware: rejects requests without a live session
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match auth_service_from(&request) {
        Ok(service) => service,
        Err(e) => return e.into_response(),
    };

    let token = match extract_session_token(request.headers()) {
        Some(token) => token,
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Resolves the caller when a valid token is presented but never rejects
pub async fn optional_auth_middleware(mut request: Request, next: Next) -> Response {
    if let (Ok(auth_service), Some(token)) = (
        auth_service_from(&request),
        extract_session_token(request.headers()),
    ) {
        if let Ok(user) = auth_service.authenticate(&token).await {
            request.extensions_mut().insert(user);
        }
    }
    next.run(request).await
}

/// Role middleware to check if a user has one of the allowed roles
pub async fn role_middleware(
    State(allowed_roles): State<Vec<UserRole>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !allowed_roles.contains(&user.role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Caller on routes where authentication is optional
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn is_staff(&self) -> bool {
        self.0.as_ref().map_or(false, AuthUser::is_staff)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_optional_auth(self) -> Self;
    fn with_roles(self, roles: &[UserRole]) -> Self;
    fn with_staff(self) -> Self;
    fn with_customer(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_optional_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(optional_auth_middleware))
    }

    fn with_roles(self, roles: &[UserRole]) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            roles.to_vec(),
            role_middleware,
        ))
        .with_auth()
    }

    fn with_staff(self) -> Self {
        self.with_roles(&[UserRole::Pharmacist, UserRole::Admin])
    }

    fn with_customer(self) -> Self {
        self.with_roles(&[UserRole::Customer])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("Tablet-Dose-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Tablet-Dose-42", &hash));
        assert!(!verify_password("tablet-dose-42", &hash));
        assert!(!verify_password("Tablet-Dose-42", "not-a-hash"));
    }

    #[test]
    fn session_tokens_are_alphanumeric_and_digests_are_stable() {
        let token = generate_session_token();
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_session_token());

        let digest = hash_session_token(&token);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_session_token(&token));
    }

    #[test]
    fn token_is_read_from_bearer_header_then_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=cookie-token"),
        );
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("cookie-token")
        );

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("header-token")
        );
    }

    #[test]
    fn require_customer_rejects_staff() {
        let staff = AuthUser {
            user_id: Uuid::new_v4(),
            email: "rx@example.com".into(),
            role: UserRole::Pharmacist,
            customer_id: None,
            session_id: Uuid::new_v4(),
        };
        assert!(staff.is_staff());
        assert!(matches!(
            staff.require_customer(),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
