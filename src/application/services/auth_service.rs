//! Authentication Service
//!
//! Handles login, JWT access tokens, refresh-token rotation and the bootstrap
//! admin account.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::JwtSettings;
use crate::domain::{Session, SessionRepository, User, UserRepository, UserRole, UserStatus};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Authenticate with credentials, opening a new session
    async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError>;

    /// Rotate a refresh token, returning a fresh token pair
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke the session behind a refresh token
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;

    /// Load the user an access token belongs to
    async fn me(&self, user_id: i64) -> Result<User, AuthError>;

    /// Create the admin account if no admin exists yet
    async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError>;
}

/// Authentication tokens
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired refresh token")]
    SessionNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::SessionNotFound => AppError::Unauthorized(err.to_string()),
            AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Repository(e) => e,
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// SHA-256 hex digest of a refresh token, the only form that is stored
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Sign an access token for `user` and mint an opaque refresh token
pub fn issue_tokens(user: &User, settings: &JwtSettings) -> Result<AuthTokens, AuthError> {
    let now = Utc::now();
    let access_expiry = now + Duration::minutes(settings.access_token_expiry_minutes);

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        exp: access_expiry.timestamp(),
        iat: now.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

    // Opaque, carries no user data
    let refresh_token = format!("{}.{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

    Ok(AuthTokens {
        access_token,
        refresh_token,
        expires_in: settings.access_token_expiry_minutes * 60,
        token_type: "Bearer".to_string(),
    })
}

/// AuthService implementation
pub struct AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    id_generator: Arc<SnowflakeGenerator>,
    jwt_settings: JwtSettings,
}

impl<U, S> AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            id_generator,
            jwt_settings,
        }
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.jwt_settings.refresh_token_expiry_days)
    }
}

#[async_trait]
impl<U, S> AuthService for AuthServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            tracing::info!(user_id = user.id, "Login rejected: account inactive");
            return Err(AuthError::AccountInactive);
        }

        let tokens = issue_tokens(&user, &self.jwt_settings)?;
        let session = Session::new(
            user.id,
            hash_refresh_token(&tokens.refresh_token),
            self.refresh_expiry(),
        );
        self.session_repo.create(&session).await?;

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok((user, tokens))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !session.is_active() {
            return Err(AuthError::SessionNotFound);
        }

        let user = self
            .user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active() {
            self.session_repo.revoke(session.id).await?;
            return Err(AuthError::AccountInactive);
        }

        let tokens = issue_tokens(&user, &self.jwt_settings)?;
        self.session_repo
            .rotate(
                session.id,
                &hash_refresh_token(&tokens.refresh_token),
                self.refresh_expiry(),
            )
            .await?;

        Ok(tokens)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        self.session_repo.revoke(session.id).await?;
        tracing::debug!(user_id = session.user_id, "Session revoked");
        Ok(())
    }

    async fn me(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn bootstrap_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        if self.user_repo.admin_exists().await? {
            return Ok(None);
        }

        let now = Utc::now();
        let admin = User {
            id: self.id_generator.generate(),
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password)?,
            role: UserRole::Admin,
            phone: None,
            location: None,
            language: None,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let admin = self.user_repo.create(&admin).await?;

        tracing::info!(user_id = admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockSessionRepository, MockUserRepository};

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: SECRET.into(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn user_with_password(password: &str, status: UserStatus) -> User {
        User {
            id: 42,
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            password_hash: hash_password(password).unwrap(),
            status,
            ..User::default()
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionRepository,
    ) -> AuthServiceImpl<MockUserRepository, MockSessionRepository> {
        AuthServiceImpl::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            jwt(),
        )
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn access_token_carries_role() {
        let user = User {
            id: 7,
            role: UserRole::Admin,
            ..User::default()
        };
        let tokens = issue_tokens(&user, &jwt()).unwrap();
        let claims = decode_access_token(&tokens.access_token, SECRET).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(tokens.expires_in, 900);
        assert!(matches!(
            decode_access_token(&tokens.access_token, "another-secret-another-secret-xx"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported() {
        let settings = JwtSettings {
            access_token_expiry_minutes: -10,
            ..jwt()
        };
        let tokens = issue_tokens(&User::default(), &settings).unwrap();
        assert!(matches!(
            decode_access_token(&tokens.access_token, SECRET),
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn login_opens_session_with_hashed_token() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user_with_password("hunter22", UserStatus::Active))));
        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_create()
            .times(1)
            .withf(|s| s.user_id == 42 && s.refresh_token_hash.len() == 64)
            .returning(|s| Ok(s.clone()));

        let (user, tokens) = service(users, sessions)
            .login("ravi@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_inactive_account() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user_with_password("hunter22", UserStatus::Inactive))));
        let mut sessions = MockSessionRepository::new();
        sessions.expect_create().never();
        let svc = service(users, sessions);

        assert!(matches!(
            svc.login("ravi@example.com", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        let err = svc.login("ravi@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));
        assert!(matches!(AppError::from(err), AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_rotates_session() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|hash| {
            Ok(Some(Session::new(
                42,
                hash.to_string(),
                Utc::now() + Duration::days(1),
            )))
        });
        sessions.expect_rotate().times(1).returning(|_, _, _| Ok(()));
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user_with_password("x", UserStatus::Active))));

        let tokens = service(users, sessions).refresh("old.token").await.unwrap();
        assert_ne!(tokens.refresh_token, "old.token");
    }

    #[tokio::test]
    async fn refresh_with_unknown_token_is_unauthorized() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|_| Ok(None));

        let err = service(MockUserRepository::new(), sessions)
            .refresh("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }

    #[tokio::test]
    async fn bootstrap_admin_only_once() {
        let mut users = MockUserRepository::new();
        let mut exists = false;
        users.expect_admin_exists().times(2).returning(move || {
            let answer = exists;
            exists = true;
            Ok(answer)
        });
        users
            .expect_create()
            .times(1)
            .withf(|u| u.role == UserRole::Admin && u.email == "boss@example.com")
            .returning(|u| Ok(u.clone()));
        let svc = service(users, MockSessionRepository::new());

        let created = svc
            .bootstrap_admin("Boss", " Boss@Example.com ", "supersecret")
            .await
            .unwrap();
        assert!(created.is_some());
        assert!(svc
            .bootstrap_admin("Boss", "boss@example.com", "supersecret")
            .await
            .unwrap()
            .is_none());
    }
}
