//! Administrator authentication
//!
//! A single administrator account is configured in `[auth]`. A successful
//! login opens the session that every admin route requires; logout closes it
//! and invalidates its token. Session changes can be observed through
//! `subscribe`.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use tokio::sync::watch;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{AdminClaims, AdminSession},
};

#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    session: Arc<watch::Sender<Option<AdminSession>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            session: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Sign in the administrator and open a session
    pub fn login(&self, email: &str, password: &str) -> AppResult<AdminSession> {
        if !email.trim().eq_ignore_ascii_case(&self.config.admin_email) || !self.verify_password(password)? {
            tracing::warn!(email = %email, "Rejected admin login");
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.jwt_expiration_hours as i64);
        let claims = AdminClaims {
            sub: self.config.admin_email.clone(),
            uid: self.config.admin_uid.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        let session = AdminSession {
            uid: claims.uid,
            email: claims.sub,
            token,
            expires_at,
        };
        self.session.send_replace(Some(session.clone()));
        tracing::info!(uid = %session.uid, "Admin signed in");
        Ok(session)
    }

    pub fn logout(&self) {
        if self.session.send_replace(None).is_some() {
            tracing::info!("Admin signed out");
        }
    }

    pub fn current(&self) -> Option<AdminSession> {
        self.session.borrow().clone()
    }

    /// Receives the current session and every later change
    pub fn subscribe(&self) -> watch::Receiver<Option<AdminSession>> {
        self.session.subscribe()
    }

    /// Validate a bearer token against the open session
    pub fn verify_token(&self, token: &str) -> AppResult<AdminClaims> {
        let claims = AdminClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let open = self
            .session
            .borrow()
            .as_ref()
            .is_some_and(|session| session.token == token);
        if !open {
            return Err(AppError::Authentication("Session closed".to_string()));
        }
        Ok(claims)
    }

    fn verify_password(&self, password: &str) -> AppResult<bool> {
        if self.config.admin_password_hash.is_empty() {
            return Ok(false);
        }
        let parsed_hash = PasswordHash::new(&self.config.admin_password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash a password using Argon2, for `auth.admin_password_hash`
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
