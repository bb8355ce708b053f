use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::config::AuthSettings;
use crate::error::AuthError;

/// Approves sessions against the configured credentials. Nothing can open
/// the store without a `Session` issued here.
pub struct AuthGate {
    settings: AuthSettings,
}

/// An approved login. Only `AuthGate::login` can create one.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    display_name: String,
    cookie_name: String,
    expires_at: DateTime<Utc>,
}

impl AuthGate {
    pub fn new(settings: AuthSettings) -> Self {
        AuthGate { settings }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let key = username.trim().to_lowercase();
        let entry = self
            .settings
            .users
            .get(&key)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;

        let ok = bcrypt::verify(password, &entry.password).map_err(|e| AuthError::BadHash {
            user: key.clone(),
            reason: e.to_string(),
        })?;
        if !ok {
            return Err(AuthError::BadPassword(key));
        }

        info!(user = %key, "session approved");
        Ok(Session {
            username: key,
            display_name: entry.name.clone(),
            cookie_name: self.settings.cookie.name.clone(),
            expires_at: Utc::now() + Duration::days(self.settings.cookie.expiry_days),
        })
    }
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
