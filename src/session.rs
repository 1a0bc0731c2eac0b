//! Persisted session state: token, user id and login time

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::api::ChannelApi;
use crate::error::ApiError;
use crate::models::Session;
use crate::token::{self, TokenStatus};

pub const TOKEN_KEY: &str = "token";
pub const USER_ID_KEY: &str = "userId";
pub const LOGIN_TIME_KEY: &str = "loginTime";

const GUEST_PREFIX: &str = "guest_";
const GUEST_SUFFIX_LEN: usize = 11;
const SHORT_NAME_LEN: usize = 10;

/// String key/value backend the session is persisted in.
pub trait SessionStorage: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// Volatile backend, used by tests and as a fallback when no config dir exists.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON file backend (`session.json` next to the app config).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// What the caller has to do after a logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    Cleared,
    /// Clearing storage failed; the app must reset itself from scratch.
    ReloadRequired,
}

/// Single owner of the persisted session, shared as `Arc<SessionStore>`.
pub struct SessionStore {
    storage: Mutex<Box<dyn SessionStorage>>,
}

impl SessionStore {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self {
            storage: Mutex::new(Box::new(storage)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    pub fn open_default() -> Self {
        Self::new(FileStorage::open(crate::config::session_path()))
    }

    fn with_storage<R>(&self, f: impl FnOnce(&mut dyn SessionStorage) -> R) -> R {
        let mut guard = self.storage.lock().unwrap_or_else(|e| e.into_inner());
        f(guard.as_mut())
    }

    /// Stored token, only if it is structurally valid. A corrupt token is dropped.
    pub fn token(&self) -> Option<String> {
        self.with_storage(|storage| {
            let token = storage.get(TOKEN_KEY)?;
            if token::is_well_formed(&token) {
                return Some(token);
            }
            tracing::warn!("Invalid token format detected, discarding it");
            if let Err(e) = storage.remove(TOKEN_KEY) {
                tracing::warn!("Failed to discard invalid token: {}", e);
            }
            None
        })
    }

    pub fn user_id(&self) -> Option<String> {
        self.with_storage(|storage| storage.get(USER_ID_KEY))
    }

    pub fn login_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.with_storage(|storage| storage.get(LOGIN_TIME_KEY))?;
        DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn session(&self) -> Option<Session> {
        let token = self.token()?;
        let user_id = self.user_id()?;
        let login_time = self
            .with_storage(|storage| storage.get(LOGIN_TIME_KEY))
            .unwrap_or_default();
        Some(Session { token, user_id, login_time })
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some() && self.user_id().is_some()
    }

    /// Token status at the current time, without side effects.
    pub fn status(&self) -> TokenStatus {
        let raw = self.with_storage(|storage| storage.get(TOKEN_KEY));
        token::inspect(raw.as_deref(), Utc::now().timestamp_millis())
    }

    /// True for a missing, malformed or expired token. Logs out when true.
    pub fn is_token_expired(&self) -> bool {
        self.expire_if_invalid().is_some()
    }

    /// Log out when the token is missing, malformed or expired and report how
    /// the logout went. `None` while the token is still valid.
    pub fn expire_if_invalid(&self) -> Option<LogoutOutcome> {
        match self.status() {
            TokenStatus::Valid { .. } => None,
            status => {
                match status {
                    TokenStatus::Expired { exp } => tracing::warn!("Token expired at {}", exp),
                    TokenStatus::Malformed => tracing::error!("Invalid token structure"),
                    _ => tracing::debug!("No token stored"),
                }
                let outcome = self.logout();
                if outcome == LogoutOutcome::ReloadRequired {
                    tracing::error!("Expired session is still stored; a reset is required");
                }
                Some(outcome)
            }
        }
    }

    /// Validate the username, authenticate and persist the new session.
    /// Any failure leaves the store empty.
    pub fn login(&self, api: &ChannelApi, username: &str) -> Result<Session, ApiError> {
        let result = self.try_login(api, username);
        if let Err(ref e) = result {
            tracing::error!("Login error: {}", e);
            if let Err(clear_err) = self.clear() {
                tracing::warn!("Failed to clear session after login error: {}", clear_err);
            }
        }
        result
    }

    fn try_login(&self, api: &ChannelApi, username: &str) -> Result<Session, ApiError> {
        let username = validate_username(username)?;
        let login_id = resolve_login_id(&username);
        tracing::info!("Attempting login for user: {}", login_id);

        let data = api.authenticate(&login_id)?;
        let token = data
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Api("No authentication token received from server".to_string()))?;
        let user_id = data
            .user_id
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Api("No user ID received from server".to_string()))?;

        let session = self.establish(&token, &user_id)?;
        tracing::info!("Login successful for user: {}", session.user_id);
        Ok(session)
    }

    /// Persist a freshly issued session.
    pub fn establish(&self, token: &str, user_id: &str) -> Result<Session, ApiError> {
        let login_time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.with_storage(|storage| -> io::Result<()> {
            storage.set(TOKEN_KEY, token)?;
            storage.set(USER_ID_KEY, user_id)?;
            storage.set(LOGIN_TIME_KEY, &login_time)
        })?;
        Ok(Session {
            token: token.to_string(),
            user_id: user_id.to_string(),
            login_time,
        })
    }

    /// Remove every persisted session field.
    pub fn clear(&self) -> io::Result<()> {
        self.with_storage(|storage| {
            storage.remove(TOKEN_KEY)?;
            storage.remove(USER_ID_KEY)?;
            storage.remove(LOGIN_TIME_KEY)
        })
    }

    pub fn logout(&self) -> LogoutOutcome {
        tracing::info!("Logging out");
        match self.clear() {
            Ok(()) => LogoutOutcome::Cleared,
            Err(e) => {
                tracing::error!("Logout error: {}", e);
                LogoutOutcome::ReloadRequired
            }
        }
    }

    pub fn display_name(&self) -> Option<String> {
        self.user_id().map(|id| display_name_for(&id))
    }

    pub fn short_display_name(&self) -> Option<String> {
        self.display_name().map(|name| shorten_name(&name))
    }
}

/// Trimmed username, or the local validation error.
pub fn validate_username(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }
    if trimmed.chars().count() < 2 {
        return Err(ApiError::validation("Username must be at least 2 characters"));
    }
    Ok(trimmed.to_string())
}

/// `guest` in any case becomes a fresh guest identifier.
pub fn resolve_login_id(username: &str) -> String {
    if username.eq_ignore_ascii_case("guest") {
        generate_guest_id()
    } else {
        username.to_string()
    }
}

/// `guest_<unix millis>_<random lowercase alphanumerics>`
pub fn generate_guest_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(GUEST_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}_{}", GUEST_PREFIX, Utc::now().timestamp_millis(), suffix)
}

pub fn is_guest(user_id: &str) -> bool {
    user_id.starts_with(GUEST_PREFIX)
}

pub fn display_name_for(user_id: &str) -> String {
    if is_guest(user_id) {
        "Guest".to_string()
    } else {
        user_id.to_string()
    }
}

fn shorten_name(name: &str) -> String {
    if name == "Guest" || name.chars().count() <= SHORT_NAME_LEN {
        return name.to_string();
    }
    let head: String = name.chars().take(SHORT_NAME_LEN).collect();
    format!("{}...", head)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
