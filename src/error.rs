//! Error taxonomy shared by the session store, the API gateway and the actions

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Input rejected locally, before any request was issued
    #[error("{0}")]
    Validation(String),

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Access denied. Please login again.")]
    AccessDenied,

    #[error("Server error. Please try again later.")]
    ServerError { status: u16 },

    #[error("Request failed with status {0}")]
    RequestFailed(u16),

    #[error("Network error. Check your connection.")]
    Network { detail: String },

    /// The envelope came back with `success: false`
    #[error("{0}")]
    Api(String),

    #[error("Empty response from server")]
    EmptyResponse,

    #[error("Invalid token format")]
    TokenMalformed,

    #[error("You are offline. Cannot {0}.")]
    Offline(String),

    /// Catalogue loaded fine but the server has no channels
    #[error("No channels available. Please try again.")]
    NoChannels,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Where the app goes after a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Stay put and tell the user
    Notify,
    /// Session is gone: back to the login screen
    Login,
    /// Drop all state and start over
    Reset,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// 401/403: the session is already cleared, the user must log in again.
    pub fn ends_session(&self) -> bool {
        matches!(self, ApiError::SessionExpired | ApiError::AccessDenied)
    }

    /// 403 resets the whole app instead of only returning to the login screen.
    pub fn requires_reset(&self) -> bool {
        matches!(self, ApiError::AccessDenied)
    }

    pub fn recovery(&self) -> Recovery {
        if self.requires_reset() {
            Recovery::Reset
        } else if self.ends_session() {
            Recovery::Login
        } else {
            Recovery::Notify
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_user_facing_text() {
        assert_eq!(ApiError::SessionExpired.to_string(), "Session expired. Please login again.");
        assert_eq!(ApiError::RequestFailed(404).to_string(), "Request failed with status 404");
        assert_eq!(
            ApiError::Offline("add favorite".to_string()).to_string(),
            "You are offline. Cannot add favorite."
        );
        assert_eq!(
            ApiError::Network { detail: "dns".to_string() }.to_string(),
            "Network error. Check your connection."
        );
    }

    #[test]
    fn test_session_ending_errors() {
        assert!(ApiError::SessionExpired.ends_session());
        assert!(ApiError::AccessDenied.ends_session());
        assert!(ApiError::AccessDenied.requires_reset());
        assert!(!ApiError::SessionExpired.requires_reset());
        assert!(!ApiError::ServerError { status: 500 }.ends_session());
        assert!(!ApiError::EmptyResponse.ends_session());
    }

    #[test]
    fn test_recovery() {
        assert_eq!(ApiError::SessionExpired.recovery(), Recovery::Login);
        assert_eq!(ApiError::AccessDenied.recovery(), Recovery::Reset);
        assert_eq!(ApiError::ServerError { status: 502 }.recovery(), Recovery::Notify);
        assert_eq!(ApiError::Offline("play channel".to_string()).recovery(), Recovery::Notify);
        assert_eq!(ApiError::NoChannels.recovery(), Recovery::Notify);
    }
}
