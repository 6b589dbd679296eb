use thiserror::Error;

/// Result alias used across the workspace.
pub type PortalResult<T> = Result<T, PortalError>;

/// Failure taxonomy shared by every DocPortal crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("unable to sanitize `{href}`")]
    UnparseableUri { href: String },

    #[error("{message}")]
    ProjectNotFound { message: String },

    #[error("{message}")]
    VersionNotFound { message: String },

    #[error("Whoops! This page doesn't seem to exist...")]
    PageNotFound,

    #[error("frame unavailable: {reason}")]
    FrameUnavailable { reason: String },

    #[error("api request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{code}: {message}")]
    Transport { code: &'static str, message: String },

    #[error("failed to decode response: {message}")]
    Decode { message: String },

    #[error("{code}: {message}")]
    Storage { code: &'static str, message: String },

    #[error("{message}")]
    Empty { message: String },
}

impl PortalError {
    pub fn transport(code: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }

    pub fn storage(code: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
        }
    }

    pub fn unparseable(href: impl Into<String>) -> Self {
        Self::UnparseableUri { href: href.into() }
    }

    pub fn frame_unavailable(reason: impl Into<String>) -> Self {
        Self::FrameUnavailable {
            reason: reason.into(),
        }
    }

    /// Stable dotted identifier, suitable for logs and assertions.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnparseableUri { .. } => "uri.unparseable",
            Self::ProjectNotFound { .. } => "api.project_not_found",
            Self::VersionNotFound { .. } => "api.version_not_found",
            Self::PageNotFound => "frame.page_not_found",
            Self::FrameUnavailable { .. } => "frame.unavailable",
            Self::Api { .. } => "api.request_failed",
            Self::Transport { code, .. } | Self::Storage { code, .. } => code,
            Self::Decode { .. } => "api.decode_failed",
            Self::Empty { .. } => "api.empty",
        }
    }

    /// Text shown in the error view.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProjectNotFound { message }
            | Self::VersionNotFound { message }
            | Self::Empty { message } => message.clone(),
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::PageNotFound => crate::PAGE_NOT_FOUND_MESSAGE.to_owned(),
            _ => "An unknown error occurred.".to_owned(),
        }
    }

    /// Errors that are transient and only logged, never shown.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::FrameUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::PortalError;

    #[test]
    fn upstream_messages_are_shown_verbatim() {
        let error = PortalError::VersionNotFound {
            message: "Version 9.9.9 of project-one not found".to_owned(),
        };
        assert_eq!(error.user_message(), "Version 9.9.9 of project-one not found");
        assert_eq!(error.code(), "api.version_not_found");
    }

    #[test]
    fn page_not_found_uses_fixed_message() {
        let error = PortalError::PageNotFound;
        assert_eq!(
            error.user_message(),
            "Whoops! This page doesn't seem to exist..."
        );
        assert_eq!(error.to_string(), error.user_message());
    }

    #[test]
    fn transport_errors_keep_their_code() {
        let error = PortalError::transport("net.http.unexpected_eof", "eof");
        assert_eq!(error.code(), "net.http.unexpected_eof");
        assert_eq!(error.user_message(), "An unknown error occurred.");
        assert!(PortalError::frame_unavailable("cross-origin").is_silent());
    }
}
