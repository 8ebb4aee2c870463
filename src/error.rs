//! Error types.
//!
//! Two layers:
//!
//! - [`PortalError`] is what the login/scrape pipeline reports. Callers only ever
//!   see `InvalidCredentials` or `Backend`; parse and transport failures are
//!   folded into `Backend`.
//! - [`AppError`] is what the binary reports: a message plus a process exit code.

/// Exit code for configuration and input problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for rejected credentials.
pub const EXIT_CREDENTIALS: u8 = 3;
/// Exit code for portal/backend and runtime failures.
pub const EXIT_BACKEND: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Classified failure of a login/retrieval pipeline.
#[derive(Clone, PartialEq)]
pub enum PortalError {
    /// The identity provider re-rendered its login page: wrong username or password.
    ///
    /// Terminal; retrying with the same secret will not help.
    InvalidCredentials,
    /// Unexpected page shape, non-success status, or transport failure.
    ///
    /// `page` keeps the raw body when one was received.
    Backend { message: String, page: Option<String> },
}

impl PortalError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            page: None,
        }
    }

    pub fn backend_with_page(message: impl Into<String>, page: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            page: Some(page.into()),
        }
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::fmt::Debug for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => f.write_str("InvalidCredentials"),
            Self::Backend { message, page } => f
                .debug_struct("Backend")
                .field("message", message)
                .field("page_len", &page.as_ref().map(|p| p.len()))
                .finish(),
        }
    }
}

impl std::error::Error for PortalError {}

impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        let code = match err {
            PortalError::InvalidCredentials => EXIT_CREDENTIALS,
            PortalError::Backend { .. } => EXIT_BACKEND,
        };
        AppError::new(code, err.to_string())
    }
}
