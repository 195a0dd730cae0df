use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the importer.
/// Every module returns `Result<T, VaultError>`.
#[derive(Debug, Error)]
pub enum VaultError {
    // ── Session ─────────────────────────────────────────
    #[error("Authentication failed: {0}")]
    Auth(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request to {url} failed: HTTP {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Download failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    // ── Metadata ────────────────────────────────────────
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("No download variant for language {language:?}")]
    VariantNotFound { language: String },

    #[error("Platform {platform:?} not offered for language {language:?}")]
    PlatformNotFound { language: String, platform: String },

    // ── Storage ─────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Settings error in {path:?}: {reason}")]
    Settings { path: PathBuf, reason: String },
}

/// Convenience alias used throughout the crate.
pub type VaultResult<T> = Result<T, VaultError>;

/// Coarse classification used when reporting per-title failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Transport,
    MalformedMetadata,
    VariantNotFound,
    PlatformNotFound,
    FetchFailed,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::MalformedMetadata => write!(f, "malformed-metadata"),
            ErrorKind::VariantNotFound => write!(f, "variant-not-found"),
            ErrorKind::PlatformNotFound => write!(f, "platform-not-found"),
            ErrorKind::FetchFailed => write!(f, "fetch-failed"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Auth(_) => ErrorKind::Auth,
            VaultError::Transport(e) if e.is_timeout() => ErrorKind::FetchFailed,
            VaultError::Transport(_) | VaultError::BadStatus { .. } => ErrorKind::Transport,
            VaultError::FetchFailed { .. } => ErrorKind::FetchFailed,
            VaultError::MalformedMetadata(_) => ErrorKind::MalformedMetadata,
            VaultError::VariantNotFound { .. } => ErrorKind::VariantNotFound,
            VaultError::PlatformNotFound { .. } => ErrorKind::PlatformNotFound,
            VaultError::Io { .. } | VaultError::Zip(_) | VaultError::Settings { .. } => {
                ErrorKind::Storage
            }
        }
    }

    /// Wrap an IO failure together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VaultError::Io {
            path: path.into(),
            source,
        }
    }

    /// Any transport failure while retrieving an installer file.
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        VaultError::FetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for VaultError {
    fn from(source: std::io::Error) -> Self {
        VaultError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::MalformedMetadata(err.to_string())
    }
}
