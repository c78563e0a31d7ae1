//! Error types for scanning, plan generation, edit application and PR
//! submission.

use thiserror::Error;

/// Main error type for copilot operations.
#[derive(Error, Debug)]
pub enum CopilotError {
    // Cli args errors
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Retrieval errors
    #[error("Remote repository unreachable: {location}: {reason}")]
    RemoteUnreachable { location: String, reason: String },

    #[error("Reference not found in remote repository: {reference}")]
    RefNotFound { reference: String },

    #[error("Cloning {location} timed out after {seconds}s")]
    CloneTimeout { location: String, seconds: u64 },

    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    // Detection / generation errors
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Classification degraded for {language}: {reason}")]
    ClassificationDegraded { language: String, reason: String },

    #[error("Anchor '{anchor}' not found in {path}")]
    AnchorNotFound { path: String, anchor: String },

    #[error("Invalid instrumentation plan: {0}")]
    InvalidPlan(String),

    #[error("Service '{service}' already has {mode} instrumentation")]
    AlreadySatisfied { service: String, mode: String },

    // Edit application errors
    #[error("Failed to apply edit to {path}: {reason}")]
    ApplyError { path: String, reason: String },

    // Forge errors
    #[error("Forge operation failed: {0}")]
    ForgeError(String),

    #[error("Invalid git remote URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("Git URL parse error: {0}")]
    GitUrlError(#[from] git_url_parse::GitUrlParseError),

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Syntax parser error: {0}")]
    ParserError(#[from] tree_sitter::LanguageError),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using CopilotError
pub type Result<T> = std::result::Result<T, CopilotError>;

impl CopilotError {
    /// Create a forge error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::ForgeError(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid plan error
    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }

    /// Create an apply error for a repo-relative path
    pub fn apply(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ApplyError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a remote unreachable error
    pub fn unreachable(
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RemoteUnreachable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// True for the retrieval class of errors (clone/checkout failures).
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnreachable { .. }
                | Self::RefNotFound { .. }
                | Self::CloneTimeout { .. }
                | Self::GitError(_)
        )
    }
}

// Implement From for std::io::Error - wraps in Other variant for generic I/O errors
impl From<std::io::Error> for CopilotError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

impl From<tokio::task::JoinError> for CopilotError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Other(color_eyre::Report::msg(format!(
            "background task failed: {}",
            err
        )))
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for CopilotError {
    fn from(err: octocrab::Error) -> Self {
        Self::ForgeError(format!("GitHub API error: {}", err))
    }
}
