//! Error types for tessera collaborators.
//!
//! Decorators never surface these to the page. They are logged at the
//! boundary and turned into defaults.

use miette::Diagnostic;

/// Main error type for tessera operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum TesseraError {
    /// HTTP request failed or returned a non-success status
    #[error("fetch failed for {url}: {message}")]
    #[diagnostic(code(tessera::fetch))]
    Fetch { url: String, message: String },

    /// URL could not be parsed
    #[error(transparent)]
    #[diagnostic(code(tessera::url))]
    InvalidUrl(#[from] url::ParseError),

    /// JSON (de)serialisation error
    #[error(transparent)]
    #[diagnostic(code(tessera::json))]
    Json(#[from] serde_json::Error),

    /// TOML deserialisation error
    #[error("toml error: {0}")]
    #[diagnostic(code(tessera::toml))]
    Toml(String),

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(tessera::io))]
    Io(#[from] std::io::Error),

    /// Configuration was present but unusable
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(tessera::config), help("check the carousel settings source"))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Player(#[from] PlayerError),
}

/// Failures talking to the third-party video player library.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("player library is not available on the page")]
    #[diagnostic(code(tessera::player::missing))]
    LibraryMissing,

    #[error("embed is missing its {0} attribute")]
    #[diagnostic(code(tessera::player::attribute))]
    MissingAttribute(&'static str),

    #[error("player {id} did not initialise after {attempts} attempts")]
    #[diagnostic(code(tessera::player::init))]
    InitFailed { id: String, attempts: u32 },

    #[error("player call failed: {0}")]
    #[diagnostic(code(tessera::player::call))]
    Call(String),
}

impl TesseraError {
    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for TesseraError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        Self::fetch(url, err)
    }
}

pub type Result<T, E = TesseraError> = std::result::Result<T, E>;
