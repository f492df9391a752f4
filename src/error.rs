use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("HTTP transport failed: {0}")]
    Transport(String),
    #[error("Response document could not be parsed: {0}")]
    Parse(String),
    #[error("API returned an error: resultCode={code}, message='{message}'")]
    Api { code: String, message: String },
    #[error("Fatal: {0}")]
    Fatal(String),
    #[error("Spreadsheet write failed: {0}")]
    Write(String),
    #[error("Spreadsheet read failed: {0}")]
    Read(String),
    #[error("Filesystem I/O error: {0}")]
    Io(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid argument provided: {0}")]
    Argument(String),
    #[error("Worker task failed: {0}")]
    Join(String),
    #[error("Collection interrupted by user")]
    Interrupted,
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        let context = if e.is_timeout() {
            "Timeout"
        } else if e.is_connect() {
            "Connection"
        } else if e.is_status() {
            "Status"
        } else {
            "Request"
        };
        AppError::Transport(format!("{} error: {}", context, e))
    }
}
impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Write(e.to_string())
    }
}
impl From<calamine::XlsxError> for AppError {
    fn from(e: calamine::XlsxError) -> Self {
        AppError::Read(e.to_string())
    }
}
impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}
impl From<JoinError> for AppError {
    fn from(e: JoinError) -> Self {
        AppError::Join(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn api_error<C: Into<String>, M: Into<String>>(code: C, message: M) -> AppError {
        AppError::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wraps a failure of the initial count query, which aborts the whole run.
    pub fn fatal(cause: &AppError) -> AppError {
        AppError::Fatal(format!("total count query failed: {}", cause))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, AppError::Interrupted)
    }
}
