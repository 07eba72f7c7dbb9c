/// Result alias that carries the custom [`StudyError`] type.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Free-form error surfaced to the user as-is.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// The media engine refused to open or parse a file.
    #[error("failed to load media: {0}")]
    Media(String),
    /// Export was requested while no ratings or markers were recorded.
    #[error("nothing to export: no ratings or markers have been recorded")]
    NothingToExport,
    /// The workbook could not be written, usually because the destination is
    /// locked or unwritable.
    #[error("failed to write workbook: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl StudyError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a media error from any displayable reason.
    pub fn media<T: Into<String>>(reason: T) -> Self {
        Self::Media(reason.into())
    }
}

impl From<&str> for StudyError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for StudyError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
