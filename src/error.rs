use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrubError {
    #[error("cannot access '{path}': {source}")]
    FileAccess { path: String, source: io::Error },

    #[error("workbook format error: {0}")]
    Format(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ScrubError {
    /// File-level failure carrying the offending path.
    pub fn file_access(path: &Path, source: io::Error) -> Self {
        ScrubError::FileAccess {
            path: path.display().to_string(),
            source,
        }
    }
}

// Archive and XML failures surface while decoding the workbook, so they are
// format errors as far as callers are concerned.
impl From<zip::result::ZipError> for ScrubError {
    fn from(err: zip::result::ZipError) -> Self {
        ScrubError::Format(format!("workbook archive: {err}"))
    }
}

impl From<quick_xml::Error> for ScrubError {
    fn from(err: quick_xml::Error) -> Self {
        ScrubError::Format(format!("workbook xml: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for ScrubError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ScrubError::Format(format!("workbook xml attribute: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ScrubError>;
