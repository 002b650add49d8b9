use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FwError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Compression error: {0}")]
    CompressionError(String),
    #[error("input {0} has no columns")]
    EmptyInput(String),
    #[error("input {0} has no data rows")]
    NoDataRows(String),
    #[error("row {row} has {found} fields, header has {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unsupported delimiter {0:?}, only tab is supported")]
    UnsupportedDelimiter(char),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("{filter} filter cannot be applied to column '{column}' of type {column_type}")]
    TypeMismatch {
        column: String,
        filter: String,
        column_type: String,
    },
    #[error("malformed filter: {0}")]
    MalformedFilter(String),
    #[error("value '{0}' is not numeric")]
    NonNumericValue(String),
    #[error("missing or unreadable file: {0}")]
    MissingFile(String),
    #[error("table invariant violated: {0}")]
    InvariantViolation(String),
}

impl FwError {
    pub(crate) fn missing(path: &Path, err: std::io::Error) -> Self {
        FwError::MissingFile(format!("{}: {}", path.display(), err))
    }
}

impl From<std::io::Error> for FwError {
    fn from(err: std::io::Error) -> Self {
        FwError::IoError(err.to_string())
    }
}

impl From<regex::Error> for FwError {
    fn from(err: regex::Error) -> Self {
        FwError::MalformedFilter(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_shape_message_names_row() {
        let err = FwError::RowShape {
            row: 7,
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "row 7 has 2 fields, header has 3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert_eq!(FwError::from(io), FwError::IoError("disk gone".to_string()));
    }
}
