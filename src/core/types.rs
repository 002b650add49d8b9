use std::fmt;

use serde::Serialize;

use crate::core::FwError;

/// Inferred type of a column, stored as a one-character tag in the `.ct` sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Categorical,
    /// Categorical column whose non-missing values are pairwise distinct.
    Identifier,
}

impl ColumnType {
    pub fn tag(&self) -> u8 {
        match self {
            ColumnType::Integer => b'i',
            ColumnType::Float => b'f',
            ColumnType::Categorical => b'c',
            ColumnType::Identifier => b'u',
        }
    }

    pub fn from_tag(tag: &[u8]) -> Result<Self, FwError> {
        match tag {
            b"i" => Ok(ColumnType::Integer),
            b"f" => Ok(ColumnType::Float),
            b"c" => Ok(ColumnType::Categorical),
            b"u" | b"s" => Ok(ColumnType::Identifier),
            other => Err(FwError::InvariantViolation(format!(
                "unknown column type tag {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Categorical => "categorical",
            ColumnType::Identifier => "identifier",
        };
        f.write_str(name)
    }
}

/// Empty strings and the literal `NA` are missing values.
pub fn is_missing(value: &[u8]) -> bool {
    value.is_empty() || value == b"NA"
}

pub fn parse_i64(value: &[u8]) -> Option<i64> {
    std::str::from_utf8(value).ok()?.parse().ok()
}

/// Parses a finite float; `inf` and `NaN` spellings are not numbers here.
pub fn parse_f64(value: &[u8]) -> Option<f64> {
    let parsed: f64 = std::str::from_utf8(value).ok()?.parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for t in [
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Categorical,
            ColumnType::Identifier,
        ] {
            assert_eq!(ColumnType::from_tag(&[t.tag()]).unwrap(), t);
        }
        assert_eq!(ColumnType::from_tag(b"s").unwrap(), ColumnType::Identifier);
        assert!(ColumnType::from_tag(b"x").is_err());
    }

    #[test]
    fn test_missing_values() {
        assert!(is_missing(b""));
        assert!(is_missing(b"NA"));
        assert!(!is_missing(b"na"));
        assert!(!is_missing(b"0"));
    }

    #[test]
    fn test_parse_f64_rejects_non_finite() {
        assert_eq!(parse_f64(b"2.5"), Some(2.5));
        assert_eq!(parse_f64(b"1e3"), Some(1000.0));
        assert_eq!(parse_f64(b"inf"), None);
        assert_eq!(parse_f64(b"NaN"), None);
        assert_eq!(parse_f64(b"abc"), None);
    }
}
