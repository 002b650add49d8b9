use serde::{Deserialize, Serialize};

/// Options for converting a delimited file into a fixed-width table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default = "BuildConfig::default_delimiter")]
    pub delimiter: char,
    /// zstd level applied to each row independently. `None` stores rows as-is.
    #[serde(default)]
    pub compression: Option<i32>,
    #[serde(default = "BuildConfig::default_workers")]
    pub workers: usize,
    /// Columns per inference task. `None` puts every column in one task.
    #[serde(default)]
    pub column_chunk_size: Option<usize>,
    /// Rows buffered before a chunk task flushes to its staging file.
    #[serde(default = "BuildConfig::default_row_batch_size")]
    pub row_batch_size: usize,
}

impl BuildConfig {
    fn default_delimiter() -> char {
        '\t'
    }

    fn default_workers() -> usize {
        1
    }

    fn default_row_batch_size() -> usize {
        10_000
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            delimiter: Self::default_delimiter(),
            compression: None,
            workers: Self::default_workers(),
            column_chunk_size: None,
            row_batch_size: Self::default_row_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default() {
        let conf = BuildConfig::default();
        assert_eq!(conf.delimiter, '\t');
        assert_eq!(conf.compression, None);
        assert_eq!(conf.workers, 1);
        assert_eq!(conf.row_batch_size, 10_000);
    }
}
