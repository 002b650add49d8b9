//! Conversion of tab-delimited text into a fixed-width table.
//!
//! Runs in three phases: per-column-chunk inference, per-row-chunk
//! formatting into staging files, and an ordered merge that pads every row
//! to the table's line length.

mod format;
mod infer;
mod writer;

use std::path::Path;

use log::info;

use crate::conf::BuildConfig;
use crate::core::{FwError, WorkerPool, split_ranges};
use crate::io::meta::{TableLayout, write_sidecars};
use crate::io::reader::{DELIMITER, DelimitedReader};

use format::{ChunkArtifact, RowFormat, format_chunk, merge_chunks};
use infer::{ColumnStats, infer_chunk};

pub use writer::TableWriter;

pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &BuildConfig,
) -> Result<TableLayout, FwError> {
    let input = input.as_ref();
    let output = output.as_ref();
    if config.delimiter != DELIMITER as char {
        return Err(FwError::UnsupportedDelimiter(config.delimiter));
    }

    let names = DelimitedReader::open(input)?.header()?;
    if names.is_empty() {
        return Err(FwError::EmptyInput(input.display().to_string()));
    }
    let num_columns = names.len();
    let pool = WorkerPool::new(config.workers)?;

    // Phase 1: widths and types, one task per column chunk.
    let chunk_size = config.column_chunk_size.unwrap_or(num_columns).max(1);
    let tasks: Vec<_> = (0..num_columns)
        .step_by(chunk_size)
        .map(|start| {
            let columns = start..(start + chunk_size).min(num_columns);
            move || infer_chunk(input, columns, num_columns)
        })
        .collect();
    let inferred = pool.run(tasks)?;
    let num_rows = inferred.first().map(|c| c.num_rows).unwrap_or(0);
    if num_rows == 0 {
        return Err(FwError::NoDataRows(input.display().to_string()));
    }
    let stats: Vec<ColumnStats> = inferred.into_iter().flat_map(|c| c.columns).collect();
    let widths: Vec<usize> = stats.iter().map(|s| s.width).collect();
    let types = stats.iter().map(|s| s.column_type()).collect();
    info!(
        "inferred {} columns over {} rows of {}",
        num_columns,
        num_rows,
        input.display()
    );

    // Phase 2: format row chunks into staging files.
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".fwtab-staging-")
        .tempdir_in(parent)
        .map_err(|e| FwError::IoError(format!("creating staging dir in {}: {}", parent.display(), e)))?;
    let format = RowFormat {
        widths: &widths,
        compression: config.compression,
        batch_size: config.row_batch_size,
    };
    let tasks: Vec<_> = split_ranges(num_rows, pool.workers())
        .into_iter()
        .map(|rows| {
            let format = &format;
            let staging = staging.path();
            move || format_chunk(input, rows, format, staging)
        })
        .collect();
    let chunks: Vec<ChunkArtifact> = pool.run(tasks)?;

    // Phase 3: ordered merge. Compressed rows vary in length, so every row
    // is padded to the longest one.
    let line_length = match config.compression {
        Some(_) => chunks.iter().map(|c| c.max_length).max().unwrap_or(0),
        None => widths.iter().sum::<usize>() + 1,
    };
    merge_chunks(&chunks, line_length, output)?;

    let layout = TableLayout {
        names,
        types,
        widths,
        num_rows,
        line_length,
        compression: config.compression,
    };
    write_sidecars(output, &layout)?;
    info!(
        "built {}: {} rows, {} columns, line length {}",
        output.display(),
        num_rows,
        num_columns,
        line_length
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnType;
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("input.tsv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_convert_small() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "ID\tFloatA\tOrdinal\n1\t1.1\tLow\n2\t2.2\tHigh\n3\t3.3\tMed\n");
        let output = dir.path().join("out.fw");
        let layout = convert(&input, &output, &BuildConfig::default()).unwrap();

        assert_eq!(layout.num_rows, 3);
        assert_eq!(layout.widths, vec![1, 3, 4]);
        assert_eq!(
            layout.types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Identifier]
        );
        assert_eq!(layout.line_length, 9);
        assert_eq!(
            std::fs::read(&output).unwrap(),
            b"11.1Low \n22.2High\n33.3Med \n"
        );
    }

    #[test]
    fn test_empty_input() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "");
        let err = convert(&input, dir.path().join("o.fw"), &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, FwError::EmptyInput(_)));
    }

    #[test]
    fn test_header_only() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a\tb\n");
        let err = convert(&input, dir.path().join("o.fw"), &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, FwError::NoDataRows(_)));
    }

    #[test]
    fn test_ragged_row() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a\tb\n1\t2\n3\n");
        let err = convert(&input, dir.path().join("o.fw"), &BuildConfig::default()).unwrap_err();
        assert_eq!(
            err,
            FwError::RowShape {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rejects_comma_delimiter() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a,b\n1,2\n");
        let config = BuildConfig {
            delimiter: ',',
            ..BuildConfig::default()
        };
        let err = convert(&input, dir.path().join("o.fw"), &config).unwrap_err();
        assert_eq!(err, FwError::UnsupportedDelimiter(','));
    }

    #[test]
    fn test_staging_removed() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "a\n1\n2\n");
        let config = BuildConfig {
            workers: 2,
            ..BuildConfig::default()
        };
        convert(&input, dir.path().join("o.fw"), &config).unwrap();
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".fwtab-staging-"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
