//! Row formatting into chunk-local staging files and the ordered merge.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;

use crate::core::FwError;
use crate::io::codec::{NEWLINE, PAD, pad_into};
use crate::io::compress::compress_row;
use crate::io::reader::{DelimitedReader, split_fields};

/// Output of one formatting task: row bytes staged on disk, lengths in memory.
#[derive(Debug)]
pub(crate) struct ChunkArtifact {
    pub path: PathBuf,
    pub lengths: Vec<usize>,
    pub max_length: usize,
}

pub(crate) struct RowFormat<'a> {
    pub widths: &'a [usize],
    pub compression: Option<i32>,
    pub batch_size: usize,
}

/// Encode one row: every value padded to its column width, then either
/// compressed or newline-terminated.
pub(crate) fn encode_row(
    fields: &[&[u8]],
    widths: &[usize],
    compression: Option<i32>,
) -> Result<Vec<u8>, FwError> {
    let mut row = Vec::with_capacity(widths.iter().sum::<usize>() + 1);
    for (value, width) in fields.iter().zip(widths) {
        pad_into(&mut row, value, *width)?;
    }
    match compression {
        Some(level) => compress_row(&row, level),
        None => {
            row.push(NEWLINE);
            Ok(row)
        }
    }
}

pub(crate) fn format_chunk(
    input: &Path,
    rows: Range<usize>,
    format: &RowFormat<'_>,
    staging: &Path,
) -> Result<ChunkArtifact, FwError> {
    let path = staging.join(format!("{:08}.chunk", rows.start));
    let file = File::create(&path)
        .map_err(|e| FwError::IoError(format!("creating {}: {}", path.display(), e)))?;
    let mut out = BufWriter::new(file);

    let mut reader = DelimitedReader::open(input)?;
    if !reader.skip(1 + rows.start)? {
        return Err(FwError::InvariantViolation(format!(
            "input ended before row {}",
            rows.start
        )));
    }

    let num_columns = format.widths.len();
    let batch_size = format.batch_size.max(1);
    let mut lengths = Vec::with_capacity(rows.len());
    let mut batch = Vec::new();
    let mut max_length = 0;
    for row in rows.clone() {
        let line = reader.next_line()?.ok_or_else(|| {
            FwError::InvariantViolation(format!("input ended before row {row}"))
        })?;
        let fields = split_fields(line, num_columns, row)?;
        let encoded = encode_row(&fields, format.widths, format.compression)?;
        max_length = max_length.max(encoded.len());
        lengths.push(encoded.len());
        batch.extend_from_slice(&encoded);
        if lengths.len() % batch_size == 0 {
            out.write_all(&batch)?;
            batch.clear();
        }
    }
    out.write_all(&batch)?;
    out.flush()?;

    debug!(
        "formatted rows {}..{} into {} (max row {} bytes)",
        rows.start,
        rows.end,
        path.display(),
        max_length
    );
    Ok(ChunkArtifact {
        path,
        lengths,
        max_length,
    })
}

/// Concatenate chunks in order, padding every row to `line_length`.
pub(crate) fn merge_chunks(
    chunks: &[ChunkArtifact],
    line_length: usize,
    output: &Path,
) -> Result<(), FwError> {
    let file = File::create(output)
        .map_err(|e| FwError::IoError(format!("creating {}: {}", output.display(), e)))?;
    let mut out = BufWriter::new(file);
    let mut buf = Vec::with_capacity(line_length);

    for chunk in chunks {
        let mut reader = BufReader::new(File::open(&chunk.path)?);
        for length in &chunk.lengths {
            buf.clear();
            buf.resize(*length, 0);
            reader.read_exact(&mut buf)?;
            buf.resize(line_length, PAD);
            out.write_all(&buf)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::compress::decompress_row;

    #[test]
    fn test_encode_row_uncompressed() {
        let row = encode_row(&[&b"1"[..], &b"ab"[..]], &[2, 3], None).unwrap();
        assert_eq!(row, b"1 ab \n");
    }

    #[test]
    fn test_encode_row_compressed_has_no_newline() {
        let row = encode_row(&[&b"1"[..], &b"ab"[..]], &[2, 3], Some(1)).unwrap();
        assert_eq!(decompress_row(&row, 5).unwrap(), b"1 ab ");
    }

    #[test]
    fn test_encode_row_too_wide() {
        assert!(encode_row(&[&b"123"[..]], &[2], None).is_err());
    }
}
