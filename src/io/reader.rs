//! Line reader for tab-delimited input, gzip-aware.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::core::FwError;

pub const DELIMITER: u8 = b'\t';
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub struct DelimitedReader {
    inner: Box<dyn BufRead + Send>,
    line: Vec<u8>,
}

impl DelimitedReader {
    /// Open `path`, decompressing transparently when it starts with the gzip magic.
    pub fn open(path: &Path) -> Result<Self, FwError> {
        let mut file = File::open(path).map_err(|e| FwError::missing(path, e))?;
        let mut magic = [0u8; 2];
        let read = file.read(&mut magic)?;
        let file = File::open(path).map_err(|e| FwError::missing(path, e))?;
        let inner: Box<dyn BufRead + Send> = if read == 2 && magic == GZIP_MAGIC {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self {
            inner,
            line: Vec::new(),
        })
    }

    /// Read the header and split it into trimmed column names.
    pub fn header(&mut self) -> Result<Vec<String>, FwError> {
        match self.next_line()? {
            Some(line) if !line.trim_ascii().is_empty() => Ok(line
                .split(|b| *b == DELIMITER)
                .map(|name| String::from_utf8_lossy(name).trim().to_string())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>, FwError> {
        self.line.clear();
        if self.inner.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        Ok(Some(&self.line))
    }

    /// Skip `count` lines. Returns false when input ends first.
    pub fn skip(&mut self, count: usize) -> Result<bool, FwError> {
        for _ in 0..count {
            if self.next_line()?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Split a data line into fields, checking the count against the header.
/// `row` is the zero-based data row number used in the error.
pub fn split_fields(line: &[u8], expected: usize, row: usize) -> Result<Vec<&[u8]>, FwError> {
    let fields: Vec<&[u8]> = line.split(|b| *b == DELIMITER).collect();
    if fields.len() != expected {
        return Err(FwError::RowShape {
            row,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &[u8] = b" ID \tName\r\n1\ta\n2\tb";

    fn read_all(path: &Path) -> (Vec<String>, Vec<Vec<u8>>) {
        let mut reader = DelimitedReader::open(path).unwrap();
        let header = reader.header().unwrap();
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().unwrap() {
            lines.push(line.to_vec());
        }
        (header, lines)
    }

    #[test]
    fn test_plain_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.tsv");
        std::fs::write(&path, SAMPLE).unwrap();
        let (header, lines) = read_all(&path);
        assert_eq!(header, vec!["ID", "Name"]);
        assert_eq!(lines, vec![b"1\ta".to_vec(), b"2\tb".to_vec()]);
    }

    #[test]
    fn test_gzip_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.tsv.gz");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(SAMPLE).unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();
        let (header, lines) = read_all(&path);
        assert_eq!(header, vec!["ID", "Name"]);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_split_fields_shape() {
        assert_eq!(split_fields(b"1\t\tx", 3, 0).unwrap(), vec![&b"1"[..], &b""[..], &b"x"[..]]);
        assert_eq!(
            split_fields(b"1\t2", 3, 4),
            Err(FwError::RowShape {
                row: 4,
                expected: 3,
                found: 2
            })
        );
    }
}
