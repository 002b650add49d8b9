//! Value -> posting list index for categorical columns. One line per
//! distinct value, `value<TAB>rows`, in first-appearance order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use memmap2::Mmap;

use crate::core::{ColumnType, FwError, is_missing};
use crate::filter::Predicate;
use crate::io::{ColumnRef, Table};

use super::rle;

pub fn build(table: &Table, column: &ColumnRef, path: &Path) -> Result<usize, FwError> {
    let mut order: Vec<Vec<u8>> = Vec::new();
    let mut postings: AHashMap<Vec<u8>, Vec<usize>> = AHashMap::new();
    for row in 0..table.num_rows() {
        let decoded = table.row(row)?;
        let value = decoded.value(&column.coord)?;
        if is_missing(value) {
            continue;
        }
        match postings.get_mut(value) {
            Some(rows) => rows.push(row),
            None => {
                order.push(value.to_vec());
                postings.insert(value.to_vec(), vec![row]);
            }
        }
    }

    let file = File::create(path)
        .map_err(|e| FwError::IoError(format!("creating {}: {}", path.display(), e)))?;
    let mut out = BufWriter::new(file);
    for value in &order {
        out.write_all(value)?;
        out.write_all(b"\t")?;
        let rows = postings.get(value).map(Vec::as_slice).unwrap_or_default();
        out.write_all(rle::encode(rows).as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(order.len())
}

pub struct CategoricalIndex {
    path: PathBuf,
    mmap: Option<Mmap>,
}

impl CategoricalIndex {
    pub fn open(path: &Path) -> Result<Self, FwError> {
        let file = File::open(path).map_err(|e| FwError::missing(path, e))?;
        let len = file.metadata()?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: index files are written once and only mapped read-only.
            Some(unsafe { Mmap::map(&file) }.map_err(|e| FwError::missing(path, e))?)
        };
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Rows whose value satisfies `predicate`. Each distinct value is tested
    /// once, so any single-value predicate can be served.
    pub fn lookup(&self, predicate: &Predicate, column_type: ColumnType) -> Result<Vec<usize>, FwError> {
        let mut rows = Vec::new();
        let Some(data) = &self.mmap else {
            return Ok(rows);
        };
        for line in data.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            let tab = line.iter().position(|b| *b == b'\t').ok_or_else(|| {
                FwError::InvariantViolation(format!(
                    "malformed line in {}",
                    self.path.display()
                ))
            })?;
            if predicate.matches(&line[..tab], column_type) {
                rle::decode_into(&line[tab + 1..], &mut rows)?;
            }
        }
        rows.sort_unstable();
        Ok(rows)
    }
}
