//! Column width and type inference over one contiguous chunk of columns.

use std::ops::Range;
use std::path::Path;

use ahash::AHashSet;

use crate::core::{ColumnType, FwError, is_missing, parse_f64, parse_i64};
use crate::io::codec::trim;
use crate::io::reader::{DelimitedReader, split_fields};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Integer,
    Float,
    Categorical,
}

#[derive(Debug)]
pub(crate) struct ColumnStats {
    pub width: usize,
    kind: Kind,
    /// Distinct non-missing values seen so far; dropped at the first repeat.
    distinct: Option<AHashSet<Vec<u8>>>,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            width: 0,
            kind: Kind::Integer,
            distinct: Some(AHashSet::new()),
        }
    }
}

impl ColumnStats {
    /// Width counts the raw bytes; everything else sees the value as it
    /// reads back, with trailing padding removed.
    pub fn observe(&mut self, value: &[u8]) {
        self.width = self.width.max(value.len());
        let value = trim(value);
        if is_missing(value) {
            return;
        }

        if self.kind == Kind::Integer && parse_i64(value).is_none() {
            self.kind = Kind::Float;
        }
        if self.kind == Kind::Float && parse_f64(value).is_none() {
            self.kind = Kind::Categorical;
        }

        if let Some(distinct) = &mut self.distinct {
            if !distinct.insert(value.to_vec()) {
                self.distinct = None;
            }
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match (self.kind, self.distinct.is_some()) {
            (Kind::Integer, _) => ColumnType::Integer,
            (Kind::Float, _) => ColumnType::Float,
            (Kind::Categorical, true) => ColumnType::Identifier,
            (Kind::Categorical, false) => ColumnType::Categorical,
        }
    }
}

pub(crate) struct ChunkInference {
    pub columns: Vec<ColumnStats>,
    pub num_rows: usize,
}

/// Scan the whole input once, collecting stats for `columns`.
pub(crate) fn infer_chunk(
    input: &Path,
    columns: Range<usize>,
    num_columns: usize,
) -> Result<ChunkInference, FwError> {
    let mut reader = DelimitedReader::open(input)?;
    reader.skip(1)?;

    let mut stats: Vec<ColumnStats> = columns.clone().map(|_| ColumnStats::default()).collect();
    let mut num_rows = 0;
    while let Some(line) = reader.next_line()? {
        let fields = split_fields(line, num_columns, num_rows)?;
        for (stat, value) in stats.iter_mut().zip(&fields[columns.clone()]) {
            stat.observe(value);
        }
        num_rows += 1;
    }

    Ok(ChunkInference {
        columns: stats,
        num_rows,
    })
}
