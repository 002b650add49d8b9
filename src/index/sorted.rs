//! Sorted indexes stored as tables: `(value, row)` for one column, or
//! `(first, second, row)` for a column pair.

use std::cmp::Ordering;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;

use crate::build::TableWriter;
use crate::core::{ColumnType, FwError, WorkerPool, is_missing, parse_f64, parse_i64, split_ranges};
use crate::filter::{Op, Operand, Predicate, Test};
use crate::io::{ColumnRef, Coord, Table};

pub const VALUE_COLUMN: &str = "value";
pub const FIRST_COLUMN: &str = "first";
pub const SECOND_COLUMN: &str = "second";
pub const ROW_COLUMN: &str = "row";

enum Key {
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Key {
    fn parse(value: &[u8], column_type: ColumnType) -> Result<Self, FwError> {
        let key = match column_type {
            ColumnType::Integer => parse_i64(value).map(Key::Int),
            ColumnType::Float => parse_f64(value).map(Key::Float),
            ColumnType::Categorical | ColumnType::Identifier => Some(Key::Bytes(value.to_vec())),
        };
        key.ok_or_else(|| {
            FwError::InvariantViolation(format!(
                "value {:?} does not parse as {column_type}",
                String::from_utf8_lossy(value)
            ))
        })
    }

    fn cmp(&self, other: &Key) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Float(a), Key::Float(b)) => a.total_cmp(b),
            (Key::Bytes(a), Key::Bytes(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Single-column index: every non-missing `(value, row)` pair.
pub fn build(table: &Table, column: &ColumnRef, path: &Path) -> Result<usize, FwError> {
    write_sorted(table, &[column], &[VALUE_COLUMN], path)
}

/// Pair index: `(first, second, row)` for rows where both values are present,
/// ordered by the first value and then the second.
pub fn build_pair(
    table: &Table,
    first: &ColumnRef,
    second: &ColumnRef,
    path: &Path,
) -> Result<usize, FwError> {
    write_sorted(table, &[first, second], &[FIRST_COLUMN, SECOND_COLUMN], path)
}

/// Sort by the typed keys in column order (stable, so ties keep row order)
/// and write the keys plus the row number as a table.
fn write_sorted(
    table: &Table,
    columns: &[&ColumnRef],
    names: &[&str],
    path: &Path,
) -> Result<usize, FwError> {
    let mut entries: Vec<(Vec<Key>, Vec<Vec<u8>>)> = Vec::with_capacity(table.num_rows());
    'rows: for row in 0..table.num_rows() {
        let decoded = table.row(row)?;
        let mut keys = Vec::with_capacity(columns.len());
        let mut fields = Vec::with_capacity(columns.len() + 1);
        for column in columns {
            let value = decoded.value(&column.coord)?;
            if is_missing(value) {
                continue 'rows;
            }
            keys.push(Key::parse(value, column.column_type)?);
            fields.push(value.to_vec());
        }
        fields.push(row.to_string().into_bytes());
        entries.push((keys, fields));
    }
    entries.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let rows: Vec<Vec<Vec<u8>>> = entries.into_iter().map(|(_, fields)| fields).collect();
    let mut column_names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    column_names.push(ROW_COLUMN.to_string());
    let mut types: Vec<ColumnType> = columns.iter().map(|c| c.column_type).collect();
    types.push(ColumnType::Integer);
    TableWriter::new(column_names, types).write(path, &rows)?;
    Ok(rows.len())
}

fn compare_keys(a: &[Key], b: &[Key]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub struct SortedIndex {
    path: PathBuf,
    table: Table,
    /// Coordinates and types of the key columns, in sort order.
    keys: Vec<(Coord, ColumnType)>,
    row: Coord,
}

impl SortedIndex {
    /// Open an index whose key columns have `key_types`; the row number is
    /// the last column.
    pub fn open(path: &Path, key_types: &[ColumnType]) -> Result<Self, FwError> {
        let table = Table::open(path)?;
        if table.num_columns() != key_types.len() + 1 {
            return Err(FwError::InvariantViolation(format!(
                "index {} has {} columns, expected {}",
                path.display(),
                table.num_columns(),
                key_types.len() + 1
            )));
        }
        let all: Vec<usize> = (0..table.num_columns()).collect();
        let mut coords = table.coordinates_for(&all)?;
        let row = coords.pop().ok_or_else(|| {
            FwError::InvariantViolation(format!("index {} has no columns", path.display()))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            table,
            keys: coords.into_iter().zip(key_types.iter().copied()).collect(),
            row,
        })
    }

    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    /// Index positions satisfying `predicate` on the first key, or `None` if
    /// the predicate cannot be answered from sorted values.
    pub fn positions(&self, predicate: &Predicate) -> Result<Option<Vec<Range<usize>>>, FwError> {
        self.positions_in(0, predicate, 0..self.len())
    }

    /// Positions where `first` holds on the first key and `second` on the
    /// second. Inside a run of equal first values the second key is sorted,
    /// so point predicates on the first key let the second one bisect too;
    /// otherwise the second predicate is tested per position.
    pub fn pair_positions(
        &self,
        first: &Predicate,
        second: &Predicate,
    ) -> Result<Option<Vec<Range<usize>>>, FwError> {
        if self.keys.len() != 2 {
            return Ok(None);
        }
        let Some(outer) = self.positions_in(0, first, 0..self.len())? else {
            return Ok(None);
        };
        let point = matches!(
            first.test,
            Test::Compare { op: Op::Eq, .. } | Test::In { negate: false, .. }
        );
        let mut ranges = Vec::new();
        for range in outer {
            if point {
                if let Some(inner) = self.positions_in(1, second, range.clone())? {
                    ranges.extend(inner);
                    continue;
                }
            }
            self.filter_positions(1, second, range, &mut ranges)?;
        }
        Ok(Some(ranges))
    }

    fn positions_in(
        &self,
        key: usize,
        predicate: &Predicate,
        within: Range<usize>,
    ) -> Result<Option<Vec<Range<usize>>>, FwError> {
        let (start, end) = (within.start, within.end);
        let ranges = match &predicate.test {
            Test::Compare { op, operand } => {
                let lower = self.lower_bound(key, operand, &within)?;
                let upper = self.upper_bound(key, operand, &within)?;
                match op {
                    Op::Eq => vec![lower..upper],
                    Op::Ne => vec![start..lower, upper..end],
                    Op::Lt => vec![start..lower],
                    Op::Le => vec![start..upper],
                    Op::Gt => vec![upper..end],
                    Op::Ge => vec![lower..end],
                }
            }
            Test::Range { low, high } => {
                let from = self.lower_bound(key, low, &within)?;
                let to = self.upper_bound(key, high, &within)?;
                vec![from..to.max(from)]
            }
            // Identifier values are stored verbatim, so membership is a set of
            // exact point lookups.
            Test::In {
                values,
                negate: false,
            } if self.keys[key].1 == ColumnType::Identifier => {
                let mut ranges = Vec::with_capacity(values.len());
                for value in values {
                    let operand = Operand::Str(value.clone());
                    ranges.push(
                        self.lower_bound(key, &operand, &within)?
                            ..self.upper_bound(key, &operand, &within)?,
                    );
                }
                ranges
            }
            _ => return Ok(None),
        };
        Ok(Some(ranges.into_iter().filter(|r| !r.is_empty()).collect()))
    }

    /// Append the positions in `within` whose `key` value satisfies
    /// `predicate`, merging neighbours into runs.
    fn filter_positions(
        &self,
        key: usize,
        predicate: &Predicate,
        within: Range<usize>,
        out: &mut Vec<Range<usize>>,
    ) -> Result<(), FwError> {
        let (coord, column_type) = &self.keys[key];
        for pos in within {
            let row = self.table.row(pos)?;
            if !predicate.matches(row.value(coord)?, *column_type) {
                continue;
            }
            match out.last_mut() {
                Some(last) if last.end == pos => last.end += 1,
                _ => out.push(pos..pos + 1),
            }
        }
        Ok(())
    }

    /// Row numbers for the given index positions, ascending. Ranges above
    /// `threshold` positions are split across workers, each with its own handle.
    pub fn rows(
        &self,
        ranges: &[Range<usize>],
        pool: &WorkerPool,
        threshold: usize,
    ) -> Result<Vec<usize>, FwError> {
        let total: usize = ranges.iter().map(|r| r.len()).sum();
        let mut rows = Vec::with_capacity(total);
        for range in ranges {
            if range.len() <= threshold || pool.workers() == 1 {
                self.read_rows(&self.table, range.clone(), &mut rows)?;
                continue;
            }
            let tasks: Vec<_> = split_ranges(range.len(), pool.workers())
                .into_iter()
                .map(|part| {
                    let part = range.start + part.start..range.start + part.end;
                    move || {
                        let handle = Table::open(&self.path)?;
                        let mut out = Vec::with_capacity(part.len());
                        self.read_rows(&handle, part, &mut out)?;
                        Ok(out)
                    }
                })
                .collect();
            debug!(
                "resolving {} index positions in {} tasks",
                range.len(),
                tasks.len()
            );
            for part in pool.run(tasks)? {
                rows.extend(part);
            }
        }
        rows.sort_unstable();
        Ok(rows)
    }

    fn read_rows(&self, handle: &Table, positions: Range<usize>, out: &mut Vec<usize>) -> Result<(), FwError> {
        for pos in positions {
            out.push(handle.row(pos)?.row_number(&self.row)?);
        }
        Ok(())
    }

    fn compare_at(&self, key: usize, pos: usize, operand: &Operand) -> Result<Ordering, FwError> {
        let (coord, column_type) = &self.keys[key];
        let row = self.table.row(pos)?;
        let value = row.value(coord)?;
        operand.compare(value, *column_type).ok_or_else(|| {
            FwError::InvariantViolation(format!(
                "index {} holds incomparable value {:?}",
                self.path.display(),
                String::from_utf8_lossy(value)
            ))
        })
    }

    /// First position in `within` whose value is not less than `operand`.
    fn lower_bound(&self, key: usize, operand: &Operand, within: &Range<usize>) -> Result<usize, FwError> {
        self.split_point(within, |pos| {
            Ok(self.compare_at(key, pos, operand)? == Ordering::Less)
        })
    }

    /// First position in `within` whose value is greater than `operand`.
    fn upper_bound(&self, key: usize, operand: &Operand, within: &Range<usize>) -> Result<usize, FwError> {
        self.split_point(within, |pos| {
            Ok(self.compare_at(key, pos, operand)? != Ordering::Greater)
        })
    }

    /// End of the leading part of `within` for which `before` holds. `before`
    /// must be true on a prefix of the range and false after it.
    fn split_point<F>(&self, within: &Range<usize>, before: F) -> Result<usize, FwError>
    where
        F: Fn(usize) -> Result<bool, FwError>,
    {
        let (start, end) = (within.start, within.end);
        if start == end || !before(start)? {
            return Ok(start);
        }
        if before(end - 1)? {
            return Ok(end);
        }
        // before(lo) holds and before(hi) does not; narrow until adjacent.
        let (mut lo, mut hi) = (start, end - 1);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if before(mid)? {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(hi)
    }
}
