//! Per-column indexes that answer leaf predicates without a full scan.
//!
//! Integer, float and identifier columns get a sorted `(value, row)` table
//! searched by bisection; categorical columns get a value -> row list file.
//! Both live at `<table>.idx_<column>`. A pair of columns can also get a
//! sorted `(first, second, row)` table at `<table>.idx_<first>____<second>`,
//! which answers an AND of one leaf on each column.

mod categorical;
mod rle;
mod sorted;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use ahash::AHashMap;
use log::{info, warn};

use crate::core::{ColumnType, FwError, WorkerPool};
use crate::filter::Predicate;
use crate::io::meta::{self, sidecar_path};
use crate::io::{ColumnRef, Table};

pub use categorical::CategoricalIndex;
pub use sorted::SortedIndex;

/// Joins the column names of a pair index in its file name.
pub const PAIR_SEPARATOR: &str = "____";

/// Path of the index for `column`, or for a pair named by [`pair_name`].
pub fn index_path(table: &Path, column: &str) -> PathBuf {
    sidecar_path(table, &format!(".idx_{column}"))
}

pub fn pair_name(first: &str, second: &str) -> String {
    format!("{first}{PAIR_SEPARATOR}{second}")
}

/// Build (or rebuild) the index for `column` and return its path.
pub fn build_index(table: &Table, column: &str) -> Result<PathBuf, FwError> {
    let resolved = table
        .resolve(&[column])?
        .pop()
        .ok_or_else(|| FwError::ColumnNotFound(column.to_string()))?;
    let path = index_path(table.path(), column);
    // Drop whatever was there before, including sidecars of a sorted index.
    meta::remove_table(&path)?;

    let entries = match resolved.column_type {
        ColumnType::Categorical => categorical::build(table, &resolved, &path)?,
        _ => sorted::build(table, &resolved, &path)?,
    };
    info!(
        "built {} index for '{}' at {} ({} entries)",
        resolved.column_type,
        column,
        path.display(),
        entries
    );
    Ok(path)
}

/// Build (or rebuild) the sorted index over the pair `(first, second)` and
/// return its path.
pub fn build_pair_index(table: &Table, first: &str, second: &str) -> Result<PathBuf, FwError> {
    let mut resolved = table.resolve(&[first, second])?;
    let (Some(second_ref), Some(first_ref)) = (resolved.pop(), resolved.pop()) else {
        return Err(FwError::ColumnNotFound(first.to_string()));
    };
    let path = index_path(table.path(), &pair_name(first, second));
    meta::remove_table(&path)?;

    let entries = sorted::build_pair(table, &first_ref, &second_ref, &path)?;
    info!(
        "built pair index for ('{}', '{}') at {} ({} entries)",
        first,
        second,
        path.display(),
        entries
    );
    Ok(path)
}

pub enum Index {
    Sorted(SortedIndex),
    Categorical(CategoricalIndex),
}

impl Index {
    /// Open the index at `path`. Sorted indexes carry table sidecars.
    pub fn open(path: &Path, column_type: ColumnType) -> Result<Self, FwError> {
        if sidecar_path(path, meta::NUM_COLUMNS).exists() {
            Ok(Index::Sorted(SortedIndex::open(path, &[column_type])?))
        } else {
            Ok(Index::Categorical(CategoricalIndex::open(path)?))
        }
    }

    /// Rows satisfying `predicate`, ascending, or `None` when this index
    /// cannot answer it.
    pub fn lookup(
        &self,
        predicate: &Predicate,
        column_type: ColumnType,
        pool: &WorkerPool,
        threshold: usize,
    ) -> Result<Option<Vec<usize>>, FwError> {
        match self {
            Index::Sorted(index) => match index.positions(predicate)? {
                Some(ranges) => index.rows(&ranges, pool, threshold).map(Some),
                None => Ok(None),
            },
            Index::Categorical(index) => index.lookup(predicate, column_type).map(Some),
        }
    }
}

/// Indexes available for one table, opened on first use.
pub struct IndexCatalog {
    table: PathBuf,
    table_modified: SystemTime,
    opened: Mutex<AHashMap<String, Option<Arc<Index>>>>,
}

impl IndexCatalog {
    pub fn new(table: &Table) -> Result<Self, FwError> {
        Ok(Self {
            table: table.path().to_path_buf(),
            table_modified: table.modified()?,
            opened: Mutex::new(AHashMap::new()),
        })
    }

    /// The index for `column`, if one exists and is not older than the table.
    pub fn get(&self, column: &ColumnRef) -> Result<Option<Arc<Index>>, FwError> {
        self.open_cached(&column.name, |path| Index::open(path, column.column_type))
    }

    /// The pair index over `(first, second)` in that order, if usable.
    pub fn get_pair(
        &self,
        first: &ColumnRef,
        second: &ColumnRef,
    ) -> Result<Option<Arc<Index>>, FwError> {
        self.open_cached(&pair_name(&first.name, &second.name), |path| {
            let types = [first.column_type, second.column_type];
            Ok(Index::Sorted(SortedIndex::open(path, &types)?))
        })
    }

    fn open_cached<F>(&self, name: &str, open: F) -> Result<Option<Arc<Index>>, FwError>
    where
        F: FnOnce(&Path) -> Result<Index, FwError>,
    {
        let mut opened = self.opened.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = opened.get(name) {
            return Ok(index.clone());
        }

        let path = index_path(&self.table, name);
        let index = match std::fs::metadata(&path) {
            Err(_) => None,
            Ok(m) if m.modified()? < self.table_modified => {
                warn!(
                    "index {} is older than its table, falling back to scan",
                    path.display()
                );
                None
            }
            Ok(_) => Some(Arc::new(open(&path)?)),
        };
        opened.insert(name.to_string(), index.clone());
        Ok(index)
    }

    pub fn lookup(
        &self,
        predicate: &Predicate,
        column: &ColumnRef,
        pool: &WorkerPool,
        threshold: usize,
    ) -> Result<Option<Vec<usize>>, FwError> {
        match self.get(column)? {
            Some(index) => index.lookup(predicate, column.column_type, pool, threshold),
            None => Ok(None),
        }
    }

    /// Rows where both leaves hold, from a pair index over their two columns
    /// built in either order. `None` when no pair index can answer.
    pub fn lookup_pair(
        &self,
        left: (&Predicate, &ColumnRef),
        right: (&Predicate, &ColumnRef),
        pool: &WorkerPool,
        threshold: usize,
    ) -> Result<Option<Vec<usize>>, FwError> {
        if left.1.name == right.1.name {
            return Ok(None);
        }
        for (first, second) in [(left, right), (right, left)] {
            let Some(index) = self.get_pair(first.1, second.1)? else {
                continue;
            };
            let Index::Sorted(index) = index.as_ref() else {
                continue;
            };
            if let Some(ranges) = index.pair_positions(first.0, second.0)? {
                return index.rows(&ranges, pool, threshold).map(Some);
            }
        }
        Ok(None)
    }
}
