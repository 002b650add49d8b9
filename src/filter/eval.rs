use ahash::AHashMap;
use log::debug;

use crate::core::{FwError, WorkerPool, split_ranges};
use crate::index::IndexCatalog;
use crate::io::{ColumnRef, Table};

use super::rows::{difference, intersect, union};
use super::{Filter, Predicate};

/// Below this many candidates a scan runs as a single task.
const MIN_PARALLEL_SCAN: usize = 4096;

/// Everything a filter needs to evaluate against one table.
pub struct EvalContext<'a> {
    pub table: &'a Table,
    pub columns: &'a AHashMap<String, ColumnRef>,
    pub pool: &'a WorkerPool,
    pub indexes: Option<&'a IndexCatalog>,
    pub index_parallel_threshold: usize,
}

impl EvalContext<'_> {
    fn column(&self, name: &str) -> Result<&ColumnRef, FwError> {
        self.columns
            .get(name)
            .ok_or_else(|| FwError::ColumnNotFound(name.to_string()))
    }
}

impl Filter {
    /// Rows of `candidates` (ascending) that pass this filter, ascending.
    pub fn evaluate(&self, ctx: &EvalContext<'_>, candidates: &[usize]) -> Result<Vec<usize>, FwError> {
        match self {
            Filter::All => Ok(candidates.to_vec()),
            Filter::Leaf(p) => p.evaluate(ctx, candidates),
            Filter::And(left, right) => {
                if let Some(rows) = lookup_pair(ctx, left, right)? {
                    return Ok(intersect(candidates, &rows));
                }
                let passed = left.evaluate(ctx, candidates)?;
                if passed.is_empty() {
                    return Ok(passed);
                }
                right.evaluate(ctx, &passed)
            }
            Filter::Or(left, right) => {
                let passed = left.evaluate(ctx, candidates)?;
                let rest = difference(candidates, &passed);
                if rest.is_empty() {
                    return Ok(passed);
                }
                let more = right.evaluate(ctx, &rest)?;
                Ok(union(&passed, &more))
            }
        }
    }
}

/// An AND of one leaf on each of two columns, answered by a pair index.
fn lookup_pair(
    ctx: &EvalContext<'_>,
    left: &Filter,
    right: &Filter,
) -> Result<Option<Vec<usize>>, FwError> {
    let (Some(catalog), Filter::Leaf(a), Filter::Leaf(b)) = (ctx.indexes, left, right) else {
        return Ok(None);
    };
    let rows = catalog.lookup_pair(
        (a, ctx.column(&a.column)?),
        (b, ctx.column(&b.column)?),
        ctx.pool,
        ctx.index_parallel_threshold,
    )?;
    if let Some(rows) = &rows {
        debug!(
            "'{}' and '{}' answered from pair index: {} rows",
            a.column,
            b.column,
            rows.len()
        );
    }
    Ok(rows)
}

impl Predicate {
    fn evaluate(&self, ctx: &EvalContext<'_>, candidates: &[usize]) -> Result<Vec<usize>, FwError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let column = ctx.column(&self.column)?;
        if let Some(catalog) = ctx.indexes {
            if let Some(rows) =
                catalog.lookup(self, column, ctx.pool, ctx.index_parallel_threshold)?
            {
                debug!("'{}' answered from index: {} rows", self.column, rows.len());
                return Ok(intersect(candidates, &rows));
            }
        }
        self.scan(ctx, column, candidates)
    }

    fn scan(
        &self,
        ctx: &EvalContext<'_>,
        column: &ColumnRef,
        candidates: &[usize],
    ) -> Result<Vec<usize>, FwError> {
        let parts = if candidates.len() < MIN_PARALLEL_SCAN {
            1
        } else {
            ctx.pool.workers()
        };
        let tasks: Vec<_> = split_ranges(candidates.len(), parts)
            .into_iter()
            .map(|range| {
                let chunk = &candidates[range];
                move || self.scan_chunk(ctx.table, column, chunk)
            })
            .collect();
        let matched = ctx.pool.run(tasks)?;
        debug!(
            "'{}' scanned {} rows in {} tasks",
            self.column,
            candidates.len(),
            matched.len()
        );
        Ok(matched.concat())
    }

    fn scan_chunk(
        &self,
        table: &Table,
        column: &ColumnRef,
        rows: &[usize],
    ) -> Result<Vec<usize>, FwError> {
        let mut out = Vec::new();
        for &row in rows {
            let decoded = table.row(row)?;
            if self.matches(decoded.value(&column.coord)?, column.column_type) {
                out.push(row);
            }
        }
        Ok(out)
    }
}
