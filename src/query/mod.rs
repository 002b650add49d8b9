//! Filter a table and stream the selected columns as tab-delimited text.

use std::io::Write;
use std::path::Path;

use ahash::AHashMap;
use log::info;

use crate::conf::QueryConfig;
use crate::core::{ColumnType, FwError, WorkerPool};
use crate::filter::{EvalContext, Filter};
use crate::index::IndexCatalog;
use crate::io::{ColumnRef, Table};

/// Matching row numbers, ascending. Resolves and type-checks the filter's
/// columns first.
pub fn filter_rows(table: &Table, filter: &Filter, config: &QueryConfig) -> Result<Vec<usize>, FwError> {
    let columns = resolve_columns(table, &filter.columns())?;
    evaluate(table, filter, &columns, config)
}

/// Run `filter` against the table at `path` and write the selected columns
/// of every matching row to `sink` (stdout when `None`). An empty selection
/// means every column in file order. Returns the number of rows written.
pub fn query_and_save(
    path: impl AsRef<Path>,
    filter: &Filter,
    select: &[&str],
    sink: Option<&mut dyn Write>,
    config: &QueryConfig,
) -> Result<usize, FwError> {
    let table = Table::open(path)?;

    let all_names;
    let select: Vec<&str> = if select.is_empty() {
        all_names = table.column_names()?;
        all_names.iter().map(|s| s.as_str()).collect()
    } else {
        select.to_vec()
    };

    let mut wanted = filter.columns();
    for name in &select {
        if !wanted.contains(name) {
            wanted.push(*name);
        }
    }
    let columns = resolve_columns(&table, &wanted)?;
    let rows = evaluate(&table, filter, &columns, config)?;

    let projected: Vec<&ColumnRef> = select
        .iter()
        .map(|name| {
            columns
                .get(*name)
                .ok_or_else(|| FwError::ColumnNotFound(name.to_string()))
        })
        .collect::<Result<_, _>>()?;

    let written = match sink {
        Some(sink) => write_rows(&table, &select, &projected, &rows, sink, config.batch_size)?,
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_rows(&table, &select, &projected, &rows, &mut lock, config.batch_size)?
        }
    };
    info!(
        "wrote {} of {} rows from {}",
        written,
        table.num_rows(),
        table.path().display()
    );
    Ok(written)
}

/// One pass over the column names for everything the query touches.
fn resolve_columns(table: &Table, names: &[&str]) -> Result<AHashMap<String, ColumnRef>, FwError> {
    Ok(table
        .resolve(names)?
        .into_iter()
        .map(|c| (c.name.clone(), c))
        .collect())
}

fn evaluate(
    table: &Table,
    filter: &Filter,
    columns: &AHashMap<String, ColumnRef>,
    config: &QueryConfig,
) -> Result<Vec<usize>, FwError> {
    let types: AHashMap<String, ColumnType> = columns
        .iter()
        .map(|(name, c)| (name.clone(), c.column_type))
        .collect();
    filter.check_types(&types)?;

    let pool = WorkerPool::new(config.workers)?;
    let catalog = if config.use_indexes {
        Some(IndexCatalog::new(table)?)
    } else {
        None
    };
    let ctx = EvalContext {
        table,
        columns,
        pool: &pool,
        indexes: catalog.as_ref(),
        index_parallel_threshold: config.index_parallel_threshold,
    };
    let candidates: Vec<usize> = (0..table.num_rows()).collect();
    filter.evaluate(&ctx, &candidates)
}

fn write_rows(
    table: &Table,
    names: &[&str],
    columns: &[&ColumnRef],
    rows: &[usize],
    sink: &mut dyn Write,
    batch_size: usize,
) -> Result<usize, FwError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(names.join("\t").as_bytes());
    buf.push(b'\n');

    for batch in rows.chunks(batch_size.max(1)) {
        for &row in batch {
            let decoded = table.row(row)?;
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    buf.push(b'\t');
                }
                buf.extend_from_slice(decoded.value(&column.coord)?);
            }
            buf.push(b'\n');
        }
        sink.write_all(&buf)?;
        buf.clear();
    }
    sink.write_all(&buf)?;
    sink.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::convert;
    use crate::conf::BuildConfig;
    use crate::filter::Op;
    use tempfile::TempDir;

    fn build(dir: &TempDir) -> std::path::PathBuf {
        let input = dir.path().join("in.tsv");
        std::fs::write(&input, "ID\tFloatA\tOrdinal\n1\t1.1\tLow\n2\t2.2\tHigh\n3\t3.3\tMed\n").unwrap();
        let output = dir.path().join("t.fw");
        convert(&input, &output, &BuildConfig::default()).unwrap();
        output
    }

    fn query(path: &Path, filter: &Filter, select: &[&str]) -> String {
        let mut out = Vec::new();
        query_and_save(path, filter, select, Some(&mut out), &QueryConfig::default()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_float_filter_projects_id() {
        let dir = TempDir::new().unwrap();
        let path = build(&dir);
        let out = query(&path, &Filter::float("FloatA", Op::Ge, 2.2), &["ID"]);
        assert_eq!(out, "ID\n2\n3\n");
    }

    #[test]
    fn test_no_filter_all_columns() {
        let dir = TempDir::new().unwrap();
        let path = build(&dir);
        let out = query(&path, &Filter::All, &[]);
        assert_eq!(out, "ID\tFloatA\tOrdinal\n1\t1.1\tLow\n2\t2.2\tHigh\n3\t3.3\tMed\n");
    }

    #[test]
    fn test_select_order_and_empty_result() {
        let dir = TempDir::new().unwrap();
        let path = build(&dir);
        let out = query(&path, &Filter::string("Ordinal", Op::Eq, "Med"), &["Ordinal", "ID"]);
        assert_eq!(out, "Ordinal\tID\nMed\t3\n");
        let out = query(&path, &Filter::int("ID", Op::Gt, 10), &["ID"]);
        assert_eq!(out, "ID\n");
    }

    #[test]
    fn test_type_mismatch_before_scan() {
        let dir = TempDir::new().unwrap();
        let path = build(&dir);
        let mut out = Vec::new();
        let err = query_and_save(
            &path,
            &Filter::float("Ordinal", Op::Gt, 1.0),
            &["ID"],
            Some(&mut out),
            &QueryConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FwError::TypeMismatch { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_select_column() {
        let dir = TempDir::new().unwrap();
        let path = build(&dir);
        let mut out = Vec::new();
        let err = query_and_save(&path, &Filter::All, &["Nope"], Some(&mut out), &QueryConfig::default())
            .unwrap_err();
        assert_eq!(err, FwError::ColumnNotFound("Nope".into()));
    }
}
