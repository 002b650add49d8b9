//! Sidecar files that describe a table. Each lives next to the data file,
//! named by appending a fixed suffix to the table path.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::core::{ColumnType, FwError};

use super::codec::{build_map, offsets};

pub const LINE_LENGTH: &str = ".ll";
pub const COORDINATES: &str = ".cc";
pub const MAX_COORDINATE_LENGTH: &str = ".mccl";
pub const COLUMN_NAMES: &str = ".cn";
pub const MAX_COLUMN_NAME_LENGTH: &str = ".mcnl";
pub const COLUMN_TYPES: &str = ".ct";
pub const NUM_ROWS: &str = ".nrow";
pub const NUM_COLUMNS: &str = ".ncol";
pub const COMPRESSION: &str = ".cmp";

pub const ALL_SUFFIXES: [&str; 9] = [
    LINE_LENGTH,
    COORDINATES,
    MAX_COORDINATE_LENGTH,
    COLUMN_NAMES,
    MAX_COLUMN_NAME_LENGTH,
    COLUMN_TYPES,
    NUM_ROWS,
    NUM_COLUMNS,
    COMPRESSION,
];

const NO_COMPRESSION: &str = "None";

/// `data.fw` + `.cn` -> `data.fw.cn`.
pub fn sidecar_path(table: &Path, suffix: &str) -> PathBuf {
    let mut name = table.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Everything the sidecars record about a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub names: Vec<String>,
    pub types: Vec<ColumnType>,
    pub widths: Vec<usize>,
    pub num_rows: usize,
    pub line_length: usize,
    pub compression: Option<i32>,
}

impl TableLayout {
    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    /// Bytes of column data in a row, excluding the terminator.
    pub fn row_width(&self) -> usize {
        self.widths.iter().sum()
    }
}

pub fn write_sidecars(table: &Path, layout: &TableLayout) -> Result<(), FwError> {
    if layout.types.len() != layout.names.len() || layout.widths.len() != layout.names.len() {
        return Err(FwError::InvariantViolation(format!(
            "layout has {} names, {} types, {} widths",
            layout.names.len(),
            layout.types.len(),
            layout.widths.len()
        )));
    }

    let coords: Vec<String> = offsets(&layout.widths)
        .iter()
        .map(|c| c.to_string())
        .collect();
    let coords_width = write_map(table, COORDINATES, &coords)?;
    write_scalar(table, MAX_COORDINATE_LENGTH, coords_width)?;

    let names_width = write_map(table, COLUMN_NAMES, &layout.names)?;
    write_scalar(table, MAX_COLUMN_NAME_LENGTH, names_width)?;

    let tags: Vec<[u8; 1]> = layout.types.iter().map(|t| [t.tag()]).collect();
    write_map(table, COLUMN_TYPES, &tags)?;

    write_scalar(table, LINE_LENGTH, layout.line_length)?;
    write_scalar(table, NUM_ROWS, layout.num_rows)?;
    write_scalar(table, NUM_COLUMNS, layout.num_columns())?;
    match layout.compression {
        Some(level) => write_scalar(table, COMPRESSION, level)?,
        None => write_scalar(table, COMPRESSION, NO_COMPRESSION)?,
    }

    debug!(
        "wrote sidecars for {}: {} columns, line length {}",
        table.display(),
        layout.num_columns(),
        layout.line_length
    );
    Ok(())
}

/// Write a fixed-width map sidecar, returning its entry width.
pub fn write_map<T: AsRef<[u8]>>(table: &Path, suffix: &str, values: &[T]) -> Result<usize, FwError> {
    let (block, width) = build_map(values)?;
    let path = sidecar_path(table, suffix);
    fs::write(&path, block)
        .map_err(|e| FwError::IoError(format!("writing {}: {}", path.display(), e)))?;
    Ok(width)
}

pub fn write_scalar(table: &Path, suffix: &str, value: impl Display) -> Result<(), FwError> {
    let path = sidecar_path(table, suffix);
    fs::write(&path, value.to_string())
        .map_err(|e| FwError::IoError(format!("writing {}: {}", path.display(), e)))
}

pub fn read_scalar<T: FromStr>(table: &Path, suffix: &str) -> Result<T, FwError> {
    let path = sidecar_path(table, suffix);
    let raw = fs::read_to_string(&path).map_err(|e| FwError::missing(&path, e))?;
    raw.trim().parse().map_err(|_| {
        FwError::InvariantViolation(format!(
            "cannot parse {} contents {:?}",
            path.display(),
            raw.trim()
        ))
    })
}

pub fn read_compression(table: &Path) -> Result<Option<i32>, FwError> {
    let path = sidecar_path(table, COMPRESSION);
    let raw = fs::read_to_string(&path).map_err(|e| FwError::missing(&path, e))?;
    match raw.trim() {
        NO_COMPRESSION => Ok(None),
        level => level.parse().map(Some).map_err(|_| {
            FwError::InvariantViolation(format!("bad compression level {level:?}"))
        }),
    }
}

/// Remove the data file and all of its sidecars, ignoring files that do not exist.
pub fn remove_table(table: &Path) -> Result<(), FwError> {
    let paths = std::iter::once(table.to_path_buf())
        .chain(ALL_SUFFIXES.iter().map(|s| sidecar_path(table, s)));
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(FwError::IoError(format!("removing {}: {}", path.display(), e))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> TableLayout {
        TableLayout {
            names: vec!["ID".into(), "FloatA".into()],
            types: vec![ColumnType::Integer, ColumnType::Float],
            widths: vec![1, 3],
            num_rows: 3,
            line_length: 5,
            compression: None,
        }
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        let p = sidecar_path(Path::new("/tmp/data.fw"), COLUMN_NAMES);
        assert_eq!(p, PathBuf::from("/tmp/data.fw.cn"));
    }

    #[test]
    fn test_write_and_read_sidecars() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("t.fw");
        write_sidecars(&table, &layout()).unwrap();

        assert_eq!(read_scalar::<usize>(&table, NUM_ROWS).unwrap(), 3);
        assert_eq!(read_scalar::<usize>(&table, NUM_COLUMNS).unwrap(), 2);
        assert_eq!(read_scalar::<usize>(&table, LINE_LENGTH).unwrap(), 5);
        assert_eq!(read_scalar::<usize>(&table, MAX_COLUMN_NAME_LENGTH).unwrap(), 6);
        assert_eq!(read_compression(&table).unwrap(), None);

        let cc = fs::read(sidecar_path(&table, COORDINATES)).unwrap();
        assert_eq!(cc, b"0\n1\n4\n");
        let ct = fs::read(sidecar_path(&table, COLUMN_TYPES)).unwrap();
        assert_eq!(ct, b"i\nf\n");
    }

    #[test]
    fn test_compression_level_recorded() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("t.fw");
        let mut l = layout();
        l.compression = Some(3);
        write_sidecars(&table, &l).unwrap();
        assert_eq!(read_compression(&table).unwrap(), Some(3));
    }

    #[test]
    fn test_missing_sidecar() {
        let dir = TempDir::new().unwrap();
        let err = read_scalar::<usize>(&dir.path().join("nope"), NUM_ROWS).unwrap_err();
        assert!(matches!(err, FwError::MissingFile(_)));
    }

    #[test]
    fn test_mismatched_layout_rejected() {
        let dir = TempDir::new().unwrap();
        let mut l = layout();
        l.widths.pop();
        assert!(write_sidecars(&dir.path().join("t.fw"), &l).is_err());
    }
}
