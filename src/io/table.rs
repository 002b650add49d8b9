use std::borrow::Cow;
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use ahash::AHashMap;
use memmap2::Mmap;
use serde::Serialize;

use crate::core::{ColumnType, FwError};

use super::codec::{self, map_entry, parse_usize};
use super::compress::decompress_row;
use super::meta::{self, sidecar_path};

/// Byte range of a column inside a decoded row.
pub type Coord = Range<usize>;

/// A column resolved against a table's sidecars.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
    pub column_type: ColumnType,
    pub coord: Coord,
}

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub width: usize,
}

#[derive(Debug, Serialize)]
pub struct TableInfo {
    pub path: PathBuf,
    pub num_rows: usize,
    pub num_columns: usize,
    pub line_length: usize,
    pub compression: Option<i32>,
    pub columns: Vec<ColumnInfo>,
}

/// Fixed-width sidecar map kept memory-mapped.
struct MapFile {
    mmap: Mmap,
    width: usize,
    len: usize,
}

impl MapFile {
    /// Map `table` + `suffix`. Without a recorded width, the width is derived
    /// from the file size and the expected entry count.
    fn open(table: &Path, suffix: &str, width: Option<usize>, len: usize) -> Result<Self, FwError> {
        let mmap = map_file(&sidecar_path(table, suffix))?;
        let width = match width {
            Some(w) => w,
            None if len > 0 => (mmap.len() / len).saturating_sub(1),
            None => 0,
        };
        if mmap.len() < len * (width + 1) {
            return Err(FwError::InvariantViolation(format!(
                "{}{} holds {} bytes, expected {} entries of width {}",
                table.display(),
                suffix,
                mmap.len(),
                len,
                width
            )));
        }
        Ok(Self { mmap, width, len })
    }

    fn get(&self, index: usize) -> Result<&[u8], FwError> {
        if index >= self.len {
            return Err(FwError::InvariantViolation(format!(
                "map index {index} out of range (have {})",
                self.len
            )));
        }
        map_entry(&self.mmap, self.width, index)
    }
}

fn map_file(path: &Path) -> Result<Mmap, FwError> {
    let file = File::open(path).map_err(|e| FwError::missing(path, e))?;
    // SAFETY: tables are immutable once built and are only ever mapped read-only.
    unsafe { Mmap::map(&file) }.map_err(|e| FwError::missing(path, e))
}

/// Read-only, memory-mapped handle to a built table and its sidecars.
/// Handles are released when the table is dropped.
pub struct Table {
    path: PathBuf,
    data: Mmap,
    num_rows: usize,
    num_columns: usize,
    line_length: usize,
    row_width: usize,
    compression: Option<i32>,
    names: MapFile,
    types: MapFile,
    coords: MapFile,
    coord_cache: RwLock<AHashMap<usize, Coord>>,
}

impl Table {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FwError> {
        let path = path.as_ref().to_path_buf();
        let num_rows: usize = meta::read_scalar(&path, meta::NUM_ROWS)?;
        let num_columns: usize = meta::read_scalar(&path, meta::NUM_COLUMNS)?;
        let line_length: usize = meta::read_scalar(&path, meta::LINE_LENGTH)?;
        let compression = meta::read_compression(&path)?;
        let coords_width: usize = meta::read_scalar(&path, meta::MAX_COORDINATE_LENGTH)?;
        let names_width: usize = meta::read_scalar(&path, meta::MAX_COLUMN_NAME_LENGTH)?;

        let coords = MapFile::open(&path, meta::COORDINATES, Some(coords_width), num_columns + 1)
            .map_err(|_| {
                FwError::InvariantViolation(format!(
                    "coordinate map of {} is shorter than ncol + 1 = {}",
                    path.display(),
                    num_columns + 1
                ))
            })?;
        let names = MapFile::open(&path, meta::COLUMN_NAMES, Some(names_width), num_columns)?;
        let types = MapFile::open(&path, meta::COLUMN_TYPES, None, num_columns)?;
        let row_width = parse_usize(coords.get(num_columns)?)?;

        let data = map_file(&path)?;
        if data.len() != num_rows * line_length {
            return Err(FwError::InvariantViolation(format!(
                "{} holds {} bytes, expected {} rows of {} bytes",
                path.display(),
                data.len(),
                num_rows,
                line_length
            )));
        }

        Ok(Self {
            path,
            data,
            num_rows,
            num_columns,
            line_length,
            row_width,
            compression,
            names,
            types,
            coords,
            coord_cache: RwLock::new(AHashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    pub fn compression(&self) -> Option<i32> {
        self.compression
    }

    /// Modification time of the data file.
    pub fn modified(&self) -> Result<SystemTime, FwError> {
        Ok(std::fs::metadata(&self.path)?.modified()?)
    }

    pub fn column_name(&self, index: usize) -> Result<String, FwError> {
        Ok(String::from_utf8_lossy(self.names.get(index)?).into_owned())
    }

    pub fn column_names(&self) -> Result<Vec<String>, FwError> {
        (0..self.num_columns).map(|i| self.column_name(i)).collect()
    }

    pub fn column_type(&self, index: usize) -> Result<ColumnType, FwError> {
        ColumnType::from_tag(self.types.get(index)?)
    }

    /// Linear scan over the column names.
    pub fn column_index_of(&self, name: &str) -> Result<usize, FwError> {
        for i in 0..self.num_columns {
            if self.names.get(i)? == name.as_bytes() {
                return Ok(i);
            }
        }
        Err(FwError::ColumnNotFound(name.to_string()))
    }

    /// Resolve several names with a single pass over the column names.
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<ColumnRef>, FwError> {
        let mut wanted: AHashMap<&[u8], Option<usize>> =
            names.iter().map(|n| (n.as_bytes(), None)).collect();
        let mut remaining = wanted.len();
        for i in 0..self.num_columns {
            if remaining == 0 {
                break;
            }
            if let Some(slot) = wanted.get_mut(self.names.get(i)?) {
                if slot.is_none() {
                    *slot = Some(i);
                    remaining -= 1;
                }
            }
        }

        names
            .iter()
            .map(|name| {
                let index = wanted
                    .get(name.as_bytes())
                    .copied()
                    .flatten()
                    .ok_or_else(|| FwError::ColumnNotFound(name.to_string()))?;
                Ok(ColumnRef {
                    index,
                    name: name.to_string(),
                    column_type: self.column_type(index)?,
                    coord: self.coordinate(index)?,
                })
            })
            .collect()
    }

    pub fn coordinates_for(&self, columns: &[usize]) -> Result<Vec<Coord>, FwError> {
        columns.iter().map(|c| self.coordinate(*c)).collect()
    }

    fn coordinate(&self, column: usize) -> Result<Coord, FwError> {
        if let Some(coord) = self
            .coord_cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&column)
        {
            return Ok(coord.clone());
        }
        if column >= self.num_columns {
            return Err(FwError::InvariantViolation(format!(
                "column index {column} out of range (have {})",
                self.num_columns
            )));
        }
        let start = parse_usize(self.coords.get(column)?)?;
        let end = parse_usize(self.coords.get(column + 1)?)?;
        if start > end || end > self.row_width {
            return Err(FwError::InvariantViolation(format!(
                "column {column} spans {start}..{end}, row width is {}",
                self.row_width
            )));
        }
        self.coord_cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(column, start..end);
        Ok(start..end)
    }

    /// Decode one row. Compressed rows are decompressed here, once, so any
    /// number of columns can then be sliced from the result.
    pub fn row(&self, row: usize) -> Result<Row<'_>, FwError> {
        if row >= self.num_rows {
            return Err(FwError::InvariantViolation(format!(
                "row {row} out of range (have {})",
                self.num_rows
            )));
        }
        let start = row * self.line_length;
        let raw = &self.data[start..start + self.line_length];
        let bytes = match self.compression {
            Some(_) => Cow::Owned(decompress_row(raw, self.row_width)?),
            None => Cow::Borrowed(raw),
        };
        Ok(Row { bytes })
    }

    /// Value of one column in one row, padding removed.
    pub fn read_value(&self, row: usize, coord: &Coord) -> Result<Vec<u8>, FwError> {
        Ok(self.row(row)?.value(coord)?.to_vec())
    }

    pub fn info(&self) -> Result<TableInfo, FwError> {
        let columns = (0..self.num_columns)
            .map(|i| {
                let coord = self.coordinate(i)?;
                Ok(ColumnInfo {
                    name: self.column_name(i)?,
                    column_type: self.column_type(i)?,
                    width: coord.len(),
                })
            })
            .collect::<Result<Vec<_>, FwError>>()?;
        Ok(TableInfo {
            path: self.path.clone(),
            num_rows: self.num_rows,
            num_columns: self.num_columns,
            line_length: self.line_length,
            compression: self.compression,
            columns,
        })
    }
}

/// A decoded row.
pub struct Row<'a> {
    bytes: Cow<'a, [u8]>,
}

impl Row<'_> {
    pub fn value(&self, coord: &Coord) -> Result<&[u8], FwError> {
        self.raw(coord).map(codec::trim)
    }

    /// Column bytes including padding.
    pub fn raw(&self, coord: &Coord) -> Result<&[u8], FwError> {
        self.bytes.get(coord.clone()).ok_or_else(|| {
            FwError::InvariantViolation(format!(
                "column range {}..{} exceeds row of {} bytes",
                coord.start,
                coord.end,
                self.bytes.len()
            ))
        })
    }

    pub fn row_number(&self, coord: &Coord) -> Result<usize, FwError> {
        parse_usize(self.value(coord)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::meta::{TableLayout, write_sidecars};
    use tempfile::TempDir;

    fn write_table(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("t.fw");
        std::fs::write(&path, b"1 a 0.5\n22bc1.5\n").unwrap();
        write_sidecars(
            &path,
            &TableLayout {
                names: vec!["ID".into(), "Name".into(), "Score".into()],
                types: vec![
                    ColumnType::Integer,
                    ColumnType::Identifier,
                    ColumnType::Float,
                ],
                widths: vec![2, 2, 3],
                num_rows: 2,
                line_length: 8,
                compression: None,
            },
        )
        .unwrap();
        path
    }

    #[test]
    fn test_open_and_read() {
        let dir = TempDir::new().unwrap();
        let table = Table::open(write_table(&dir)).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 3);
        assert_eq!(table.column_index_of("Score").unwrap(), 2);
        assert_eq!(table.column_type(1).unwrap(), ColumnType::Identifier);

        let coords = table.coordinates_for(&[0, 1, 2]).unwrap();
        assert_eq!(coords, vec![0..2, 2..4, 4..7]);
        assert_eq!(table.read_value(0, &coords[0]).unwrap(), b"1");
        assert_eq!(table.read_value(0, &coords[1]).unwrap(), b"a");
        assert_eq!(table.read_value(1, &coords[1]).unwrap(), b"bc");
        assert_eq!(table.read_value(1, &coords[2]).unwrap(), b"1.5");

        let row = table.row(0).unwrap();
        assert_eq!(row.raw(&coords[1]).unwrap(), b"a ");
    }

    #[test]
    fn test_resolve_preserves_request_order() {
        let dir = TempDir::new().unwrap();
        let table = Table::open(write_table(&dir)).unwrap();
        let cols = table.resolve(&["Score", "ID"]).unwrap();
        assert_eq!(cols[0].index, 2);
        assert_eq!(cols[0].column_type, ColumnType::Float);
        assert_eq!(cols[1].coord, 0..2);

        assert_eq!(
            table.resolve(&["ID", "Nope"]).unwrap_err(),
            FwError::ColumnNotFound("Nope".into())
        );
    }

    #[test]
    fn test_row_out_of_range() {
        let dir = TempDir::new().unwrap();
        let table = Table::open(write_table(&dir)).unwrap();
        assert!(matches!(
            table.row(2),
            Err(FwError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_short_coordinate_map_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir);
        std::fs::write(sidecar_path(&path, meta::COORDINATES), b"0\n2\n").unwrap();
        let err = Table::open(&path).err().unwrap();
        assert!(err.to_string().contains("ncol + 1"));
    }

    #[test]
    fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let err = Table::open(dir.path().join("absent.fw")).err().unwrap();
        assert!(matches!(err, FwError::MissingFile(_)));
    }
}
