use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::{ColumnType, FwError};
use crate::io::meta::{TableLayout, write_sidecars};

use super::format::encode_row;

/// Writes a small in-memory table (uncompressed) with the same layout and
/// sidecars as a converted one. Index files are written through this.
pub struct TableWriter {
    names: Vec<String>,
    types: Vec<ColumnType>,
}

impl TableWriter {
    pub fn new(names: Vec<String>, types: Vec<ColumnType>) -> Self {
        Self { names, types }
    }

    pub fn write<R, F>(&self, path: &Path, rows: &[R]) -> Result<TableLayout, FwError>
    where
        R: AsRef<[F]>,
        F: AsRef<[u8]>,
    {
        let num_columns = self.names.len();
        let mut widths = vec![0usize; num_columns];
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != num_columns {
                return Err(FwError::RowShape {
                    row: i,
                    expected: num_columns,
                    found: row.len(),
                });
            }
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.as_ref().len());
            }
        }

        let file = File::create(path)
            .map_err(|e| FwError::IoError(format!("creating {}: {}", path.display(), e)))?;
        let mut out = BufWriter::new(file);
        for row in rows {
            let fields: Vec<&[u8]> = row.as_ref().iter().map(|f| f.as_ref()).collect();
            out.write_all(&encode_row(&fields, &widths, None)?)?;
        }
        out.flush()?;

        let layout = TableLayout {
            names: self.names.clone(),
            types: self.types.clone(),
            line_length: widths.iter().sum::<usize>() + 1,
            widths,
            num_rows: rows.len(),
            compression: None,
        };
        write_sidecars(path, &layout)?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Table;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.fw");
        let writer = TableWriter::new(
            vec!["value".into(), "row".into()],
            vec![ColumnType::Float, ColumnType::Integer],
        );
        let rows = vec![vec!["1.25", "3"], vec!["10.5", "0"]];
        let layout = writer.write(&path, &rows).unwrap();
        assert_eq!(layout.widths, vec![4, 1]);
        assert_eq!(std::fs::read(&path).unwrap(), b"1.253\n10.50\n");

        let table = Table::open(&path).unwrap();
        let coords = table.coordinates_for(&[0, 1]).unwrap();
        assert_eq!(table.read_value(1, &coords[0]).unwrap(), b"10.5");
        assert_eq!(table.row(0).unwrap().row_number(&coords[1]).unwrap(), 3);
    }

    #[test]
    fn test_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let writer = TableWriter::new(vec!["a".into(), "b".into()], vec![ColumnType::Integer; 2]);
        let rows = vec![vec!["1"]];
        let err = writer.write(&dir.path().join("t.fw"), &rows).unwrap_err();
        assert!(matches!(err, FwError::RowShape { row: 0, .. }));
    }
}
