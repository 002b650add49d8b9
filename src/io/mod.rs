pub mod codec;
pub mod compress;
pub mod meta;
pub mod reader;
pub mod table;

pub use meta::{TableLayout, sidecar_path};
pub use table::{ColumnRef, Coord, Row, Table, TableInfo};
