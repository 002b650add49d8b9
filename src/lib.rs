pub mod build;
pub mod conf;
pub mod core;
pub mod filter;
pub mod index;
pub mod io;
pub mod query;

#[cfg(feature = "testutil")]
pub mod testutil;

pub use build::convert;
pub use core::{ColumnType, FwError};
pub use filter::{Filter, Op, Operand};
pub use index::{build_index, build_pair_index};
pub use io::Table;
pub use query::{filter_rows, query_and_save};
