mod args;
mod error;
mod logger;
mod pool;
mod types;

pub use args::{CliArgs, Command};
pub use error::FwError;
pub use logger::setup_logging;
pub use pool::{WorkerPool, split_ranges};
pub use types::{ColumnType, is_missing, parse_f64, parse_i64};
