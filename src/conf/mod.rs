mod build;
mod config;
mod query;

pub use build::BuildConfig;
pub use config::Config;
pub use query::QueryConfig;
