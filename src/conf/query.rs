use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    #[serde(default = "QueryConfig::default_workers")]
    pub workers: usize,
    /// Output rows buffered per write to the sink.
    #[serde(default = "QueryConfig::default_batch_size")]
    pub batch_size: usize,
    /// Index matches above this many rows are resolved by parallel tasks.
    #[serde(default = "QueryConfig::default_index_parallel_threshold")]
    pub index_parallel_threshold: usize,
    #[serde(default = "QueryConfig::default_use_indexes")]
    pub use_indexes: bool,
}

impl QueryConfig {
    fn default_workers() -> usize {
        1
    }

    fn default_batch_size() -> usize {
        1_000
    }

    fn default_index_parallel_threshold() -> usize {
        100_000
    }

    fn default_use_indexes() -> bool {
        true
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            workers: Self::default_workers(),
            batch_size: Self::default_batch_size(),
            index_parallel_threshold: Self::default_index_parallel_threshold(),
            use_indexes: Self::default_use_indexes(),
        }
    }
}
