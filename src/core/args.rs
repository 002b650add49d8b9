use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub struct CliArgs {
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Convert a tab-delimited file into a fixed-width table.
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        compression: Option<i32>,
        #[arg(short, long)]
        workers: Option<usize>,
        #[arg(long)]
        column_chunk_size: Option<usize>,
    },
    /// Build an index for each named column.
    Index {
        table: PathBuf,
        #[arg(required = true)]
        columns: Vec<String>,
        /// Build one pair index over exactly two columns instead.
        #[arg(long)]
        pair: bool,
    },
    /// Filter and project a table into tab-delimited output.
    Query {
        table: PathBuf,
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,
        #[arg(long = "where")]
        conditions: Vec<String>,
        /// Combine conditions with OR instead of AND.
        #[arg(long)]
        any: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        workers: Option<usize>,
        #[arg(long)]
        no_index: bool,
    },
    /// Print table statistics as JSON.
    Info { table: PathBuf },
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = CliArgs::parse_from(["self", "--config", "foo", "info", "data.fw"]);
        assert_eq!(
            args,
            CliArgs {
                config: Some(PathBuf::from("foo")),
                command: Command::Info {
                    table: PathBuf::from("data.fw")
                },
            }
        );
    }

    #[test]
    fn test_pair_index_args() {
        let args = CliArgs::parse_from(["self", "index", "t.fw", "Ordinal", "ID", "--pair"]);
        assert_eq!(
            args.command,
            Command::Index {
                table: PathBuf::from("t.fw"),
                columns: vec!["Ordinal".to_string(), "ID".to_string()],
                pair: true,
            }
        );
    }

    #[test]
    fn test_query_args() {
        let args = CliArgs::parse_from([
            "self", "query", "t.fw", "--select", "ID,FloatA", "--where", "FloatA >= 2.2",
            "--where", "Ordinal == High", "--any",
        ]);
        match args.command {
            Command::Query {
                select,
                conditions,
                any,
                output,
                ..
            } => {
                assert_eq!(select, vec!["ID", "FloatA"]);
                assert_eq!(conditions, vec!["FloatA >= 2.2", "Ordinal == High"]);
                assert!(any);
                assert_eq!(output, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
