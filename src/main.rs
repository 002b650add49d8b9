use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use clap::Parser;
use log::info;

use fwtab::conf::Config;
use fwtab::core::{CliArgs, Command, setup_logging};
use fwtab::{Filter, Table, build_index, build_pair_index, convert, query_and_save};

fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "fwtab started.");
    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Convert {
            input,
            output,
            compression,
            workers,
            column_chunk_size,
        } => {
            config.build.compression = compression.or(config.build.compression);
            config.build.workers = workers.unwrap_or(config.build.workers);
            config.build.column_chunk_size = column_chunk_size.or(config.build.column_chunk_size);
            convert(&input, &output, &config.build)
                .with_context(|| format!("converting {}", input.display()))?;
        }
        Command::Index {
            table,
            columns,
            pair,
        } => {
            let table = Table::open(&table)?;
            if pair {
                let [first, second] = columns.as_slice() else {
                    anyhow::bail!("--pair needs exactly two columns, got {}", columns.len());
                };
                build_pair_index(&table, first, second)?;
            } else {
                for column in &columns {
                    build_index(&table, column)?;
                }
            }
        }
        Command::Query {
            table,
            select,
            conditions,
            any,
            output,
            workers,
            no_index,
        } => {
            config.query.workers = workers.unwrap_or(config.query.workers);
            config.query.use_indexes &= !no_index;

            let filter = {
                let handle = Table::open(&table)?;
                let column_type = |name: &str| {
                    let index = handle.column_index_of(name)?;
                    handle.column_type(index)
                };
                let mut filters = conditions
                    .iter()
                    .map(|c| Filter::parse(c, &column_type))
                    .collect::<Result<Vec<_>, _>>()?;
                match filters.len() {
                    0 => Filter::All,
                    1 => filters.remove(0),
                    _ if any => Filter::any(filters)?,
                    _ => Filter::all(filters)?,
                }
            };

            let select: Vec<&str> = select.iter().map(|s| s.as_str()).collect();
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    query_and_save(&table, &filter, &select, Some(&mut writer), &config.query)?;
                    writer.flush()?;
                }
                None => {
                    query_and_save(&table, &filter, &select, None, &config.query)?;
                }
            }
        }
        Command::Info { table } => {
            let info = Table::open(&table)?.info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}
