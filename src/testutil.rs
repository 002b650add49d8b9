//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::build::convert;
use crate::conf::BuildConfig;

/// RNG seed for deterministic data generation
pub const RNG_SEED: u64 = 42;

pub const LABELS: &[&str] = &["Low", "Med", "High", "Unknown"];

/// Header of tables produced by [`generate_rows`].
pub const GENERATED_HEADER: &[&str] = &["id", "score", "label", "code", "count"];

/// Write a tab-delimited file with a header line.
pub fn write_tsv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> std::io::Result<()> {
    let mut out = header.join("\t");
    out.push('\n');
    for row in rows {
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    fs::write(path, out)
}

/// Deterministic rows matching [`GENERATED_HEADER`]:
/// - `id`: row index (unique integer)
/// - `score`: float in [0, 100) with two decimals
/// - `label`: one of [`LABELS`], roughly 1 in 20 missing (`NA`)
/// - `code`: unique string identifier `C<index>`
/// - `count`: small integer, roughly 1 in 10 empty
pub fn generate_rows(num_rows: usize) -> Vec<Vec<String>> {
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    (0..num_rows)
        .map(|i| {
            let score = format!("{:.2}", rng.gen_range(0.0..100.0));
            let label = if rng.gen_range(0..20) == 0 {
                "NA".to_string()
            } else {
                LABELS[rng.gen_range(0..LABELS.len())].to_string()
            };
            let count = if rng.gen_range(0..10) == 0 {
                String::new()
            } else {
                rng.gen_range(0..50).to_string()
            };
            vec![i.to_string(), score, label, format!("C{i:06}"), count]
        })
        .collect()
}

/// Write generated rows to `<dir>/<name>.tsv` and convert them to `<dir>/<name>.fw`.
/// Returns the paths of the input and the built table.
pub fn build_generated_table(
    dir: &Path,
    name: &str,
    num_rows: usize,
    config: &BuildConfig,
) -> (PathBuf, PathBuf) {
    let input = dir.join(format!("{name}.tsv"));
    let output = dir.join(format!("{name}.fw"));
    write_tsv(&input, GENERATED_HEADER, &generate_rows(num_rows)).unwrap();
    convert(&input, &output, config).unwrap();
    (input, output)
}

/// Write `contents` verbatim to `<dir>/<name>.tsv` and convert it.
pub fn build_table_from_str(dir: &Path, name: &str, contents: &str, config: &BuildConfig) -> PathBuf {
    let input = dir.join(format!("{name}.tsv"));
    let output = dir.join(format!("{name}.fw"));
    fs::write(&input, contents).unwrap();
    convert(&input, &output, config).unwrap();
    output
}
