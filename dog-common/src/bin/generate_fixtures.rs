//! Writes every dog/breed/toy combination to a CSV file for replay tests.
use std::fs::File;

use dog_common::fixtures::write_fixtures;
use eyre::{Result, WrapErr};

const DEFAULT_OUTPUT: &str = "dog_messages.csv";

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let file = File::create(&path).wrap_err_with(|| format!("failed to create {path}"))?;
    let rows = write_fixtures(file).wrap_err("failed to write fixtures")?;

    println!("CSV file '{path}' created with {rows} message combinations.");
    Ok(())
}
