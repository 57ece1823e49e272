use std::io::Write;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::generator::{DOG_BREEDS, DOG_NAMES, DOG_TOYS};

/// One row of the fixture CSV, in the shape the CSV-fed consumers read.
#[derive(Debug, Serialize)]
pub struct FixtureRow<'a> {
    pub timestamp: NaiveDateTime,
    pub dog_name: &'a str,
    pub breed: &'a str,
    pub toy: &'a str,
}

/// Every (name, breed, toy) combination, names varying slowest.
pub fn combinations() -> impl Iterator<Item = (&'static str, &'static str, &'static str)> {
    DOG_NAMES.iter().flat_map(|name| {
        DOG_BREEDS.iter().flat_map(move |breed| {
            DOG_TOYS.iter().map(move |toy| (*name, *breed, *toy))
        })
    })
}

/// Writes the header plus one row per combination and returns the row count.
pub fn write_fixtures<W: Write>(writer: W) -> Result<usize, csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for (dog_name, breed, toy) in combinations() {
        writer.serialize(FixtureRow {
            timestamp: Utc::now().naive_utc(),
            dog_name,
            breed,
            toy,
        })?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}
