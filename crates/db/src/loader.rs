//! CSV bulk ingest. One pass, row order; a malformed row is logged and
//! skipped so the all-columns-equal-length invariant holds by
//! construction.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::store::{ColumnStore, ResaleRecord};

const EXPECTED_COLUMNS: usize = 10;

/// Reads the CSV at `path` into the store. Returns how many records were
/// accepted.
pub fn load_csv(path: &Path, store: &mut ColumnStore) -> Result<usize> {
    let file =
        File::open(path).with_context(|| format!("open csv file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    match lines.next() {
        Some(header) => {
            header.context("read csv header line")?;
        }
        None => bail!("csv file {} is empty", path.display()),
    }

    let mut loaded = 0usize;
    let mut skipped = 0usize;
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(&line) {
            Ok(record) => {
                store.push(record);
                loaded += 1;
            }
            Err(reason) => {
                // header is line 1, first data row line 2
                warn!("skipping csv line {}: {}", index + 2, reason);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{} malformed rows skipped", skipped);
    }
    info!("loaded {} records from {}", loaded, path.display());
    Ok(loaded)
}

fn parse_record(line: &str) -> Result<ResaleRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != EXPECTED_COLUMNS {
        return Err(format!(
            "expected {} columns, found {}",
            EXPECTED_COLUMNS,
            fields.len()
        ));
    }

    let floor_area_sqm = fields[6]
        .parse::<f64>()
        .map_err(|_| format!("invalid floor area {:?}", fields[6]))?;
    let lease_commence_date = fields[8]
        .parse::<i32>()
        .map_err(|_| format!("invalid lease commence date {:?}", fields[8]))?;
    let resale_price = fields[9]
        .parse::<f64>()
        .map_err(|_| format!("invalid resale price {:?}", fields[9]))?;

    Ok(ResaleRecord {
        month: fields[0].to_string(),
        town: fields[1].to_string(),
        flat_type: fields[2].to_string(),
        block: fields[3].to_string(),
        street_name: fields[4].to_string(),
        storey_range: fields[5].to_string(),
        floor_area_sqm,
        flat_model: fields[7].to_string(),
        lease_commence_date,
        resale_price,
    })
}
