//! The ten-column store: in-memory vectors for the bulk path, one paged
//! column file per attribute for persistence, and a selective-fetch row
//! projection for query results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use index::KeyValue;
use log::warn;
use storage::{ColumnFile, FixedWidth, RecordId};

/// One parsed CSV row.
#[derive(Debug, Clone)]
pub struct ResaleRecord {
    pub month: String,
    pub town: String,
    pub flat_type: String,
    pub block: String,
    pub street_name: String,
    pub storey_range: String,
    pub floor_area_sqm: f64,
    pub flat_model: String,
    pub lease_commence_date: i32,
    pub resale_price: f64,
}

/// A projected query result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRow {
    pub id: RecordId,
    pub values: Vec<KeyValue>,
}

pub struct ColumnStore {
    dir: PathBuf,
    months: Vec<String>,
    towns: Vec<String>,
    flat_types: Vec<String>,
    blocks: Vec<String>,
    street_names: Vec<String>,
    storey_ranges: Vec<String>,
    floor_areas: Vec<f64>,
    flat_models: Vec<String>,
    lease_commence_dates: Vec<i32>,
    resale_prices: Vec<f64>,
    row_count: usize,
}

impl ColumnStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            months: Vec::new(),
            towns: Vec::new(),
            flat_types: Vec::new(),
            blocks: Vec::new(),
            street_names: Vec::new(),
            storey_ranges: Vec::new(),
            floor_areas: Vec::new(),
            flat_models: Vec::new(),
            lease_commence_dates: Vec::new(),
            resale_prices: Vec::new(),
            row_count: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Appends one record to every column, keeping all lengths equal.
    pub fn push(&mut self, record: ResaleRecord) {
        self.months.push(record.month);
        self.towns.push(record.town);
        self.flat_types.push(record.flat_type);
        self.blocks.push(record.block);
        self.street_names.push(record.street_name);
        self.storey_ranges.push(record.storey_range);
        self.floor_areas.push(record.floor_area_sqm);
        self.flat_models.push(record.flat_model);
        self.lease_commence_dates.push(record.lease_commence_date);
        self.resale_prices.push(record.resale_price);
        self.row_count += 1;
    }

    /// Writes every column to its paged file.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        self.text_file("month").write_all(&self.months)?;
        self.text_file("town").write_all(&self.towns)?;
        self.text_file("flat_type").write_all(&self.flat_types)?;
        self.text_file("block").write_all(&self.blocks)?;
        self.text_file("street_name").write_all(&self.street_names)?;
        self.text_file("storey_range").write_all(&self.storey_ranges)?;
        self.real_file("floor_area_sqm").write_all(&self.floor_areas)?;
        self.text_file("flat_model").write_all(&self.flat_models)?;
        self.int_file("lease_commence_date")
            .write_all(&self.lease_commence_dates)?;
        self.real_file("resale_price").write_all(&self.resale_prices)?;
        Ok(())
    }

    /// Loads every column from disk. Missing or unreadable files load as
    /// empty; if the per-column lengths disagree, the median length becomes
    /// the authoritative row count.
    pub fn load(&mut self) -> Result<usize> {
        self.months = load_or_empty(&self.text_file("month"));
        self.towns = load_or_empty(&self.text_file("town"));
        self.flat_types = load_or_empty(&self.text_file("flat_type"));
        self.blocks = load_or_empty(&self.text_file("block"));
        self.street_names = load_or_empty(&self.text_file("street_name"));
        self.storey_ranges = load_or_empty(&self.text_file("storey_range"));
        self.floor_areas = load_or_empty(&self.real_file("floor_area_sqm"));
        self.flat_models = load_or_empty(&self.text_file("flat_model"));
        self.lease_commence_dates = load_or_empty(&self.int_file("lease_commence_date"));
        self.resale_prices = load_or_empty(&self.real_file("resale_price"));

        let lengths = [
            self.months.len(),
            self.towns.len(),
            self.flat_types.len(),
            self.blocks.len(),
            self.street_names.len(),
            self.storey_ranges.len(),
            self.floor_areas.len(),
            self.flat_models.len(),
            self.lease_commence_dates.len(),
            self.resale_prices.len(),
        ];
        if lengths.iter().all(|&len| len == lengths[0]) {
            self.row_count = lengths[0];
        } else {
            let mut sorted = lengths;
            sorted.sort_unstable();
            let median = sorted[lengths.len() / 2];
            warn!(
                "column lengths disagree after load ({:?}); using median {} as row count",
                lengths, median
            );
            self.row_count = median;
        }
        Ok(self.row_count)
    }

    /// The row's values in declared column order, for index building.
    pub fn values_at(&self, rid: usize) -> Result<Vec<KeyValue>> {
        let row = (|| {
            Some(vec![
                KeyValue::Text(self.months.get(rid)?.clone()),
                KeyValue::Text(self.towns.get(rid)?.clone()),
                KeyValue::Text(self.flat_types.get(rid)?.clone()),
                KeyValue::Text(self.blocks.get(rid)?.clone()),
                KeyValue::Text(self.street_names.get(rid)?.clone()),
                KeyValue::Text(self.storey_ranges.get(rid)?.clone()),
                KeyValue::Real(*self.floor_areas.get(rid)?),
                KeyValue::Text(self.flat_models.get(rid)?.clone()),
                KeyValue::Int(*self.lease_commence_dates.get(rid)?),
                KeyValue::Real(*self.resale_prices.get(rid)?),
            ])
        })();
        match row {
            Some(values) => Ok(values),
            None => bail!("record {} is missing from at least one column", rid),
        }
    }

    /// Selective fetch of one column, straight from its paged file.
    /// Out-of-range ids are skipped; the output order is unspecified.
    pub fn fetch_column(&self, name: &str, ids: &[RecordId]) -> Result<Vec<(RecordId, KeyValue)>> {
        let hits = match name {
            "month" | "town" | "flat_type" | "block" | "street_name" | "storey_range"
            | "flat_model" => self
                .text_file(name)
                .fetch(ids)?
                .into_iter()
                .map(|(id, value)| (id, KeyValue::Text(value)))
                .collect(),
            "floor_area_sqm" | "resale_price" => self
                .real_file(name)
                .fetch(ids)?
                .into_iter()
                .map(|(id, value)| (id, KeyValue::Real(value)))
                .collect(),
            "lease_commence_date" => self
                .int_file(name)
                .fetch(ids)?
                .into_iter()
                .map(|(id, value)| (id, KeyValue::Int(value)))
                .collect(),
            _ => bail!("unknown column {:?}", name),
        };
        Ok(hits)
    }

    /// Materializes the requested rows, reading only the blocks that
    /// contain them. Rows drop out when any column misses the id.
    pub fn project(&self, ids: &[RecordId], columns: &[&str]) -> Result<Vec<ProjectedRow>> {
        let mut per_column: Vec<HashMap<RecordId, KeyValue>> = Vec::with_capacity(columns.len());
        for name in columns {
            let hits = self.fetch_column(name, ids)?;
            per_column.push(hits.into_iter().collect());
        }

        let mut rows = Vec::with_capacity(ids.len());
        'next_id: for &id in ids {
            let mut values = Vec::with_capacity(columns.len());
            for column in &per_column {
                match column.get(&id) {
                    Some(value) => values.push(value.clone()),
                    None => continue 'next_id,
                }
            }
            rows.push(ProjectedRow { id, values });
        }
        Ok(rows)
    }

    fn column_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.col", name))
    }

    fn text_file(&self, name: &str) -> ColumnFile<String> {
        ColumnFile::new(self.column_path(name))
    }

    fn real_file(&self, name: &str) -> ColumnFile<f64> {
        ColumnFile::new(self.column_path(name))
    }

    fn int_file(&self, name: &str) -> ColumnFile<i32> {
        ColumnFile::new(self.column_path(name))
    }
}

fn load_or_empty<T: FixedWidth>(column: &ColumnFile<T>) -> Vec<T> {
    match column.load_all() {
        Ok(values) => values,
        Err(err) => {
            warn!(
                "failed to load {}: {}; treating column as empty",
                column.path().display(),
                err
            );
            Vec::new()
        }
    }
}
