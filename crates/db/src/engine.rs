//! Ties the column store and the per-column trees together: open-or-ingest
//! on startup, index build when the trees are absent or stale, and the
//! search/project pair the prompt drives.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use index::{IndexManager, Predicate};
use log::{info, warn};
use storage::RecordId;

use crate::loader;
use crate::schema;
use crate::store::{ColumnStore, ProjectedRow};

const BUILD_PROGRESS_EVERY: usize = 10_000;

pub struct Engine {
    store: ColumnStore,
    indexes: IndexManager,
}

impl Engine {
    /// Opens the data directory. When column files are present they are
    /// loaded; otherwise `csv` is ingested and saved. Indexes are reopened
    /// from disk if they match the store's row count and rebuilt if not.
    pub fn open(data_dir: &Path, csv: Option<&Path>) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("create data directory {}", data_dir.display()))?;

        let mut store = ColumnStore::new(data_dir);
        let loaded = store.load()?;
        if loaded > 0 {
            info!("loaded {} rows from {}", loaded, data_dir.display());
        } else {
            let csv = csv.ok_or_else(|| {
                anyhow!(
                    "no column data in {} and no csv file to ingest",
                    data_dir.display()
                )
            })?;
            let rows = loader::load_csv(csv, &mut store)?;
            if rows == 0 {
                bail!("no records loaded from {}", csv.display());
            }
            store.save().context("save column files")?;
        }

        let index_dir = data_dir.join("index");
        let indexes = IndexManager::open(&index_dir, &schema::index_specs())?;
        let indexes = if indexes.row_count() == store.row_count() as u64 {
            indexes
        } else {
            if indexes.row_count() > 0 {
                warn!(
                    "index row count {} does not match store row count {}; rebuilding",
                    indexes.row_count(),
                    store.row_count()
                );
            }
            drop(indexes);
            fs::remove_dir_all(&index_dir)
                .with_context(|| format!("clear index directory {}", index_dir.display()))?;
            build_indexes(&store, &index_dir)?
        };

        Ok(Self { store, indexes })
    }

    pub fn row_count(&self) -> usize {
        self.store.row_count()
    }

    /// Conjunctive multi-column search; the result is sorted and
    /// duplicate-free.
    pub fn search(&self, predicates: &[Predicate]) -> Result<Vec<RecordId>> {
        Ok(self.indexes.search(predicates)?)
    }

    /// Materializes the given rows for the given columns through the
    /// selective fetch path.
    pub fn project(&self, ids: &[RecordId], columns: &[&str]) -> Result<Vec<ProjectedRow>> {
        self.store.project(ids, columns)
    }
}

fn build_indexes(store: &ColumnStore, index_dir: &Path) -> Result<IndexManager> {
    let mut indexes = IndexManager::open(index_dir, &schema::index_specs())?;
    info!("building indexes for {} rows", store.row_count());
    for rid in 0..store.row_count() {
        let values = store.values_at(rid)?;
        indexes.insert_row(rid as RecordId, &values)?;
        if rid > 0 && rid % BUILD_PROGRESS_EVERY == 0 {
            info!("indexed {} / {} rows", rid, store.row_count());
        }
    }
    info!("index build complete for {} rows", store.row_count());
    Ok(indexes)
}
