//! One B+ tree per indexed column, plus the conjunctive multi-column
//! search that intersects per-column id lists.

use std::fs;
use std::path::{Path, PathBuf};

use storage::RecordId;

use crate::btree::{
    BPlusTree, IndexError, IndexResult, FANOUT_INT, FANOUT_REAL, FANOUT_TEXT,
};
use crate::interval::Interval;

/// Key domain of an indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Int,
    Real,
    Text,
}

impl KeyType {
    /// Fanout that fills one block for this key width.
    pub fn default_fanout(self) -> usize {
        match self {
            KeyType::Int => FANOUT_INT,
            KeyType::Real => FANOUT_REAL,
            KeyType::Text => FANOUT_TEXT,
        }
    }
}

/// One typed column value, as supplied by the bulk build and returned by
/// row projection.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Int(i32),
    Real(f64),
    Text(String),
}

/// Per-column disjunction of intervals; the empty set means "no filter on
/// this column".
#[derive(Debug, Clone)]
pub enum IntervalSet {
    Int(Vec<Interval<i32>>),
    Real(Vec<Interval<f64>>),
    Text(Vec<Interval<String>>),
}

impl IntervalSet {
    pub fn is_empty(&self) -> bool {
        match self {
            IntervalSet::Int(set) => set.is_empty(),
            IntervalSet::Real(set) => set.is_empty(),
            IntervalSet::Text(set) => set.is_empty(),
        }
    }
}

/// A column name paired with its interval set.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub column: String,
    pub set: IntervalSet,
}

enum ColumnTree {
    Int(BPlusTree<i32>),
    Real(BPlusTree<f64>),
    Text(BPlusTree<String>),
}

impl ColumnTree {
    fn row_count(&self) -> u64 {
        match self {
            ColumnTree::Int(tree) => tree.row_count(),
            ColumnTree::Real(tree) => tree.row_count(),
            ColumnTree::Text(tree) => tree.row_count(),
        }
    }
}

struct IndexedColumn {
    name: String,
    tree: ColumnTree,
}

/// Holds the per-column trees of one dataset, one file per column under a
/// designated directory.
pub struct IndexManager {
    #[allow(dead_code)]
    dir: PathBuf,
    columns: Vec<IndexedColumn>,
}

impl IndexManager {
    /// Opens (creating if absent) one tree file per indexed column.
    pub fn open(dir: &Path, specs: &[(&str, KeyType)]) -> IndexResult<Self> {
        fs::create_dir_all(dir)?;
        let mut columns = Vec::with_capacity(specs.len());
        for &(name, key_type) in specs {
            let path = dir.join(format!("{}.idx", name));
            let fanout = key_type.default_fanout();
            let tree = match key_type {
                KeyType::Int => ColumnTree::Int(BPlusTree::open(&path, fanout)?),
                KeyType::Real => ColumnTree::Real(BPlusTree::open(&path, fanout)?),
                KeyType::Text => ColumnTree::Text(BPlusTree::open(&path, fanout)?),
            };
            columns.push(IndexedColumn {
                name: name.to_string(),
                tree,
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            columns,
        })
    }

    /// Rows indexed so far, taken from the first column's tree.
    pub fn row_count(&self) -> u64 {
        self.columns
            .first()
            .map(|column| column.tree.row_count())
            .unwrap_or(0)
    }

    /// Indexes one record: `values` in declared column order, one insert
    /// per tree.
    pub fn insert_row(&mut self, rid: RecordId, values: &[KeyValue]) -> IndexResult<()> {
        if values.len() != self.columns.len() {
            return Err(IndexError::RowArity {
                got: values.len(),
                want: self.columns.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(values.iter()) {
            match (&mut column.tree, value) {
                (ColumnTree::Int(tree), KeyValue::Int(key)) => tree.insert(*key, rid)?,
                (ColumnTree::Real(tree), KeyValue::Real(key)) => tree.insert(*key, rid)?,
                (ColumnTree::Text(tree), KeyValue::Text(key)) => tree.insert(key.clone(), rid)?,
                _ => return Err(IndexError::KeyTypeMismatch(column.name.clone())),
            }
        }
        Ok(())
    }

    /// Conjunctive multi-column search: evaluates each predicate's interval
    /// set, then intersects the sorted id lists smallest-first, stopping as
    /// soon as the running result is empty. A column with an empty interval
    /// set imposes no constraint.
    pub fn search(&self, predicates: &[Predicate]) -> IndexResult<Vec<RecordId>> {
        let mut lists = Vec::new();
        for predicate in predicates {
            let column = self
                .columns
                .iter()
                .find(|column| column.name == predicate.column)
                .ok_or_else(|| IndexError::UnknownColumn(predicate.column.clone()))?;
            if predicate.set.is_empty() {
                continue;
            }
            let ids = match (&column.tree, &predicate.set) {
                (ColumnTree::Int(tree), IntervalSet::Int(set)) => tree.eval_interval_set(set)?,
                (ColumnTree::Real(tree), IntervalSet::Real(set)) => tree.eval_interval_set(set)?,
                (ColumnTree::Text(tree), IntervalSet::Text(set)) => tree.eval_interval_set(set)?,
                _ => return Err(IndexError::KeyTypeMismatch(column.name.clone())),
            };
            lists.push(ids);
        }

        if lists.is_empty() {
            return Ok((0..self.row_count() as RecordId).collect());
        }

        lists.sort_by_key(|list| list.len());
        let mut iter = lists.into_iter();
        let mut result = iter.next().unwrap_or_default();
        for list in iter {
            if result.is_empty() {
                break;
            }
            result = intersect(&result, &list);
        }
        Ok(result)
    }
}

/// Two-pointer intersection of sorted unique id lists.
fn intersect(a: &[RecordId], b: &[RecordId]) -> Vec<RecordId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if b[j] < a[i] {
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }
    out
}
