//! Interval evaluation over a tree's leaf-chain scan.
//!
//! Every shape reduces to a lower-bound-rooted scan: bounded shapes scan
//! `[start, end]` and drop excluded endpoints, right-unbounded shapes scan
//! without an end bound, and left-unbounded shapes are the complement of
//! the opposite right-unbounded shape against the full id range `[0, N)`.

use std::cmp::Ordering;

use storage::{FixedWidth, RecordId};

use crate::btree::{BPlusTree, IndexResult};

/// One interval on a key domain. Unbounded shapes carry only the bound they
/// use.
#[derive(Debug, Clone, PartialEq)]
pub enum Interval<K> {
    /// `[start, end]`
    Closed { start: K, end: K },
    /// `[start, end)`
    ClosedOpen { start: K, end: K },
    /// `(start, end]`
    OpenClosed { start: K, end: K },
    /// `(start, end)`
    Open { start: K, end: K },
    /// `[start, ∞)`
    From { start: K },
    /// `(start, ∞)`
    FromOpen { start: K },
    /// `(-∞, end]`
    UpTo { end: K },
    /// `(-∞, end)`
    UpToOpen { end: K },
}

impl<K: FixedWidth> BPlusTree<K> {
    /// Record ids whose key falls inside `interval`, unsorted and possibly
    /// with duplicates (one hit per matching tree entry).
    pub fn eval_interval(&self, interval: &Interval<K>) -> IndexResult<Vec<RecordId>> {
        match interval {
            Interval::Closed { start, end } => self.bounded(start, end, true, true),
            Interval::ClosedOpen { start, end } => self.bounded(start, end, true, false),
            Interval::OpenClosed { start, end } => self.bounded(start, end, false, true),
            Interval::Open { start, end } => self.bounded(start, end, false, false),
            Interval::From { start } => self.from(start, true),
            Interval::FromOpen { start } => self.from(start, false),
            Interval::UpTo { end } => Ok(self.complement(self.from(end, false)?)),
            Interval::UpToOpen { end } => Ok(self.complement(self.from(end, true)?)),
        }
    }

    /// Union of the intervals in the set, as a sorted duplicate-free id
    /// list. The empty set means "no filter" and yields every id in
    /// `[0, N)`.
    pub fn eval_interval_set(&self, intervals: &[Interval<K>]) -> IndexResult<Vec<RecordId>> {
        if intervals.is_empty() {
            return Ok((0..self.row_count() as RecordId).collect());
        }
        let mut ids = Vec::new();
        for interval in intervals {
            ids.extend(self.eval_interval(interval)?);
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn bounded(
        &self,
        start: &K,
        end: &K,
        include_start: bool,
        include_end: bool,
    ) -> IndexResult<Vec<RecordId>> {
        if start.compare(end) == Ordering::Greater {
            return Ok(Vec::new());
        }
        let hits = self.scan(start, Some(end))?;
        Ok(hits
            .into_iter()
            .filter(|(key, _)| {
                (include_start || key.compare(start) != Ordering::Equal)
                    && (include_end || key.compare(end) != Ordering::Equal)
            })
            .map(|(_, rid)| rid)
            .collect())
    }

    fn from(&self, start: &K, inclusive: bool) -> IndexResult<Vec<RecordId>> {
        let hits = self.scan(start, None)?;
        Ok(hits
            .into_iter()
            .filter(|(key, _)| inclusive || key.compare(start) != Ordering::Equal)
            .map(|(_, rid)| rid)
            .collect())
    }

    /// `[0, N)` minus the matched ids; the only place the evaluator needs
    /// the total row count.
    fn complement(&self, matched: Vec<RecordId>) -> Vec<RecordId> {
        let mut matched = matched;
        matched.sort_unstable();
        matched.dedup();

        let mut out = Vec::with_capacity(self.row_count() as usize - matched.len());
        let mut excluded = matched.into_iter().peekable();
        for id in 0..self.row_count() as RecordId {
            if excluded.peek() == Some(&id) {
                excluded.next();
            } else {
                out.push(id);
            }
        }
        out
    }
}
