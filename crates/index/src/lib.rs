mod btree;
mod interval;
mod manager;
mod node;

pub use btree::{BPlusTree, IndexError, IndexResult, FANOUT_INT, FANOUT_REAL, FANOUT_TEXT};
pub use interval::Interval;
pub use manager::{IndexManager, IntervalSet, KeyType, KeyValue, Predicate};
pub use storage::{FixedWidth, RecordId};
