//! Disk-resident B+ tree, generic over a fixed-width key codec.
//!
//! Block 0 of the tree file is a header holding the root offset and the
//! insertion count; nodes are appended after it, one block each, and
//! referenced by byte offset. Leaves chain through their last info slot in
//! ascending key order, which makes the leaf walk the sole sequential-read
//! primitive. The tree is insert-only and single-writer.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::path::Path;

use thiserror::Error;

use storage::{
    BlockFile, BlockOffset, FixedWidth, RecordId, StorageError, BLOCK_SIZE, FIXED_STRING_LEN,
    NO_OFFSET,
};

use crate::node::{max_fanout, node_size, InternalNode, LeafNode, Node};

/// Default key counts per node, sized so one node fills one block.
pub const FANOUT_INT: usize = max_fanout(4);
pub const FANOUT_REAL: usize = max_fanout(8);
pub const FANOUT_TEXT: usize = max_fanout(FIXED_STRING_LEN);

const HEADER_MAGIC: u32 = 0x31_54_50_42; // "BPT1"

/// Errors returned by the index layer.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("index io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index file corrupt: {0}")]
    Corrupt(String),
    #[error("fanout {fanout} does not fit a block with key width {key_width}")]
    BadFanout { fanout: usize, key_width: usize },
    #[error("unknown indexed column: {0}")]
    UnknownColumn(String),
    #[error("predicate type does not match key type of column {0}")]
    KeyTypeMismatch(String),
    #[error("row has {got} values, index has {want} columns")]
    RowArity { got: usize, want: usize },
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;

/// Carried upward when a child node had to split.
struct SplitResult<K> {
    separator: K,
    right: BlockOffset,
}

pub struct BPlusTree<K> {
    file: BlockFile,
    fanout: usize,
    root: BlockOffset,
    row_count: u64,
    _marker: PhantomData<K>,
}

impl<K: FixedWidth> BPlusTree<K> {
    /// Opens (creating if absent) a tree file. An empty file becomes an
    /// empty tree; an existing file must match the requested shape.
    pub fn open<P: AsRef<Path>>(path: P, fanout: usize) -> IndexResult<Self> {
        if fanout < 2 || node_size(fanout, K::WIDTH) > BLOCK_SIZE {
            return Err(IndexError::BadFanout {
                fanout,
                key_width: K::WIDTH,
            });
        }
        let file = BlockFile::open(path)?;
        let mut tree = Self {
            file,
            fanout,
            root: NO_OFFSET,
            row_count: 0,
            _marker: PhantomData,
        };
        if tree.file.is_empty() {
            let header = tree.header_block();
            tree.file.append(&header)?;
        } else {
            tree.read_header()?;
        }
        Ok(tree)
    }

    /// Number of insertions so far; doubles as the row count `N` that
    /// interval evaluation complements against.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }

    pub fn is_empty(&self) -> bool {
        self.root == NO_OFFSET
    }

    /// Inserts one `(key, record id)` pair. Duplicate keys are permitted and
    /// placed after existing equal keys, so scans return them in insertion
    /// order.
    pub fn insert(&mut self, key: K, rid: RecordId) -> IndexResult<()> {
        if self.root == NO_OFFSET {
            self.root = self.append_node(&Node::Leaf(LeafNode::empty()))?;
        }
        if let Some(split) = self.insert_at(self.root, key, rid as i64)? {
            let new_root = Node::Internal(InternalNode {
                keys: vec![split.separator],
                children: vec![self.root, split.right],
            });
            self.root = self.append_node(&new_root)?;
        }
        self.row_count += 1;
        self.write_header()
    }

    /// Key-range scan: all `(key, record id)` pairs with `key >= start`, in
    /// ascending key order, stopping past `end` when one is given.
    pub fn scan(&self, start: &K, end: Option<&K>) -> IndexResult<Vec<(K, RecordId)>> {
        let mut results = Vec::new();
        if self.root == NO_OFFSET {
            return Ok(results);
        }

        // Descend towards the first leaf that can hold `start`.
        let mut offset = self.root;
        let mut leaf = loop {
            match self.read_node(offset)? {
                Node::Internal(internal) => {
                    offset = internal.children[lower_bound(&internal.keys, start)];
                }
                Node::Leaf(leaf) => break leaf,
            }
        };

        // Walk the leaf chain until the end bound is exceeded.
        loop {
            for (key, &rid) in leaf.keys.iter().zip(leaf.rids.iter()) {
                if let Some(end) = end {
                    if key.compare(end) == Ordering::Greater {
                        return Ok(results);
                    }
                }
                if key.compare(start) != Ordering::Less {
                    results.push((key.clone(), rid as RecordId));
                }
            }
            if leaf.next == NO_OFFSET {
                return Ok(results);
            }
            leaf = match self.read_node(leaf.next)? {
                Node::Leaf(next) => next,
                Node::Internal(_) => {
                    return Err(IndexError::Corrupt(
                        "leaf chain points at an internal node".to_string(),
                    ))
                }
            };
        }
    }

    fn insert_at(
        &mut self,
        offset: BlockOffset,
        key: K,
        rid: i64,
    ) -> IndexResult<Option<SplitResult<K>>> {
        match self.read_node(offset)? {
            Node::Leaf(mut leaf) => {
                let at = upper_bound(&leaf.keys, &key);
                leaf.keys.insert(at, key);
                leaf.rids.insert(at, rid);

                if leaf.keys.len() <= self.fanout {
                    self.update_node(offset, &Node::Leaf(leaf))?;
                    return Ok(None);
                }

                // Overflow at fanout + 1 keys: left keeps the ceiling half,
                // the right sibling takes over the old chain pointer.
                let left_len = (leaf.keys.len() + 1) / 2;
                let right = LeafNode {
                    keys: leaf.keys.split_off(left_len),
                    rids: leaf.rids.split_off(left_len),
                    next: leaf.next,
                };
                let separator = right.keys[0].clone();
                let right_offset = self.append_node(&Node::Leaf(right))?;
                leaf.next = right_offset;
                self.update_node(offset, &Node::Leaf(leaf))?;
                Ok(Some(SplitResult {
                    separator,
                    right: right_offset,
                }))
            }
            Node::Internal(mut node) => {
                let child_at = upper_bound(&node.keys, &key);
                let split = match self.insert_at(node.children[child_at], key, rid)? {
                    Some(split) => split,
                    None => return Ok(None),
                };
                node.keys.insert(child_at, split.separator);
                node.children.insert(child_at + 1, split.right);

                if node.keys.len() <= self.fanout {
                    self.update_node(offset, &Node::Internal(node))?;
                    return Ok(None);
                }

                // Overflow: the middle key is promoted, not kept in either
                // sibling.
                let mid = (self.fanout + 1) / 2;
                let separator = node.keys[mid].clone();
                let right = InternalNode {
                    keys: node.keys.split_off(mid + 1),
                    children: node.children.split_off(mid + 1),
                };
                node.keys.truncate(mid);
                let right_offset = self.append_node(&Node::Internal(right))?;
                self.update_node(offset, &Node::Internal(node))?;
                Ok(Some(SplitResult {
                    separator,
                    right: right_offset,
                }))
            }
        }
    }

    fn read_node(&self, offset: BlockOffset) -> IndexResult<Node<K>> {
        let mut block = [0u8; BLOCK_SIZE];
        self.file.read(offset, &mut block)?;
        Node::decode(&block, self.fanout)
    }

    fn append_node(&mut self, node: &Node<K>) -> IndexResult<BlockOffset> {
        Ok(self.file.append(&node.encode(self.fanout))?)
    }

    fn update_node(&mut self, offset: BlockOffset, node: &Node<K>) -> IndexResult<()> {
        Ok(self.file.overwrite(offset, &node.encode(self.fanout))?)
    }

    fn header_block(&self) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        block[0..4].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
        block[4..6].copy_from_slice(&(self.fanout as u16).to_le_bytes());
        block[6..8].copy_from_slice(&(K::WIDTH as u16).to_le_bytes());
        block[8..16].copy_from_slice(&self.root.to_le_bytes());
        block[16..24].copy_from_slice(&self.row_count.to_le_bytes());
        block
    }

    fn write_header(&mut self) -> IndexResult<()> {
        let header = self.header_block();
        Ok(self.file.overwrite(0, &header)?)
    }

    fn read_header(&mut self) -> IndexResult<()> {
        let mut block = [0u8; BLOCK_SIZE];
        self.file.read(0, &mut block)?;

        let magic = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        if magic != HEADER_MAGIC {
            return Err(IndexError::Corrupt(format!(
                "bad tree file magic {:#010x}",
                magic
            )));
        }
        let fanout = u16::from_le_bytes([block[4], block[5]]) as usize;
        let key_width = u16::from_le_bytes([block[6], block[7]]) as usize;
        if fanout != self.fanout || key_width != K::WIDTH {
            return Err(IndexError::Corrupt(format!(
                "tree file has fanout {} / key width {}, expected {} / {}",
                fanout,
                key_width,
                self.fanout,
                K::WIDTH
            )));
        }

        let mut root = [0u8; 8];
        root.copy_from_slice(&block[8..16]);
        self.root = i64::from_le_bytes(root);
        let mut count = [0u8; 8];
        count.copy_from_slice(&block[16..24]);
        self.row_count = u64::from_le_bytes(count);
        Ok(())
    }
}

/// Index of the first key `>= key`.
fn lower_bound<K: FixedWidth>(keys: &[K], key: &K) -> usize {
    keys.iter()
        .position(|k| k.compare(key) != Ordering::Less)
        .unwrap_or(keys.len())
}

/// Index of the first key `> key`; ties go right.
fn upper_bound<K: FixedWidth>(keys: &[K], key: &K) -> usize {
    keys.iter()
        .position(|k| k.compare(key) == Ordering::Greater)
        .unwrap_or(keys.len())
}
