//! On-disk B+ tree nodes, one block each.
//!
//! Layout (little-endian):
//!   byte 0        node kind (1 = leaf, 2 = internal)
//!   bytes 2..4    key count (u16)
//!   bytes 4..     `fanout` inline key slots of `K::WIDTH` bytes
//!   then          `fanout + 1` i64 info slots
//!
//! For leaves, info slot `i` holds the record id paired with key `i` and the
//! last slot holds the next-leaf offset (`NO_OFFSET` at the end of the
//! chain). For internal nodes, slots `0..=key_count` hold child offsets.
//! Unused slots are `NO_OFFSET`.

use storage::{BlockOffset, FixedWidth, BLOCK_SIZE, NO_OFFSET};

use crate::btree::{IndexError, IndexResult};

const NODE_KIND_LEAF: u8 = 1;
const NODE_KIND_INTERNAL: u8 = 2;

const NODE_HEADER_SIZE: usize = 4;
const INFO_SLOT_SIZE: usize = 8;

/// Byte size of a node with the given shape.
pub const fn node_size(fanout: usize, key_width: usize) -> usize {
    NODE_HEADER_SIZE + fanout * key_width + (fanout + 1) * INFO_SLOT_SIZE
}

/// Largest key count per node that still fits one block.
pub const fn max_fanout(key_width: usize) -> usize {
    (BLOCK_SIZE - NODE_HEADER_SIZE - INFO_SLOT_SIZE) / (key_width + INFO_SLOT_SIZE)
}

#[derive(Debug, Clone)]
pub(crate) struct LeafNode<K> {
    pub keys: Vec<K>,
    pub rids: Vec<i64>,
    pub next: BlockOffset,
}

impl<K> LeafNode<K> {
    pub fn empty() -> Self {
        Self {
            keys: Vec::new(),
            rids: Vec::new(),
            next: NO_OFFSET,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InternalNode<K> {
    pub keys: Vec<K>,
    pub children: Vec<BlockOffset>,
}

#[derive(Debug, Clone)]
pub(crate) enum Node<K> {
    Leaf(LeafNode<K>),
    Internal(InternalNode<K>),
}

impl<K: FixedWidth> Node<K> {
    pub fn encode(&self, fanout: usize) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        let info_base = NODE_HEADER_SIZE + fanout * K::WIDTH;
        for slot in 0..=fanout {
            write_info(&mut block, info_base, slot, NO_OFFSET);
        }
        match self {
            Node::Leaf(leaf) => {
                block[0] = NODE_KIND_LEAF;
                block[2..4].copy_from_slice(&(leaf.keys.len() as u16).to_le_bytes());
                for (i, key) in leaf.keys.iter().enumerate() {
                    let at = NODE_HEADER_SIZE + i * K::WIDTH;
                    key.encode(&mut block[at..at + K::WIDTH]);
                }
                for (i, &rid) in leaf.rids.iter().enumerate() {
                    write_info(&mut block, info_base, i, rid);
                }
                write_info(&mut block, info_base, fanout, leaf.next);
            }
            Node::Internal(node) => {
                block[0] = NODE_KIND_INTERNAL;
                block[2..4].copy_from_slice(&(node.keys.len() as u16).to_le_bytes());
                for (i, key) in node.keys.iter().enumerate() {
                    let at = NODE_HEADER_SIZE + i * K::WIDTH;
                    key.encode(&mut block[at..at + K::WIDTH]);
                }
                for (i, &child) in node.children.iter().enumerate() {
                    write_info(&mut block, info_base, i, child);
                }
            }
        }
        block
    }

    pub fn decode(block: &[u8], fanout: usize) -> IndexResult<Self> {
        let key_count = u16::from_le_bytes([block[2], block[3]]) as usize;
        if key_count > fanout {
            return Err(IndexError::Corrupt(format!(
                "node key count {} exceeds fanout {}",
                key_count, fanout
            )));
        }
        let info_base = NODE_HEADER_SIZE + fanout * K::WIDTH;
        let mut keys = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let at = NODE_HEADER_SIZE + i * K::WIDTH;
            keys.push(K::decode(&block[at..at + K::WIDTH]));
        }
        match block[0] {
            NODE_KIND_LEAF => {
                let rids = (0..key_count)
                    .map(|i| read_info(block, info_base, i))
                    .collect();
                let next = read_info(block, info_base, fanout);
                Ok(Node::Leaf(LeafNode { keys, rids, next }))
            }
            NODE_KIND_INTERNAL => {
                let children = (0..=key_count)
                    .map(|i| read_info(block, info_base, i))
                    .collect();
                Ok(Node::Internal(InternalNode { keys, children }))
            }
            other => Err(IndexError::Corrupt(format!("unknown node kind {}", other))),
        }
    }
}

fn write_info(block: &mut [u8], info_base: usize, slot: usize, value: i64) {
    let at = info_base + slot * INFO_SLOT_SIZE;
    block[at..at + INFO_SLOT_SIZE].copy_from_slice(&value.to_le_bytes());
}

fn read_info(block: &[u8], info_base: usize, slot: usize) -> i64 {
    let at = info_base + slot * INFO_SLOT_SIZE;
    let mut bytes = [0u8; INFO_SLOT_SIZE];
    bytes.copy_from_slice(&block[at..at + INFO_SLOT_SIZE]);
    i64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::FIXED_STRING_LEN;

    #[test]
    fn default_fanouts_fit_one_block() {
        assert_eq!(max_fanout(4), 41);
        assert_eq!(max_fanout(8), 31);
        assert_eq!(max_fanout(FIXED_STRING_LEN), 6);
        assert!(node_size(max_fanout(4), 4) <= BLOCK_SIZE);
        assert!(node_size(max_fanout(8), 8) <= BLOCK_SIZE);
        assert!(node_size(max_fanout(FIXED_STRING_LEN), FIXED_STRING_LEN) <= BLOCK_SIZE);
    }

    #[test]
    fn leaf_round_trips() {
        let leaf = Node::Leaf(LeafNode {
            keys: vec![3i32, 7, 9],
            rids: vec![0, 1, 2],
            next: 1024,
        });
        let block = leaf.encode(4);
        match Node::<i32>::decode(&block, 4).unwrap() {
            Node::Leaf(decoded) => {
                assert_eq!(decoded.keys, vec![3, 7, 9]);
                assert_eq!(decoded.rids, vec![0, 1, 2]);
                assert_eq!(decoded.next, 1024);
            }
            Node::Internal(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn empty_leaf_has_chain_sentinel() {
        let block = Node::<f64>::Leaf(LeafNode::empty()).encode(31);
        match Node::<f64>::decode(&block, 31).unwrap() {
            Node::Leaf(decoded) => {
                assert!(decoded.keys.is_empty());
                assert_eq!(decoded.next, NO_OFFSET);
            }
            Node::Internal(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn internal_round_trips_with_string_keys() {
        let node = Node::Internal(InternalNode {
            keys: vec!["BEDOK".to_string(), "JURONG WEST".to_string()],
            children: vec![512, 1024, 1536],
        });
        let block = node.encode(6);
        match Node::<String>::decode(&block, 6).unwrap() {
            Node::Internal(decoded) => {
                assert_eq!(decoded.keys, vec!["BEDOK", "JURONG WEST"]);
                assert_eq!(decoded.children, vec![512, 1024, 1536]);
            }
            Node::Leaf(_) => panic!("expected internal"),
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        let block = [0u8; BLOCK_SIZE];
        assert!(Node::<i32>::decode(&block, 4).is_err());

        let mut block = [0u8; BLOCK_SIZE];
        block[0] = NODE_KIND_LEAF;
        block[2..4].copy_from_slice(&100u16.to_le_bytes());
        assert!(Node::<i32>::decode(&block, 4).is_err());
    }
}
