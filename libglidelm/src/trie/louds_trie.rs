//! A succinct traversable trie using the Level-Order Unary Degree Sequence
//! (LOUDS) representation.
//!
//! The trie structure costs about two bits per node, and the level-order
//! numbering doubles as a free key-to-dense-id map: nodes are numbered
//! 0..N in BFS order (the root is 0), and value-bearing nodes are numbered
//! independently, in the same order, as terminal-ids. Both directions of
//! the node/terminal mapping are constant time.
//!
//! The shape bit-vector holds a single leading 1 for the root followed by
//! each node's degree in unary (`1^deg 0`) in level order, so N nodes
//! produce exactly N ones and N zeros. The k-th one corresponds to node k,
//! and the k-th zero terminates node k's degree block. Edge labels are
//! stored in a separate vector ordered by child node-id.

use std::collections::VecDeque;
use std::io::{Read, Write};

use anyhow::{bail, Result};

use crate::succinct::bit_vector::BitVector;
use crate::succinct::int_vector::{Element, IntVector};
use crate::wire::{ModelMapper, ModelReader, ModelWriter};

pub type LoudsNodeId = u32;
pub type LoudsTerminalId = u32;

pub const ROOT_NODE_ID: LoudsNodeId = 0;

/// A LOUDS trie over symbol type `S` with a value of type `V` per terminal.
///
/// When `has_explicit_terminals` is false, every node except the root is a
/// terminal and `terminal_id == node_id - 1`; otherwise a separate
/// bit-vector marks the terminal nodes.
pub struct LoudsTrie<S: Element + Ord, V: Element + Default> {
    shape: BitVector,
    labels: IntVector<S>,
    is_terminal: Option<BitVector>,
    values: IntVector<V>,
}

/// Collects key/value pairs and freezes them into a [`LoudsTrie`].
pub struct LoudsTrieBuilder<S, V> {
    entries: Vec<(Vec<S>, V)>,
    has_explicit_terminals: bool,
}

struct TreeNode<S, V> {
    children: Vec<(S, usize)>,
    value: Option<V>,
}

impl<S, V> Default for TreeNode<S, V> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            value: None,
        }
    }
}

impl<S: Element + Ord, V: Element + Default> LoudsTrieBuilder<S, V> {
    pub fn new(has_explicit_terminals: bool) -> Self {
        Self {
            entries: Vec::new(),
            has_explicit_terminals,
        }
    }

    pub fn add(&mut self, key: Vec<S>, value: V) {
        self.entries.push((key, value));
    }

    pub fn build(mut self) -> Result<LoudsTrie<S, V>> {
        if self.entries.is_empty() {
            bail!("cannot build a LOUDS trie from an empty key set");
        }
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        if self.entries.windows(2).any(|w| w[0].0 == w[1].0) {
            bail!("duplicate key in LOUDS trie input");
        }

        // Intermediate edge-labeled tree. Keys arrive sorted, so a new edge
        // at any node is either its last child (descend) or a fresh child
        // with a larger symbol (append); children stay ordered by symbol.
        let mut tree: Vec<TreeNode<S, V>> = vec![TreeNode::default()];
        for (key, value) in &self.entries {
            let mut node = 0usize;
            for &sym in key {
                let last_child = match tree[node].children.last() {
                    Some(&(last_sym, child)) if last_sym == sym => Some(child),
                    _ => None,
                };
                node = match last_child {
                    Some(child) => child,
                    None => {
                        tree.push(TreeNode::default());
                        let child = tree.len() - 1;
                        tree[node].children.push((sym, child));
                        child
                    }
                };
            }
            tree[node].value = Some(*value);
        }

        let mut shape = BitVector::new();
        shape.push_back(true);
        let mut labels = IntVector::new();
        let mut is_terminal = self.has_explicit_terminals.then(BitVector::new);
        let mut values = IntVector::new();

        let mut queue = VecDeque::from([0usize]);
        while let Some(idx) = queue.pop_front() {
            for &(sym, child) in &tree[idx].children {
                shape.push_back(true);
                labels.push_back(sym);
                queue.push_back(child);
            }
            shape.push_back(false);
            let value = tree[idx].value;
            if let Some(bv) = is_terminal.as_mut() {
                bv.push_back(value.is_some());
                if let Some(v) = value {
                    values.push_back(v);
                }
            } else if idx == 0 {
                if value.is_some() {
                    bail!("the empty key requires explicit terminals");
                }
            } else {
                values.push_back(value.unwrap_or_default());
            }
        }
        shape.build();
        if let Some(bv) = is_terminal.as_mut() {
            bv.build();
        }

        Ok(LoudsTrie {
            shape,
            labels,
            is_terminal,
            values,
        })
    }
}

impl<S: Element + Ord, V: Element + Default> LoudsTrie<S, V> {
    pub fn num_nodes(&self) -> usize {
        self.shape.num_ones()
    }

    pub fn num_terminals(&self) -> usize {
        self.values.len()
    }

    pub fn has_explicit_terminals(&self) -> bool {
        self.is_terminal.is_some()
    }

    // First position of node n's degree block in the shape bit-vector.
    fn block_start(&self, n: LoudsNodeId) -> usize {
        if n == 0 {
            1
        } else {
            self.shape.select0(n as usize - 1) + 1
        }
    }

    /// The node-id of `n`'s first child, or `None` for a leaf. The k-th
    /// child of `n` is `first_child + k` and its edge label is
    /// `labels[first_child - 1 + k]`.
    pub fn first_child_node_id(&self, n: LoudsNodeId) -> Option<LoudsNodeId> {
        let p = self.block_start(n);
        if p >= self.shape.len() || !self.shape.bit(p) {
            return None;
        }
        // The zeros before a block start equal its node's id.
        Some((p - n as usize) as LoudsNodeId)
    }

    pub fn degree(&self, n: LoudsNodeId) -> usize {
        self.shape.select0(n as usize) - self.block_start(n)
    }

    pub fn parent_node_id(&self, n: LoudsNodeId) -> Option<LoudsNodeId> {
        if n == 0 {
            return None;
        }
        Some(self.shape.rank0(self.shape.select1(n as usize)) as LoudsNodeId)
    }

    /// The label on the edge entering node `n` (n >= 1).
    pub fn label(&self, n: LoudsNodeId) -> S {
        self.labels.get(n as usize - 1)
    }

    /// Emits each child's edge label and node-id, in order, into the
    /// caller's buffers. The buffers are cleared first so callers can keep
    /// reusing them without reallocation.
    pub fn get_children(
        &self,
        n: LoudsNodeId,
        out_labels: &mut Vec<S>,
        out_node_ids: &mut Vec<LoudsNodeId>,
    ) {
        out_labels.clear();
        out_node_ids.clear();
        let Some(first) = self.first_child_node_id(n) else {
            return;
        };
        let deg = self.degree(n);
        out_labels.reserve(deg);
        out_node_ids.reserve(deg);
        for k in 0..deg {
            out_labels.push(self.labels.get(first as usize - 1 + k));
            out_node_ids.push(first + k as LoudsNodeId);
        }
    }

    fn child_with_label(&self, n: LoudsNodeId, sym: S) -> Option<LoudsNodeId> {
        let first = self.first_child_node_id(n)?;
        let base = first as usize - 1;
        let mut lo = 0usize;
        let mut hi = self.degree(n);
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.labels.get(base + mid).cmp(&sym) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(first + mid as LoudsNodeId),
            }
        }
        None
    }

    /// Resolves a key to a node-id by descending from the root.
    pub fn key_to_node_id(&self, key: &[S]) -> Option<LoudsNodeId> {
        let mut node = ROOT_NODE_ID;
        for &sym in key {
            node = self.child_with_label(node, sym)?;
        }
        Some(node)
    }

    /// Reconstructs the key for a node by walking parent edges to the root.
    pub fn node_id_to_key(&self, mut n: LoudsNodeId, key: &mut Vec<S>) {
        key.clear();
        while n != ROOT_NODE_ID {
            key.push(self.label(n));
            n = self.parent_node_id(n).unwrap_or(ROOT_NODE_ID);
        }
        key.reverse();
    }

    pub fn node_id_to_terminal_id(&self, n: LoudsNodeId) -> Option<LoudsTerminalId> {
        match &self.is_terminal {
            Some(bv) => {
                if bv.bit(n as usize) {
                    Some(bv.rank1(n as usize) as LoudsTerminalId)
                } else {
                    None
                }
            }
            None => {
                if n == 0 {
                    None
                } else {
                    Some(n - 1)
                }
            }
        }
    }

    pub fn terminal_id_to_node_id(&self, t: LoudsTerminalId) -> Option<LoudsNodeId> {
        if (t as usize) >= self.num_terminals() {
            return None;
        }
        match &self.is_terminal {
            Some(bv) => Some(bv.select1(t as usize) as LoudsNodeId),
            None => Some(t + 1),
        }
    }

    pub fn terminal_id_to_value(&self, t: LoudsTerminalId) -> V {
        self.values.get(t as usize)
    }

    pub fn key_to_terminal_id(&self, key: &[S]) -> Option<LoudsTerminalId> {
        self.node_id_to_terminal_id(self.key_to_node_id(key)?)
    }

    pub fn key_to_value(&self, key: &[S]) -> Option<V> {
        Some(self.terminal_id_to_value(self.key_to_terminal_id(key)?))
    }

    pub fn write_to<W: Write>(&self, w: &mut ModelWriter<W>) -> Result<()> {
        self.shape.write_to(w)?;
        self.labels.write_to(w)?;
        w.write_u8(self.is_terminal.is_some() as u8)?;
        if let Some(bv) = &self.is_terminal {
            bv.write_to(w)?;
        }
        self.values.write_to(w)
    }

    pub fn read_from<R: Read>(r: &mut ModelReader<R>) -> Result<Self> {
        let shape = BitVector::read_from(r)?;
        let labels = IntVector::read_from(r)?;
        let is_terminal = if r.read_u8()? != 0 {
            Some(BitVector::read_from(r)?)
        } else {
            None
        };
        let values = IntVector::read_from(r)?;
        Self::from_parts(shape, labels, is_terminal, values)
    }

    pub fn map_from(m: &mut ModelMapper) -> Result<Self> {
        let shape = BitVector::map_from(m)?;
        let labels = IntVector::map_from(m)?;
        let is_terminal = if m.map_u8()? != 0 {
            Some(BitVector::map_from(m)?)
        } else {
            None
        };
        let values = IntVector::map_from(m)?;
        Self::from_parts(shape, labels, is_terminal, values)
    }

    fn from_parts(
        shape: BitVector,
        labels: IntVector<S>,
        is_terminal: Option<BitVector>,
        values: IntVector<V>,
    ) -> Result<Self> {
        let num_nodes = shape.num_ones();
        if shape.num_zeros() != num_nodes {
            bail!(
                "corrupt trie shape: {} ones vs {} zeros",
                num_nodes,
                shape.num_zeros()
            );
        }
        if num_nodes == 0 || labels.len() != num_nodes - 1 {
            bail!(
                "corrupt trie: {} labels for {} nodes",
                labels.len(),
                num_nodes
            );
        }
        let expected_terminals = match &is_terminal {
            Some(bv) => {
                if bv.len() != num_nodes {
                    bail!("corrupt trie: terminal bits do not cover all nodes");
                }
                bv.num_ones()
            }
            None => num_nodes - 1,
        };
        if values.len() != expected_terminals {
            bail!(
                "corrupt trie: {} values for {} terminals",
                values.len(),
                expected_terminals
            );
        }
        Ok(Self {
            shape,
            labels,
            is_terminal,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_trie(entries: &[(&[u8], u8)], explicit: bool) -> LoudsTrie<u8, u8> {
        let mut builder = LoudsTrieBuilder::new(explicit);
        for (key, value) in entries {
            builder.add(key.to_vec(), *value);
        }
        builder.build().unwrap()
    }

    #[test]
    fn empty_and_duplicate_inputs_fail() {
        let builder = LoudsTrieBuilder::<u8, u8>::new(true);
        assert!(builder.build().is_err());

        let mut builder = LoudsTrieBuilder::<u8, u8>::new(true);
        builder.add(b"ab".to_vec(), 1);
        builder.add(b"ab".to_vec(), 2);
        assert!(builder.build().is_err());
    }

    #[test]
    fn shape_has_equal_ones_and_zeros() {
        let trie = byte_trie(&[(b"cat", 1), (b"car", 2), (b"dog", 3)], true);
        // cat/car/dog: root + c,a,t,r + d,o,g = 8 nodes.
        assert_eq!(trie.num_nodes(), 8);
        assert_eq!(trie.num_terminals(), 3);
    }

    #[test]
    fn key_node_round_trip() {
        let entries: Vec<(&[u8], u8)> = vec![
            (b"a".as_slice(), 1),
            (b"an", 2),
            (b"ant", 3),
            (b"bee", 4),
            (b"bet", 5),
        ];
        let trie = byte_trie(&entries, true);
        let mut key_buf = Vec::new();
        for (key, value) in &entries {
            let node = trie.key_to_node_id(key).unwrap();
            trie.node_id_to_key(node, &mut key_buf);
            assert_eq!(&key_buf, key);
            let terminal = trie.node_id_to_terminal_id(node).unwrap();
            assert_eq!(trie.terminal_id_to_node_id(terminal), Some(node));
            assert_eq!(trie.key_to_value(key), Some(*value));
        }
        assert_eq!(trie.key_to_node_id(b"ax"), None);
        assert_eq!(trie.key_to_node_id(b"bees"), None);
        // "be" is a path node but not a terminal.
        let be = trie.key_to_node_id(b"be").unwrap();
        assert_eq!(trie.node_id_to_terminal_id(be), None);
    }

    #[test]
    fn children_are_ordered_and_consecutive() {
        let trie = byte_trie(&[(b"ba", 1), (b"bc", 2), (b"bb", 3), (b"a", 4)], true);
        let mut labels = Vec::new();
        let mut ids = Vec::new();
        trie.get_children(ROOT_NODE_ID, &mut labels, &mut ids);
        assert_eq!(labels, vec![b'a', b'b']);
        assert_eq!(ids, vec![1, 2]);

        let b = trie.key_to_node_id(b"b").unwrap();
        trie.get_children(b, &mut labels, &mut ids);
        assert_eq!(labels, vec![b'a', b'b', b'c']);
        let first = trie.first_child_node_id(b).unwrap();
        assert_eq!(ids, vec![first, first + 1, first + 2]);
        for (&label, &id) in labels.iter().zip(&ids) {
            assert_eq!(trie.label(id), label);
            assert_eq!(trie.parent_node_id(id), Some(b));
        }
        // Leaves have no children.
        assert_eq!(trie.first_child_node_id(*ids.last().unwrap()), None);
    }

    #[test]
    fn implicit_terminals_number_nodes_minus_root() {
        // Every node is a terminal; terminal ids follow level order.
        let entries: Vec<(&[u16], u8)> = vec![
            (&[0], 10),
            (&[1], 11),
            (&[1, 5], 12),
            (&[2], 13),
        ];
        let mut builder = LoudsTrieBuilder::<u16, u8>::new(false);
        for (key, value) in &entries {
            builder.add(key.to_vec(), *value);
        }
        let trie = builder.build().unwrap();
        assert_eq!(trie.num_nodes(), 5);
        assert_eq!(trie.num_terminals(), 4);
        for (key, value) in &entries {
            let node = trie.key_to_node_id(key).unwrap();
            assert_eq!(trie.node_id_to_terminal_id(node), Some(node - 1));
            assert_eq!(trie.key_to_value(key), Some(*value));
        }
        // Depth-1 terminal ids equal the leading symbol when symbols 0..k
        // are all present.
        for sym in 0u16..3 {
            assert_eq!(trie.key_to_terminal_id(&[sym]), Some(sym as u32));
        }
    }

    #[test]
    fn serialization_round_trip() -> Result<()> {
        let entries: Vec<(&[u8], u8)> =
            vec![(b"x".as_slice(), 9), (b"xy", 8), (b"xyz", 7), (b"zz", 6)];
        let trie = byte_trie(&entries, true);

        let mut buf = Vec::new();
        trie.write_to(&mut ModelWriter::new(&mut buf))?;

        let read = LoudsTrie::<u8, u8>::read_from(&mut ModelReader::new(&buf[..]))?;
        let mut m = ModelMapper::from_bytes(std::sync::Arc::from(buf.into_boxed_slice()));
        let mapped = LoudsTrie::<u8, u8>::map_from(&mut m)?;
        for (key, value) in &entries {
            assert_eq!(read.key_to_value(key), Some(*value));
            assert_eq!(mapped.key_to_value(key), Some(*value));
        }
        assert_eq!(read.num_nodes(), trie.num_nodes());
        Ok(())
    }

    #[test]
    fn truncated_stream_fails_to_load() {
        let trie = byte_trie(&[(b"ab", 1)], true);
        let mut buf = Vec::new();
        trie.write_to(&mut ModelWriter::new(&mut buf)).unwrap();
        let truncated = &buf[..buf.len() / 2];
        assert!(LoudsTrie::<u8, u8>::read_from(&mut ModelReader::new(truncated)).is_err());
    }
}
