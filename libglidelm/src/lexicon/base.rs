//! The traversal surface the decoder consumes.

/// A node handle handed to the decoder while it walks the lexicon
/// character by character during beam search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexiconNode {
    /// The UTF-8 byte on the edge entering this node (0 for the root).
    pub label: u8,
    pub id: u64,
}

pub trait TraversableLexicon {
    fn root_node(&self) -> LexiconNode;

    /// Appends the node's children to `out` in label order.
    fn children(&self, node: &LexiconNode, out: &mut Vec<LexiconNode>);

    /// The unigram log probability if the node is a complete term.
    fn term_log_prob(&self, node: &LexiconNode) -> Option<f32>;

    /// The best-completion log probability for the prefix ending at this
    /// node, if the lexicon encodes prefix values.
    fn prefix_log_prob(&self, node: &LexiconNode) -> Option<f32>;
}
