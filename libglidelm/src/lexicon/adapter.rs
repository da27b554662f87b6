//! Adapts [`LoudsLexicon`] to the decoder-facing traversal trait.

use std::cell::RefCell;
use std::sync::Arc;

use crate::lexicon::base::{LexiconNode, TraversableLexicon};
use crate::lexicon::louds_lexicon::LoudsLexicon;
use crate::trie::louds_trie::{LoudsNodeId, ROOT_NODE_ID};

thread_local! {
    // Reusable per-thread scratch so the children walk does not allocate
    // on the decoder's hot path.
    static CHILD_LABELS: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
    static CHILD_NODE_IDS: RefCell<Vec<LoudsNodeId>> = const { RefCell::new(Vec::new()) };
}

pub struct LoudsLexiconAdapter {
    lexicon: Arc<LoudsLexicon>,
}

impl LoudsLexiconAdapter {
    pub fn new(lexicon: Arc<LoudsLexicon>) -> Self {
        Self { lexicon }
    }
}

impl TraversableLexicon for LoudsLexiconAdapter {
    fn root_node(&self) -> LexiconNode {
        LexiconNode {
            label: 0,
            id: ROOT_NODE_ID as u64,
        }
    }

    fn children(&self, node: &LexiconNode, out: &mut Vec<LexiconNode>) {
        CHILD_LABELS.with(|labels| {
            CHILD_NODE_IDS.with(|node_ids| {
                let mut labels = labels.borrow_mut();
                let mut node_ids = node_ids.borrow_mut();
                self.lexicon
                    .get_children(node.id as LoudsNodeId, &mut labels, &mut node_ids);
                out.reserve(labels.len());
                for (&label, &id) in labels.iter().zip(node_ids.iter()) {
                    out.push(LexiconNode {
                        label,
                        id: id as u64,
                    });
                }
            })
        });
    }

    fn term_log_prob(&self, node: &LexiconNode) -> Option<f32> {
        self.lexicon.term_log_prob_for_node_id(node.id as LoudsNodeId)
    }

    fn prefix_log_prob(&self, node: &LexiconNode) -> Option<f32> {
        if !self.lexicon.has_prefix_unigrams() {
            return None;
        }
        self.lexicon.prefix_log_prob_for_node_id(node.id as LoudsNodeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_terms_character_by_character() -> anyhow::Result<()> {
        let lexicon = Arc::new(LoudsLexicon::build_from_unigrams(
            &[("at".to_string(), -1.0), ("ax".to_string(), -2.0)],
            20.0,
            0,
            true,
        )?);
        let adapter = LoudsLexiconAdapter::new(lexicon);

        let root = adapter.root_node();
        assert_eq!(root.id, 0);
        let mut children = Vec::new();
        adapter.children(&root, &mut children);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].label, b'a');
        assert!(adapter.term_log_prob(&children[0]).is_none());
        assert!(adapter.prefix_log_prob(&children[0]).is_some());

        let a = children[0];
        children.clear();
        adapter.children(&a, &mut children);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].label, b't');
        assert_eq!(children[1].label, b'x');
        let logp = adapter.term_log_prob(&children[0]).unwrap();
        assert!((logp - (-1.0)).abs() < 0.05);
        Ok(())
    }
}
