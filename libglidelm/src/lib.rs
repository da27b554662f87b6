//! Compact on-device n-gram language model over a succinct LOUDS trie.
//!
//! The trie structure costs about two bits per node and its level-order
//! numbering doubles as a free term-to-term-id map, which makes a
//! two-tier setup cheap: a large character lexicon with per-term and
//! per-prefix unigram log probabilities, and a smaller higher-order
//! n-gram model that only addresses the most frequent terms through
//! 16-bit ids. A swipe-keyboard decoder walks the lexicon character by
//! character during beam search and asks the model for conditional log
//! probabilities (with stupid or weighted backoff) and for top-k
//! next-word predictions.
//!
//! Models are built once from unigram/n-gram listings, then frozen;
//! serialized containers load either by reading into owned memory or by
//! memory-mapping the file read-only. A loaded model is immutable and
//! safe to query from any number of threads.

pub mod constants;
pub mod lexicon;
pub mod lm;
pub mod quantizer;
pub mod succinct;
pub mod trie;
pub mod wire;
