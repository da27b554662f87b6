//! A traversable lexicon over a LOUDS trie of UTF-8 bytes.
//!
//! Each complete term carries a quantized unigram log probability, and the
//! level-order terminal numbering doubles as the term-to-term-id map for
//! the n-gram model. Because that numbering is by level order, short terms
//! always get low terminal-ids regardless of frequency; when the model can
//! only address a limited term-id space (16 bits here), the lexicon maps
//! just the most frequent terms to external term-ids in
//! `[FIRST_UNRESERVED_ID, max_num_term_ids)` via a bit-vector over
//! terminal-ids. Everything else maps to `UNK_ID`.
//!
//! Optionally the lexicon also stores, per prefix, the best unigram log
//! probability among its completions. A prefix value is only stored where
//! it differs from the nearest ancestor prefix that has one; the decoder
//! inherits the parent's value otherwise.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;

use crate::constants::{
    reserved_term_id_to_term, reserved_term_to_term_id, TermId, FIRST_UNRESERVED_ID, UNK_ID,
};
use crate::quantizer::{EqualSizeBinQuantizer, QUANTIZED_LOGP_BITS};
use crate::succinct::bit_vector::BitVector;
use crate::succinct::int_vector::IntVector;
use crate::trie::louds_trie::{LoudsNodeId, LoudsTerminalId, LoudsTrie, LoudsTrieBuilder};
use crate::wire::{ModelMapper, ModelReader, ModelWriter};

/// A LOUDS trie over UTF-8 bytes with 8-bit quantized values. Multi-byte
/// codepoints occupy consecutive edges.
pub type Utf8CharTrie = LoudsTrie<u8, u8>;

pub struct LoudsLexicon {
    trie: Utf8CharTrie,
    has_prefix_unigrams: bool,
    // Log probabilities quantize into 256 bins over [-quantizer_logp_range, 0].
    quantizer_logp_range: f32,
    max_num_term_ids: u32,
    // Per terminal-id: does this term have an externally visible term-id?
    has_termids: BitVector,
    // Per node-id: does this prefix carry its own value?
    has_prefix_values: BitVector,
    prefix_values: IntVector<u8>,
    quantizer: EqualSizeBinQuantizer,
}

impl LoudsLexicon {
    /// Builds a lexicon from `(term, logp)` unigrams. Duplicate terms keep
    /// the last entry. If `max_num_term_ids > 0`, only the
    /// `max_num_term_ids - FIRST_UNRESERVED_ID` most probable terms get an
    /// external term-id.
    pub fn build_from_unigrams(
        unigrams: &[(String, f32)],
        quantizer_logp_range: f32,
        max_num_term_ids: u32,
        has_prefix_unigrams: bool,
    ) -> Result<LoudsLexicon> {
        let mut deduped: BTreeMap<&str, f32> = BTreeMap::new();
        for (term, logp) in unigrams {
            deduped.insert(term.as_str(), *logp);
        }

        let quantizer = EqualSizeBinQuantizer::new(quantizer_logp_range, QUANTIZED_LOGP_BITS);
        let mut builder = LoudsTrieBuilder::new(true);
        for (&term, &logp) in &deduped {
            builder.add(term.as_bytes().to_vec(), quantizer.encode(-logp) as u8);
        }
        let trie = builder.build().context("cannot build lexicon trie")?;

        let mut lexicon = LoudsLexicon {
            trie,
            has_prefix_unigrams,
            quantizer_logp_range,
            max_num_term_ids,
            has_termids: BitVector::new(),
            has_prefix_values: BitVector::new(),
            prefix_values: IntVector::new(),
            quantizer,
        };
        if max_num_term_ids > 0 {
            lexicon.map_external_term_ids(&deduped)?;
        }
        if has_prefix_unigrams {
            lexicon.integrate_prefix_log_probs(&deduped)?;
        }
        info!(
            "Built lexicon: {} terms, {} nodes",
            lexicon.trie.num_terminals(),
            lexicon.trie.num_nodes()
        );
        Ok(lexicon)
    }

    // Marks the terminal-ids of the most probable terms in `has_termids`.
    // An external id is then rank1(terminal_id) + FIRST_UNRESERVED_ID.
    fn map_external_term_ids(&mut self, unigrams: &BTreeMap<&str, f32>) -> Result<()> {
        let mut sorted: Vec<(f32, &str)> = unigrams.iter().map(|(&t, &lp)| (lp, t)).collect();
        sorted.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));

        let num_terminals = self.trie.num_terminals();
        let mut is_frequent = vec![false; num_terminals];
        let num_regular = self.max_num_term_ids.saturating_sub(FIRST_UNRESERVED_ID) as usize;
        for &(_, term) in sorted.iter().take(num_regular) {
            let terminal_id = self
                .trie
                .key_to_terminal_id(term.as_bytes())
                .with_context(|| format!("unigram {term:?} missing from its own trie"))?;
            is_frequent[terminal_id as usize] = true;
        }
        for frequent in is_frequent {
            self.has_termids.push_back(frequent);
        }
        self.has_termids.build();
        Ok(())
    }

    // Records, for every UTF-8 character-aligned prefix, the best unigram
    // log probability among its completions, storing only the values that
    // differ from the nearest ancestor prefix.
    fn integrate_prefix_log_probs(&mut self, unigrams: &BTreeMap<&str, f32>) -> Result<()> {
        let mut prefix_logps: BTreeMap<&str, f32> = BTreeMap::new();
        for (&term, &logp) in unigrams {
            let mut prefix_len = 0;
            for ch in term.chars() {
                prefix_len += ch.len_utf8();
                let entry = prefix_logps.entry(&term[..prefix_len]).or_insert(logp);
                if logp > *entry {
                    *entry = logp;
                }
            }
        }

        let mut node_logps: BTreeMap<LoudsNodeId, f32> = BTreeMap::new();
        for (&prefix, &logp) in &prefix_logps {
            let mut parent_logp = f32::NEG_INFINITY;
            for (boundary, _) in prefix.char_indices().rev() {
                if boundary == 0 {
                    break;
                }
                if let Some(&lp) = prefix_logps.get(&prefix[..boundary]) {
                    parent_logp = lp;
                    break;
                }
            }
            if logp != parent_logp {
                let node_id = self
                    .trie
                    .key_to_node_id(prefix.as_bytes())
                    .with_context(|| format!("prefix {prefix:?} missing from trie"))?;
                node_logps.insert(node_id, logp);
            }
        }

        for (&node_id, &logp) in &node_logps {
            while self.has_prefix_values.len() < node_id as usize {
                self.has_prefix_values.push_back(false);
            }
            self.has_prefix_values.push_back(true);
            self.prefix_values.push_back(self.quantizer.encode(-logp) as u8);
        }
        self.has_prefix_values.build();
        Ok(())
    }

    pub fn has_prefix_unigrams(&self) -> bool {
        self.has_prefix_unigrams
    }

    pub fn num_terms(&self) -> usize {
        self.trie.num_terminals()
    }

    /// The string key for a node, reconstructed by walking parent edges.
    pub fn node_id_to_key(&self, node_id: LoudsNodeId) -> String {
        let mut buf = Vec::new();
        self.trie.node_id_to_key(node_id, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// The node for a complete-term or term-prefix key, if present.
    pub fn key_to_node_id(&self, key: &str) -> Option<LoudsNodeId> {
        self.trie.key_to_node_id(key.as_bytes())
    }

    pub fn get_children(
        &self,
        node_id: LoudsNodeId,
        out_labels: &mut Vec<u8>,
        out_node_ids: &mut Vec<LoudsNodeId>,
    ) {
        self.trie.get_children(node_id, out_labels, out_node_ids);
    }

    /// The unigram log probability if `node_id` is a complete term.
    pub fn term_log_prob_for_node_id(&self, node_id: LoudsNodeId) -> Option<f32> {
        let terminal_id = self.trie.node_id_to_terminal_id(node_id)?;
        Some(-self.quantizer.decode(self.trie.terminal_id_to_value(terminal_id) as u32))
    }

    /// The stored prefix log probability for `node_id`, if any. Nodes
    /// without their own entry inherit the nearest ancestor's value, which
    /// the caller tracks while descending.
    pub fn prefix_log_prob_for_node_id(&self, node_id: LoudsNodeId) -> Option<f32> {
        if node_id as usize >= self.has_prefix_values.len() {
            return None;
        }
        if !self.has_prefix_values.bit(node_id as usize) {
            return None;
        }
        let prefix_id = self.has_prefix_values.rank1(node_id as usize);
        Some(-self.quantizer.decode(self.prefix_values.get(prefix_id) as u32))
    }

    /// Maps a term to its externally visible term-id, or `UNK_ID` when the
    /// term is absent or not among the top `max_num_term_ids` terms.
    pub fn term_to_term_id(&self, term: &str) -> TermId {
        let reserved = reserved_term_to_term_id(term);
        if reserved < FIRST_UNRESERVED_ID {
            return reserved;
        }
        let Some(node_id) = self.key_to_node_id(term) else {
            return UNK_ID;
        };
        self.node_id_to_term_id(node_id)
    }

    fn node_id_to_term_id(&self, node_id: LoudsNodeId) -> TermId {
        match self.trie.node_id_to_terminal_id(node_id) {
            Some(terminal_id) => self.terminal_id_to_term_id(terminal_id),
            None => UNK_ID,
        }
    }

    pub(crate) fn terminal_id_to_term_id(&self, terminal_id: LoudsTerminalId) -> TermId {
        if self.max_num_term_ids == 0 {
            return terminal_id + FIRST_UNRESERVED_ID;
        }
        if self.has_termids.bit(terminal_id as usize) {
            self.has_termids.rank1(terminal_id as usize) as TermId + FIRST_UNRESERVED_ID
        } else {
            UNK_ID
        }
    }

    fn term_id_to_terminal_id(&self, term_id: TermId) -> Option<LoudsTerminalId> {
        if term_id < FIRST_UNRESERVED_ID {
            return None;
        }
        let index = term_id - FIRST_UNRESERVED_ID;
        if self.max_num_term_ids == 0 {
            return Some(index);
        }
        if term_id < self.max_num_term_ids && (index as usize) < self.has_termids.num_ones() {
            return Some(self.has_termids.select1(index as usize) as LoudsTerminalId);
        }
        None
    }

    /// The string term for an external term-id. Reserved ids map to their
    /// markers; unknown ids map to the empty string.
    pub fn term_id_to_term(&self, term_id: TermId) -> String {
        if term_id < FIRST_UNRESERVED_ID {
            return reserved_term_id_to_term(term_id).unwrap_or_default().to_string();
        }
        let Some(terminal_id) = self.term_id_to_terminal_id(term_id) else {
            return String::new();
        };
        let Some(node_id) = self.trie.terminal_id_to_node_id(terminal_id) else {
            return String::new();
        };
        self.node_id_to_key(node_id)
    }

    pub fn write_to<W: Write>(&self, w: &mut ModelWriter<W>) -> Result<()> {
        self.trie.write_to(w)?;
        self.has_termids.write_to(w)?;
        self.has_prefix_values.write_to(w)?;
        self.prefix_values.write_to(w)?;
        w.write_u8(self.has_prefix_unigrams as u8)?;
        w.write_f32(self.quantizer_logp_range)?;
        w.write_u32(self.max_num_term_ids)
    }

    pub fn read_from<R: Read>(r: &mut ModelReader<R>) -> Result<LoudsLexicon> {
        let trie = Utf8CharTrie::read_from(r)?;
        let has_termids = BitVector::read_from(r)?;
        let has_prefix_values = BitVector::read_from(r)?;
        let prefix_values = IntVector::read_from(r)?;
        let has_prefix_unigrams = r.read_u8()? != 0;
        let quantizer_logp_range = r.read_f32()?;
        let max_num_term_ids = r.read_u32()?;
        Self::from_parts(
            trie,
            has_termids,
            has_prefix_values,
            prefix_values,
            has_prefix_unigrams,
            quantizer_logp_range,
            max_num_term_ids,
        )
    }

    pub fn map_from(m: &mut ModelMapper) -> Result<LoudsLexicon> {
        let trie = Utf8CharTrie::map_from(m)?;
        let has_termids = BitVector::map_from(m)?;
        let has_prefix_values = BitVector::map_from(m)?;
        let prefix_values = IntVector::map_from(m)?;
        let has_prefix_unigrams = m.map_u8()? != 0;
        let quantizer_logp_range = m.map_f32()?;
        let max_num_term_ids = m.map_u32()?;
        Self::from_parts(
            trie,
            has_termids,
            has_prefix_values,
            prefix_values,
            has_prefix_unigrams,
            quantizer_logp_range,
            max_num_term_ids,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn from_parts(
        trie: Utf8CharTrie,
        has_termids: BitVector,
        has_prefix_values: BitVector,
        prefix_values: IntVector<u8>,
        has_prefix_unigrams: bool,
        quantizer_logp_range: f32,
        max_num_term_ids: u32,
    ) -> Result<LoudsLexicon> {
        if max_num_term_ids > 0 && has_termids.len() != trie.num_terminals() {
            bail!("corrupt lexicon: term-id bits do not cover all terminals");
        }
        if prefix_values.len() != has_prefix_values.num_ones() {
            bail!("corrupt lexicon: prefix value count does not match its bit-vector");
        }
        Ok(LoudsLexicon {
            trie,
            has_prefix_unigrams,
            quantizer_logp_range,
            max_num_term_ids,
            has_termids,
            has_prefix_values,
            prefix_values,
            quantizer: EqualSizeBinQuantizer::new(quantizer_logp_range, QUANTIZED_LOGP_BITS),
        })
    }

    /// Writes the lexicon alone to a file, independent of any LM container.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        let mut w = ModelWriter::new(BufWriter::new(file));
        self.write_to(&mut w)?;
        w.flush()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoudsLexicon> {
        let path = path.as_ref();
        info!("Reading {}", path.display());
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Self::read_from(&mut ModelReader::new(BufReader::new(file)))
    }

    pub fn map_from_path(path: impl AsRef<Path>) -> Result<LoudsLexicon> {
        let mut m = ModelMapper::from_path(path)?;
        Self::map_from(&mut m)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    fn unigrams(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|(t, lp)| (t.to_string(), *lp)).collect()
    }

    #[test]
    fn term_ids_without_cap_round_trip() -> Result<()> {
        let lexicon = LoudsLexicon::build_from_unigrams(
            &unigrams(&[("the", -1.0), ("cat", -3.0), ("cap", -4.0)]),
            20.0,
            0,
            false,
        )?;
        for term in ["the", "cat", "cap"] {
            let id = lexicon.term_to_term_id(term);
            assert!(id >= FIRST_UNRESERVED_ID);
            assert_eq!(lexicon.term_id_to_term(id), term);
        }
        assert_eq!(lexicon.term_to_term_id("dog"), UNK_ID);
        assert_eq!(lexicon.term_to_term_id("<S>"), 0);
        assert_eq!(lexicon.term_id_to_term(UNK_ID), "<UNK>");
        Ok(())
    }

    #[test]
    fn capped_term_ids_keep_only_top_terms() -> Result<()> {
        // Cap leaves room for two regular terms; "rare" must fall to UNK.
        let lexicon = LoudsLexicon::build_from_unigrams(
            &unigrams(&[("the", -1.0), ("cat", -3.0), ("rare", -9.0)]),
            20.0,
            FIRST_UNRESERVED_ID + 2,
            false,
        )?;
        let the = lexicon.term_to_term_id("the");
        let cat = lexicon.term_to_term_id("cat");
        assert!(the >= FIRST_UNRESERVED_ID && the < FIRST_UNRESERVED_ID + 2);
        assert!(cat >= FIRST_UNRESERVED_ID && cat < FIRST_UNRESERVED_ID + 2);
        assert_ne!(the, cat);
        assert_eq!(lexicon.term_to_term_id("rare"), UNK_ID);
        assert_eq!(lexicon.term_id_to_term(the), "the");
        assert_eq!(lexicon.term_id_to_term(cat), "cat");
        // "rare" still has a unigram in the lexicon trie.
        let node = lexicon.key_to_node_id("rare").unwrap();
        let logp = lexicon.term_log_prob_for_node_id(node).unwrap();
        assert!((logp - (-9.0)).abs() < 0.05);
        Ok(())
    }

    #[test]
    fn prefix_log_probs_are_monotone() -> Result<()> {
        let lexicon = LoudsLexicon::build_from_unigrams(
            &unigrams(&[("car", -2.0), ("cart", -5.0), ("cab", -3.5), ("dog", -1.0)]),
            20.0,
            0,
            true,
        )?;
        // Walk every root-to-leaf path; prefix values must never increase
        // below an ancestor that carries one.
        let mut stack = vec![(0u32, f32::INFINITY)];
        let mut labels = Vec::new();
        let mut children = Vec::new();
        while let Some((node, best_above)) = stack.pop() {
            let best_here = match lexicon.prefix_log_prob_for_node_id(node) {
                Some(logp) => {
                    assert!(
                        logp <= best_above + 0.05,
                        "prefix value rose along a path: {logp} > {best_above}"
                    );
                    logp
                }
                None => best_above,
            };
            lexicon.get_children(node, &mut labels, &mut children);
            for &child in &children {
                stack.push((child, best_here));
            }
        }
        // The "c" prefix takes the best completion, "car".
        let c = lexicon.key_to_node_id("c").unwrap();
        let logp = lexicon.prefix_log_prob_for_node_id(c).unwrap();
        assert!((logp - (-2.0)).abs() < 0.05);
        // "car" as a prefix shares its parent's value, so it stores none.
        let car = lexicon.key_to_node_id("car").unwrap();
        assert!(lexicon.prefix_log_prob_for_node_id(car).is_none());
        // "cab" differs (-3.5) and stores its own.
        let cab = lexicon.key_to_node_id("cab").unwrap();
        let logp = lexicon.prefix_log_prob_for_node_id(cab).unwrap();
        assert!((logp - (-3.5)).abs() < 0.05);
        Ok(())
    }

    #[test]
    fn multibyte_terms_walk_byte_edges() -> Result<()> {
        let lexicon = LoudsLexicon::build_from_unigrams(
            &unigrams(&[("héllo", -2.0), ("héllos", -4.0), ("日本", -1.5)]),
            20.0,
            0,
            true,
        )?;
        let id = lexicon.term_to_term_id("日本");
        assert_eq!(lexicon.term_id_to_term(id), "日本");
        let node = lexicon.key_to_node_id("héllo").unwrap();
        assert!((lexicon.term_log_prob_for_node_id(node).unwrap() - (-2.0)).abs() < 0.05);
        // Prefix values only exist at character boundaries.
        let first_byte_of_nihon = &"日本".as_bytes()[..1];
        let partial = lexicon
            .trie
            .key_to_node_id(first_byte_of_nihon)
            .map(|n| lexicon.prefix_log_prob_for_node_id(n));
        if let Some(Some(_)) = partial {
            panic!("partial codepoint prefix should not carry a value");
        }
        Ok(())
    }

    #[test]
    fn standalone_save_load_and_map() -> Result<()> {
        let lexicon = LoudsLexicon::build_from_unigrams(
            &unigrams(&[("alpha", -1.0), ("beta", -2.0)]),
            20.0,
            0,
            true,
        )?;
        let tmpfile = NamedTempFile::new()?;
        lexicon.write_to_path(tmpfile.path())?;

        for reloaded in [
            LoudsLexicon::load_from_path(tmpfile.path())?,
            LoudsLexicon::map_from_path(tmpfile.path())?,
        ] {
            let id = reloaded.term_to_term_id("alpha");
            assert_eq!(reloaded.term_id_to_term(id), "alpha");
            let node = reloaded.key_to_node_id("beta").unwrap();
            assert!((reloaded.term_log_prob_for_node_id(node).unwrap() - (-2.0)).abs() < 0.05);
            assert!(reloaded.has_prefix_unigrams());
        }
        Ok(())
    }

    #[test]
    fn empty_unigrams_fail_to_build() {
        assert!(LoudsLexicon::build_from_unigrams(&[], 20.0, 0, false).is_err());
    }
}
