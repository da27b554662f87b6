//! The n-gram language model: a LOUDS trie over 16-bit term-id sequences
//! with quantized conditional log probabilities, backed by the lexicon for
//! term-id mapping, plus the two queries the decoder issues against it.
//!
//! Keys store n-grams in natural order (history first, target last), so a
//! key of length L encodes `P(w_L | w_1 .. w_{L-1})`. Every node is a
//! terminal; the reserved term-ids get default values at depth 1, which
//! keeps the depth-1 terminal-ids identical to the term-ids themselves and
//! lets backoff-weight lookups for single-term histories skip the trie
//! walk entirely.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use serde::Serialize;

use crate::constants::{is_reserved_term, FIRST_UNRESERVED_ID, UNK, UNK_ID};
use crate::lexicon::adapter::LoudsLexiconAdapter;
use crate::lexicon::louds_lexicon::LoudsLexicon;
use crate::lm::beam::PredictionBeam;
use crate::lm::params::{LoudsLmParams, FORMAT_VERSION};
use crate::quantizer::{EqualSizeBinQuantizer, QUANTIZED_LOGP_BITS};
use crate::succinct::bit_vector::BitVector;
use crate::succinct::int_vector::IntVector;
use crate::trie::louds_trie::{LoudsNodeId, LoudsTrie, LoudsTrieBuilder, ROOT_NODE_ID};
use crate::wire::{ModelMapper, ModelReader, ModelWriter};

/// The term-id type addressable by the n-gram trie.
pub type TermId16 = u16;

/// A LOUDS trie over term-id sequences; every node carries a value.
pub type NgramLoudsTrie = LoudsTrie<TermId16, u8>;

pub const MAGIC_NUMBER: u32 = u32::from_le_bytes(*b"GLM1");

/// ln 0.4, the fixed per-skip penalty when no stored backoff weights exist.
pub const STUPID_BACKOFF_LOGP: f32 = -0.916_290_7;

// The number of top unigram next-word predictions to precompute.
const MAX_UNIGRAM_PREDICTIONS: usize = 10;

// Added to unigram fallback predictions so they always rank below real
// n-gram predictions.
const UNIGRAM_PREDICTION_BACKOFF: f32 = -100.0;

const UNK_ID16: TermId16 = UNK_ID as TermId16;

/// One n-gram of the input model: terms in natural order, conditional log
/// probability, and an optional backoff weight (natural log).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ngram {
    pub terms: Vec<String>,
    pub logp: f32,
    pub backoff: f32,
}

pub struct LoudsLm {
    params: LoudsLmParams,
    lexicon: Arc<LoudsLexicon>,
    ngram_trie: NgramLoudsTrie,
    max_n: usize,
    // Per n-gram terminal-id: does the history have a non-zero backoff
    // weight? Weights are stored sparsely at rank1 of the terminal-id.
    has_backoff_weights: BitVector,
    backoff_weights: IntVector<u8>,
    quantizer: EqualSizeBinQuantizer,
    top_unigram_predictions: Vec<(TermId16, f32)>,
}

impl LoudsLm {
    /// Builds a model from n-grams. Unigrams feed the lexicon (a `<UNK>`
    /// unigram is stored under its reserved id instead); any other n-gram
    /// containing an unmappable term is skipped, so the model is not
    /// normalized. Reserved terms other than `<UNK>` must not appear as
    /// unigrams.
    pub fn build(ngrams: &[Ngram], params: LoudsLmParams) -> Result<LoudsLm> {
        let mut regular_unigrams: Vec<(String, f32)> = Vec::new();
        for ngram in ngrams {
            if ngram.terms.len() == 1 {
                let term = &ngram.terms[0];
                if term == UNK {
                    continue;
                }
                if is_reserved_term(term) {
                    bail!("reserved term {term:?} cannot appear as a unigram");
                }
                regular_unigrams.push((term.clone(), ngram.logp));
            }
        }

        let lexicon = LoudsLexicon::build_from_unigrams(
            &regular_unigrams,
            params.logp_quantizer_range,
            params.max_num_term_ids,
            params.enable_prefix_unigrams,
        )?;
        let term_id_space = if params.max_num_term_ids > 0 {
            params.max_num_term_ids
        } else {
            lexicon.num_terms() as u32 + FIRST_UNRESERVED_ID
        };
        if term_id_space > TermId16::MAX as u32 + 1 {
            bail!("term-id space {term_id_space} does not fit 16 bits; set max_num_term_ids");
        }

        let quantizer =
            EqualSizeBinQuantizer::new(params.logp_quantizer_range, QUANTIZED_LOGP_BITS);

        let mut keys_to_values: BTreeMap<Vec<TermId16>, u8> = BTreeMap::new();
        let mut keys_to_backoffs: BTreeMap<Vec<TermId16>, u8> = BTreeMap::new();

        // Default values for the reserved terms. Depth 1 of the trie then
        // contains every id from 0 up, so terminal_id == term_id there.
        for id in 0..FIRST_UNRESERVED_ID as TermId16 {
            keys_to_values.insert(vec![id], quantizer.encode(f32::NEG_INFINITY) as u8);
        }

        let mut max_n = 1usize;
        for ngram in ngrams {
            if ngram.terms.len() == 1 && ngram.terms[0] == UNK {
                keys_to_values.insert(vec![UNK_ID16], quantizer.encode(-ngram.logp) as u8);
                continue;
            }
            let key: Vec<TermId16> = ngram
                .terms
                .iter()
                .map(|term| lexicon.term_to_term_id(term) as TermId16)
                .collect();
            if key.contains(&UNK_ID16) {
                // N-grams with unmappable terms are dropped, leaving the
                // model unnormalized.
                continue;
            }
            max_n = max_n.max(key.len());
            if params.has_backoff_weights {
                keys_to_backoffs.insert(key.clone(), quantizer.encode(-ngram.backoff) as u8);
            }
            keys_to_values.insert(key, quantizer.encode(-ngram.logp) as u8);
        }

        let mut builder = LoudsTrieBuilder::new(false);
        for (key, value) in &keys_to_values {
            builder.add(key.clone(), *value);
        }
        let ngram_trie = builder.build().context("cannot build n-gram trie")?;

        let mut has_backoff_weights = BitVector::new();
        let mut backoff_weights = IntVector::new();
        if params.has_backoff_weights {
            let mut terminals: Vec<(u32, u8)> = keys_to_backoffs
                .iter()
                .filter_map(|(key, &weight)| {
                    ngram_trie.key_to_terminal_id(key).map(|t| (t, weight))
                })
                .collect();
            terminals.sort_unstable();
            for (terminal_id, weight) in terminals {
                if weight != 0 {
                    // Only non-zero quantized weights are stored.
                    while has_backoff_weights.len() < terminal_id as usize {
                        has_backoff_weights.push_back(false);
                    }
                    has_backoff_weights.push_back(true);
                    backoff_weights.push_back(weight);
                }
            }
            info!(
                "Populated backoff weights: {}/{}",
                backoff_weights.len(),
                has_backoff_weights.len()
            );
            has_backoff_weights.build();
        }

        let mut lm = LoudsLm {
            params,
            lexicon: Arc::new(lexicon),
            ngram_trie,
            max_n,
            has_backoff_weights,
            backoff_weights,
            quantizer,
            top_unigram_predictions: Vec::new(),
        };
        if lm.params.include_unigram_predictions {
            lm.populate_unigram_predictions();
        }
        Ok(lm)
    }

    /// Convenience over [`LoudsLm::build`] for callers that keep unigrams
    /// and higher-order n-grams in separate lists.
    pub fn build_from_unigrams_and_ngrams(
        unigrams: &[(String, f32)],
        ngrams: &[Ngram],
        params: LoudsLmParams,
    ) -> Result<LoudsLm> {
        let mut all: Vec<Ngram> = unigrams
            .iter()
            .map(|(term, logp)| Ngram {
                terms: vec![term.clone()],
                logp: *logp,
                backoff: 0.0,
            })
            .collect();
        all.extend_from_slice(ngrams);
        Self::build(&all, params)
    }

    pub fn params(&self) -> &LoudsLmParams {
        &self.params
    }

    pub fn max_n(&self) -> usize {
        self.max_n
    }

    pub fn lexicon(&self) -> &LoudsLexicon {
        &self.lexicon
    }

    /// A decoder-facing adapter sharing this model's lexicon.
    pub fn lexicon_adapter(&self) -> LoudsLexiconAdapter {
        LoudsLexiconAdapter::new(self.lexicon.clone())
    }

    pub fn term_to_term_id(&self, term: &str) -> TermId16 {
        self.lexicon.term_to_term_id(term) as TermId16
    }

    pub fn term_id_to_term(&self, term_id: TermId16) -> String {
        self.lexicon.term_id_to_term(term_id as u32)
    }

    pub fn terms_to_term_ids(&self, terms: &[&str]) -> Vec<TermId16> {
        terms.iter().map(|term| self.term_to_term_id(term)).collect()
    }

    // The unigram stored in the n-gram trie for a term-id. Present for
    // every mapped id because the reserved defaults and all unigrams are
    // inserted at depth 1.
    fn lookup_log_prob_for_term_id(&self, term_id: TermId16) -> u8 {
        self.ngram_trie.key_to_value(&[term_id]).unwrap_or(u8::MAX)
    }

    /// Maps the context (tail `terms`, then older `preceding_term_ids`) to
    /// at most `max_term_count` in-vocab term-ids, newest last. Walking
    /// right to left, an unmappable term ends the history; when
    /// `preserve_last_term` is set an unmappable final term is still kept
    /// so the caller can fall back to the lexicon for it.
    fn backoff_to_in_vocab_term_ids(
        &self,
        preceding_term_ids: &[TermId16],
        terms: &[&str],
        max_term_count: usize,
        preserve_last_term: bool,
    ) -> Vec<TermId16> {
        let mut term_ids: Vec<TermId16> = Vec::new();
        for (i, term) in terms.iter().enumerate().rev() {
            let term_id = self.term_to_term_id(term);
            if term_id == UNK_ID16 && (!preserve_last_term || i < terms.len() - 1) {
                term_ids.reverse();
                return term_ids;
            }
            term_ids.push(term_id);
            if term_ids.len() == max_term_count {
                term_ids.reverse();
                return term_ids;
            }
        }
        for &term_id in preceding_term_ids.iter().rev() {
            if term_id == UNK_ID16 {
                break;
            }
            term_ids.push(term_id);
            if term_ids.len() == max_term_count {
                break;
            }
        }
        term_ids.reverse();
        term_ids
    }

    // The cost of dropping the leading token of a history. With stored
    // weights, a single-term history's terminal-id is the term-id itself
    // thanks to the reserved depth-1 defaults.
    fn get_backoff_cost(&self, history: &[TermId16]) -> f32 {
        if !self.params.has_backoff_weights {
            return STUPID_BACKOFF_LOGP;
        }
        let terminal_id = if history.len() == 1 {
            Some(history[0] as u32)
        } else {
            self.ngram_trie.key_to_terminal_id(history)
        };
        match terminal_id {
            Some(t) if (t as usize) < self.has_backoff_weights.len() => {
                if self.has_backoff_weights.bit(t as usize) {
                    let index = self.has_backoff_weights.rank1(t as usize);
                    -self.quantizer.decode(self.backoff_weights.get(index) as u32)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    /// The conditional log probability of the last of `terms` given the
    /// preceding context, backing off to shorter histories on misses.
    /// Returns the value and whether a match was found; a full miss
    /// surfaces the `<UNK>` unigram with `false`.
    pub fn lookup_conditional_log_prob(
        &self,
        preceding_term_ids: &[TermId16],
        terms: &[&str],
    ) -> (f32, bool) {
        let mut term_ids =
            self.backoff_to_in_vocab_term_ids(preceding_term_ids, terms, self.max_n, true);
        if term_ids.is_empty() {
            let value = -self
                .quantizer
                .decode(self.lookup_log_prob_for_term_id(UNK_ID16) as u32);
            return (value, false);
        }

        let term_count = terms.len() + preceding_term_ids.len();
        let mut backoff_cost = 0.0f32;
        if !self.params.has_backoff_weights {
            // Fixed stupid-backoff penalty for terms already skipped by the
            // in-vocab mapping.
            let backoff_count = self.max_n.min(term_count) - term_ids.len();
            backoff_cost = backoff_count as f32 * STUPID_BACKOFF_LOGP;
        }

        while term_ids.len() > 1 {
            if let Some(value) = self.ngram_trie.key_to_value(&term_ids) {
                return (-self.quantizer.decode(value as u32) + backoff_cost, true);
            }
            backoff_cost += self.get_backoff_cost(&term_ids[..term_ids.len() - 1]);
            term_ids.remove(0);
        }

        let last_term = match terms.last() {
            Some(term) => (*term).to_string(),
            None => self.term_id_to_term(term_ids[0]),
        };
        if last_term != last_term.to_lowercase() {
            backoff_cost += self.params.uppercase_unigram_extra_backoff_weight;
        }

        if term_ids[0] == UNK_ID16 {
            // The last term has no term-id in the n-gram model; it may
            // still carry a unigram in the (larger) lexicon.
            if let Some(node_id) = terms.last().and_then(|term| self.lexicon.key_to_node_id(term))
            {
                if let Some(logp) = self.lexicon.term_log_prob_for_node_id(node_id) {
                    return (logp + backoff_cost, true);
                }
            }
            let value = -self
                .quantizer
                .decode(self.lookup_log_prob_for_term_id(UNK_ID16) as u32);
            return (value + backoff_cost, false);
        }

        let value = -self
            .quantizer
            .decode(self.lookup_log_prob_for_term_id(term_ids[0]) as u32);
        (value + backoff_cost, true)
    }

    /// Merges the top `max_results` next-word predictions for the context
    /// into `results`. Predictions from longer histories are never
    /// overwritten by backed-off ones, even at a better score; if enabled,
    /// the precomputed top unigrams fill any remaining slots at a fixed
    /// penalty that ranks them below every real n-gram prediction.
    pub fn predict_next_words(
        &self,
        preceding_term_ids: &[TermId16],
        terms: &[&str],
        max_results: usize,
        results: &mut HashMap<String, f32>,
    ) {
        let mut term_ids = self.backoff_to_in_vocab_term_ids(
            preceding_term_ids,
            terms,
            self.max_n.saturating_sub(1),
            false,
        );
        let mut predicted_term_ids: HashSet<TermId16> = HashSet::new();
        if !term_ids.is_empty() {
            let term_count = preceding_term_ids.len() + terms.len();
            let mut backoff_cost = 0.0f32;
            if !self.params.has_backoff_weights {
                let backoff_count = (self.max_n - 1)
                    .min(term_count)
                    .saturating_sub(term_ids.len());
                backoff_cost = backoff_count as f32 * STUPID_BACKOFF_LOGP;
            }
            let mut beam = PredictionBeam::new(max_results);
            let mut child_term_ids: Vec<TermId16> = Vec::new();
            let mut child_node_ids: Vec<LoudsNodeId> = Vec::new();
            while !term_ids.is_empty() {
                self.lookup_next_words(
                    &term_ids,
                    backoff_cost,
                    &mut beam,
                    &mut child_term_ids,
                    &mut child_node_ids,
                );
                backoff_cost += self.get_backoff_cost(&term_ids);
                term_ids.remove(0);
            }
            for (term_id, logp) in beam.take() {
                predicted_term_ids.insert(term_id);
                let term = self.term_id_to_term(term_id);
                if is_reserved_term(&term) {
                    continue;
                }
                let entry = results.entry(term).or_insert(f32::NEG_INFINITY);
                if logp > *entry {
                    *entry = logp;
                }
            }
        }
        if self.params.include_unigram_predictions {
            for &(term_id, logp) in &self.top_unigram_predictions {
                if results.len() >= max_results {
                    break;
                }
                if predicted_term_ids.contains(&term_id) {
                    continue;
                }
                let term = self.term_id_to_term(term_id);
                if !is_reserved_term(&term) {
                    results.insert(term, logp + UNIGRAM_PREDICTION_BACKOFF);
                }
            }
        }
    }

    // Pushes the continuations of one history into the beam. Term-ids
    // already in the beam came from longer histories and are skipped.
    fn lookup_next_words(
        &self,
        key: &[TermId16],
        backoff: f32,
        beam: &mut PredictionBeam,
        child_term_ids: &mut Vec<TermId16>,
        child_node_ids: &mut Vec<LoudsNodeId>,
    ) -> bool {
        let Some(node_id) = self.ngram_trie.key_to_node_id(key) else {
            return false;
        };
        let predicted: HashSet<TermId16> = if beam.is_empty() {
            HashSet::new()
        } else {
            beam.iter().map(|(term_id, _)| term_id).collect()
        };
        self.ngram_trie
            .get_children(node_id, child_term_ids, child_node_ids);
        for (&term_id, &child_node_id) in child_term_ids.iter().zip(child_node_ids.iter()) {
            if predicted.contains(&term_id) {
                continue;
            }
            if key.len() > 1 {
                // Predictions from trigram-and-above histories must clear
                // the unigram threshold.
                let unigram_logp = -self
                    .quantizer
                    .decode(self.lookup_log_prob_for_term_id(term_id) as u32);
                if unigram_logp < self.params.min_unigram_logp_for_predictions {
                    continue;
                }
            }
            let Some(terminal_id) = self.ngram_trie.node_id_to_terminal_id(child_node_id) else {
                continue;
            };
            let logp = -self
                .quantizer
                .decode(self.ngram_trie.terminal_id_to_value(terminal_id) as u32)
                + backoff;
            beam.push(term_id, logp);
        }
        true
    }

    fn populate_unigram_predictions(&mut self) {
        if !self.top_unigram_predictions.is_empty() {
            return;
        }
        let mut child_term_ids: Vec<TermId16> = Vec::new();
        let mut child_node_ids: Vec<LoudsNodeId> = Vec::new();
        self.ngram_trie
            .get_children(ROOT_NODE_ID, &mut child_term_ids, &mut child_node_ids);
        let mut beam = PredictionBeam::new(MAX_UNIGRAM_PREDICTIONS);
        for &term_id in &child_term_ids {
            if (term_id as u32) >= FIRST_UNRESERVED_ID {
                let logp = -self
                    .quantizer
                    .decode(self.lookup_log_prob_for_term_id(term_id) as u32);
                beam.push(term_id, logp);
            }
        }
        self.top_unigram_predictions = beam.take();
    }

    /// Walks the whole n-gram trie depth-first and returns its contents,
    /// including the reserved depth-1 defaults.
    pub fn dump_ngrams(&self) -> Vec<Ngram> {
        let mut ngrams = Vec::new();
        let mut prefix = Vec::new();
        self.dump_ngrams_from(ROOT_NODE_ID, &mut prefix, &mut ngrams);
        ngrams
    }

    fn dump_ngrams_from(
        &self,
        node_id: LoudsNodeId,
        prefix: &mut Vec<String>,
        ngrams: &mut Vec<Ngram>,
    ) {
        let mut child_term_ids: Vec<TermId16> = Vec::new();
        let mut child_node_ids: Vec<LoudsNodeId> = Vec::new();
        self.ngram_trie
            .get_children(node_id, &mut child_term_ids, &mut child_node_ids);
        for (&term_id, &child_node_id) in child_term_ids.iter().zip(child_node_ids.iter()) {
            let Some(terminal_id) = self.ngram_trie.node_id_to_terminal_id(child_node_id) else {
                continue;
            };
            prefix.push(self.term_id_to_term(term_id));
            ngrams.push(Ngram {
                terms: prefix.clone(),
                logp: -self
                    .quantizer
                    .decode(self.ngram_trie.terminal_id_to_value(terminal_id) as u32),
                backoff: 0.0,
            });
            self.dump_ngrams_from(child_node_id, prefix, ngrams);
            prefix.pop();
        }
    }

    fn write_internal<W: Write>(&self, w: &mut ModelWriter<W>) -> Result<()> {
        w.write_u32(MAGIC_NUMBER)?;
        let params_bytes =
            serde_json::to_vec(&self.params).context("cannot serialize params")?;
        let mut params_blob = IntVector::<u8>::new();
        for byte in params_bytes {
            params_blob.push_back(byte);
        }
        params_blob.write_to(w)?;
        self.lexicon.write_to(w)?;
        self.ngram_trie.write_to(w)?;
        w.write_u32(self.max_n as u32)?;
        if self.params.has_backoff_weights {
            self.has_backoff_weights.write_to(w)?;
            self.backoff_weights.write_to(w)?;
        }
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut w = ModelWriter::new(writer);
        self.write_internal(&mut w)?;
        w.flush()
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        self.write_to(BufWriter::new(file))
    }

    pub fn read_from<R: Read>(reader: R) -> Result<LoudsLm> {
        let mut r = ModelReader::new(reader);
        let magic = r.read_u32()?;
        if magic != MAGIC_NUMBER {
            bail!("invalid magic number {magic:#010x}");
        }
        let params_blob = IntVector::<u8>::read_from(&mut r)?;
        let params = Self::parse_params(params_blob.as_bytes())?;
        let lexicon = LoudsLexicon::read_from(&mut r)?;
        let ngram_trie = NgramLoudsTrie::read_from(&mut r)?;
        let max_n = r.read_u32()? as usize;
        let (has_backoff_weights, backoff_weights) = if params.has_backoff_weights {
            (BitVector::read_from(&mut r)?, IntVector::read_from(&mut r)?)
        } else {
            (BitVector::new(), IntVector::new())
        };
        Self::assemble(
            params,
            lexicon,
            ngram_trie,
            max_n,
            has_backoff_weights,
            backoff_weights,
        )
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoudsLm> {
        let path = path.as_ref();
        info!("Reading {}", path.display());
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Self::read_from(BufReader::new(file))
    }

    /// Memory-maps a model file read-only; the trie and vector contents
    /// stay views into the mapping for the model's lifetime.
    pub fn map_from_path(path: impl AsRef<Path>) -> Result<LoudsLm> {
        let mut m = ModelMapper::from_path(path)?;
        Self::map_internal(&mut m)
    }

    /// Memory-maps a model embedded at `offset` inside a larger file.
    pub fn map_from_region(path: impl AsRef<Path>, offset: usize, len: usize) -> Result<LoudsLm> {
        let mut m = ModelMapper::from_path_region(path, offset, len)?;
        Self::map_internal(&mut m)
    }

    /// Treats an owned buffer as the mapped region.
    pub fn map_from_bytes(bytes: Arc<[u8]>) -> Result<LoudsLm> {
        let mut m = ModelMapper::from_bytes(bytes);
        Self::map_internal(&mut m)
    }

    fn map_internal(m: &mut ModelMapper) -> Result<LoudsLm> {
        let magic = m.map_u32()?;
        if magic != MAGIC_NUMBER {
            bail!("invalid magic number {magic:#010x}");
        }
        let params_blob = IntVector::<u8>::map_from(m)?;
        let params = Self::parse_params(params_blob.as_bytes())?;
        let lexicon = LoudsLexicon::map_from(m)?;
        let ngram_trie = NgramLoudsTrie::map_from(m)?;
        let max_n = m.map_u32()? as usize;
        let (has_backoff_weights, backoff_weights) = if params.has_backoff_weights {
            (BitVector::map_from(m)?, IntVector::map_from(m)?)
        } else {
            (BitVector::new(), IntVector::new())
        };
        Self::assemble(
            params,
            lexicon,
            ngram_trie,
            max_n,
            has_backoff_weights,
            backoff_weights,
        )
    }

    fn parse_params(blob: &[u8]) -> Result<LoudsLmParams> {
        let params: LoudsLmParams =
            serde_json::from_slice(blob).context("cannot parse params blob")?;
        if params.format_version != FORMAT_VERSION {
            bail!("unsupported format version {}", params.format_version);
        }
        Ok(params)
    }

    fn assemble(
        params: LoudsLmParams,
        lexicon: LoudsLexicon,
        ngram_trie: NgramLoudsTrie,
        max_n: usize,
        has_backoff_weights: BitVector,
        backoff_weights: IntVector<u8>,
    ) -> Result<LoudsLm> {
        if max_n == 0 {
            bail!("corrupt model: max_n must be at least 1");
        }
        let quantizer =
            EqualSizeBinQuantizer::new(params.logp_quantizer_range, QUANTIZED_LOGP_BITS);
        let mut lm = LoudsLm {
            params,
            lexicon: Arc::new(lexicon),
            ngram_trie,
            max_n,
            has_backoff_weights,
            backoff_weights,
            quantizer,
            top_unigram_predictions: Vec::new(),
        };
        if lm.params.include_unigram_predictions {
            lm.populate_unigram_predictions();
        }
        info!(
            "Loaded n-gram LM: {} nodes, max_n={}",
            lm.ngram_trie.num_nodes(),
            lm.max_n
        );
        Ok(lm)
    }
}
