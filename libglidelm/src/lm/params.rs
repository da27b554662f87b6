//! Model parameters, carried in the serialized container as an opaque
//! JSON blob and optionally supplied to the build tool as YAML.

use serde::{Deserialize, Serialize};

/// The current container format version. Loading fails on a mismatch.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudsLmParams {
    /// Log probabilities quantize into 256 equally spaced bins over
    /// `[-logp_quantizer_range, 0]`.
    pub logp_quantizer_range: f32,
    /// Store per-history backoff weights instead of the fixed stupid
    /// backoff factor.
    pub has_backoff_weights: bool,
    /// Top up predictions from the precomputed strongest unigrams.
    pub include_unigram_predictions: bool,
    /// Encode best-completion log probabilities for lexicon prefixes.
    pub enable_prefix_unigrams: bool,
    /// If greater than 0, only the most probable terms get an externally
    /// visible term-id; everything else maps to `<UNK>`.
    pub max_num_term_ids: u32,
    /// Extra backoff weight added when backing off to an uppercase unigram.
    pub uppercase_unigram_extra_backoff_weight: f32,
    /// Predictions from histories of two or more terms are dropped when
    /// the predicted term's unigram log probability falls below this.
    pub min_unigram_logp_for_predictions: f32,
    pub format_version: u32,
}

impl Default for LoudsLmParams {
    fn default() -> Self {
        Self {
            logp_quantizer_range: 20.0,
            has_backoff_weights: false,
            include_unigram_predictions: false,
            enable_prefix_unigrams: false,
            max_num_term_ids: 0,
            uppercase_unigram_extra_backoff_weight: 0.0,
            min_unigram_logp_for_predictions: -20.0,
            format_version: FORMAT_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() -> anyhow::Result<()> {
        let params = LoudsLmParams {
            has_backoff_weights: true,
            max_num_term_ids: 65536,
            ..Default::default()
        };
        let blob = serde_json::to_vec(&params)?;
        let back: LoudsLmParams = serde_json::from_slice(&blob)?;
        assert!(back.has_backoff_weights);
        assert_eq!(back.max_num_term_ids, 65536);
        assert_eq!(back.format_version, FORMAT_VERSION);
        Ok(())
    }

    #[test]
    fn missing_fields_take_defaults() -> anyhow::Result<()> {
        let back: LoudsLmParams = serde_json::from_slice(b"{\"max_num_term_ids\": 100}")?;
        assert_eq!(back.max_num_term_ids, 100);
        assert_eq!(back.logp_quantizer_range, 20.0);
        Ok(())
    }
}
