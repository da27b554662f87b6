//! A bit-vector with constant-time rank and sampled select, the primitive
//! underneath the LOUDS tries.
//!
//! Append-only during construction; `build()` computes the rank directory
//! and select samples, after which `rank1/0` and `select1/0` are available
//! and the vector must not be mutated. The indices are small and cheap to
//! compute, so they are rebuilt on load instead of being serialized.

use std::io::{Read, Write};

use anyhow::{bail, Result};

use crate::succinct::int_vector::IntVector;
use crate::wire::{ModelMapper, ModelReader, ModelWriter};

const WORDS_PER_RANK_BLOCK: usize = 4;
const RANK_BLOCK_BITS: usize = WORDS_PER_RANK_BLOCK * 64;
const SELECT_SAMPLE_RATE: usize = 256;

/// Position of the k-th set bit within a word. `k` must be less than the
/// word's popcount.
fn select_in_word(mut word: u64, mut k: usize) -> usize {
    loop {
        let t = word.trailing_zeros() as usize;
        if k == 0 {
            return t;
        }
        word &= word - 1;
        k -= 1;
    }
}

#[derive(Default)]
pub struct BitVector {
    words: IntVector<u64>,
    num_bits: usize,
    num_ones: usize,
    // Absolute rank at each 256-bit block boundary.
    ranks: Vec<u32>,
    // Position of every 256th one / zero.
    select1_samples: Vec<u32>,
    select0_samples: Vec<u32>,
}

impl BitVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bit. Must not be called after `build()`.
    pub fn push_back(&mut self, bit: bool) {
        debug_assert!(self.ranks.is_empty(), "push_back after build");
        if self.num_bits % 64 == 0 {
            self.words.push_back(0);
        }
        if bit {
            let w = self.num_bits / 64;
            let word = self.words.get(w) | 1u64 << (self.num_bits % 64);
            self.words.set(w, word);
        }
        self.num_bits += 1;
    }

    pub fn len(&self) -> usize {
        self.num_bits
    }

    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    pub fn num_ones(&self) -> usize {
        self.num_ones
    }

    pub fn num_zeros(&self) -> usize {
        self.num_bits - self.num_ones
    }

    pub fn bit(&self, i: usize) -> bool {
        assert!(i < self.num_bits, "bit index {i} out of range");
        (self.words.get(i / 64) >> (i % 64)) & 1 == 1
    }

    // The word at index `w` with any bits past `num_bits` cleared.
    fn masked_word(&self, w: usize) -> u64 {
        let word = self.words.get(w);
        let valid = self.num_bits - w * 64;
        if valid >= 64 {
            word
        } else {
            word & ((1u64 << valid) - 1)
        }
    }

    fn masked_inv_word(&self, w: usize) -> u64 {
        let inv = !self.words.get(w);
        let valid = self.num_bits - w * 64;
        if valid >= 64 {
            inv
        } else {
            inv & ((1u64 << valid) - 1)
        }
    }

    /// Builds the rank and select indices.
    pub fn build(&mut self) {
        let num_words = self.words.len();
        self.ranks = Vec::with_capacity(num_words / WORDS_PER_RANK_BLOCK + 2);
        self.select1_samples.clear();
        self.select0_samples.clear();
        let mut ones: usize = 0;
        let mut zeros: usize = 0;
        for w in 0..num_words {
            if w % WORDS_PER_RANK_BLOCK == 0 {
                self.ranks.push(ones as u32);
            }
            let word = self.masked_word(w);
            let inv = self.masked_inv_word(w);
            let cnt1 = word.count_ones() as usize;
            let cnt0 = inv.count_ones() as usize;
            let mut t = ones.next_multiple_of(SELECT_SAMPLE_RATE);
            while t < ones + cnt1 {
                self.select1_samples
                    .push((w * 64 + select_in_word(word, t - ones)) as u32);
                t += SELECT_SAMPLE_RATE;
            }
            let mut t = zeros.next_multiple_of(SELECT_SAMPLE_RATE);
            while t < zeros + cnt0 {
                self.select0_samples
                    .push((w * 64 + select_in_word(inv, t - zeros)) as u32);
                t += SELECT_SAMPLE_RATE;
            }
            ones += cnt1;
            zeros += cnt0;
        }
        self.ranks.push(ones as u32);
        self.num_ones = ones;
    }

    /// The number of ones in `[0, i)`. Only valid after `build()`.
    pub fn rank1(&self, i: usize) -> usize {
        assert!(i <= self.num_bits, "rank1 index {i} out of range");
        debug_assert!(!self.ranks.is_empty(), "rank1 before build");
        let block = i / RANK_BLOCK_BITS;
        let mut r = self.ranks[block] as usize;
        let last_word = i / 64;
        for w in block * WORDS_PER_RANK_BLOCK..last_word {
            r += self.masked_word(w).count_ones() as usize;
        }
        let rem = i % 64;
        if rem > 0 {
            r += (self.masked_word(last_word) & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        r
    }

    /// The number of zeros in `[0, i)`. Only valid after `build()`.
    pub fn rank0(&self, i: usize) -> usize {
        i - self.rank1(i)
    }

    /// The position of the k-th one (0-indexed). Only valid after `build()`.
    pub fn select1(&self, k: usize) -> usize {
        assert!(k < self.num_ones, "select1 index {k} out of range");
        let sample = self.select1_samples[k / SELECT_SAMPLE_RATE] as usize;
        let mut w = sample / 64;
        let mut count = self.rank1(w * 64);
        loop {
            let word = self.masked_word(w);
            let c = word.count_ones() as usize;
            if count + c > k {
                return w * 64 + select_in_word(word, k - count);
            }
            count += c;
            w += 1;
        }
    }

    /// The position of the k-th zero (0-indexed). Only valid after `build()`.
    pub fn select0(&self, k: usize) -> usize {
        assert!(k < self.num_zeros(), "select0 index {k} out of range");
        let sample = self.select0_samples[k / SELECT_SAMPLE_RATE] as usize;
        let mut w = sample / 64;
        let mut count = self.rank0(w * 64);
        loop {
            let inv = self.masked_inv_word(w);
            let c = inv.count_ones() as usize;
            if count + c > k {
                return w * 64 + select_in_word(inv, k - count);
            }
            count += c;
            w += 1;
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut ModelWriter<W>) -> Result<()> {
        w.write_u64(self.num_bits as u64)?;
        self.words.write_to(w)
    }

    pub fn read_from<R: Read>(r: &mut ModelReader<R>) -> Result<Self> {
        let num_bits = r.read_u64()? as usize;
        let words = IntVector::<u64>::read_from(r)?;
        Self::from_parts(num_bits, words)
    }

    pub fn map_from(m: &mut ModelMapper) -> Result<Self> {
        let num_bits = m.map_u64()? as usize;
        let words = IntVector::<u64>::map_from(m)?;
        Self::from_parts(num_bits, words)
    }

    fn from_parts(num_bits: usize, words: IntVector<u64>) -> Result<Self> {
        if words.len() != num_bits.div_ceil(64) {
            bail!(
                "corrupt bit-vector: {} words for {} bits",
                words.len(),
                num_bits
            );
        }
        let mut bv = Self {
            words,
            num_bits,
            ..Default::default()
        };
        bv.build();
        Ok(bv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bits(n: usize) -> Vec<bool> {
        // A deterministic irregular pattern with runs of both values.
        (0..n).map(|i| (i * i + i / 3) % 7 < 3).collect()
    }

    fn build_from(bits: &[bool]) -> BitVector {
        let mut bv = BitVector::new();
        for &b in bits {
            bv.push_back(b);
        }
        bv.build();
        bv
    }

    #[test]
    fn rank_identities() {
        let bits = sample_bits(1000);
        let bv = build_from(&bits);
        let mut ones = 0;
        for i in 0..=bits.len() {
            assert_eq!(bv.rank1(i), ones, "rank1({i})");
            assert_eq!(bv.rank1(i) + bv.rank0(i), i);
            if i < bits.len() && bits[i] {
                ones += 1;
            }
        }
        assert_eq!(bv.rank1(bv.len()), bv.num_ones());
    }

    #[test]
    fn select_inverts_rank() {
        let bits = sample_bits(1500);
        let bv = build_from(&bits);
        let mut ones = 0;
        let mut zeros = 0;
        for (i, &b) in bits.iter().enumerate() {
            if b {
                assert_eq!(bv.select1(ones), i, "select1({ones})");
                assert!(bv.select1(bv.rank1(i)) <= i || !b);
                ones += 1;
            } else {
                assert_eq!(bv.select0(zeros), i, "select0({zeros})");
                zeros += 1;
            }
        }
        assert_eq!(ones, bv.num_ones());
        assert_eq!(zeros, bv.num_zeros());
    }

    #[test]
    fn serialization_round_trip() -> Result<()> {
        let bits = sample_bits(700);
        let bv = build_from(&bits);

        let mut buf = Vec::new();
        bv.write_to(&mut ModelWriter::new(&mut buf))?;
        let read = BitVector::read_from(&mut ModelReader::new(&buf[..]))?;
        assert_eq!(read.len(), bv.len());
        assert_eq!(read.num_ones(), bv.num_ones());
        for i in (0..bits.len()).step_by(13) {
            assert_eq!(read.bit(i), bits[i]);
            assert_eq!(read.rank1(i), bv.rank1(i));
        }

        let mut m = ModelMapper::from_bytes(std::sync::Arc::from(buf.into_boxed_slice()));
        let mapped = BitVector::map_from(&mut m)?;
        assert_eq!(mapped.rank1(mapped.len()), bv.num_ones());
        Ok(())
    }

    #[test]
    fn empty_vector_builds() {
        let mut bv = BitVector::new();
        bv.build();
        assert_eq!(bv.len(), 0);
        assert_eq!(bv.rank1(0), 0);
    }

    #[test]
    fn long_runs_cross_sample_boundaries() {
        // 600 ones then 600 zeros exercises samples beyond the first.
        let mut bits = vec![true; 600];
        bits.extend(vec![false; 600]);
        let bv = build_from(&bits);
        assert_eq!(bv.select1(599), 599);
        assert_eq!(bv.select0(0), 600);
        assert_eq!(bv.select0(599), 1199);
        assert_eq!(bv.rank1(1200), 600);
    }
}
