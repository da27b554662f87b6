//! A bounded beam that keeps the top-k predictions by log probability.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, PartialEq)]
struct BeamEntry {
    logp: f32,
    term_id: u16,
}

impl Eq for BeamEntry {}

impl Ord for BeamEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.logp
            .total_cmp(&other.logp)
            .then_with(|| self.term_id.cmp(&other.term_id))
    }
}

impl PartialOrd for BeamEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps at most `capacity` entries, evicting the weakest. Ties break
/// arbitrarily; the beam is only stable up to its size.
pub(crate) struct PredictionBeam {
    capacity: usize,
    heap: BinaryHeap<Reverse<BeamEntry>>,
}

impl PredictionBeam {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    pub(crate) fn push(&mut self, term_id: u16, logp: f32) {
        if self.capacity == 0 {
            return;
        }
        let entry = BeamEntry { logp, term_id };
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(entry));
        } else if let Some(weakest) = self.heap.peek() {
            if entry > weakest.0 {
                self.heap.pop();
                self.heap.push(Reverse(entry));
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Non-destructive view of the current contents, in no particular order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u16, f32)> + '_ {
        self.heap.iter().map(|e| (e.0.term_id, e.0.logp))
    }

    /// Drains the beam, strongest first.
    pub(crate) fn take(self) -> Vec<(u16, f32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.0.term_id, e.0.logp))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_k_in_order() {
        let mut beam = PredictionBeam::new(3);
        for (id, logp) in [(1, -5.0), (2, -1.0), (3, -9.0), (4, -2.0), (5, -0.5)] {
            beam.push(id, logp);
        }
        let taken = beam.take();
        assert_eq!(
            taken.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            vec![5, 2, 4]
        );
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut beam = PredictionBeam::new(0);
        beam.push(1, -1.0);
        assert!(beam.is_empty());
        assert!(beam.take().is_empty());
    }

    #[test]
    fn weaker_entries_do_not_evict() {
        let mut beam = PredictionBeam::new(2);
        beam.push(1, -1.0);
        beam.push(2, -2.0);
        beam.push(3, -10.0);
        let ids: Vec<u16> = beam.take().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
