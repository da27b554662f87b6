pub mod dump_ngrams;
pub mod lookup;
pub mod make_lm;
pub mod predict;
