//! Builds a binary LM container from a TSV n-gram listing.

use libglidelm::lm::louds_lm::LoudsLm;
use libglidelm::lm::params::LoudsLmParams;

use crate::ngram_tsv::parse_ngram_tsv;

pub fn make_lm(src_file: &str, dst_file: &str, params: LoudsLmParams) -> anyhow::Result<()> {
    let ngrams = parse_ngram_tsv(src_file)?;
    log::info!("Read {} n-grams from {}", ngrams.len(), src_file);

    let lm = LoudsLm::build(&ngrams, params)?;

    println!("Writing {dst_file}");
    lm.write_to_path(dst_file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builds_a_loadable_model() -> anyhow::Result<()> {
        let mut src = tempfile::NamedTempFile::new()?;
        writeln!(src, "the\t-1.0")?;
        writeln!(src, "cat\t-3.0")?;
        writeln!(src, "the cat\t-1.5")?;
        src.flush()?;
        let dst = tempfile::NamedTempFile::new()?;

        make_lm(
            src.path().to_str().unwrap(),
            dst.path().to_str().unwrap(),
            LoudsLmParams::default(),
        )?;

        let lm = LoudsLm::load_from_path(dst.path())?;
        let (value, found) = lm.lookup_conditional_log_prob(&[], &["the", "cat"]);
        assert!(found);
        assert!((value - (-1.5)).abs() < 0.05);
        Ok(())
    }
}
