//! Dumps every n-gram stored in a model.

use libglidelm::lm::louds_lm::LoudsLm;

use crate::OutputFormat;

pub fn dump_ngrams(model_file: &str, mmap: bool, format: OutputFormat) -> anyhow::Result<()> {
    let lm = if mmap {
        LoudsLm::map_from_path(model_file)?
    } else {
        LoudsLm::load_from_path(model_file)?
    };
    let ngrams = lm.dump_ngrams();
    match format {
        OutputFormat::Text => {
            for ngram in &ngrams {
                println!("{}\t{}", ngram.terms.join(" "), ngram.logp);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ngrams)?);
        }
    }
    Ok(())
}
