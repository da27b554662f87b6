//! Top-N next-word predictions for a context.

use std::collections::HashMap;

use libglidelm::lm::louds_lm::LoudsLm;

pub fn predict(
    model_file: &str,
    mmap: bool,
    context: &[String],
    max_results: usize,
) -> anyhow::Result<()> {
    let lm = if mmap {
        LoudsLm::map_from_path(model_file)?
    } else {
        LoudsLm::load_from_path(model_file)?
    };

    let terms: Vec<&str> = context.iter().map(String::as_str).collect();
    let mut results: HashMap<String, f32> = HashMap::new();
    lm.predict_next_words(&[], &terms, max_results, &mut results);

    let mut sorted: Vec<(String, f32)> = results.into_iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (term, logp) in sorted {
        println!("{term}\t{logp}");
    }
    Ok(())
}
