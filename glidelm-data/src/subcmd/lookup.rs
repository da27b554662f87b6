//! Conditional log probability of the last word of a sentence.

use anyhow::bail;
use libglidelm::lm::louds_lm::LoudsLm;

pub fn lookup(model_file: &str, mmap: bool, words: &[String]) -> anyhow::Result<()> {
    if words.is_empty() {
        bail!("lookup requires at least one word");
    }
    let lm = if mmap {
        LoudsLm::map_from_path(model_file)?
    } else {
        LoudsLm::load_from_path(model_file)?
    };

    let terms: Vec<&str> = words.iter().map(String::as_str).collect();
    let (value, found) = lm.lookup_conditional_log_prob(&[], &terms);

    let (history, target) = terms.split_at(terms.len() - 1);
    println!(
        "P({} | {}) = {} ({})",
        target[0],
        if history.is_empty() {
            "<empty>".to_string()
        } else {
            history.join(" ")
        },
        value,
        if found { "match" } else { "miss" },
    );
    Ok(())
}
