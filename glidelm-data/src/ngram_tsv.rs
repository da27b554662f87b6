//! Parser for the TSV n-gram listing consumed by `make-lm`.
//!
//! One n-gram per line: `w1 w2 ... wN<TAB>logp[<TAB>backoff]`, log
//! probabilities in natural log. Blank lines and `#` comments are
//! ignored; malformed lines are skipped with a warning.

use std::fs::File;
use std::io::{prelude::*, BufReader};

use anyhow::Context;
use libglidelm::lm::louds_lm::Ngram;

pub fn parse_ngram_tsv(src_file: &str) -> anyhow::Result<Vec<Ngram>> {
    let file = File::open(src_file).with_context(|| format!("cannot open {src_file}"))?;
    let mut ngrams = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split('\t');
        let terms_field = fields.next().unwrap_or_default();
        let Some(logp_field) = fields.next() else {
            log::warn!("Skipping malformed n-gram line: {:?}", trimmed);
            continue;
        };
        let logp: f32 = match logp_field.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Skipping unparseable logp in line: {:?}", trimmed);
                continue;
            }
        };
        let backoff: f32 = match fields.next() {
            Some(field) => match field.trim().parse() {
                Ok(v) => v,
                Err(_) => {
                    log::warn!("Skipping unparseable backoff in line: {:?}", trimmed);
                    continue;
                }
            },
            None => 0.0,
        };
        let terms: Vec<String> = terms_field.split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            log::warn!("Skipping n-gram line without terms: {:?}", trimmed);
            continue;
        }
        ngrams.push(Ngram { terms, logp, backoff });
    }

    Ok(ngrams)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_and_skips_malformed_lines() -> anyhow::Result<()> {
        let mut tmpfile = tempfile::NamedTempFile::new()?;
        writeln!(tmpfile, "# comment")?;
        writeln!(tmpfile, "the\t-1.0")?;
        writeln!(tmpfile, "the cat\t-1.5\t-0.3")?;
        writeln!(tmpfile)?;
        writeln!(tmpfile, "no-logp-field")?;
        writeln!(tmpfile, "bad\tnot-a-number")?;
        tmpfile.flush()?;

        let ngrams = parse_ngram_tsv(tmpfile.path().to_str().unwrap())?;
        assert_eq!(ngrams.len(), 2);
        assert_eq!(ngrams[0].terms, vec!["the"]);
        assert_eq!(ngrams[1].terms, vec!["the", "cat"]);
        assert_eq!(ngrams[1].backoff, -0.3);
        Ok(())
    }
}
