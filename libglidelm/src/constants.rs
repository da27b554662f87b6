//! Reserved terms and term-ids shared by the lexicon and the n-gram model.

/// An externally visible term id. Reserved ids occupy `[0, FIRST_UNRESERVED_ID)`.
pub type TermId = u32;

/// The reserved term id for the beginning-of-sentence term.
pub const BOS_ID: TermId = 0;

/// The reserved term id for the end-of-sentence term.
pub const EOS_ID: TermId = 1;

/// The reserved term id for a term that is not in the lexicon.
/// Also used for terms that do not have an externally visible term id
/// when the lexicon caps its term-id space.
pub const UNK_ID: TermId = 2;

/// The reserved term id indicating that there is no id. Not intended for
/// regular out-of-vocabulary terms; those use `UNK_ID`.
pub const NONE_ID: TermId = 3;

/// The first term id that can be allocated to an actual term.
pub const FIRST_UNRESERVED_ID: TermId = 4;

pub const BOS: &str = "<S>";
pub const EOS: &str = "</S>";
pub const UNK: &str = "<UNK>";
pub const NONE: &str = "<NONE>";

/// Returns whether the given term is one of the reserved terms.
pub fn is_reserved_term(term: &str) -> bool {
    term == UNK || term == BOS || term == EOS || term == NONE
}

/// If the term is reserved, returns its term id. Otherwise returns
/// `FIRST_UNRESERVED_ID`.
pub fn reserved_term_to_term_id(term: &str) -> TermId {
    match term {
        UNK => UNK_ID,
        BOS => BOS_ID,
        EOS => EOS_ID,
        NONE => NONE_ID,
        _ => FIRST_UNRESERVED_ID,
    }
}

/// Returns the term for a reserved term id, or `None` for unreserved ids.
pub fn reserved_term_id_to_term(term_id: TermId) -> Option<&'static str> {
    match term_id {
        UNK_ID => Some(UNK),
        BOS_ID => Some(BOS),
        EOS_ID => Some(EOS),
        NONE_ID => Some(NONE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_round_trip() {
        for id in 0..FIRST_UNRESERVED_ID {
            let term = reserved_term_id_to_term(id).unwrap();
            assert!(is_reserved_term(term));
            assert_eq!(reserved_term_to_term_id(term), id);
        }
        assert_eq!(reserved_term_id_to_term(FIRST_UNRESERVED_ID), None);
        assert!(!is_reserved_term("hello"));
        assert_eq!(reserved_term_to_term_id("hello"), FIRST_UNRESERVED_ID);
    }
}
