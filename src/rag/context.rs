//! Bounded context-window assembly.
//!
//! Retrieved chunk texts are concatenated most-relevant-first under a fixed
//! character budget. The tail beyond the budget is dropped silently from the
//! context string itself; whether anything was dropped is reported back so
//! the caller can surface it.

/// One chunk's contribution to the context window.
#[derive(Debug, Clone, Copy)]
pub struct ContextPiece<'a> {
    pub text: &'a str,
    pub source_path: &'a str,
    pub sequence_no: u32,
}

#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub text: String,
    /// True when the budget cut off part of the supplied pieces.
    pub truncated: bool,
}

pub struct ContextBuilder {
    max_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Assemble numbered, source-attributed entries until the budget is
    /// spent. An entry that does not fit whole is cut at the last char
    /// boundary inside the budget; everything after it is dropped.
    pub fn build(&self, pieces: &[ContextPiece<'_>]) -> BuiltContext {
        let mut context = String::new();
        let mut truncated = false;

        for (i, piece) in pieces.iter().enumerate() {
            let entry = format!(
                "[{}] (source: {}, chunk {})\n{}\n\n",
                i + 1,
                piece.source_path,
                piece.sequence_no,
                piece.text
            );

            let remaining = self.max_chars.saturating_sub(context.len());
            if entry.len() <= remaining {
                context.push_str(&entry);
                continue;
            }

            let mut cut = remaining;
            while cut > 0 && !entry.is_char_boundary(cut) {
                cut -= 1;
            }
            context.push_str(&entry[..cut]);
            truncated = true;
            break;
        }

        BuiltContext {
            text: context.trim_end().to_string(),
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(text: &str) -> ContextPiece<'_> {
        ContextPiece {
            text,
            source_path: "doc.txt",
            sequence_no: 0,
        }
    }

    #[test]
    fn everything_fits_within_a_large_budget() {
        let builder = ContextBuilder::new(4000);
        let built = builder.build(&[piece("cats are mammals"), piece("dogs are mammals")]);

        assert!(!built.truncated);
        assert!(built.text.contains("cats are mammals"));
        assert!(built.text.contains("dogs are mammals"));
        assert!(built.text.starts_with("[1] (source: doc.txt, chunk 0)"));
        assert!(built.text.contains("[2]"));
    }

    #[test]
    fn tail_is_dropped_beyond_the_budget() {
        let builder = ContextBuilder::new(80);
        let built = builder.build(&[piece("first passage kept in full"), piece("second passage")]);

        assert!(built.truncated);
        assert!(built.text.contains("first passage kept in full"));
        assert!(!built.text.contains("second passage"));
        assert!(built.text.len() <= 80);
    }

    #[test]
    fn oversized_first_piece_is_cut_not_skipped() {
        let builder = ContextBuilder::new(60);
        let long = "x".repeat(500);
        let built = builder.build(&[piece(&long)]);

        assert!(built.truncated);
        assert!(!built.text.is_empty());
        assert!(built.text.len() <= 60);
    }

    #[test]
    fn cut_lands_on_a_char_boundary() {
        let builder = ContextBuilder::new(46);
        // multibyte content straddling the cut point
        let built = builder.build(&[piece("ééééééééééééééééééééééééé")]);

        assert!(built.truncated);
        // would panic on a broken boundary; also must remain valid UTF-8
        assert!(built.text.chars().count() > 0);
    }

    #[test]
    fn empty_pieces_produce_empty_context() {
        let builder = ContextBuilder::new(100);
        let built = builder.build(&[]);
        assert!(built.text.is_empty());
        assert!(!built.truncated);
    }
}
