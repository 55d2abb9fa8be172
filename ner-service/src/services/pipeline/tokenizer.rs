/// A word token. `start`/`end` are byte offsets into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

fn is_joiner(c: char) -> bool {
    matches!(c, '-' | '\'' | '.')
}

/// Split text into word tokens.
///
/// A token is a run of alphanumerics; `-`, `'` and `.` stay inside a
/// token when they sit between two alphanumerics (`non-small-cell`,
/// `Crohn's`, `2.5`). Everything else is a boundary and is dropped.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c.is_alphanumeric() {
            if start.is_none() {
                start = Some(offset);
            }
            continue;
        }

        let next_is_alnum = chars
            .peek()
            .map(|&(_, next)| next.is_alphanumeric())
            .unwrap_or(false);
        if start.is_some() && is_joiner(c) && next_is_alnum {
            continue;
        }

        if let Some(s) = start.take() {
            tokens.push(Token {
                text: &text[s..offset],
                start: s,
                end: offset,
            });
        }
    }

    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            start: s,
            end: text.len(),
        });
    }

    tokens
}

/// Lower-case and collapse a phrase to single-space separated tokens.
/// Aliases and mentions are compared in this form.
pub fn normalize(text: &str) -> String {
    tokenize(text)
        .iter()
        .map(|token| token.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<&str> {
        tokenize(text).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        assert_eq!(
            texts("The patient was prescribed ibuprofen, for pain."),
            vec!["The", "patient", "was", "prescribed", "ibuprofen", "for", "pain"]
        );
    }

    #[test]
    fn keeps_internal_joiners() {
        assert_eq!(
            texts("non-small-cell carcinoma, Crohn's disease, 2.5 mg/kg"),
            vec!["non-small-cell", "carcinoma", "Crohn's", "disease", "2.5", "mg/kg"]
        );
    }

    #[test]
    fn drops_trailing_and_parenthesised_punctuation() {
        let tokens = tokenize("disease (COPD).");
        assert_eq!(tokens[1].text, "COPD");
        assert_eq!(tokens[1].start, 9);
        assert_eq!(tokens[1].end, 13);
    }

    #[test]
    fn offsets_are_bytes_for_non_ascii_text() {
        let text = "Sjögren syndrome";
        let tokens = tokenize(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[1].start..tokens[1].end], "syndrome");
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... ").is_empty());
    }

    #[test]
    fn normalize_collapses_case_and_spacing() {
        assert_eq!(
            normalize("  Chronic   Obstructive\tPulmonary-Disease "),
            "chronic obstructive pulmonary-disease"
        );
    }

    #[test]
    fn slash_separates_tokens() {
        let words: Vec<&str> = tokenize("heart/lung transplant").iter().map(|t| t.text).collect();
        assert_eq!(words, vec!["heart", "lung", "transplant"]);
    }
}
