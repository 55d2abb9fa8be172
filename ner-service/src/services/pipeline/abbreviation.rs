//! Abbreviation detection (Schwartz & Hearst, 2003).
//!
//! Finds `long form (SF)` definitions and then marks each whole-token
//! occurrence of a short form from its definition onwards with the defining
//! long form. Uses before the definition are left alone.

use super::tokenizer::tokenize;
use super::{Abbreviation, TextSpan};
use std::collections::HashMap;

const MIN_SHORT_FORM_CHARS: usize = 2;
const MAX_SHORT_FORM_CHARS: usize = 10;
const MAX_SHORT_FORM_WORDS: usize = 2;

pub fn detect_abbreviations(text: &str) -> Vec<Abbreviation> {
    let mut definitions: Vec<(String, TextSpan)> = Vec::new();

    for (open, close) in parenthesised_regions(text) {
        let Some(short_form) = short_form_candidate(text, open + 1, close) else {
            continue;
        };
        if definitions.iter().any(|(sf, _)| *sf == short_form) {
            continue;
        }
        if let Some(long_form) = find_long_form(text, open, &short_form) {
            definitions.push((short_form, long_form));
        }
    }

    if definitions.is_empty() {
        return Vec::new();
    }

    let long_forms: HashMap<&str, &TextSpan> = definitions
        .iter()
        .map(|(sf, lf)| (sf.as_str(), lf))
        .collect();

    let mut abbreviations = Vec::new();
    for occurrence in short_form_occurrences(text, &long_forms) {
        let Some(long_form) = long_forms.get(occurrence.text.as_str()) else {
            continue;
        };
        if occurrence.start >= long_form.end {
            abbreviations.push(Abbreviation {
                short_form: occurrence,
                long_form: (*long_form).clone(),
            });
        }
    }

    abbreviations
}

/// Byte offsets of `(` and its `)` for every non-nested pair.
fn parenthesised_regions(text: &str) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut open: Option<usize> = None;

    for (offset, c) in text.char_indices() {
        match c {
            '(' => open = Some(offset),
            ')' => {
                if let Some(start) = open.take() {
                    regions.push((start, offset));
                }
            }
            _ => {}
        }
    }

    regions
}

/// Validate the text between the parentheses as a short form. Anything after
/// `,` or `;` is ignored (`(COPD; see below)`).
fn short_form_candidate(text: &str, start: usize, end: usize) -> Option<String> {
    let inner = &text[start..end];
    let inner = inner
        .split([',', ';'])
        .next()
        .unwrap_or_default()
        .trim();

    let char_count = inner.chars().count();
    if !(MIN_SHORT_FORM_CHARS..=MAX_SHORT_FORM_CHARS).contains(&char_count) {
        return None;
    }
    if inner.split_whitespace().count() > MAX_SHORT_FORM_WORDS {
        return None;
    }
    if !inner.chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    if !inner.chars().any(char::is_alphabetic) {
        return None;
    }

    Some(inner.to_string())
}

/// Search the words preceding `paren` for the shortest long form whose
/// characters cover the short form from right to left, the first short-form
/// character landing on a word start.
fn find_long_form(text: &str, paren: usize, short_form: &str) -> Option<TextSpan> {
    let sf_chars = short_form.chars().count();
    let window = (sf_chars + 5).min(sf_chars * 2);

    let preceding = tokenize(&text[..paren]);
    if preceding.is_empty() {
        return None;
    }
    let first = preceding.len().saturating_sub(window);
    let region_start = preceding[first].start;
    let region_end = preceding[preceding.len() - 1].end;
    let region = &text[region_start..region_end];

    let lf: Vec<(usize, char)> = region.char_indices().collect();
    let sf: Vec<char> = short_form.chars().collect();

    let mut s_index = sf.len() as isize - 1;
    let mut l_index = lf.len() as isize - 1;

    while s_index >= 0 {
        let current = sf[s_index as usize].to_lowercase().next()?;
        if !current.is_alphanumeric() {
            s_index -= 1;
            continue;
        }

        while l_index >= 0 {
            let candidate = lf[l_index as usize].1.to_lowercase().next()?;
            let at_word_start =
                l_index == 0 || !lf[l_index as usize - 1].1.is_alphanumeric();
            if candidate == current && (s_index > 0 || at_word_start) {
                break;
            }
            l_index -= 1;
        }
        if l_index < 0 {
            return None;
        }

        l_index -= 1;
        s_index -= 1;
    }

    // Extend back to the start of the word the first match landed in.
    let mut begin = (l_index + 1) as usize;
    while begin > 0 && !lf[begin - 1].1.is_whitespace() {
        begin -= 1;
    }
    while begin < lf.len() && !lf[begin].1.is_alphanumeric() {
        begin += 1;
    }
    if begin >= lf.len() {
        return None;
    }

    let start = region_start + lf[begin].0;
    let long_form = &text[start..region_end];

    if long_form.chars().count() <= sf_chars || long_form == short_form {
        return None;
    }

    Some(TextSpan {
        text: long_form.to_string(),
        start,
        end: region_end,
    })
}

/// Whole-token occurrences of any defined short form, in text order. Two-word
/// short forms are matched against consecutive token pairs.
fn short_form_occurrences(text: &str, long_forms: &HashMap<&str, &TextSpan>) -> Vec<TextSpan> {
    let tokens = tokenize(text);
    let mut found = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        if i + 1 < tokens.len() {
            let pair = &text[tokens[i].start..tokens[i + 1].end];
            let single_space = tokens[i + 1].start == tokens[i].end + 1;
            if single_space && long_forms.contains_key(pair) {
                found.push(TextSpan {
                    text: pair.to_string(),
                    start: tokens[i].start,
                    end: tokens[i + 1].end,
                });
                i += 2;
                continue;
            }
        }

        if long_forms.contains_key(tokens[i].text) {
            found.push(TextSpan {
                text: tokens[i].text.to_string(),
                start: tokens[i].start,
                end: tokens[i].end,
            });
        }
        i += 1;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_classic_definition() {
        let text = "The patient has chronic obstructive pulmonary disease (COPD).";
        let abbreviations = detect_abbreviations(text);

        assert_eq!(abbreviations.len(), 1);
        let abbr = &abbreviations[0];
        assert_eq!(abbr.short_form.text, "COPD");
        assert_eq!(abbr.long_form.text, "chronic obstructive pulmonary disease");
        assert_eq!(
            &text[abbr.long_form.start..abbr.long_form.end],
            "chronic obstructive pulmonary disease"
        );
    }

    #[test]
    fn marks_later_occurrences_with_the_same_long_form() {
        let text = "Magnetic resonance imaging (MRI) was ordered. The MRI was normal.";
        let abbreviations = detect_abbreviations(text);

        assert_eq!(abbreviations.len(), 2);
        assert!(abbreviations
            .iter()
            .all(|a| a.long_form.text == "Magnetic resonance imaging"));
        assert!(abbreviations[0].short_form.start < abbreviations[1].short_form.start);
        assert_eq!(
            &text[abbreviations[1].short_form.start..abbreviations[1].short_form.end],
            "MRI"
        );
    }

    #[test]
    fn uses_before_the_definition_are_not_marked() {
        let text = "COPD is common. Chronic obstructive pulmonary disease (COPD) is treatable.";
        let abbreviations = detect_abbreviations(text);

        assert_eq!(abbreviations.len(), 1);
        assert_eq!(abbreviations[0].short_form.start, text.find("(COPD)").unwrap() + 1);
    }

    #[test]
    fn ignores_trailing_clause_inside_parentheses() {
        let abbreviations =
            detect_abbreviations("Patients with atrial fibrillation (AF; n = 12) were enrolled.");
        assert_eq!(abbreviations.len(), 1);
        assert_eq!(abbreviations[0].long_form.text, "atrial fibrillation");
    }

    #[test]
    fn rejects_parentheses_that_are_not_short_forms() {
        assert!(detect_abbreviations("Dose was increased (see table 2 below).").is_empty());
        assert!(detect_abbreviations("Given twice daily (12).").is_empty());
        assert!(detect_abbreviations("A value (x).").is_empty());
    }

    #[test]
    fn rejects_when_letters_cannot_be_matched() {
        assert!(detect_abbreviations("The patient was seen in clinic (XYZ).").is_empty());
    }

    #[test]
    fn short_form_does_not_match_inside_other_words() {
        let text = "Heart failure (HF) worsened. HFpEF is distinct.";
        let abbreviations = detect_abbreviations(text);
        assert_eq!(abbreviations.len(), 1);
    }

    #[test]
    fn empty_text_has_no_abbreviations() {
        assert!(detect_abbreviations("").is_empty());
    }
}
