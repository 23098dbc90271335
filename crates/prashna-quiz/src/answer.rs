// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer resolver: finds an explicit "correct answer" marker in a question's
// text and canonicalizes it to a Latin letter.

use std::sync::LazyLock;

use prashna_core::AnswerLetter;
use regex::Regex;

/// Marker patterns in priority order. Group 1 captures the letter token.
const ANSWER_MARKERS: &[&str] = &[
    r"सही\s*उत्तर\s*[:=]\s*\(?([A-Da-dकखगघचछजझ])(?:\)|\b)",
    r"(?i:answer)\s*[:=]\s*\(?([A-Da-dकखगघचछजझ])(?:\)|\b)",
];

static MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ANSWER_MARKERS
        .iter()
        .map(|source| Regex::new(source).expect("built-in answer pattern must compile"))
        .collect()
});

/// Map a captured letter token to its canonical answer letter.
pub fn canonical_letter(token: &str) -> Option<AnswerLetter> {
    let letter = match token.trim().trim_matches(|c| c == '(' || c == ')') {
        "A" | "a" | "क" => AnswerLetter::A,
        "B" | "b" | "ख" => AnswerLetter::B,
        "C" | "c" | "ग" => AnswerLetter::C,
        "D" | "d" | "घ" => AnswerLetter::D,
        "च" => AnswerLetter::E,
        "छ" => AnswerLetter::F,
        "ज" => AnswerLetter::G,
        "झ" => AnswerLetter::H,
        _ => return None,
    };
    Some(letter)
}

/// Resolve the correct answer from a question's accumulated text.
///
/// Best-effort: no marker, or an unrecognized token, leaves the answer unset.
pub fn resolve_answer(question_text: &str) -> Option<AnswerLetter> {
    MARKERS.iter().find_map(|marker| {
        marker
            .captures(question_text)
            .and_then(|caps| caps.get(1))
            .and_then(|token| canonical_letter(token.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devanagari_marker() {
        assert_eq!(
            resolve_answer("भारत की राजधानी? सही उत्तर: क"),
            Some(AnswerLetter::A)
        );
    }

    #[test]
    fn english_marker() {
        assert_eq!(
            resolve_answer("Largest planet? Answer: D"),
            Some(AnswerLetter::D)
        );
    }

    #[test]
    fn no_marker_leaves_answer_unset() {
        assert_eq!(resolve_answer("सबसे बड़ा ग्रह कौन सा है?"), None);
    }

    #[test]
    fn parenthesized_and_lowercase_tokens() {
        assert_eq!(resolve_answer("सही उत्तर = (ख)"), Some(AnswerLetter::B));
        assert_eq!(resolve_answer("answer: c"), Some(AnswerLetter::C));
        assert_eq!(resolve_answer("ANSWER=(a)"), Some(AnswerLetter::A));
    }

    #[test]
    fn extended_devanagari_letters() {
        assert_eq!(resolve_answer("सही उत्तर: च"), Some(AnswerLetter::E));
        assert_eq!(resolve_answer("सही उत्तर: झ"), Some(AnswerLetter::H));
    }

    #[test]
    fn unrecognized_token_leaves_answer_unset() {
        assert_eq!(resolve_answer("Answer: Z"), None);
        assert_eq!(resolve_answer("सही उत्तर: काला"), None);
        assert_eq!(resolve_answer("Answer: Delhi"), None);
        assert_eq!(canonical_letter("ट"), None);
    }

    #[test]
    fn devanagari_marker_takes_priority() {
        assert_eq!(
            resolve_answer("Answer: D सही उत्तर: ग"),
            Some(AnswerLetter::C)
        );
    }

    #[test]
    fn resolves_through_extract_questions() {
        let text = "प्रश्न 1. 2 + 2 = ?\nA) 3\nB) 4\nसही उत्तर: ख";
        let questions = crate::extract_questions(&crate::normalize_text(text));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, Some(AnswerLetter::B));
        assert_eq!(questions[0].correct_option(), Some("४"));
    }
}
