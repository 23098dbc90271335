// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prashna-quiz: Text side of the quiz extractor.
//
// Canonicalizes recognized Devanagari text, splits it into question/option
// records with a line-oriented state machine, and resolves explicit
// "correct answer" markers.

pub mod answer;
pub mod normalize;
pub mod parser;

pub use answer::resolve_answer;
pub use normalize::normalize_text;
pub use parser::QuestionParser;

use prashna_core::Question;

/// Parse normalized text into questions and resolve each one's answer marker.
pub fn extract_questions(text: &str) -> Vec<Question> {
    QuestionParser::new()
        .parse(text)
        .into_iter()
        .map(|mut question| {
            question.correct_answer = resolve_answer(&question.text);
            question
        })
        .collect()
}
