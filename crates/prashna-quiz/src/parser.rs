// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Question parser: a line-oriented state machine that turns normalized quiz
// text into question/option records.
//
// Each non-blank line is classified against two priority tables: question
// starts first, then option leads. The parser state is an explicit enum that
// is folded over the lines, so the flush/discard rule lives in one function.

use std::sync::LazyLock;

use prashna_core::Question;
use regex::Regex;
use tracing::{debug, instrument};

/// Question-start patterns in priority order: the first one that matches wins.
///
/// Capture group 1 is the numbering token. Numbering is checked before
/// options on every line, so a bare `N.` always opens a new question.
pub const QUESTION_START_PATTERNS: &[(&str, &str)] = &[
    ("prashna", r"^प्रश्न\s*(\d+)\s*\."),
    ("q-number", r"^Q\.?\s*(\d+)\s*[.):]?"),
    ("bare-number", r"^(\d+)\."),
    ("parenthesized-number", r"^\((\d+)\)"),
];

/// Option-lead patterns in priority order.
///
/// The trailing `bare-number` entry has the same shape as a question start
/// and is therefore shadowed whenever both tables are consulted.
pub const OPTION_PATTERNS: &[(&str, &str)] = &[
    ("latin-paren", r"^[A-Da-d]\)"),
    ("latin-dot", r"^[A-Da-d]\."),
    ("devanagari-letter", r"^\(?[कखगघचछजझ]\)"),
    ("bare-number", r"^(\d+)\."),
];

/// A named, compiled entry of a priority table.
#[derive(Debug, Clone)]
pub struct LinePattern {
    pub name: &'static str,
    pub regex: Regex,
}

fn compile(table: &[(&'static str, &'static str)]) -> Vec<LinePattern> {
    table
        .iter()
        .map(|&(name, source)| LinePattern {
            name,
            regex: Regex::new(source).expect("built-in line pattern must compile"),
        })
        .collect()
}

static QUESTION_TABLE: LazyLock<Vec<LinePattern>> =
    LazyLock::new(|| compile(QUESTION_START_PATTERNS));
static OPTION_TABLE: LazyLock<Vec<LinePattern>> = LazyLock::new(|| compile(OPTION_PATTERNS));

/// What a single line means to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    QuestionStart { number: &'a str, text: &'a str },
    Option(&'a str),
    Text(&'a str),
}

/// A question still collecting lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialQuestion {
    pub number: String,
    pub text: String,
    pub options: Vec<String>,
}

impl PartialQuestion {
    fn append_text(&mut self, line: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(line);
    }

    /// Finalize into a [`Question`]; `None` when no option was parsed.
    pub fn finish(self) -> Option<Question> {
        if self.options.is_empty() {
            debug!(number = %self.number, "Dropping question without options");
            return None;
        }
        Some(Question {
            number: self.number,
            text: self.text.trim().to_string(),
            options: self.options,
            correct_answer: None,
        })
    }
}

/// Parser state carried through the fold over lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParserState {
    #[default]
    NoQuestion,
    InQuestion(PartialQuestion),
}

impl ParserState {
    /// Flush at end of input, applying the same completeness rule as a boundary.
    pub fn finish(self) -> Option<Question> {
        match self {
            Self::NoQuestion => None,
            Self::InQuestion(partial) => partial.finish(),
        }
    }
}

/// Line-oriented MCQ parser. The priority tables are compiled once per
/// process and shared by every parser.
#[derive(Debug, Clone, Copy)]
pub struct QuestionParser {
    question_patterns: &'static [LinePattern],
    option_patterns: &'static [LinePattern],
}

impl Default for QuestionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionParser {
    pub fn new() -> Self {
        Self {
            question_patterns: QUESTION_TABLE.as_slice(),
            option_patterns: OPTION_TABLE.as_slice(),
        }
    }

    pub fn question_patterns(&self) -> &'static [LinePattern] {
        self.question_patterns
    }

    pub fn option_patterns(&self) -> &'static [LinePattern] {
        self.option_patterns
    }

    /// Classify a trimmed, non-blank line.
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        for pattern in self.question_patterns {
            if let Some(caps) = pattern.regex.captures(line) {
                let lead = caps.get(0).map_or(0, |m| m.end());
                let number = caps.get(1).map_or("", |m| m.as_str());
                return LineKind::QuestionStart {
                    number,
                    text: line[lead..].trim(),
                };
            }
        }
        for pattern in self.option_patterns {
            if let Some(m) = pattern.regex.find(line) {
                return LineKind::Option(line[m.end()..].trim());
            }
        }
        LineKind::Text(line)
    }

    /// Apply one line to the state, returning the next state and any question
    /// flushed by a boundary.
    pub fn transition(&self, state: ParserState, line: &str) -> (ParserState, Option<Question>) {
        match (state, self.classify(line)) {
            (previous, LineKind::QuestionStart { number, text }) => {
                let flushed = previous.finish();
                let next = ParserState::InQuestion(PartialQuestion {
                    number: number.to_string(),
                    text: text.to_string(),
                    options: Vec::new(),
                });
                (next, flushed)
            }
            (ParserState::InQuestion(mut partial), LineKind::Option(option)) => {
                partial.options.push(option.to_string());
                (ParserState::InQuestion(partial), None)
            }
            (ParserState::InQuestion(mut partial), LineKind::Text(text)) => {
                partial.append_text(text);
                (ParserState::InQuestion(partial), None)
            }
            // Nothing to attach the line to yet.
            (ParserState::NoQuestion, _) => (ParserState::NoQuestion, None),
        }
    }

    /// Parse normalized text into complete questions, in input order.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn parse(&self, text: &str) -> Vec<Question> {
        let mut questions = Vec::new();
        let last = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .fold(ParserState::NoQuestion, |state, line| {
                let (next, flushed) = self.transition(state, line);
                questions.extend(flushed);
                next
            });
        questions.extend(last.finish());

        debug!(questions = questions.len(), "Parse complete");
        questions
    }
}
