// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text normalizer: canonical Unicode form for recognized Devanagari text.

use unicode_normalization::UnicodeNormalization;

/// The Devanagari Unicode block.
const DEVANAGARI: std::ops::RangeInclusive<char> = '\u{0900}'..='\u{097F}';

/// ASCII punctuation that recognition engines emit in place of Devanagari or
/// typographic marks.
const PUNCTUATION_MAP: &[(char, char)] = &[
    ('|', '।'),
    ('-', '—'),
    ('`', '‘'),
    ('\'', '’'),
    ('"', '”'),
];

/// Vowel signs that OCR tends to separate from their consonant with a space.
///
/// Best-effort list; not every matra is covered.
const SPACED_MATRAS: &[char] = &['ा', 'ी', 'े', 'ै', 'ो', 'ौ'];

/// Normalize raw recognized or extracted text.
///
/// NFKC, drops glyphs outside ASCII and Devanagari, maps ASCII digits and
/// punctuation to their Devanagari/typographic forms, collapses whitespace,
/// rejoins detached matras and trims. Line structure is kept so the question
/// parser can work line by line. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let composed: String = raw.nfkc().collect();

    let mapped: String = composed
        .chars()
        .filter(|c| is_retained(*c))
        .map(map_char)
        .collect();

    let unified = mapped.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for line in unified.split('\n') {
        let cleaned = fix_matras(&collapse_whitespace(line));
        let cleaned = cleaned.trim();
        // Keep at most one blank line in a row.
        if cleaned.is_empty() && lines.last().is_none_or(|prev| prev.is_empty()) {
            continue;
        }
        lines.push(cleaned.to_string());
    }

    let joined = lines.join("\n");
    // Dropping characters can leave a base and a combining mark adjacent;
    // recompose so a second pass has nothing left to do.
    joined.trim().nfkc().collect()
}

/// Whether a character survives the noise filter.
fn is_retained(c: char) -> bool {
    if c.is_whitespace() {
        return true;
    }
    if c.is_ascii() {
        return !c.is_ascii_control();
    }
    DEVANAGARI.contains(&c) || PUNCTUATION_MAP.iter().any(|(_, to)| *to == c)
}

fn map_char(c: char) -> char {
    if c.is_ascii_digit() {
        // U+0966 DEVANAGARI DIGIT ZERO
        return char::from_u32(0x0966 + (c as u32 - '0' as u32)).unwrap_or(c);
    }
    PUNCTUATION_MAP
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fix_matras(line: &str) -> String {
    let mut fixed = line.to_string();
    for matra in SPACED_MATRAS {
        fixed = fixed.replace(&format!(" {matra}"), &matra.to_string());
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_ascii_digits_to_devanagari() {
        assert_eq!(normalize_text("Q.12 = 0987"), "Q.१२ = ०९८७");
    }

    #[test]
    fn maps_punctuation() {
        assert_eq!(normalize_text("राम | श्याम - 'क' \"ख\" `ग"), "राम । श्याम — ’क’ ”ख” ‘ग");
    }

    #[test]
    fn strips_other_scripts_and_noise() {
        assert_eq!(normalize_text("प्रश्न ★ абв 日本 ok"), "प्रश्न ok");
    }

    #[test]
    fn nfkc_folds_compatibility_forms() {
        // Fullwidth A and the "fi" ligature fold to ASCII.
        assert_eq!(normalize_text("\u{FF21} \u{FB01}le"), "A file");
    }

    #[test]
    fn collapses_whitespace_but_keeps_lines() {
        let raw = "  प्रश्न   1.\t क्या?  \r\n\r\n\r\n A)   100 \n";
        assert_eq!(normalize_text(raw), "प्रश्न १. क्या?\n\nA) १००");
    }

    #[test]
    fn rejoins_detached_matras() {
        assert_eq!(normalize_text("क ा ल े"), "का ले");
        assert_eq!(normalize_text("भ ी"), "भी");
    }

    #[test]
    fn empty_and_whitespace_only() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\t\r\n "), "");
    }

    #[test]
    fn idempotent_on_varied_inputs() {
        let samples = [
            "प्रश्न 1. एक संख्या का 20% 25 है तो वह संख्या क्या है?\nA) 100\nB) 125",
            "  Q.2  Which | is - 'largest' \"planet\"?  \n\n\n (क) पृथ्वी ",
            "क ा ख े ग ै घ ो ङ ौ च ी",
            "न\u{2605}\u{093C} mixed \u{0958} text\u{00A0}with\u{2028}separators",
            "\u{FF11}\u{FF12}. fullwidth digits",
            "\r\r\n\u{0007}bell\u{0000} and controls",
            "सही उत्तर: क\nAnswer = D",
        ];
        for sample in samples {
            let once = normalize_text(sample);
            let twice = normalize_text(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }
}
