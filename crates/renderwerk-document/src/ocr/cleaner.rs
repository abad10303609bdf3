// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Noise filter for OCR output.

/// Lines of a single repeated symbol longer than this are scanning artefacts.
const MAX_KEPT_RULING: usize = 3;

/// Strip OCR noise from extracted text.
///
/// Each line is trimmed. Empty lines and rulings (a non-alphanumeric
/// character repeated more than three times, e.g. `-----`) become a single
/// space. Lines are joined with a space, whitespace runs collapse to one
/// space, and the result is trimmed. Applying it twice changes nothing.
///
/// Unlike plain concatenation of the kept lines, `"a\nb"` becomes `"a b"`,
/// not `"ab"`. Without the separator a ruling split across lines (`"---\n-"`)
/// would only be recognised on the second pass.
pub fn clean_text(input: &str) -> String {
    let mut joined = String::with_capacity(input.len());
    for line in input.lines() {
        let line = line.trim();
        joined.push(' ');
        if !is_useless_line(line) {
            joined.push_str(line);
        }
    }
    collapse_whitespace(&joined).trim().to_string()
}

fn is_useless_line(line: &str) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if first.is_alphanumeric() {
        return false;
    }
    chars.all(|c| c == first) && line.chars().count() > MAX_KEPT_RULING
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !previous_space {
                out.push(' ');
                previous_space = true;
            }
        } else {
            out.push(c);
            previous_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rulings_of_four_are_dropped() {
        assert_eq!(clean_text("above\n----\nbelow"), "above below");
        assert_eq!(clean_text("____"), "");
    }

    #[test]
    fn rulings_of_three_are_kept() {
        assert_eq!(clean_text("---"), "---");
        assert_eq!(clean_text("above\n***\nbelow"), "above *** below");
    }

    #[test]
    fn mixed_symbols_are_kept() {
        assert_eq!(clean_text("-=-=-="), "-=-=-=");
        assert_eq!(clean_text("aaaaaa"), "aaaaaa");
        assert_eq!(clean_text("1111"), "1111");
    }

    #[test]
    fn whitespace_collapses_within_lines() {
        assert_eq!(clean_text("  Invoice \t  No.   42  "), "Invoice No. 42");
    }

    #[test]
    fn blank_lines_separate_words() {
        assert_eq!(clean_text("first\n\n\n\nsecond\r\nthird"), "first second third");
    }

    #[test]
    fn adjacent_lines_keep_a_word_boundary() {
        assert_eq!(clean_text("a\nb"), "a b");
        assert_eq!(clean_text("---\n-"), "--- -");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(clean_text("———"), "———");
        assert_eq!(clean_text("————"), "");
    }

    #[test]
    fn is_idempotent() {
        for input in [
            "",
            "   ",
            "---\n-",
            "Title\n=====\n\nBody   text\n___\nend",
            "....\n....\nx",
            "a\tb\u{00a0}c",
        ] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "input: {input:?}");
        }
    }
}
