//! Emoji detection and removal.

/// Whether `c` is an emoji code point or an emoji modifier.
///
/// Covers pictographs, dingbats, regional indicators, skin-tone modifiers,
/// variation selectors, zero-width joiners, keycap marks and tag characters,
/// plus the symbols that have an emoji form (`©`, `™`, `▶`, `↩`, ...).
/// Plain arrows like `→` are left alone.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        // Copyright, registered
        0x00A9
            | 0x00AE
            // Double exclamation, exclamation question mark
            | 0x203C
            | 0x2049
            // Trade mark, information
            | 0x2122
            | 0x2139
            // Arrows with emoji form
            | 0x2194..=0x2199
            | 0x21A9..=0x21AA
            | 0x2934..=0x2935
            // Circled M
            | 0x24C2
            // Squares and triangles with emoji form
            | 0x25AA..=0x25AB
            | 0x25B6
            | 0x25C0
            | 0x25FB..=0x25FE
            // Mahjong, cards, enclosed alphanumerics, regional indicators,
            // pictographs, emoticons, transport, supplemental symbols
            | 0x1F000..=0x1FAFF
            // Misc symbols and dingbats
            | 0x2600..=0x27BF
            // Watch, hourglass, keyboard, media controls
            | 0x231A..=0x231B
            | 0x2328
            | 0x23CF
            | 0x23E9..=0x23F3
            | 0x23F8..=0x23FA
            // Arrows and shapes with emoji presentation
            | 0x2B05..=0x2B07
            | 0x2B1B..=0x2B1C
            | 0x2B50
            | 0x2B55
            // CJK marks with emoji presentation
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            // Variation selectors
            | 0xFE00..=0xFE0F
            // Zero-width joiner
            | 0x200D
            // Combining keycap
            | 0x20E3
            // Tag characters (flag sequences)
            | 0xE0020..=0xE007F
    )
}

pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji)
}

/// Requests emoji presentation for the character before it.
const EMOJI_PRESENTATION: char = '\u{FE0F}';

/// Remove emoji from one line.
///
/// A character followed by U+FE0F is an emoji whatever its code point, so it
/// goes with the selector. A line that lost an emoji has its interior
/// whitespace collapsed so that `"feat: 🎉 add x"` becomes `"feat: add x"`;
/// its indentation is kept. Lines without emoji are returned unchanged.
pub fn strip_emoji_line(line: &str) -> String {
    if !contains_emoji(line) {
        return line.to_string();
    }

    let indent = &line[..line.len() - line.trim_start().len()];
    let mut chars = line.chars().peekable();
    let mut stripped = String::with_capacity(line.len());
    while let Some(c) = chars.next() {
        if is_emoji(c) || chars.peek() == Some(&EMOJI_PRESENTATION) {
            continue;
        }
        stripped.push(c);
    }
    let words: Vec<&str> = stripped.split_whitespace().collect();

    if words.is_empty() {
        return String::new();
    }
    format!("{}{}", indent, words.join(" "))
}

/// Remove emoji from every line of `text`.
pub fn strip_emoji(text: &str) -> String {
    text.lines()
        .map(strip_emoji_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_emoji_detected() {
        for c in ['🎉', '✨', '🐛', '🚀', '♻', '⚡', '✅', '⭐', '⌛', '▶', 'ℹ', '↩', '©', '®', '‼', '™', '↔', '▪', '◀', '◻', '⤴'] {
            assert!(is_emoji(c), "{:?} should be an emoji", c);
        }
    }

    #[test]
    fn test_text_symbols_not_detected() {
        for c in ['a', 'é', '→', '—', '|', '`', '#', '中'] {
            assert!(!is_emoji(c), "{:?} should not be an emoji", c);
        }
    }

    #[test]
    fn test_strip_line_collapses_gap() {
        assert_eq!(strip_emoji_line("feat: 🎉 add parser"), "feat: add parser");
        assert_eq!(strip_emoji_line("✨ feat(cli): add flag"), "feat(cli): add flag");
    }

    #[test]
    fn test_strip_line_keeps_indent() {
        assert_eq!(strip_emoji_line("    let x = 1; // 🚀 fast"), "    let x = 1; // fast");
    }

    #[test]
    fn test_strip_line_without_emoji_is_untouched() {
        assert_eq!(strip_emoji_line("    a  b"), "    a  b");
    }

    #[test]
    fn test_strip_sequences() {
        // ZWJ family, flag, keycap and skin tone
        assert_eq!(strip_emoji_line("x 👨\u{200D}👩\u{200D}👧 y"), "x y");
        assert_eq!(strip_emoji_line("ship 🇩🇪"), "ship");
        assert_eq!(strip_emoji_line("step 1\u{FE0F}\u{20E3} done"), "step done");
        assert_eq!(strip_emoji_line("👍🏽 ok"), "ok");
        // Emoji presentation of symbols
        assert_eq!(strip_emoji_line("fix: ▶\u{FE0F} play button"), "fix: play button");
        assert_eq!(strip_emoji_line("ℹ\u{FE0F} note ↩\u{FE0F} back"), "note back");
        assert_eq!(strip_emoji_line("©\u{FE0F} 2024 ™"), "2024");
        assert_eq!(strip_emoji_line("go ↔\u{FE0F} ◻\u{FE0F} ⤴\u{FE0F} ▪"), "go");
        // Any base with the presentation selector
        assert_eq!(strip_emoji_line("#\u{FE0F}\u{20E3} tag"), "tag");
    }

    #[test]
    fn test_emoji_only_line_becomes_empty() {
        assert_eq!(strip_emoji_line("  🎉🎉  "), "");
    }

    #[test]
    fn test_strip_multiline() {
        assert_eq!(strip_emoji("fix: 🐛 bug\n\nBody ✅ done"), "fix: bug\n\nBody done");
    }
}
