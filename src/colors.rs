//! mIRC formatting codes.
//!
//! Text payloads may carry inline color and style control characters. When
//! the session is configured with `strip_colors`, these are removed from
//! incoming lines before tokenization.

/// Extension trait for stripping mIRC formatting from text.
pub trait FormattedStringExt {
    /// Returns true if the string contains any color or style codes.
    fn is_formatted(&self) -> bool;

    /// Returns the string with all color and style codes removed.
    fn stripped(&self) -> String;
}

const COLOR: char = '\u{3}';
const STYLES: &[char] = &[
    '\u{2}',  // bold
    '\u{1d}', // italic
    '\u{1f}', // underline
    '\u{1e}', // strikethrough
    '\u{11}', // monospace
    '\u{16}', // reverse
    '\u{f}',  // reset
];

impl FormattedStringExt for str {
    fn is_formatted(&self) -> bool {
        self.contains(COLOR) || self.contains(STYLES)
    }

    fn stripped(&self) -> String {
        let mut out = String::with_capacity(self.len());
        let mut chars = self.chars().peekable();

        while let Some(c) = chars.next() {
            if STYLES.contains(&c) {
                continue;
            }
            if c != COLOR {
                out.push(c);
                continue;
            }
            // Color introducer: up to two foreground digits, then an
            // optional comma followed by up to two background digits.
            for _ in 0..2 {
                if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                    chars.next();
                }
            }
            if chars.peek() == Some(&',') {
                let mut ahead = chars.clone();
                ahead.next();
                if ahead.peek().is_some_and(|d| d.is_ascii_digit()) {
                    chars.next();
                    for _ in 0..2 {
                        if chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                            chars.next();
                        }
                    }
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert!(!"hello".is_formatted());
        assert_eq!("hello".stripped(), "hello");
    }

    #[test]
    fn test_strip_color_codes() {
        assert_eq!("\u{3}04red text\u{3}".stripped(), "red text");
        assert_eq!("\u{3}04,02fg and bg\u{f}".stripped(), "fg and bg");
    }

    #[test]
    fn test_strip_styles() {
        assert_eq!("\u{2}bold\u{2} and \u{1f}under\u{1f}".stripped(), "bold and under");
    }

    #[test]
    fn test_comma_without_background_kept() {
        assert_eq!("\u{3}4,no bg".stripped(), ",no bg");
    }
}
