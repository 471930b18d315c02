//! Outbound text splitting.
//!
//! A PRIVMSG/NOTICE body longer than the line budget is split into several
//! frames. Splits prefer the last whitespace at or before the limit and
//! consume that whitespace; a single unbroken word is hard-cut.

/// Split one line of text into parts no longer than `max_len` characters.
///
/// An empty input yields no parts. Whitespace chosen as a cut point is not
/// carried into either adjacent part.
pub fn split_long_lines(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut parts = Vec::new();
    let mut current: Vec<char> = text.chars().collect();

    loop {
        if current.is_empty() {
            break;
        }
        if current.len() <= max_len {
            parts.push(current.iter().collect());
            break;
        }

        let mut cut = None;
        for i in (0..=max_len.min(current.len() - 1)).rev() {
            if current[i].is_whitespace() {
                cut = Some(i);
                break;
            }
        }
        let (cut, ws_len) = match cut {
            Some(i) => (i, 1),
            None => (max_len, 0),
        };

        parts.push(current[..cut].iter().collect());
        current.drain(..cut + ws_len);
    }

    parts
}
