//! Client-To-Client Protocol (CTCP) payloads.
//!
//! CTCP rides inside PRIVMSG/NOTICE text as `\u{1}TYPE body\u{1}`. The
//! session detects wrapped payloads on ingress and wraps them on egress.

const DELIM: char = '\u{1}';

/// A decoded CTCP payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    /// The CTCP type tag, uppercased (e.g. `ACTION`, `VERSION`).
    pub kind: String,
    /// The remainder of the payload, possibly empty.
    pub body: String,
}

/// Returns true if `text` is a CTCP-wrapped payload.
pub fn is_ctcp(text: &str) -> bool {
    text.len() >= 2 && text.starts_with(DELIM) && text.ends_with(DELIM)
}

/// Decode a CTCP payload. Returns `None` unless `text` is wrapped.
pub fn decode(text: &str) -> Option<Ctcp> {
    if !is_ctcp(text) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let (kind, body) = match inner.split_once(' ') {
        Some((k, b)) => (k, b),
        None => (inner, ""),
    };
    Some(Ctcp {
        kind: kind.to_ascii_uppercase(),
        body: body.to_string(),
    })
}

/// Wrap a type tag and body for transmission.
pub fn encode(kind: &str, body: &str) -> String {
    if body.is_empty() {
        format!("{DELIM}{kind}{DELIM}")
    } else {
        format!("{DELIM}{kind} {body}{DELIM}")
    }
}
