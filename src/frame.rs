//! IRC frame model, tokenizer and serializer.
//!
//! A [`Frame`] is one protocol line split into prefix, command and
//! arguments. Numeric commands are mapped to their symbolic names (the raw
//! numeric is kept in [`Frame::raw_command`]) and classified as replies or
//! errors via the [`crate::codes`] table.
//!
//! [`parse_frame`] is total: it never fails, and malformed input yields a
//! frame with an empty command and no arguments rather than an error.

use crate::codes::{self, CommandKind};
use crate::colors::FormattedStringExt;

/// One parsed IRC protocol line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// The full prefix, as received (without the leading `:`).
    pub prefix: Option<String>,
    /// Nick component of a `nick!user@host` prefix.
    pub nick: Option<String>,
    /// User component of a `nick!user@host` prefix.
    pub user: Option<String>,
    /// Host component of a `nick!user@host` prefix.
    pub host: Option<String>,
    /// Symbolic command name (`PRIVMSG`, `rpl_welcome`, ...).
    pub command: String,
    /// Reply/error classification.
    pub kind: CommandKind,
    /// The command exactly as received (numerics keep their digits).
    pub raw_command: String,
    /// Positional arguments; a trailing argument is the last entry.
    pub args: Vec<String>,
}

impl Frame {
    /// Argument at `index`, or the empty string when absent.
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or("")
    }

    /// The last argument, or the empty string when there are none.
    pub fn trailing(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or("")
    }
}

/// Tokenize one line into a [`Frame`].
///
/// With `strip_colors`, mIRC formatting codes are removed from the whole
/// line before tokenization. An IRCv3 tag section, if present, is skipped.
pub fn parse_frame(line: &str, strip_colors: bool) -> Frame {
    let stripped;
    let mut rest = if strip_colors {
        stripped = line.stripped();
        stripped.as_str()
    } else {
        line
    };

    let mut frame = Frame::default();

    rest = rest.trim_start_matches(' ');
    if rest.starts_with('@') {
        rest = rest.split_once(' ').map_or("", |(_, r)| r);
        rest = rest.trim_start_matches(' ');
    }

    if let Some(r) = rest.strip_prefix(':') {
        let (prefix, r) = r.split_once(' ').unwrap_or((r, ""));
        if !prefix.is_empty() {
            frame.prefix = Some(prefix.to_string());
            if let Some((nick, user_host)) = prefix.split_once('!') {
                frame.nick = Some(nick.to_string());
                match user_host.split_once('@') {
                    Some((user, host)) => {
                        frame.user = Some(user.to_string());
                        frame.host = Some(host.to_string());
                    }
                    None => frame.user = Some(user_host.to_string()),
                }
            } else if !prefix.contains('.') {
                // Bare nick prefix (e.g. `:nick NICK :new`); dotted
                // prefixes are server names.
                frame.nick = Some(prefix.to_string());
            }
        }
        rest = r.trim_start_matches(' ');
    }

    let (command, r) = rest.split_once(' ').unwrap_or((rest, ""));
    frame.raw_command = command.to_string();
    match codes::lookup(command) {
        Some((name, kind)) => {
            frame.command = name.to_string();
            frame.kind = kind;
        }
        None => {
            frame.command = command.to_string();
            frame.kind = CommandKind::Normal;
        }
    }

    rest = r;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            frame.args.push(trailing.to_string());
            break;
        }
        let (token, r) = rest.split_once(' ').unwrap_or((rest, ""));
        frame.args.push(token.to_string());
        rest = r;
    }

    frame
}

/// Serialize a command and arguments into one protocol line (no terminator;
/// the codec appends CRLF on the wire).
///
/// The final argument gets the `:` trailing marker when it is empty,
/// contains whitespace, or itself begins with `:`.
pub fn serialize(command: &str, args: &[&str]) -> String {
    let mut line = String::from(command);
    if let Some((trailing, middle)) = args.split_last() {
        for arg in middle {
            line.push(' ');
            line.push_str(arg);
        }
        line.push(' ');
        if trailing.is_empty() || trailing.contains(char::is_whitespace) || trailing.starts_with(':')
        {
            line.push(':');
        }
        line.push_str(trailing);
    }
    line
}
