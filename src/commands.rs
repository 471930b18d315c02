//! User-facing session operations.
//!
//! These run on the session context. The async [`Client`] handle posts
//! [`Request`] values through its channel; the runtime loop executes them
//! here, between frames, so command effects interleave with handler effects
//! in submission order.
//!
//! [`Client`]: crate::client::Client

use tokio::sync::oneshot;
use tracing::debug;

use crate::casemap::irc_eq;
use crate::ctcp;
use crate::error::Result;
use crate::events::{Event, WaitFilter};
use crate::session::Session;
use crate::state::{DEFAULT_WHO_FORMAT, WHOX_FIELD_ORDER};
use crate::text::split_long_lines;

/// A command submitted from outside the session context.
#[derive(Debug)]
pub(crate) enum Request {
    Connect {
        notify: Option<oneshot::Sender<Event>>,
    },
    Disconnect {
        message: Option<String>,
        notify: Option<oneshot::Sender<Event>>,
    },
    Join {
        channel: String,
        notify: Option<oneshot::Sender<Event>>,
    },
    Part {
        channel: String,
        message: Option<String>,
        notify: Option<oneshot::Sender<Event>>,
    },
    Say {
        target: String,
        text: String,
    },
    Notice {
        target: String,
        text: String,
    },
    Action {
        target: String,
        text: String,
    },
    Ctcp {
        to: String,
        kind: String,
        text: String,
    },
    Whois {
        nick: String,
        notify: Option<oneshot::Sender<Event>>,
    },
    List {
        args: Vec<String>,
    },
    Who {
        target: String,
        format: Option<String>,
    },
    SetChanMode {
        channel: String,
        mode_change: String,
        nicks: Vec<String>,
    },
    Raw {
        command: String,
        args: Vec<String>,
    },
}

impl Session {
    /// Execute a submitted command (everything except the connection
    /// lifecycle, which the runtime loop owns).
    pub(crate) fn execute(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Join { channel, notify } => {
                if let Some(tx) = notify {
                    let name = channel_name(&channel).to_string();
                    self.events.add_waiter(WaitFilter::SelfJoin(name), tx);
                }
                self.join_channel(&channel);
                Ok(())
            }
            Request::Part {
                channel,
                message,
                notify,
            } => {
                if let Some(tx) = notify {
                    let name = channel_name(&channel).to_string();
                    self.events.add_waiter(WaitFilter::SelfPart(name), tx);
                }
                self.part_channel(&channel, message.as_deref());
                Ok(())
            }
            Request::Say { target, text } => self.say(&target, &text),
            Request::Notice { target, text } => self.notice(&target, &text),
            Request::Action { target, text } => self.action(&target, &text),
            Request::Ctcp { to, kind, text } => self.send_ctcp(&to, &kind, &text),
            Request::Whois { nick, notify } => {
                if let Some(tx) = notify {
                    self.events.add_waiter(WaitFilter::Whois(nick.clone()), tx);
                }
                self.whois_query(&nick);
                Ok(())
            }
            Request::List { args } => {
                self.list_query(&args);
                Ok(())
            }
            Request::Who { target, format } => {
                self.who_query(&target, format.as_deref());
                Ok(())
            }
            Request::SetChanMode {
                channel,
                mode_change,
                nicks,
            } => {
                self.set_chan_mode(&channel, &mode_change, &nicks);
                Ok(())
            }
            Request::Raw { command, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                self.send(&command, &args);
                Ok(())
            }
            // Lifecycle requests never reach the session directly.
            Request::Connect { .. } | Request::Disconnect { .. } => Ok(()),
        }
    }

    /// Send JOIN, keeping an optional space-separated channel key.
    pub fn join_channel(&mut self, channel: &str) {
        let parts: Vec<&str> = channel.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return;
        }
        self.send("JOIN", &parts);
    }

    /// Send PART and drop the channel from the auto-join list.
    pub fn part_channel(&mut self, channel: &str, message: Option<&str>) {
        let name = channel_name(channel);
        self.config
            .channels
            .retain(|c| !irc_eq(channel_name(c), name));
        match message {
            Some(message) => self.send("PART", &[name, message]),
            None => self.send("PART", &[name]),
        }
    }

    /// Send a PRIVMSG, splitting long text; each sent part is echoed as
    /// [`Event::SelfMessage`].
    pub fn say(&mut self, target: &str, text: &str) -> Result<()> {
        self.speak("PRIVMSG", target, text)
    }

    /// Send a NOTICE, splitting long text.
    pub fn notice(&mut self, target: &str, text: &str) -> Result<()> {
        self.speak("NOTICE", target, text)
    }

    /// Send a CTCP ACTION per non-empty line of `text`.
    pub fn action(&mut self, target: &str, text: &str) -> Result<()> {
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let wrapped = ctcp::encode("ACTION", line);
            self.say(target, &wrapped)?;
        }
        Ok(())
    }

    /// Send a CTCP payload; `kind` of `privmsg` goes out as a query, any
    /// other kind as a notice (a reply).
    pub fn send_ctcp(&mut self, to: &str, kind: &str, text: &str) -> Result<()> {
        let wrapped = match text.split_once(' ') {
            Some((tag, body)) => ctcp::encode(tag, body),
            None => ctcp::encode(text, ""),
        };
        if kind.eq_ignore_ascii_case("privmsg") {
            self.say(to, &wrapped)
        } else {
            self.notice(to, &wrapped)
        }
    }

    /// Send WHOIS for `nick`.
    pub fn whois_query(&mut self, nick: &str) {
        self.send("WHOIS", &[nick]);
    }

    /// Send LIST with pass-through arguments.
    pub fn list_query(&mut self, args: &[String]) {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.send("LIST", &args);
    }

    /// Send WHO for `target`.
    ///
    /// A format of `o` passes through; a `%`-format is honored only when the
    /// server supports WHOX, filtered to known field letters and reordered
    /// into the server's field order. Anything else is dropped. The
    /// effective format is queued so the completing `rpl_endofwho` can map
    /// reply columns back to fields.
    pub fn who_query(&mut self, target: &str, format: Option<&str>) {
        let mut queued = DEFAULT_WHO_FORMAT.to_string();
        let mut extra: Option<String> = None;

        match format {
            Some("o") => extra = Some("o".to_string()),
            Some(fmt) if fmt.starts_with('%') && self.state.supported.whox => {
                let mut canonical = String::from("%");
                canonical.extend(WHOX_FIELD_ORDER.chars().filter(|c| fmt.contains(*c)));
                if canonical.len() > 1 {
                    queued = canonical.clone();
                    extra = Some(canonical);
                }
            }
            Some(fmt) => debug!(format = fmt, "dropping unsupported WHO format"),
            None => {}
        }

        match extra {
            Some(extra) => self.send("WHO", &[target, extra.as_str()]),
            None => self.send("WHO", &[target]),
        }
        self.state.who.queue.push_back(queued);
    }

    /// Apply a membership mode to several nicks at once.
    ///
    /// Requires op in the channel. Nicks are resolved against the channel's
    /// member list and filtered to those missing the mode (setting) or
    /// holding it (unsetting), then batched by the server's per-line mode
    /// limit.
    pub fn set_chan_mode(&mut self, channel: &str, mode_change: &str, nicks: &[String]) {
        let mut chars = mode_change.chars();
        let (Some(sign), Some(mode)) = (chars.next(), chars.next()) else {
            debug!(mode_change, "malformed mode change");
            return;
        };
        let set = match sign {
            '+' => true,
            '-' => false,
            _ => {
                debug!(mode_change, "mode change must start with + or -");
                return;
            }
        };
        if !self.state.have_op(channel) {
            debug!(channel, "cannot change modes without op");
            return;
        }

        let affected: Vec<String> = nicks
            .iter()
            .filter(|nick| {
                let has = self.state.nick_has_chan_mode(nick, mode, channel);
                let present = self
                    .state
                    .chans
                    .get(&crate::casemap::irc_lower(channel))
                    .is_some_and(|c| c.users.contains_key(*nick));
                present && (set != has)
            })
            .cloned()
            .collect();

        let batch_size = self.state.supported.max_modes.max(1);
        for batch in affected.chunks(batch_size) {
            let mode_str: String = std::iter::once(sign)
                .chain(std::iter::repeat(mode).take(batch.len()))
                .collect();
            let mut args: Vec<&str> = vec![channel, &mode_str];
            args.extend(batch.iter().map(String::as_str));
            self.send("MODE", &args);
        }
    }

    /// Queue the shutdown QUIT on the bypass path and suppress further
    /// writes.
    pub fn quit(&mut self, message: Option<&str>) {
        match message {
            Some(message) => self.send_immediate("QUIT", &[message]),
            None => self.send_immediate("QUIT", &[]),
        }
        self.requested_disconnect = true;
    }

    fn speak(&mut self, command: &str, target: &str, text: &str) -> Result<()> {
        let budget = self
            .state
            .max_line_length
            .saturating_sub(target.len())
            .max(1);
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            for part in split_long_lines(line, budget) {
                self.send(command, &[target, part.as_str()]);
                if command == "PRIVMSG" {
                    self.emit(Event::SelfMessage {
                        target: target.to_string(),
                        text: part,
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// The channel-name part of a `"#chan key"` join spec.
fn channel_name(spec: &str) -> &str {
    spec.split(' ').next().unwrap_or(spec)
}
