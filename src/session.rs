//! The sans-IO session core.
//!
//! [`Session`] owns the protocol state for one server connection: it
//! consumes inbound lines, mutates [`SessionState`], emits [`Event`]s and
//! queues outbound lines. It performs no I/O itself — the runtime loop in
//! [`crate::client`] feeds it from the transport and drains its outbox —
//! which keeps every protocol rule testable without a socket.
//!
//! All mutation happens on the single session context; command submissions
//! from other tasks are handed off through the client's request channel
//! before they touch state here.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::debug;

use crate::caps::CapNegotiation;
use crate::config::Config;
use crate::error::Result;
use crate::events::{Event, EventSink};
use crate::frame::{self, Frame};
use crate::state::SessionState;

/// A serialized line awaiting transmission, with its scheduling class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundLine {
    /// The serialized frame (no terminator).
    pub line: String,
    /// Bypass the paced queue (used for the shutdown QUIT).
    pub bypass: bool,
}

/// Protocol engine for one server session.
pub struct Session {
    pub(crate) config: Config,
    pub(crate) state: SessionState,
    pub(crate) cap: CapNegotiation,
    pub(crate) events: EventSink,
    pub(crate) outbox: VecDeque<OutboundLine>,
    /// Suffix counter for nick-in-use mitigation.
    pub(crate) nick_mod: u32,
    /// Set once the user asks to disconnect; suppresses writes and downgrades
    /// event-dispatch failures from fatal to ignored.
    pub(crate) requested_disconnect: bool,
}

impl Session {
    /// Create a session and the receiving end of its event stream.
    pub fn new(config: Config) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = EventSink::new();
        let state = SessionState::new(&config.nick, &config.channel_prefixes);
        (
            Self {
                config,
                state,
                cap: CapNegotiation::default(),
                events,
                outbox: VecDeque::new(),
                nick_mod: 0,
                requested_disconnect: false,
            },
            rx,
        )
    }

    /// Current protocol state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the user has asked for a disconnect.
    pub fn requested_disconnect(&self) -> bool {
        self.requested_disconnect
    }

    /// Begin a connection attempt: reset negotiation state and queue the
    /// registration sequence (WEBIRC, PASS, `CAP LS 302`, NICK, USER).
    pub fn start(&mut self) {
        self.requested_disconnect = false;
        self.nick_mod = 0;
        self.state.own_nick = self.config.nick.clone();
        self.state.host_mask.clear();
        self.state.update_max_line_length();
        self.state.capabilities.clear();
        self.state.supported.capabilities.clear();
        self.state.motd_buffer.clear();
        self.state.whois_data.clear();
        self.state.who = Default::default();
        self.state.sync_chans.clear();

        if self.config.webirc.is_configured() {
            let webirc = self.config.webirc.clone();
            // No gateway hostname is configured; the IP stands in for it.
            self.send(
                "WEBIRC",
                &[
                    webirc.pass.as_str(),
                    webirc.user.as_str(),
                    webirc.ip.as_str(),
                    webirc.ip.as_str(),
                ],
            );
        }
        if !self.config.sasl {
            if let Some(password) = self.config.password.clone() {
                self.send("PASS", &[password.as_str()]);
            }
        }
        self.cap.start();
        self.send("CAP", &["LS", "302"]);
        let nick = self.config.nick.clone();
        self.send("NICK", &[nick.as_str()]);
        let (user, real) = (self.config.user_name.clone(), self.config.real_name.clone());
        self.send("USER", &[user.as_str(), "8", "*", real.as_str()]);
    }

    /// Feed one inbound line: parse, surface as [`Event::Raw`], dispatch.
    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        debug!("<- {}", line);
        let frame = frame::parse_frame(line, self.config.strip_colors);
        if frame.command.is_empty() {
            return Ok(());
        }
        self.emit(Event::Raw(frame.clone()))?;
        self.handle_frame(&frame)
    }

    /// Drain everything queued for transmission.
    pub fn take_outbound(&mut self) -> Vec<OutboundLine> {
        self.outbox.drain(..).collect()
    }

    /// Serialize and queue a frame.
    pub(crate) fn send(&mut self, command: &str, args: &[&str]) {
        self.queue_line(frame::serialize(command, args), false);
    }

    /// Serialize and queue a frame on the bypass path.
    pub(crate) fn send_immediate(&mut self, command: &str, args: &[&str]) {
        self.queue_line(frame::serialize(command, args), true);
    }

    fn queue_line(&mut self, line: String, bypass: bool) {
        debug!("-> {}", line);
        self.outbox.push_back(OutboundLine { line, bypass });
    }

    /// Emit an event.
    ///
    /// A dispatch failure (dropped receiver) is fatal for a live session and
    /// ignored during a requested shutdown.
    pub(crate) fn emit(&mut self, event: Event) -> Result<()> {
        match self.events.emit(event) {
            Ok(()) => Ok(()),
            Err(_) if self.requested_disconnect => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Close out capability negotiation: `CAP END`, then the `cap-end` and
    /// `connect` events.
    pub(crate) fn finish_negotiation(&mut self) -> Result<()> {
        if self.cap.phase() == crate::caps::CapPhase::End {
            return Ok(());
        }
        self.send("CAP", &["END"]);
        self.cap.finish();
        self.emit(Event::CapEnd)?;
        self.emit(Event::Connected)
    }

    /// True if `name` looks like a channel under the negotiated CHANTYPES.
    pub(crate) fn is_channel(&self, name: &str) -> bool {
        name.starts_with(|c: char| self.state.supported.channel.types.contains(c))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("nick", &self.state.own_nick)
            .field("channels", &self.state.chans.len())
            .field("outbox", &self.outbox.len())
            .field("requested_disconnect", &self.requested_disconnect)
            .finish()
    }
}
