//! Typed session events.
//!
//! Protocol occurrences are surfaced as one [`Event`] enum delivered over an
//! unbounded channel, one variant per event family. Variants carry the
//! channel or target they concern, so consumers filter by field instead of
//! subscribing to name-qualified topics.
//!
//! One-shot waits ("resolve when this channel's join completes") are served
//! by an internal waiter registry: a waiter is removed from the registry
//! before it is fulfilled, so it observes exactly one event.

use tokio::sync::{mpsc, oneshot};

use crate::casemap::irc_eq;
use crate::error::ClientError;
use crate::frame::Frame;
use crate::state::{ChannelListItem, WhoRecord, WhoisInfo};

/// A protocol occurrence, as seen by the session consumer.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Event {
    /// Every inbound frame, before dispatch.
    Raw(Frame),
    /// Registration completed (001).
    Registered {
        /// The nick the server assigned us.
        nick: String,
    },
    /// Capability list received from the server.
    CapLs {
        /// Advertised capability names.
        caps: Vec<String>,
    },
    /// Capability negotiation finished.
    CapEnd,
    /// Fires together with [`Event::CapEnd`]: the session is usable.
    Connected,
    /// SASL exchange succeeded.
    SaslAuthenticated,
    /// SASL exchange failed.
    SaslFailed,
    /// Server liveness probe; the PONG response is automatic.
    Ping {
        /// Probe payload.
        server: String,
    },
    /// Reply to one of our PINGs.
    Pong {
        /// Probe payload.
        server: String,
    },
    /// End of MOTD; the accumulated text.
    Motd {
        /// Newline-separated MOTD body.
        motd: String,
    },
    /// Inbound PRIVMSG.
    Message {
        /// Sender nick, when the prefix carried one.
        from: Option<String>,
        /// Channel or our own nick.
        target: String,
        /// Message body.
        text: String,
        /// True when the target is us rather than a channel.
        to_self: bool,
    },
    /// Outbound PRIVMSG echo, one per split part.
    SelfMessage {
        /// Destination.
        target: String,
        /// The part that was sent.
        text: String,
    },
    /// Inbound NOTICE.
    Notice {
        /// Sender nick, when the prefix carried one.
        from: Option<String>,
        /// Channel or our own nick.
        target: String,
        /// Notice body.
        text: String,
    },
    /// CTCP ACTION ("/me").
    Action {
        /// Sender nick.
        from: Option<String>,
        /// Channel or our own nick.
        target: String,
        /// Action text.
        text: String,
    },
    /// Any other CTCP payload.
    Ctcp {
        /// Sender nick.
        from: Option<String>,
        /// Channel or our own nick.
        target: String,
        /// Uppercased CTCP type tag.
        kind: String,
        /// Payload body.
        text: String,
        /// True when carried in a NOTICE (a CTCP reply).
        notice: bool,
    },
    /// Someone joined a channel we are in.
    Join {
        /// The channel.
        channel: String,
        /// Who joined.
        nick: String,
    },
    /// We joined a channel.
    SelfJoin {
        /// The channel.
        channel: String,
    },
    /// Someone left a channel.
    Part {
        /// The channel.
        channel: String,
        /// Who left.
        nick: String,
        /// Part message.
        reason: Option<String>,
    },
    /// We left a channel.
    SelfPart {
        /// The channel.
        channel: String,
    },
    /// Someone was kicked.
    Kick {
        /// The channel.
        channel: String,
        /// Who was kicked.
        nick: String,
        /// Who kicked them.
        by: Option<String>,
        /// Kick reason.
        reason: Option<String>,
    },
    /// We were kicked.
    SelfKick {
        /// The channel.
        channel: String,
        /// Who kicked us.
        by: Option<String>,
        /// Kick reason.
        reason: Option<String>,
    },
    /// A nick was removed from the network by an operator.
    Kill {
        /// Who was killed.
        nick: String,
        /// Kill reason.
        reason: Option<String>,
        /// Channels they shared with us.
        channels: Vec<String>,
    },
    /// Someone quit.
    ///
    /// A quit with reason `"Changing host"` keeps membership intact and is
    /// delivered with `removed == false`.
    Quit {
        /// Who quit.
        nick: String,
        /// Quit message.
        reason: Option<String>,
        /// Channels they shared with us.
        channels: Vec<String>,
        /// Whether membership entries were dropped.
        removed: bool,
    },
    /// Someone changed nick.
    Nick {
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
        /// Channels they share with us.
        channels: Vec<String>,
    },
    /// Our own nick changed.
    SelfNick {
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
    },
    /// Topic learned or changed.
    Topic {
        /// The channel.
        channel: String,
        /// Topic text.
        topic: Option<String>,
        /// Who set it, when known.
        set_by: Option<String>,
    },
    /// A single channel or membership mode change.
    Mode {
        /// The channel.
        channel: String,
        /// Who changed it.
        by: Option<String>,
        /// True for `+`, false for `-`.
        set: bool,
        /// The mode character.
        mode: char,
        /// Mode argument (affected nick, key, limit...).
        arg: Option<String>,
        /// True when a membership mode targeted us.
        self_target: bool,
    },
    /// We were invited to a channel.
    Invite {
        /// The channel.
        channel: String,
        /// Who invited us.
        from: Option<String>,
    },
    /// A WHOIS query completed.
    Whois {
        /// Accumulated fields.
        info: WhoisInfo,
    },
    /// A WHO query completed.
    Who {
        /// The query target.
        target: String,
        /// One record per visible user.
        records: Vec<WhoRecord>,
    },
    /// The post-join WHO sync for a channel completed.
    JoinSync {
        /// The channel.
        channel: String,
        /// Time since the JOIN, in milliseconds.
        elapsed_ms: u128,
    },
    /// LIST started.
    ChannelListStart,
    /// One LIST entry.
    ChannelListItem {
        /// The entry.
        item: ChannelListItem,
    },
    /// LIST completed.
    ChannelList {
        /// All entries.
        items: Vec<ChannelListItem>,
    },
    /// A server error reply.
    ErrorReply {
        /// The offending frame.
        frame: Frame,
    },
    /// A transport-level failure.
    NetError {
        /// Description of the failure.
        error: String,
    },
    /// The connection closed.
    Disconnected {
        /// True when we asked for the disconnect.
        requested: bool,
    },
    /// Reconnection gave up after exhausting the retry budget.
    Abort {
        /// The configured retry bound.
        retry_count: u32,
    },
}

/// What a one-shot waiter is waiting for.
#[derive(Clone, Debug)]
pub(crate) enum WaitFilter {
    Registered,
    SelfJoin(String),
    SelfPart(String),
    Whois(String),
    Disconnected,
}

impl WaitFilter {
    fn matches(&self, event: &Event) -> bool {
        match (self, event) {
            (Self::Registered, Event::Registered { .. }) => true,
            (Self::SelfJoin(chan), Event::SelfJoin { channel }) => irc_eq(chan, channel),
            (Self::SelfPart(chan), Event::SelfPart { channel }) => irc_eq(chan, channel),
            (Self::Whois(nick), Event::Whois { info }) => irc_eq(nick, &info.nick),
            (Self::Disconnected, Event::Disconnected { .. }) => true,
            _ => false,
        }
    }
}

/// Fan-out point for session events.
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
    waiters: Vec<(WaitFilter, oneshot::Sender<Event>)>,
}

impl EventSink {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                waiters: Vec::new(),
            },
            rx,
        )
    }

    /// Register a one-shot waiter fulfilled by the next matching event.
    pub(crate) fn wait_for(&mut self, filter: WaitFilter) -> oneshot::Receiver<Event> {
        let (tx, rx) = oneshot::channel();
        self.add_waiter(filter, tx);
        rx
    }

    /// Attach an externally-created reply channel as a one-shot waiter.
    pub(crate) fn add_waiter(&mut self, filter: WaitFilter, tx: oneshot::Sender<Event>) {
        self.waiters.push((filter, tx));
    }

    /// Deliver an event to waiters and the stream.
    ///
    /// Fails when the stream receiver is gone; the caller decides whether
    /// that is fatal (it is, unless a disconnect was requested).
    pub(crate) fn emit(&mut self, event: Event) -> Result<(), ClientError> {
        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].0.matches(&event) {
                let (_, tx) = self.waiters.swap_remove(i);
                let _ = tx.send(event.clone());
            } else {
                i += 1;
            }
        }
        self.tx
            .send(event)
            .map_err(|_| ClientError::EventChannelClosed)
    }
}
