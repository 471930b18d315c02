//! # slirc-client
//!
//! An async IRC client session engine (RFC 1459/2812 with common
//! extensions). One [`Client`] manages one server session: it frames the
//! byte stream, negotiates IRCv3 capabilities and SASL PLAIN, tracks the
//! session's view of the server (own nick and hostmask, joined channels
//! with membership and modes, ISUPPORT features), paces outbound traffic to
//! stay under flood limits, splits oversized messages into protocol-legal
//! frames, surfaces a typed [`Event`] stream, and reconnects with a bounded
//! retry budget after unexpected disconnects.
//!
//! ## Features
//!
//! - CR/LF/CRLF line framing with partial-tail retention
//! - Plain TCP or TLS transport with configurable trust relaxations
//! - IRCv3 `CAP LS 302` negotiation and SASL PLAIN authentication
//! - Channel membership tracking driven by WHO/WHOX replies and
//!   JOIN/PART/KICK/KILL/QUIT/NICK deltas
//! - WHOIS accumulation, LIST collection, MOTD assembly
//! - Flood protection with a paced send queue and a shutdown bypass
//! - Word-aware splitting of long PRIVMSG/NOTICE bodies
//!
//! ## Quick start
//!
//! ```no_run
//! use slirc_client::{Client, Config, Event};
//!
//! # async fn run() -> Result<(), slirc_client::ClientError> {
//! let mut config = Config::new("irc.libera.chat", "slircbot");
//! config.channels = vec!["#slirc".to_string()];
//!
//! let (client, mut events) = Client::spawn(config);
//! while let Some(event) = events.recv().await {
//!     if let Event::Message { from, target, text, .. } = event {
//!         if text.contains("ping me") {
//!             client.say(&target, "pong")?;
//!         }
//!         let _ = from;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The protocol core is sans-IO: [`Session`] consumes parsed lines and
//! produces outbound lines and events without touching a socket, which is
//! also how the test suite drives full protocol scenarios.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod caps;
pub mod casemap;
pub mod client;
pub mod codec;
pub mod codes;
pub mod colors;
pub mod commands;
pub mod config;
pub mod ctcp;
pub mod error;
pub mod events;
pub mod frame;
mod handler;
pub mod isupport;
pub mod sasl;
pub mod sendq;
pub mod session;
pub mod state;
pub mod text;
pub mod transport;

pub use self::client::Client;
pub use self::codec::{LineCodec, Transcoder, Utf8Lossy};
pub use self::codes::CommandKind;
pub use self::colors::FormattedStringExt;
pub use self::config::{Config, WebircConfig};
pub use self::error::ClientError;
pub use self::events::Event;
pub use self::frame::{parse_frame, serialize, Frame};
pub use self::session::{OutboundLine, Session};
pub use self::state::{
    Channel, ChannelListItem, SessionState, Supported, UserEntry, WhoRecord, WhoisInfo,
};
