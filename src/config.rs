//! Session configuration.

/// WEBIRC gateway identification, sent before registration when all three
/// fields are configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebircConfig {
    /// Gateway password.
    pub pass: String,
    /// Real IP address of the end user.
    pub ip: String,
    /// Gateway user field.
    pub user: String,
}

impl WebircConfig {
    /// True when every field required for the WEBIRC header is set.
    pub fn is_configured(&self) -> bool {
        !self.pass.is_empty() && !self.ip.is_empty() && !self.user.is_empty()
    }
}

/// Options recognized by the session engine.
///
/// `Default` supplies the documented defaults; `server` and `nick` have no
/// meaningful default and must be set by the caller.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Target host.
    pub server: String,
    /// Desired nickname.
    pub nick: String,
    /// Server PASS or SASL PLAIN secret.
    pub password: Option<String>,
    /// IRC user (ident) / SASL user.
    pub user_name: String,
    /// GECOS field.
    pub real_name: String,
    /// TCP port.
    pub port: u16,
    /// Source address to bind before connecting.
    pub local_address: Option<String>,
    /// Verbose logging of protocol traffic.
    pub debug: bool,
    /// Log server error replies.
    pub show_errors: bool,
    /// Rejoin a channel after being kicked from it.
    pub auto_rejoin: bool,
    /// Connect as soon as the session is spawned.
    pub auto_connect: bool,
    /// Channels joined once the MOTD completes.
    pub channels: Vec<String>,
    /// Maximum reconnect attempts; `None` means unbounded.
    pub retry_count: Option<u32>,
    /// Delay before a reconnect attempt, in milliseconds.
    pub retry_delay: u64,
    /// Connect over TLS.
    pub secure: bool,
    /// Accept self-signed certificates.
    pub self_signed: bool,
    /// Accept expired certificates.
    pub cert_expired: bool,
    /// Pace outbound frames instead of writing immediately.
    pub flood_protection: bool,
    /// Pacing interval, in milliseconds.
    pub flood_protection_delay: u64,
    /// Authenticate with SASL PLAIN during capability negotiation.
    pub sasl: bool,
    /// Capabilities to request beyond `sasl`.
    pub capabilities: Vec<String>,
    /// Strip mIRC formatting from inbound lines.
    pub strip_colors: bool,
    /// Channel type prefixes assumed before ISUPPORT arrives.
    pub channel_prefixes: String,
    /// Reserved upper bound for outbound frame length.
    pub message_split: usize,
    /// Transcoder output encoding; `None` decodes as UTF-8.
    pub encoding: Option<String>,
    /// WEBIRC gateway identification.
    pub webirc: WebircConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: String::new(),
            nick: String::new(),
            password: None,
            user_name: "nodebot".to_string(),
            real_name: "nodeJS IRC client".to_string(),
            port: 6667,
            local_address: None,
            debug: false,
            show_errors: false,
            auto_rejoin: false,
            auto_connect: true,
            channels: Vec::new(),
            retry_count: None,
            retry_delay: 2000,
            secure: false,
            self_signed: false,
            cert_expired: false,
            flood_protection: false,
            flood_protection_delay: 1000,
            sasl: false,
            capabilities: Vec::new(),
            strip_colors: false,
            channel_prefixes: "&#".to_string(),
            message_split: 512,
            encoding: None,
            webirc: WebircConfig::default(),
        }
    }
}

impl Config {
    /// Minimal configuration for a server and nick, everything else default.
    pub fn new(server: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            nick: nick.into(),
            ..Self::default()
        }
    }

    /// True if `name` starts with one of the configured channel prefixes.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.starts_with(|c: char| self.channel_prefixes.contains(c))
    }
}
