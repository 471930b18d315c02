//! In-memory session state.
//!
//! One [`SessionState`] models everything the server has told us: our own
//! nick and hostmask, joined channels with their membership and modes,
//! in-flight WHOIS and WHO accumulators, and the ISUPPORT-derived feature
//! set. All mutation happens on the session context (see the crate docs);
//! the query helpers follow a "log at debug and return empty" policy for
//! unknown channels, nicks or modes rather than erroring.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::casemap::{irc_eq, irc_lower};

/// A channel member as currently known.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserEntry {
    /// Ident, when learned from a JOIN prefix or WHO reply.
    pub username: Option<String>,
    /// Host, when learned from a JOIN prefix or WHO reply.
    pub host: Option<String>,
    /// Away status from WHO replies.
    pub away: bool,
    /// Membership mode characters (`o`, `v`, ...).
    pub modes: BTreeSet<char>,
    /// Services account, when known.
    pub account: Option<String>,
    /// True when the user is identified to services.
    pub is_registered: bool,
}

/// A joined channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    /// Lowercased name; equals the key this channel is stored under.
    pub key: String,
    /// The name in the case the server used.
    pub server_name: String,
    /// Members, keyed by nick as received.
    pub users: HashMap<String, UserEntry>,
    /// Channel mode characters currently set.
    pub mode: String,
    /// Topic text.
    pub topic: Option<String>,
    /// Who set the topic.
    pub topic_by: Option<String>,
    /// Channel creation time, as the server reported it.
    pub created: Option<String>,
}

/// Accumulated WHOIS fields for one nick, flushed at `rpl_endofwhois`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhoisInfo {
    /// The nick the query was about.
    pub nick: String,
    /// Ident.
    pub user: Option<String>,
    /// Host.
    pub host: Option<String>,
    /// GECOS field.
    pub realname: Option<String>,
    /// Server the user is connected to.
    pub server: Option<String>,
    /// Free-text server description.
    pub serverinfo: Option<String>,
    /// Idle seconds.
    pub idle: Option<String>,
    /// Channels the user is visible in.
    pub channels: Vec<String>,
    /// Operator description line.
    pub operator: Option<String>,
    /// Services account.
    pub account: Option<String>,
    /// Free-text account description.
    pub accountinfo: Option<String>,
    /// Away message.
    pub away: Option<String>,
}

/// One row of a completed WHO response, keyed by field name.
pub type WhoRecord = HashMap<String, String>;

/// One entry of a LIST response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelListItem {
    /// Channel name.
    pub name: String,
    /// Visible user count, as reported.
    pub users: String,
    /// Topic.
    pub topic: String,
}

/// In-flight WHO bookkeeping: rows received so far, plus one queued format
/// string per outstanding query.
#[derive(Clone, Debug, Default)]
pub struct WhoState {
    /// Raw reply rows (own nick already removed).
    pub data: Vec<Vec<String>>,
    /// Format strings, one per outstanding WHO, dequeued at `rpl_endofwho`.
    pub queue: VecDeque<String>,
}

/// WHOX field letters in the order servers emit them.
pub const WHOX_FIELD_ORDER: &str = "tcuihsnfdlar";

/// Default WHO format: the classic `rpl_whoreply` column set.
pub const DEFAULT_WHO_FORMAT: &str = "%cuhsnfdr";

/// Map a `%`-format's letters to field names, in canonical order.
pub fn who_fields(format: &str) -> Vec<&'static str> {
    format
        .chars()
        .filter_map(|c| match c {
            't' => Some("type"),
            'c' => Some("channel"),
            'u' => Some("username"),
            'i' => Some("ip"),
            'h' => Some("host"),
            's' => Some("server"),
            'n' => Some("nick"),
            'f' => Some("status"),
            'd' => Some("hops"),
            'l' => Some("idle"),
            'a' => Some("account"),
            'r' => Some("realname"),
            _ => None,
        })
        .collect()
}

/// CHANMODES groups: type A (list), B (always-arg), C (set-arg), D (flag).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChanModeGroups {
    /// List modes (bans etc.).
    pub a: String,
    /// Modes that always take an argument.
    pub b: String,
    /// Modes that take an argument only when set.
    pub c: String,
    /// Flag modes.
    pub d: String,
}

/// Channel-related ISUPPORT values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSupport {
    /// Maximum channel name length.
    pub length: usize,
    /// Channel type prefixes.
    pub types: String,
    /// Per-prefix join limits (CHANLIMIT).
    pub limit: HashMap<char, u32>,
    /// Mode grouping (CHANMODES plus PREFIX modes folded into group B).
    pub modes: ChanModeGroups,
    /// ID lengths for safe channels (IDCHAN).
    pub id_length: HashMap<char, String>,
}

impl Default for ChannelSupport {
    fn default() -> Self {
        Self {
            length: 200,
            types: "&#".to_string(),
            limit: HashMap::new(),
            modes: ChanModeGroups::default(),
            id_length: HashMap::new(),
        }
    }
}

/// Server feature set, seeded with RFC defaults and overwritten by 005.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Supported {
    /// Channel-related values.
    pub channel: ChannelSupport,
    /// KICKLEN, kept raw (may be empty).
    pub kick_length: String,
    /// NICKLEN.
    pub nick_length: usize,
    /// TOPICLEN.
    pub topic_length: usize,
    /// Maximum mode changes per MODE line.
    pub max_modes: usize,
    /// MAXLIST limits per list mode.
    pub max_list: HashMap<char, u32>,
    /// TARGMAX limits per command.
    pub max_targets: HashMap<String, u32>,
    /// WHOX extended WHO available.
    pub whox: bool,
    /// User mode characters from 004.
    pub user_modes: String,
    /// Capabilities the server advertised in CAP LS, with optional values.
    pub capabilities: HashMap<String, Option<String>>,
}

impl Default for Supported {
    fn default() -> Self {
        Self {
            channel: ChannelSupport::default(),
            kick_length: String::new(),
            nick_length: 9,
            topic_length: 0,
            max_modes: 3,
            max_list: HashMap::new(),
            max_targets: HashMap::new(),
            whox: false,
            user_modes: String::new(),
            capabilities: HashMap::new(),
        }
    }
}

/// The session's view of the server.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Our current nickname.
    pub own_nick: String,
    /// Our `nick!user@host` as the server sees it.
    pub host_mask: String,
    /// Per-frame text budget, derived from nick and hostmask length.
    pub max_line_length: usize,
    /// Capabilities acknowledged by the server.
    pub capabilities: HashSet<String>,
    /// Joined channels, keyed by lowercased name.
    pub chans: HashMap<String, Channel>,
    /// Channels whose post-join WHO sync is still outstanding.
    pub sync_chans: HashMap<String, Instant>,
    /// MOTD accumulator.
    pub motd_buffer: String,
    /// LIST accumulator.
    pub channel_list: Vec<ChannelListItem>,
    /// Membership mode -> prefix char (from PREFIX).
    pub prefix_for_mode: HashMap<char, char>,
    /// Prefix char -> membership mode (from PREFIX).
    pub mode_for_prefix: HashMap<char, char>,
    /// In-flight WHOIS accumulators, keyed by nick.
    pub whois_data: HashMap<String, WhoisInfo>,
    /// In-flight WHO state.
    pub who: WhoState,
    /// ISUPPORT-derived feature set.
    pub supported: Supported,
}

impl SessionState {
    /// Fresh state for a desired nick and the configured channel prefixes.
    pub fn new(nick: &str, channel_prefixes: &str) -> Self {
        let mut state = Self {
            own_nick: nick.to_string(),
            host_mask: String::new(),
            max_line_length: 0,
            capabilities: HashSet::new(),
            chans: HashMap::new(),
            sync_chans: HashMap::new(),
            motd_buffer: String::new(),
            channel_list: Vec::new(),
            prefix_for_mode: HashMap::new(),
            mode_for_prefix: HashMap::new(),
            whois_data: HashMap::new(),
            who: WhoState::default(),
            supported: Supported::default(),
        };
        state.supported.channel.types = channel_prefixes.to_string();
        state.update_max_line_length();
        state
    }

    /// Recompute the per-frame text budget from nick and hostmask.
    pub fn update_max_line_length(&mut self) {
        self.max_line_length =
            497usize.saturating_sub(self.own_nick.len() + self.host_mask.len());
    }

    /// True if `nick` is our own, under IRC case folding.
    pub fn is_self(&self, nick: &str) -> bool {
        irc_eq(nick, &self.own_nick)
    }

    /// Channel by name, creating a skeleton entry when `create` is set.
    pub fn chan_data(&mut self, name: &str, create: bool) -> Option<&mut Channel> {
        let key = irc_lower(name);
        if create {
            let entry = self.chans.entry(key.clone()).or_insert_with(|| Channel {
                key: key.clone(),
                server_name: name.to_string(),
                ..Channel::default()
            });
            return Some(entry);
        }
        let found = self.chans.get_mut(&key);
        if found.is_none() {
            debug!(channel = name, "lookup of unknown channel");
        }
        found
    }

    /// Drop a channel entirely (self PART/KICK).
    pub fn remove_chan(&mut self, name: &str) {
        self.chans.remove(&irc_lower(name));
    }

    /// Channels (server spelling) containing `nick`; with `remove`, the
    /// membership entries are dropped while enumerating.
    pub fn nick_in_channels(&mut self, nick: &str, remove: bool) -> Vec<String> {
        let mut names = Vec::new();
        for chan in self.chans.values_mut() {
            if chan.users.contains_key(nick) {
                if remove {
                    chan.users.remove(nick);
                }
                names.push(chan.server_name.clone());
            }
        }
        names.sort();
        names
    }

    /// Rename a member in every channel, keeping the entry's data.
    pub fn rename_nick(&mut self, old: &str, new: &str) -> Vec<String> {
        let mut names = Vec::new();
        for chan in self.chans.values_mut() {
            if let Some(entry) = chan.users.remove(old) {
                chan.users.insert(new.to_string(), entry);
                names.push(chan.server_name.clone());
            }
        }
        names.sort();
        names
    }

    /// Whether `nick` holds membership mode `mode` in `channel`.
    pub fn nick_has_chan_mode(&self, nick: &str, mode: char, channel: &str) -> bool {
        let Some(chan) = self.chans.get(&irc_lower(channel)) else {
            debug!(channel, "mode query against unknown channel");
            return false;
        };
        let Some(user) = chan.users.get(nick) else {
            debug!(nick, channel, "mode query against unknown nick");
            return false;
        };
        user.modes.contains(&mode)
    }

    /// Whether we hold op in `channel`.
    pub fn have_op(&self, channel: &str) -> bool {
        self.nick_has_chan_mode(&self.own_nick, 'o', channel)
    }

    /// Whether we hold voice in `channel`.
    pub fn have_voice(&self, channel: &str) -> bool {
        self.nick_has_chan_mode(&self.own_nick, 'v', channel)
    }

    /// Member entries holding membership mode `mode` in `channel`.
    pub fn users_with_chan_mode(&self, channel: &str, mode: char) -> Vec<(String, UserEntry)> {
        let Some(chan) = self.chans.get(&irc_lower(channel)) else {
            debug!(channel, "member query against unknown channel");
            return Vec::new();
        };
        let mut users: Vec<(String, UserEntry)> = chan
            .users
            .iter()
            .filter(|(_, u)| u.modes.contains(&mode))
            .map(|(n, u)| (n.clone(), u.clone()))
            .collect();
        users.sort_by(|a, b| a.0.cmp(&b.0));
        users
    }

    /// Nicks holding membership mode `mode` in `channel`.
    pub fn nicks_with_chan_mode(&self, channel: &str, mode: char) -> Vec<String> {
        let Some(chan) = self.chans.get(&irc_lower(channel)) else {
            debug!(channel, "member query against unknown channel");
            return Vec::new();
        };
        let mut nicks: Vec<String> = chan
            .users
            .iter()
            .filter(|(_, u)| u.modes.contains(&mode))
            .map(|(n, _)| n.clone())
            .collect();
        nicks.sort();
        nicks
    }

    /// Nicks in `channel` lacking the given membership modes.
    ///
    /// With `combined`, a nick is excluded only when it holds *all* of
    /// `without_modes`; otherwise holding any one of them excludes it.
    pub fn nicks_in_channel(
        &self,
        channel: &str,
        without_modes: &[char],
        combined: bool,
    ) -> Vec<String> {
        let Some(chan) = self.chans.get(&irc_lower(channel)) else {
            debug!(channel, "member query against unknown channel");
            return Vec::new();
        };
        let mut nicks: Vec<String> = chan
            .users
            .iter()
            .filter(|(_, user)| {
                if without_modes.is_empty() {
                    return true;
                }
                let excluded = if combined {
                    without_modes.iter().all(|m| user.modes.contains(m))
                } else {
                    without_modes.iter().any(|m| user.modes.contains(m))
                };
                !excluded
            })
            .map(|(n, _)| n.clone())
            .collect();
        nicks.sort();
        nicks
    }

    /// Record one WHOIS field for `nick`, creating the accumulator unless
    /// `only_if_present` blocks it.
    pub fn add_whois_field(
        &mut self,
        nick: &str,
        apply: impl FnOnce(&mut WhoisInfo),
        only_if_present: bool,
    ) {
        if only_if_present && !self.whois_data.contains_key(nick) {
            return;
        }
        let entry = self.whois_data.entry(nick.to_string()).or_default();
        apply(entry);
    }

    /// Drain and return the WHOIS accumulator for `nick`, guaranteeing the
    /// nick field is set.
    pub fn take_whois(&mut self, nick: &str) -> WhoisInfo {
        let mut info = self.whois_data.remove(nick).unwrap_or_default();
        if info.nick.is_empty() {
            info.nick = nick.to_string();
        }
        info
    }

    /// Replace `channel`'s member map from completed WHO records.
    ///
    /// The `status` field drives away state (`G` leading) and membership
    /// modes (remaining prefix chars). An `account` of `"0"` clears the
    /// account; any other value records it and marks the user registered.
    pub fn apply_who_records(&mut self, channel: &str, records: &[WhoRecord]) {
        let mode_for_prefix = self.mode_for_prefix.clone();
        let Some(chan) = self.chan_data(channel, false) else {
            return;
        };

        let mut users = HashMap::new();
        for record in records {
            let Some(nick) = record.get("nick") else {
                continue;
            };
            let mut user = UserEntry {
                username: record.get("username").cloned(),
                host: record.get("host").cloned(),
                ..UserEntry::default()
            };
            if let Some(status) = record.get("status") {
                let mut status_chars = status.chars();
                user.away = status_chars.next() == Some('G');
                for c in status_chars {
                    if let Some(mode) = mode_for_prefix.get(&c) {
                        user.modes.insert(*mode);
                    }
                }
            }
            if let Some(account) = record.get("account") {
                if account == "0" {
                    user.account = None;
                    user.is_registered = false;
                } else {
                    user.account = Some(account.clone());
                    user.is_registered = true;
                }
            }
            users.insert(nick.clone(), user);
        }
        chan.users = users;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_channel() -> SessionState {
        let mut state = SessionState::new("me", "&#");
        state.prefix_for_mode.insert('o', '@');
        state.prefix_for_mode.insert('v', '+');
        state.mode_for_prefix.insert('@', 'o');
        state.mode_for_prefix.insert('+', 'v');
        let chan = state.chan_data("#Test", true).unwrap();
        chan.users.insert("me".into(), UserEntry::default());
        chan.users.insert(
            "alice".into(),
            UserEntry {
                modes: BTreeSet::from(['o']),
                ..UserEntry::default()
            },
        );
        chan.users.insert(
            "bob".into(),
            UserEntry {
                modes: BTreeSet::from(['v']),
                ..UserEntry::default()
            },
        );
        state
    }

    #[test]
    fn test_chan_key_invariant() {
        let mut state = SessionState::new("me", "&#");
        state.chan_data("#MiXeD", true);
        let chan = &state.chans["#mixed"];
        assert_eq!(chan.key, "#mixed");
        assert_eq!(chan.server_name, "#MiXeD");
        assert_eq!(irc_lower(&chan.server_name), chan.key);
    }

    #[test]
    fn test_max_line_length_follows_identity() {
        let mut state = SessionState::new("nick", "&#");
        state.host_mask = "nick!u@h.example".to_string();
        state.update_max_line_length();
        assert_eq!(state.max_line_length, 497 - 4 - 16);
    }

    #[test]
    fn test_unknown_lookups_return_empty() {
        let state = state_with_channel();
        assert!(!state.nick_has_chan_mode("ghost", 'o', "#test"));
        assert!(!state.nick_has_chan_mode("alice", 'o', "#nowhere"));
        assert!(state.nicks_in_channel("#nowhere", &[], false).is_empty());
    }

    #[test]
    fn test_have_op_and_voice() {
        let mut state = state_with_channel();
        assert!(!state.have_op("#test"));
        state
            .chans
            .get_mut("#test")
            .unwrap()
            .users
            .get_mut("me")
            .unwrap()
            .modes
            .insert('o');
        assert!(state.have_op("#test"));
        assert!(!state.have_voice("#test"));
    }

    #[test]
    fn test_nicks_in_channel_filters() {
        let state = state_with_channel();
        assert_eq!(
            state.nicks_in_channel("#test", &[], false),
            vec!["alice", "bob", "me"]
        );
        // OR: holding either mode excludes
        assert_eq!(state.nicks_in_channel("#test", &['o', 'v'], false), vec!["me"]);
        // AND: must hold both modes to be excluded
        assert_eq!(
            state.nicks_in_channel("#test", &['o', 'v'], true),
            vec!["alice", "bob", "me"]
        );
    }

    #[test]
    fn test_nicks_with_chan_mode() {
        let state = state_with_channel();
        assert_eq!(state.nicks_with_chan_mode("#test", 'o'), vec!["alice"]);
        assert_eq!(state.nicks_with_chan_mode("#test", 'v'), vec!["bob"]);
    }

    #[test]
    fn test_users_with_chan_mode() {
        let state = state_with_channel();
        let ops = state.users_with_chan_mode("#test", 'o');
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].0, "alice");
        assert!(ops[0].1.modes.contains(&'o'));
        assert!(state.users_with_chan_mode("#missing", 'o').is_empty());
    }

    #[test]
    fn test_rename_nick_preserves_entry() {
        let mut state = state_with_channel();
        let channels = state.rename_nick("alice", "alicia");
        assert_eq!(channels, vec!["#Test"]);
        let chan = &state.chans["#test"];
        assert!(!chan.users.contains_key("alice"));
        assert!(chan.users["alicia"].modes.contains(&'o'));
    }

    #[test]
    fn test_nick_in_channels_remove() {
        let mut state = state_with_channel();
        let channels = state.nick_in_channels("bob", true);
        assert_eq!(channels, vec!["#Test"]);
        assert!(!state.chans["#test"].users.contains_key("bob"));
    }

    #[test]
    fn test_whois_presence_guard() {
        let mut state = SessionState::new("me", "&#");
        state.add_whois_field("ghost", |w| w.away = Some("gone".into()), true);
        assert!(state.whois_data.is_empty());

        state.add_whois_field("seen", |w| w.user = Some("u".into()), false);
        state.add_whois_field("seen", |w| w.away = Some("gone".into()), true);
        let info = state.take_whois("seen");
        assert_eq!(info.nick, "seen");
        assert_eq!(info.away.as_deref(), Some("gone"));
        assert!(state.whois_data.is_empty());
    }

    #[test]
    fn test_apply_who_records() {
        let mut state = state_with_channel();
        let mut record = WhoRecord::new();
        record.insert("nick".into(), "carol".into());
        record.insert("username".into(), "cu".into());
        record.insert("host".into(), "example.org".into());
        record.insert("status".into(), "G@".into());
        record.insert("account".into(), "carol".into());
        state.apply_who_records("#test", &[record]);

        let chan = &state.chans["#test"];
        assert_eq!(chan.users.len(), 1);
        let carol = &chan.users["carol"];
        assert!(carol.away);
        assert!(carol.modes.contains(&'o'));
        assert_eq!(carol.account.as_deref(), Some("carol"));
        assert!(carol.is_registered);
    }

    #[test]
    fn test_apply_who_account_zero_clears() {
        let mut state = state_with_channel();
        let mut record = WhoRecord::new();
        record.insert("nick".into(), "dave".into());
        record.insert("status".into(), "H".into());
        record.insert("account".into(), "0".into());
        state.apply_who_records("#test", &[record]);

        let dave = &state.chans["#test"].users["dave"];
        assert!(!dave.away);
        assert!(dave.account.is_none());
        assert!(!dave.is_registered);
    }

    #[test]
    fn test_who_fields_mapping() {
        assert_eq!(
            who_fields("%cuhsnfdr"),
            vec!["channel", "username", "host", "server", "nick", "status", "hops", "realname"]
        );
        assert_eq!(who_fields("%cuhnfa"), vec![
            "channel", "username", "host", "nick", "status", "account"
        ]);
    }
}
