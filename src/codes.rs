//! IRC numeric reply codes and their symbolic names.
//!
//! Servers identify most results with three-digit numerics. This module maps
//! them to the lowercase symbolic names used for dispatch (`001` becomes
//! `rpl_welcome`) and classifies each as a reply or an error. The raw
//! numeric is always preserved on the parsed frame.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

/// Classification of a parsed command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommandKind {
    /// A named command (PRIVMSG, JOIN, ...) or an unmapped numeric.
    #[default]
    Normal,
    /// An informational numeric reply (`rpl_*`).
    Reply,
    /// An error numeric (`err_*`).
    Error,
}

/// Numeric-to-symbolic table.
///
/// Ordered by numeric for readability; lookup is linear, which is fine for
/// a table this size on a per-frame basis.
static NUMERICS: &[(&str, &str)] = &[
    ("001", "rpl_welcome"),
    ("002", "rpl_yourhost"),
    ("003", "rpl_created"),
    ("004", "rpl_myinfo"),
    ("005", "rpl_isupport"),
    ("200", "rpl_tracelink"),
    ("201", "rpl_traceconnecting"),
    ("202", "rpl_tracehandshake"),
    ("203", "rpl_traceunknown"),
    ("204", "rpl_traceoperator"),
    ("205", "rpl_traceuser"),
    ("206", "rpl_traceserver"),
    ("208", "rpl_tracenewtype"),
    ("211", "rpl_statslinkinfo"),
    ("212", "rpl_statscommands"),
    ("213", "rpl_statscline"),
    ("214", "rpl_statsnline"),
    ("215", "rpl_statsiline"),
    ("216", "rpl_statskline"),
    ("218", "rpl_statsyline"),
    ("219", "rpl_endofstats"),
    ("221", "rpl_umodeis"),
    ("251", "rpl_luserclient"),
    ("252", "rpl_luserop"),
    ("253", "rpl_luserunknown"),
    ("254", "rpl_luserchannels"),
    ("255", "rpl_luserme"),
    ("256", "rpl_adminme"),
    ("257", "rpl_adminloc1"),
    ("258", "rpl_adminloc2"),
    ("259", "rpl_adminemail"),
    ("263", "rpl_tryagain"),
    ("301", "rpl_away"),
    ("302", "rpl_userhost"),
    ("303", "rpl_ison"),
    ("305", "rpl_unaway"),
    ("306", "rpl_nowaway"),
    ("311", "rpl_whoisuser"),
    ("312", "rpl_whoisserver"),
    ("313", "rpl_whoisoperator"),
    ("314", "rpl_whowasuser"),
    ("315", "rpl_endofwho"),
    ("317", "rpl_whoisidle"),
    ("318", "rpl_endofwhois"),
    ("319", "rpl_whoischannels"),
    ("321", "rpl_liststart"),
    ("322", "rpl_list"),
    ("323", "rpl_listend"),
    ("324", "rpl_channelmodeis"),
    ("329", "rpl_creationtime"),
    ("330", "rpl_whoisaccount"),
    ("331", "rpl_notopic"),
    ("332", "rpl_topic"),
    ("333", "rpl_topicwhotime"),
    ("341", "rpl_inviting"),
    ("346", "rpl_invitelist"),
    ("347", "rpl_endofinvitelist"),
    ("348", "rpl_exceptlist"),
    ("349", "rpl_endofexceptlist"),
    ("351", "rpl_version"),
    ("352", "rpl_whoreply"),
    ("353", "rpl_namreply"),
    ("354", "rpl_whospcrpl"),
    ("364", "rpl_links"),
    ("365", "rpl_endoflinks"),
    ("366", "rpl_endofnames"),
    ("367", "rpl_banlist"),
    ("368", "rpl_endofbanlist"),
    ("369", "rpl_endofwhowas"),
    ("371", "rpl_info"),
    ("372", "rpl_motd"),
    ("374", "rpl_endofinfo"),
    ("375", "rpl_motdstart"),
    ("376", "rpl_endofmotd"),
    ("378", "rpl_whoishost"),
    ("379", "rpl_whoismodes"),
    ("381", "rpl_youreoper"),
    ("382", "rpl_rehashing"),
    ("391", "rpl_time"),
    ("396", "rpl_hosthidden"),
    ("401", "err_nosuchnick"),
    ("402", "err_nosuchserver"),
    ("403", "err_nosuchchannel"),
    ("404", "err_cannotsendtochan"),
    ("405", "err_toomanychannels"),
    ("406", "err_wasnosuchnick"),
    ("407", "err_toomanytargets"),
    ("409", "err_noorigin"),
    ("411", "err_norecipient"),
    ("412", "err_notexttosend"),
    ("413", "err_notoplevel"),
    ("414", "err_wildtoplevel"),
    ("421", "err_unknowncommand"),
    ("422", "err_nomotd"),
    ("423", "err_noadmininfo"),
    ("424", "err_fileerror"),
    ("431", "err_nonicknamegiven"),
    ("432", "err_erroneusnickname"),
    ("433", "err_nicknameinuse"),
    ("436", "err_nickcollision"),
    ("437", "err_unavailresource"),
    ("441", "err_usernotinchannel"),
    ("442", "err_notonchannel"),
    ("443", "err_useronchannel"),
    ("444", "err_nologin"),
    ("445", "err_summondisabled"),
    ("446", "err_usersdisabled"),
    ("451", "err_notregistered"),
    ("461", "err_needmoreparams"),
    ("462", "err_alreadyregistred"),
    ("463", "err_nopermforhost"),
    ("464", "err_passwdmismatch"),
    ("465", "err_yourebannedcreep"),
    ("467", "err_keyset"),
    ("471", "err_channelisfull"),
    ("472", "err_unknownmode"),
    ("473", "err_inviteonlychan"),
    ("474", "err_bannedfromchan"),
    ("475", "err_badchannelkey"),
    ("476", "err_badchanmask"),
    ("477", "err_nochanmodes"),
    ("478", "err_banlistfull"),
    ("481", "err_noprivileges"),
    ("482", "err_chanoprivsneeded"),
    ("483", "err_cantkillserver"),
    ("484", "err_restricted"),
    ("485", "err_uniqopprivsneeded"),
    ("491", "err_nooperhost"),
    ("501", "err_umodeunknownflag"),
    ("502", "err_usersdontmatch"),
    ("900", "rpl_loggedin"),
    ("901", "rpl_loggedout"),
    ("902", "err_nicklocked"),
    ("903", "rpl_saslsuccess"),
    ("904", "err_saslfail"),
    ("905", "err_sasltoolong"),
    ("906", "err_saslaborted"),
    ("907", "err_saslalready"),
    ("908", "rpl_saslmechs"),
];

/// Look up the symbolic name and classification for a raw numeric.
///
/// Returns `None` for non-numeric commands and unmapped numerics; callers
/// keep the raw command string in that case.
pub fn lookup(raw: &str) -> Option<(&'static str, CommandKind)> {
    NUMERICS
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, name)| (*name, kind_of(name)))
}

fn kind_of(name: &str) -> CommandKind {
    if name.starts_with("err_") {
        CommandKind::Error
    } else {
        CommandKind::Reply
    }
}
